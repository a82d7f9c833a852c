use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use strum_macros::{Display, EnumString};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{ApprovalError, StoreError};
use crate::model::{EmployeeIdentity, PendingApprovalRecord, PendingConfirmation, RequestStatus};
use crate::services::clock::Clock;
use crate::services::notifier::{ApprovalLinks, ApprovalNotifier};
use crate::services::pending_approval::PendingApprovalStore;
use crate::services::record_store::RecordStore;
use crate::services::with_timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ApprovalAction {
    Approve,
    Reject,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApprovalClaims {
    sub: String,
    action: ApprovalAction,
    exp: i64,
    jti: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalDecision {
    pub approval_id: String,
    pub action: ApprovalAction,
    pub record_id: Option<String>,
    pub message: String,
}

/// Email-first approval path for exception requests: park the request, hand
/// the manager signed approve/reject links, persist only on approval.
pub struct ApprovalService {
    approvals: Arc<PendingApprovalStore>,
    records: Arc<dyn RecordStore>,
    notifier: Arc<dyn ApprovalNotifier>,
    clock: Arc<dyn Clock>,
    secret: String,
    link_base: String,
    timeout: Duration,
}

impl ApprovalService {
    pub fn new(
        approvals: Arc<PendingApprovalStore>,
        records: Arc<dyn RecordStore>,
        notifier: Arc<dyn ApprovalNotifier>,
        clock: Arc<dyn Clock>,
        secret: impl Into<String>,
        link_base: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            approvals,
            records,
            notifier,
            clock,
            secret: secret.into(),
            link_base: link_base.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn approvals(&self) -> &PendingApprovalStore {
        &self.approvals
    }

    #[instrument(name = "approval_submit", skip(self, employee, request), fields(employee = %employee.name))]
    pub async fn submit(
        &self,
        employee: &EmployeeIdentity,
        mut request: PendingConfirmation,
    ) -> Result<PendingApprovalRecord, ApprovalError> {
        request.mark_exception();
        let record = self.approvals.store(employee, request).await;
        let notified = match self.links_for(&record) {
            Ok(links) => with_timeout(self.timeout, self.notifier.notify_manager(&record, &links))
                .await
                .map_err(ApprovalError::from),
            Err(e) => Err(e),
        };
        if let Err(e) = notified {
            // nobody holds links to it, so it can never be decided
            self.approvals.remove(&record.id).await;
            warn!(approval_id = %record.id, error = %e, "Manager notification failed");
            return Err(e);
        }
        Ok(record)
    }

    pub fn links_for(&self, record: &PendingApprovalRecord) -> Result<ApprovalLinks, ApprovalError> {
        let exp = record.expires_at.timestamp();
        let approve = self.sign(&record.id, ApprovalAction::Approve, exp)?;
        let reject = self.sign(&record.id, ApprovalAction::Reject, exp)?;
        Ok(ApprovalLinks {
            approve_url: format!("{}/{}?action=approve&token={}", self.link_base, record.id, approve),
            reject_url: format!("{}/{}?action=reject&token={}", self.link_base, record.id, reject),
        })
    }

    fn sign(&self, id: &str, action: ApprovalAction, exp: i64) -> Result<String, ApprovalError> {
        let claims = ApprovalClaims {
            sub: id.to_string(),
            action,
            exp,
            jti: Uuid::new_v4().to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApprovalError::Signing(e.to_string()))
    }

    fn verify(&self, id: &str, action: ApprovalAction, token: &str) -> Result<(), ApprovalError> {
        // Expiry is judged against the injected clock, not the system time.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let claims = decode::<ApprovalClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => ApprovalError::Expired,
            _ => ApprovalError::InvalidToken,
        })?
        .claims;

        if claims.sub != id || claims.action != action {
            return Err(ApprovalError::InvalidToken);
        }
        if claims.exp <= self.clock.now().timestamp() {
            return Err(ApprovalError::Expired);
        }
        Ok(())
    }

    /// Applies a manager's decision from a signed link.
    #[instrument(name = "approval_decide", skip(self, token))]
    pub async fn decide(
        &self,
        id: &str,
        action: ApprovalAction,
        token: &str,
    ) -> Result<ApprovalDecision, ApprovalError> {
        // 1️⃣ token must match this id and action
        self.verify(id, action, token).inspect_err(|e| {
            warn!(error = %e, "Approval link rejected");
        })?;

        // 2️⃣ record must still be waiting; taking it claims the decision
        let record = self.approvals.take(id).await.ok_or(ApprovalError::NotFound)?;

        if action == ApprovalAction::Reject {
            info!("Exception request rejected by manager");
            return Ok(ApprovalDecision {
                approval_id: id.to_string(),
                action,
                record_id: None,
                message: format!("Request from {} rejected", record.employee_name),
            });
        }

        // 3️⃣ persist, then mark approved; a failed write puts the request back
        let employee = EmployeeIdentity {
            name: record.employee_name.clone(),
            email: record.employee_email.clone(),
            gender: None,
        };
        let created = match &record.request {
            PendingConfirmation::Leave(draft) => {
                with_timeout(self.timeout, self.records.create_leave_record(&employee, draft)).await
            }
            PendingConfirmation::Wfh(draft) => {
                with_timeout(self.timeout, self.records.create_wfh_record(&employee, draft)).await
            }
        };
        let outcome = match created {
            Ok(outcome) if outcome.success => outcome,
            Ok(outcome) => {
                self.approvals.restore(record).await;
                return Err(ApprovalError::Store(StoreError::Unavailable(outcome.message)));
            }
            Err(e) => {
                self.approvals.restore(record).await;
                return Err(e.into());
            }
        };
        if let Some(record_id) = outcome.id.as_deref() {
            with_timeout(
                self.timeout,
                self.records.update_record_status(record_id, RequestStatus::Approved),
            )
            .await?;
        }

        info!(record_id = ?outcome.id, "Exception request approved by manager");
        Ok(ApprovalDecision {
            approval_id: id.to_string(),
            action,
            record_id: outcome.id,
            message: format!("Request from {} approved", record.employee_name),
        })
    }
}
