use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::model::{
    EmployeeIdentity, LeaveRequestDraft, LeaveType, RequestKind, RequestRecord, RequestStatus,
    WfhRequestDraft,
};
use crate::parser::DateRange;
use crate::services::clock::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFilter {
    Leave,
    Wfh,
    All,
}

impl RequestFilter {
    fn accepts(&self, kind: RequestKind) -> bool {
        match self {
            RequestFilter::All => true,
            RequestFilter::Leave => kind == RequestKind::Leave,
            RequestFilter::Wfh => kind == RequestKind::Wfh,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveBalance {
    pub leave_type: LeaveType,
    pub total: f64,
    pub used: f64,
    pub remaining: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BalanceCheck {
    pub is_available: bool,
    pub remaining: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateOutcome {
    pub success: bool,
    pub id: Option<String>,
    pub message: String,
}

/// System of record for leave and WFH requests.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// First active request of either kind intersecting `range`.
    async fn check_overlap(
        &self,
        employee: &EmployeeIdentity,
        range: DateRange,
    ) -> Result<Option<RequestRecord>, StoreError>;

    async fn get_balance(
        &self,
        employee: &EmployeeIdentity,
        leave_type: LeaveType,
    ) -> Result<LeaveBalance, StoreError>;

    async fn check_balance(
        &self,
        employee: &EmployeeIdentity,
        leave_type: LeaveType,
        requested_days: f64,
    ) -> Result<BalanceCheck, StoreError> {
        let balance = self.get_balance(employee, leave_type).await?;
        Ok(BalanceCheck {
            is_available: balance.remaining >= requested_days,
            remaining: balance.remaining,
        })
    }

    async fn create_leave_record(
        &self,
        employee: &EmployeeIdentity,
        draft: &LeaveRequestDraft,
    ) -> Result<CreateOutcome, StoreError>;

    async fn create_wfh_record(
        &self,
        employee: &EmployeeIdentity,
        draft: &WfhRequestDraft,
    ) -> Result<CreateOutcome, StoreError>;

    async fn list_requests(
        &self,
        employee: &EmployeeIdentity,
        filter: RequestFilter,
    ) -> Result<Vec<RequestRecord>, StoreError>;

    async fn update_record_status(
        &self,
        id: &str,
        status: RequestStatus,
    ) -> Result<RequestRecord, StoreError>;
}

#[derive(Default)]
struct StoreState {
    records: Vec<RequestRecord>,
    next_leave_id: u64,
    next_wfh_id: u64,
}

/* =========================
In-memory record store
========================= */
pub struct InMemoryRecordStore {
    state: RwLock<StoreState>,
    clock: Arc<dyn Clock>,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("record store lock poisoned".to_string())
}

impl InMemoryRecordStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(StoreState {
                next_leave_id: 1,
                next_wfh_id: 1,
                ..Default::default()
            }),
            clock,
        }
    }

    /// Store seeded with one approved annual leave for the default employee.
    pub fn with_demo_data(clock: Arc<dyn Clock>, employee_name: &str) -> Self {
        let store = Self::new(clock);
        if let (Some(start), Some(end)) = (
            NaiveDate::from_ymd_opt(2025, 12, 18),
            NaiveDate::from_ymd_opt(2025, 12, 22),
        ) {
            if let Ok(mut state) = store.state.write() {
                let id = format!("LEAVE_{}", state.next_leave_id);
                state.next_leave_id += 1;
                state.records.push(RequestRecord {
                    id,
                    kind: RequestKind::Leave,
                    employee_name: employee_name.to_string(),
                    employee_email: None,
                    leave_type: Some(LeaveType::Annual),
                    start_date: start,
                    end_date: end,
                    reason: "Year-end vacation".to_string(),
                    duration_days: 3.0,
                    is_half_day: false,
                    is_exception: false,
                    status: RequestStatus::Approved,
                    created_at: store.clock.now(),
                });
            }
        }
        store
    }

    fn owned_by<'a>(
        records: &'a [RequestRecord],
        employee: &'a EmployeeIdentity,
    ) -> impl Iterator<Item = &'a RequestRecord> + 'a {
        records
            .iter()
            .filter(move |r| employee.owns(&r.employee_name, r.employee_email.as_deref()))
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn check_overlap(
        &self,
        employee: &EmployeeIdentity,
        range: DateRange,
    ) -> Result<Option<RequestRecord>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(Self::owned_by(&state.records, employee)
            .filter(|r| r.status.is_active())
            .find(|r| r.range().overlaps(&range))
            .cloned())
    }

    async fn get_balance(
        &self,
        employee: &EmployeeIdentity,
        leave_type: LeaveType,
    ) -> Result<LeaveBalance, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        let used: f64 = Self::owned_by(&state.records, employee)
            .filter(|r| r.kind == RequestKind::Leave && r.leave_type == Some(leave_type))
            .filter(|r| r.status.is_active())
            .map(|r| r.duration_days)
            .sum();
        let total = leave_type.entitlement();
        Ok(LeaveBalance {
            leave_type,
            total,
            used,
            remaining: (total - used).max(0.0),
        })
    }

    async fn create_leave_record(
        &self,
        employee: &EmployeeIdentity,
        draft: &LeaveRequestDraft,
    ) -> Result<CreateOutcome, StoreError> {
        let (Some(range), Some(leave_type)) = (draft.range(), draft.leave_type) else {
            return Ok(CreateOutcome {
                success: false,
                id: None,
                message: "Leave type and dates are required".to_string(),
            });
        };

        let mut state = self.state.write().map_err(poisoned)?;
        let id = format!("LEAVE_{}", state.next_leave_id);
        state.next_leave_id += 1;
        state.records.push(RequestRecord {
            id: id.clone(),
            kind: RequestKind::Leave,
            employee_name: draft
                .employee_name
                .clone()
                .unwrap_or_else(|| employee.name.clone()),
            employee_email: employee.email.clone(),
            leave_type: Some(leave_type),
            start_date: range.start(),
            end_date: range.end(),
            reason: draft.reason.clone().unwrap_or_default(),
            duration_days: draft.requested_days(),
            is_half_day: draft.is_half_day,
            is_exception: draft.is_exception,
            status: RequestStatus::PendingApproval,
            created_at: self.clock.now(),
        });

        info!(%id, %leave_type, "Leave record created");
        Ok(CreateOutcome {
            success: true,
            id: Some(id),
            message: "Leave request created".to_string(),
        })
    }

    async fn create_wfh_record(
        &self,
        employee: &EmployeeIdentity,
        draft: &WfhRequestDraft,
    ) -> Result<CreateOutcome, StoreError> {
        let Some(range) = draft.range() else {
            return Ok(CreateOutcome {
                success: false,
                id: None,
                message: "WFH date is required".to_string(),
            });
        };

        let mut state = self.state.write().map_err(poisoned)?;
        let id = format!("WFH_{}", state.next_wfh_id);
        state.next_wfh_id += 1;
        state.records.push(RequestRecord {
            id: id.clone(),
            kind: RequestKind::Wfh,
            employee_name: draft
                .employee_name
                .clone()
                .unwrap_or_else(|| employee.name.clone()),
            employee_email: employee.email.clone(),
            leave_type: None,
            start_date: range.start(),
            end_date: range.end(),
            reason: draft.reason.clone().unwrap_or_else(|| "Personal".to_string()),
            duration_days: range.days().count() as f64,
            is_half_day: false,
            is_exception: draft.is_exception,
            status: RequestStatus::PendingApproval,
            created_at: self.clock.now(),
        });

        info!(%id, "WFH record created");
        Ok(CreateOutcome {
            success: true,
            id: Some(id),
            message: "WFH request created".to_string(),
        })
    }

    async fn list_requests(
        &self,
        employee: &EmployeeIdentity,
        filter: RequestFilter,
    ) -> Result<Vec<RequestRecord>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        let mut found: Vec<RequestRecord> = Self::owned_by(&state.records, employee)
            .filter(|r| filter.accepts(r.kind))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        debug!(count = found.len(), "Listed requests");
        Ok(found)
    }

    async fn update_record_status(
        &self,
        id: &str,
        status: RequestStatus,
    ) -> Result<RequestRecord, StoreError> {
        let mut state = self.state.write().map_err(poisoned)?;
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.status = status;
        info!(%id, %status, "Record status updated");
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::FixedClock;

    fn store() -> InMemoryRecordStore {
        let clock = Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()));
        InMemoryRecordStore::new(clock)
    }

    fn casual(start: (u32, u32), end: (u32, u32), days: f64) -> LeaveRequestDraft {
        LeaveRequestDraft {
            start_date: NaiveDate::from_ymd_opt(2026, start.0, start.1),
            end_date: NaiveDate::from_ymd_opt(2026, end.0, end.1),
            leave_type: Some(LeaveType::Casual),
            reason: Some("family function".into()),
            duration_days: Some(days),
            ..Default::default()
        }
    }

    #[actix_web::test]
    async fn test_create_then_overlap_and_balance() {
        let store = store();
        let me = EmployeeIdentity::new("Current User");

        let outcome = store
            .create_leave_record(&me, &casual((3, 10), (3, 11), 2.0))
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.id.as_deref(), Some("LEAVE_1"));

        let probe = DateRange::new(
            NaiveDate::from_ymd_opt(2026, 3, 11).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 12).unwrap(),
        )
        .unwrap();
        assert!(store.check_overlap(&me, probe).await.unwrap().is_some());

        let balance = store.get_balance(&me, LeaveType::Casual).await.unwrap();
        assert_eq!(balance.used, 2.0);
        assert_eq!(balance.remaining, 10.0);
    }

    #[actix_web::test]
    async fn test_rejecting_restores_balance_and_frees_dates() {
        let store = store();
        let me = EmployeeIdentity::new("Current User");
        store
            .create_leave_record(&me, &casual((3, 10), (3, 11), 2.0))
            .await
            .unwrap();

        store
            .update_record_status("LEAVE_1", RequestStatus::Rejected)
            .await
            .unwrap();

        let balance = store.get_balance(&me, LeaveType::Casual).await.unwrap();
        assert_eq!(balance.remaining, 12.0);
        let probe = DateRange::single(NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
        assert!(store.check_overlap(&me, probe).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn test_other_employees_do_not_overlap() {
        let store = store();
        let me = EmployeeIdentity::new("Current User");
        let colleague = EmployeeIdentity::new("Someone Else");
        store
            .create_leave_record(&colleague, &casual((3, 10), (3, 10), 1.0))
            .await
            .unwrap();
        let probe = DateRange::single(NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
        assert!(store.check_overlap(&me, probe).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn test_unknown_id_update_fails() {
        let err = store()
            .update_record_status("LEAVE_99", RequestStatus::Approved)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound("LEAVE_99".into()));
    }
}
