use async_trait::async_trait;
use tracing::info;

use crate::error::StoreError;
use crate::model::PendingApprovalRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalLinks {
    pub approve_url: String,
    pub reject_url: String,
}

/// Tells a manager that an exception request is waiting.
#[async_trait]
pub trait ApprovalNotifier: Send + Sync {
    async fn notify_manager(
        &self,
        record: &PendingApprovalRecord,
        links: &ApprovalLinks,
    ) -> Result<(), StoreError>;
}

/// Writes the links to the log instead of sending mail.
pub struct LogNotifier;

#[async_trait]
impl ApprovalNotifier for LogNotifier {
    async fn notify_manager(
        &self,
        record: &PendingApprovalRecord,
        links: &ApprovalLinks,
    ) -> Result<(), StoreError> {
        info!(
            approval_id = %record.id,
            employee = %record.employee_name,
            kind = %record.request.kind(),
            approve = %links.approve_url,
            reject = %links.reject_url,
            "Manager approval requested"
        );
        Ok(())
    }
}
