use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::draft::PendingConfirmation;
use super::leave_request::LeaveType;
use crate::parser::DateRange;

/// An exception request parked until the manager follows an approve/reject link.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingApprovalRecord {
    pub id: String,
    pub employee_name: String,
    pub employee_email: Option<String>,
    pub request: PendingConfirmation,
    pub timestamp: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingApprovalRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn leave_type(&self) -> Option<LeaveType> {
        match &self.request {
            PendingConfirmation::Leave(draft) => draft.leave_type,
            PendingConfirmation::Wfh(_) => None,
        }
    }

    pub fn dates(&self) -> Option<DateRange> {
        self.request.range()
    }

    pub fn duration_days(&self) -> Option<f64> {
        match &self.request {
            PendingConfirmation::Leave(draft) => Some(draft.requested_days()),
            PendingConfirmation::Wfh(draft) => draft.range().map(|r| r.days().count() as f64),
        }
    }
}
