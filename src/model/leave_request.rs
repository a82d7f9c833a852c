use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::parser::DateRange;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum LeaveType {
    #[serde(alias = "annual", alias = "Annual")]
    Annual,
    #[serde(alias = "sick", alias = "Sick")]
    Sick,
    #[serde(alias = "casual", alias = "Casual")]
    Casual,
    #[serde(alias = "maternity", alias = "Maternity")]
    Maternity,
    #[serde(alias = "paternity", alias = "Paternity")]
    Paternity,
}

impl LeaveType {
    /// Yearly entitlement in days.
    pub fn entitlement(&self) -> f64 {
        match self {
            LeaveType::Annual => 21.0,
            LeaveType::Casual => 12.0,
            LeaveType::Sick => 12.0,
            LeaveType::Maternity => 180.0,
            LeaveType::Paternity => 15.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    #[strum(serialize = "leave")]
    Leave,
    #[strum(serialize = "WFH")]
    Wfh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum RequestStatus {
    #[serde(rename = "Pending Approval")]
    #[strum(serialize = "Pending Approval")]
    PendingApproval,
    Approved,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    /// Rejected and cancelled requests no longer hold dates or balance.
    pub fn is_active(&self) -> bool {
        matches!(self, RequestStatus::PendingApproval | RequestStatus::Approved)
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RequestStatus::Approved => "✅",
            RequestStatus::Rejected => "❌",
            RequestStatus::PendingApproval => "⏳",
            RequestStatus::Cancelled => "🚫",
        }
    }
}

/// A persisted leave or WFH request as the record store sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    pub id: String,
    pub kind: RequestKind,
    pub employee_name: String,
    pub employee_email: Option<String>,
    pub leave_type: Option<LeaveType>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub duration_days: f64,
    pub is_half_day: bool,
    pub is_exception: bool,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl RequestRecord {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date).unwrap_or(DateRange::single(self.start_date))
    }

    /// Display label, e.g. `CASUAL leave` or `WFH`.
    pub fn label(&self) -> String {
        match (self.kind, self.leave_type) {
            (RequestKind::Leave, Some(leave_type)) => format!("{leave_type} leave"),
            (RequestKind::Leave, None) => "leave".to_string(),
            (RequestKind::Wfh, _) => "WFH".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_leave_type_parses_any_case() {
        assert_eq!(LeaveType::from_str("casual").unwrap(), LeaveType::Casual);
        assert_eq!(LeaveType::from_str("SICK").unwrap(), LeaveType::Sick);
        assert!(LeaveType::from_str("vacation").is_err());
        assert_eq!(LeaveType::Annual.to_string(), "ANNUAL");
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(RequestStatus::PendingApproval.to_string(), "Pending Approval");
        let json = serde_json::to_string(&RequestStatus::PendingApproval).unwrap();
        assert_eq!(json, "\"Pending Approval\"");
        assert!(!RequestStatus::Rejected.is_active());
    }
}
