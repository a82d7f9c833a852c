use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::leave_request::{LeaveType, RequestKind};
use crate::parser::DateRange;

/// A leave request being assembled over several chat turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequestDraft {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub leave_type: Option<LeaveType>,
    pub reason: Option<String>,
    pub employee_name: Option<String>,
    pub duration_days: Option<f64>,
    #[serde(default)]
    pub is_half_day: bool,
    #[serde(default)]
    pub is_exception: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl LeaveRequestDraft {
    pub fn has_dates(&self) -> bool {
        self.start_date.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.start_date.is_some() && self.reason.is_some() && self.leave_type.is_some()
    }

    pub fn range(&self) -> Option<DateRange> {
        let start = self.start_date?;
        DateRange::new(start, self.end_date.unwrap_or(start)).ok()
    }

    /// Days charged against the balance; never below a half day.
    pub fn requested_days(&self) -> f64 {
        if self.is_half_day {
            return 0.5;
        }
        self.duration_days.unwrap_or(1.0).max(0.5)
    }

    pub fn clear_dates(&mut self) {
        self.start_date = None;
        self.end_date = None;
        self.duration_days = None;
        self.is_half_day = false;
    }

    pub fn date_label(&self) -> String {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if end != start => format!("{start} to {end}"),
            (Some(start), _) => start.to_string(),
            _ => "not set".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WfhRequestDraft {
    pub date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
    pub employee_name: Option<String>,
    #[serde(default)]
    pub is_exception: bool,
}

impl WfhRequestDraft {
    pub fn first_day(&self) -> Option<NaiveDate> {
        self.start_date.or(self.date)
    }

    pub fn has_dates(&self) -> bool {
        self.first_day().is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.has_dates() && self.reason.is_some()
    }

    pub fn range(&self) -> Option<DateRange> {
        let start = self.first_day()?;
        DateRange::new(start, self.end_date.unwrap_or(start)).ok()
    }

    pub fn set_dates(&mut self, start: NaiveDate, end: NaiveDate) {
        self.date = Some(start);
        self.start_date = Some(start);
        self.end_date = Some(end);
    }

    pub fn clear_dates(&mut self) {
        self.date = None;
        self.start_date = None;
        self.end_date = None;
    }

    pub fn date_label(&self) -> String {
        match (self.first_day(), self.end_date) {
            (Some(start), Some(end)) if end != start => format!("{start} to {end}"),
            (Some(start), _) => start.to_string(),
            _ => "not set".to_string(),
        }
    }
}

/// A fully validated draft waiting for the employee's yes/no.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details", rename_all = "lowercase")]
pub enum PendingConfirmation {
    Leave(LeaveRequestDraft),
    Wfh(WfhRequestDraft),
}

impl PendingConfirmation {
    pub fn kind(&self) -> RequestKind {
        match self {
            PendingConfirmation::Leave(_) => RequestKind::Leave,
            PendingConfirmation::Wfh(_) => RequestKind::Wfh,
        }
    }

    pub fn is_exception(&self) -> bool {
        match self {
            PendingConfirmation::Leave(draft) => draft.is_exception,
            PendingConfirmation::Wfh(draft) => draft.is_exception,
        }
    }

    pub fn mark_exception(&mut self) {
        match self {
            PendingConfirmation::Leave(draft) => draft.is_exception = true,
            PendingConfirmation::Wfh(draft) => draft.is_exception = true,
        }
    }

    pub fn range(&self) -> Option<DateRange> {
        match self {
            PendingConfirmation::Leave(draft) => draft.range(),
            PendingConfirmation::Wfh(draft) => draft.range(),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            PendingConfirmation::Leave(draft) => draft.reason.as_deref(),
            PendingConfirmation::Wfh(draft) => draft.reason.as_deref(),
        }
    }

    pub fn details_json(&self) -> serde_json::Value {
        match self {
            PendingConfirmation::Leave(draft) => serde_json::to_value(draft),
            PendingConfirmation::Wfh(draft) => serde_json::to_value(draft),
        }
        .unwrap_or(serde_json::Value::Null)
    }
}
