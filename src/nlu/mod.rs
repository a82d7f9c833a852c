//! Intent classification and entity extraction.
//!
//! [`IntentClassifier`] is the seam between the conversation engine and
//! whatever understands language: [`RuleBasedClassifier`] runs a fixed list of
//! named rules, [`GroqClient`] asks an OpenAI-compatible chat model, and
//! [`HybridClassifier`] combines the two with a bounded wait on the model.

pub mod entities;
pub mod hybrid;
pub mod llm;
pub mod rules;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::error::ClassifyError;
use crate::model::{LeaveType, RequestKind};
use crate::parser::{DateParseError, DurationSpec};
use crate::services::record_store::RequestFilter;

pub use hybrid::HybridClassifier;
pub use llm::GroqClient;
pub use rules::RuleBasedClassifier;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Intent {
    ApplyLeave,
    ApplyWfh,
    LeaveBalance,
    ViewRequests,
    HolidayList,
    Greeting,
    LeavePolicy,
    WfhPolicy,
    ReimbursementInfo,
    GeneralQuery,
}

impl Intent {
    /// Intents that start or redirect a piece of HR work. One of these,
    /// different from the active flow, abandons that flow.
    pub fn is_hr_action(&self) -> bool {
        matches!(self, Intent::ApplyLeave | Intent::ApplyWfh | Intent::LeaveBalance)
    }

    /// Intents answered without disturbing an active flow.
    pub fn passes_flow_lock(&self) -> bool {
        matches!(self, Intent::ViewRequests | Intent::Greeting | Intent::HolidayList)
    }

    pub fn for_kind(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Leave => Intent::ApplyLeave,
            RequestKind::Wfh => Intent::ApplyWfh,
        }
    }
}

/// Typed entities pulled from one message. Every field is optional; a value
/// is only present once it has been parsed and validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entities {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub date_errors: Vec<DateParseError>,
    pub duration: DurationSpec,
    pub leave_type: Option<LeaveType>,
    pub reason: Option<String>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub request_filter: Option<RequestFilter>,
}

impl Entities {
    /// Fills every field still missing here from `fallback`.
    pub fn fill_missing_from(&mut self, fallback: Entities) {
        if self.start_date.is_none() && self.date_errors.is_empty() {
            self.start_date = fallback.start_date;
            self.end_date = fallback.end_date;
            self.date_errors = fallback.date_errors;
        }
        if self.duration.days.is_none() {
            self.duration = fallback.duration;
        }
        self.leave_type = self.leave_type.or(fallback.leave_type);
        self.reason = self.reason.take().or(fallback.reason);
        self.month = self.month.or(fallback.month);
        self.year = self.year.or(fallback.year);
        self.request_filter = self.request_filter.or(fallback.request_filter);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AnalysisSource {
    Rules,
    Llm,
    /// Rules answered because the model failed or timed out.
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub intent: Intent,
    pub confidence: f64,
    pub entities: Entities,
    pub source: AnalysisSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
}

/// What a classifier may know besides the message itself.
#[derive(Debug, Clone)]
pub struct ClassifyContext {
    pub reference: NaiveDate,
    pub employee_name: String,
    pub active_flow: Option<RequestKind>,
    pub history: Vec<HistoryEntry>,
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(
        &self,
        message: &str,
        context: &ClassifyContext,
    ) -> Result<Analysis, ClassifyError>;
}

/// Free-text answers for questions no handler owns.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, message: &str, context: &ClassifyContext)
    -> Result<String, ClassifyError>;
}
