use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

use strum::IntoEnumIterator;

use crate::model::{
    LeaveRequestDraft, LeaveType, PendingConfirmation, RequestKind, RequestRecord, WfhRequestDraft,
};
use crate::nlu::Intent;

static HORIZONTAL_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Intent tags the engine itself produces. Free-text answers reuse the
/// classified intent's name instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ReplyIntent {
    AskLeaveDate,
    AskLeaveReason,
    AskLeaveReasonRetry,
    AskLeaveType,
    AskLeaveTypeRetry,
    ConfirmLeave,
    AskWfhDate,
    AskWfhReason,
    AskWfhReasonRetry,
    ConfirmWfh,
    DateParseError,
    NoWorkingDays,
    ExceptionOffer,
    ExceptionDeclined,
    ExceptionSubmitted,
    LeaveCreated,
    WfhCreated,
    ConfirmationNo,
    CancelFlow,
    EditRequest,
    ConfirmUpdatedLeave,
    ConfirmUpdatedWfh,
    LeaveBalanceInfo,
    LeaveBalanceSummary,
    AskRequestType,
    ViewRequests,
    NoRequestsFound,
    HolidayList,
    HolidayCount,
    HolidayCheck,
    Greeting,
    Error,
}

/// One assistant turn as the client sees it.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    #[schema(example = "📋 **Confirm your leave request:**")]
    pub reply: String,
    #[schema(example = "confirm_leave")]
    pub intent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_buttons: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub pending_request: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_form: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub details: Option<Value>,
    #[schema(example = "2026-03-02T12:00:00Z", format = "date-time", value_type = String)]
    pub timestamp: DateTime<Utc>,
}

impl ChatReply {
    pub fn text(reply: impl Into<String>, intent: impl ToString) -> Self {
        Self {
            reply: reply.into(),
            intent: intent.to_string(),
            show_buttons: None,
            pending_request: None,
            show_form: None,
            details: None,
            timestamp: Utc::now(),
        }
    }

    /// Attaches a draft the client renders with yes/no buttons.
    pub fn with_pending(mut self, request: &PendingConfirmation) -> Self {
        self.show_buttons = Some(true);
        self.pending_request = serde_json::to_value(request).ok();
        self
    }

    /// Asks the client to open its edit form prefilled with `details`.
    pub fn with_form(mut self, details: Value) -> Self {
        self.show_form = Some(true);
        self.details = Some(details);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn cleaned(mut self) -> Self {
        self.reply = clean_reply(&self.reply);
        self
    }
}

/// Collapses runs of spaces and tabs, caps blank lines at one, trims.
pub fn clean_reply(reply: &str) -> String {
    let collapsed = HORIZONTAL_SPACE.replace_all(reply, " ");
    BLANK_LINES.replace_all(&collapsed, "\n\n").trim().to_string()
}

/* ========================= PROMPTS ========================= */

pub const ASK_LEAVE_DATE: &str =
    "🗓️ **When would you like to take leave?**\n\nPlease provide the date(s) (e.g. \"Oct 18\" or \"Tomorrow\").";
pub const ASK_LEAVE_REASON_RETRY: &str = "📝 Could you please specify why you need leave?";
pub const ASK_LEAVE_TYPE_RETRY: &str = "🏖️ Please specify: Annual, Sick, or Casual.";
pub const ASK_WFH_DATE: &str = "🏠 **When would you like to WFH?**\n(e.g. \"tomorrow\" or \"25th Jan\")";
pub const ASK_WFH_REASON_RETRY: &str = "📝 Could you please provide a reason for your WFH request?";
pub const ASK_REQUEST_TYPE: &str = "Which requests would you like to see? (Leave, WFH, or All)";
pub const CONFIRMATION_NO: &str = "ℹ️ Request cancelled. How else can I help you?";
pub const EXCEPTION_DECLINED: &str =
    "Okay, I've discarded that request. You can reduce the duration or pick different dates anytime.";
pub const NOTHING_TO_EDIT: &str =
    "There's no request to edit right now. Would you like to apply for leave or WFH?";
pub const HOLIDAYS_UNAVAILABLE: &str = "I'm sorry, I couldn't load the holiday list.";
pub const REQUESTS_UNAVAILABLE: &str = "Unable to fetch your requests. Please try again or contact HR.";
pub const BALANCE_UNAVAILABLE: &str = "I couldn't fetch your leave balance right now. Please try again shortly.";
pub const RESPONDER_UNAVAILABLE: &str = "I encountered an unexpected error. Please try:\n\
    • Rephrasing your question\n\
    • Using specific commands like 'apply for leave' or 'holiday list'\n\
    • Contacting HR if you need immediate assistance";

pub fn cancel_flow(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::Leave => "Okay, I've cancelled that leave request. What else can I help you with?",
        RequestKind::Wfh => "Okay, I've cancelled that WFH request.",
    }
}

pub fn ask_leave_reason(draft: &LeaveRequestDraft) -> String {
    format!("📝 **What is the reason for your leave on {}?**", draft.date_label())
}

pub fn ask_leave_type(inferred: Option<LeaveType>) -> String {
    let hint = inferred
        .map(|t| format!("Potentially {t} leave. "))
        .unwrap_or_default();
    format!("🏖️ {hint}**What type of leave is this?**\n(Options: Annual, Sick, Casual)")
}

pub fn ask_wfh_reason(draft: &WfhRequestDraft) -> String {
    format!("📝 **What is the reason for WFH on {}?**", draft.date_label())
}

pub fn date_error(error: &impl std::fmt::Display) -> String {
    format!("❌ {error}\n\nPlease provide the date(s) again (e.g. \"15th March\" or \"15-03-2026 to 17-03-2026\").")
}

fn days_label(days: f64) -> String {
    if days == 0.5 {
        "Half day".to_string()
    } else if days == 1.0 {
        "1 day".to_string()
    } else {
        format!("{days:.0} days")
    }
}

/// Bullet summary of a draft, shared by confirm and edit prompts.
pub fn request_summary(request: &PendingConfirmation) -> String {
    let mut lines = Vec::new();
    match request {
        PendingConfirmation::Leave(draft) => {
            let leave_type = draft
                .leave_type
                .map(|t| t.to_string())
                .unwrap_or_else(|| "Not set".into());
            lines.push(format!("• **Type**: {leave_type}"));
            lines.push(format!("• **Date**: {}", draft.date_label()));
            lines.push(format!("• **Duration**: {}", days_label(draft.requested_days())));
            lines.push(format!("• **Reason**: {}", draft.reason.as_deref().unwrap_or("Personal")));
        }
        PendingConfirmation::Wfh(draft) => {
            lines.push(format!("• **Date**: {}", draft.date_label()));
            lines.push(format!("• **Reason**: {}", draft.reason.as_deref().unwrap_or("Personal")));
        }
    }
    if request.is_exception() {
        lines.push("• **Exception**: needs manager approval".to_string());
    }
    lines.join("\n")
}

pub fn confirm_prompt(request: &PendingConfirmation) -> ChatReply {
    let (title, intent) = match request.kind() {
        RequestKind::Leave => ("📋 **Confirm your leave request:**", ReplyIntent::ConfirmLeave),
        RequestKind::Wfh => ("📋 **Confirm your WFH request:**", ReplyIntent::ConfirmWfh),
    };
    ChatReply::text(format!("{title}\n\n{}", request_summary(request)), intent).with_pending(request)
}

pub fn confirm_updated_prompt(request: &PendingConfirmation) -> ChatReply {
    let (title, intent) = match request.kind() {
        RequestKind::Leave => (
            "📋 **Please confirm your UPDATED leave request:**",
            ReplyIntent::ConfirmUpdatedLeave,
        ),
        RequestKind::Wfh => (
            "📋 **Please confirm your UPDATED WFH request:**",
            ReplyIntent::ConfirmUpdatedWfh,
        ),
    };
    ChatReply::text(
        format!("{title}\n\n{}\n\nTap a button below when you're ready.", request_summary(request)),
        intent,
    )
    .with_pending(request)
}

pub fn edit_instructions(request: &PendingConfirmation) -> ChatReply {
    let example = match request.kind() {
        RequestKind::Leave => "\"Casual leave on 20.12.2026 for family event\"",
        RequestKind::Wfh => "\"WFH on 20.12.2026 for doctor appointment\"",
    };
    ChatReply::text(
        format!(
            "✏️ Got it! Let's update your {} request.\n\n**Current Details:**\n{}\n\n\
             Please provide the complete NEW information. For example:\n{example}",
            request.kind(),
            request_summary(request)
        ),
        ReplyIntent::EditRequest,
    )
    .with_form(request.details_json())
}

pub fn created(request: &PendingConfirmation, record_id: Option<&str>) -> ChatReply {
    let id_line = record_id.map(|id| format!("\nID: {id}")).unwrap_or_default();
    match request {
        PendingConfirmation::Leave(draft) => ChatReply::text(
            format!(
                "✅ Leave request created successfully!\n\nType: {}\nDate: {}\nStatus: Pending Approval{id_line}\n\nYour manager has been notified.",
                draft.leave_type.map(|t| t.to_string()).unwrap_or_default(),
                draft.date_label(),
            ),
            ReplyIntent::LeaveCreated,
        ),
        PendingConfirmation::Wfh(draft) => ChatReply::text(
            format!(
                "✅ WFH request created successfully!\n\nDate: {}\nStatus: Pending Approval{id_line}\n\nYour manager has been notified.",
                draft.date_label(),
            ),
            ReplyIntent::WfhCreated,
        ),
    }
}

pub fn exception_submitted(request: &PendingConfirmation) -> ChatReply {
    ChatReply::text(
        format!(
            "✅ Exception {} request sent successfully!\n\n{}\n\nYour manager will review it and approve or reject it by email.",
            request.kind(),
            request_summary(request)
        ),
        ReplyIntent::ExceptionSubmitted,
    )
}

pub fn commit_failed(message: &impl std::fmt::Display) -> ChatReply {
    ChatReply::text(
        format!("❌ Sorry, I couldn't create that request: {message}"),
        ReplyIntent::Error,
    )
}

pub fn greeting(name: &str) -> ChatReply {
    ChatReply::text(
        format!(
            "Hello {name}! 👋 I'm your HR Assistant. I can help you with:\n\n\
             • Applying for **Leave** or **WFH**\n\
             • Checking your **Leave Balance**\n\
             • Viewing your **Existing Requests**\n\
             • Information on **Company Policies**\n\n\
             How can I help you today?"
        ),
        ReplyIntent::Greeting,
    )
}

/// Answer for questions no handler owns when no model is around to phrase one.
pub fn canned_answer(intent: Intent, wfh_weekly_cap: usize) -> String {
    match intent {
        Intent::LeavePolicy => {
            let lines: Vec<String> = LeaveType::iter()
                .map(|t| format!("• **{t}**: {} days per year", t.entitlement()))
                .collect();
            format!(
                "📘 **Leave Policy**\n\n{}\n\nAsk me to check your balance or apply for leave anytime.",
                lines.join("\n")
            )
        }
        Intent::WfhPolicy => format!(
            "🏠 **WFH Policy**\n\nYou can work from home up to {wfh_weekly_cap} days per week (Monday to Sunday). \
             Anything beyond that goes to your manager as an exception request."
        ),
        Intent::ReimbursementInfo => "💳 Reimbursements are submitted with your bills through the HR portal. \
             Please contact HR for category limits and timelines."
            .to_string(),
        _ => "I'm not sure I understood that. You can ask me to:\n\
             • Apply for leave or WFH\n\
             • Check your leave balance\n\
             • View your requests\n\
             • See the holiday calendar"
            .to_string(),
    }
}

/* ========================= REQUEST LISTING ========================= */

pub fn no_requests(scope: &str) -> ChatReply {
    ChatReply::text(
        format!(
            "You haven't made any {scope} requests yet.\n\nWould you like to:\n\
             • Apply for leave\n• Apply for WFH\n• Check your leave balance"
        ),
        ReplyIntent::NoRequestsFound,
    )
}

pub fn request_listing(records: &[RequestRecord]) -> ChatReply {
    let (leaves, wfhs): (Vec<&RequestRecord>, Vec<&RequestRecord>) =
        records.iter().partition(|r| r.kind == RequestKind::Leave);

    let mut reply = String::from("📋 **Your Requests**\n\n");
    if !leaves.is_empty() {
        reply.push_str(&format!("**Leave Requests ({})**\n", leaves.len()));
        for leave in leaves {
            reply.push_str(&format!(
                "{} **{}** - {} to {}\n   Status: {} | Reason: {}\n   ID: {}\n\n",
                leave.status.emoji(),
                leave.leave_type.map(|t| t.to_string()).unwrap_or_else(|| "LEAVE".into()),
                leave.start_date,
                leave.end_date,
                leave.status,
                if leave.reason.is_empty() { "Not specified" } else { leave.reason.as_str() },
                leave.id,
            ));
        }
    }
    if !wfhs.is_empty() {
        reply.push_str(&format!("**WFH Requests ({})**\n", wfhs.len()));
        for wfh in wfhs {
            let dates = if wfh.end_date == wfh.start_date {
                wfh.start_date.to_string()
            } else {
                format!("{} to {}", wfh.start_date, wfh.end_date)
            };
            reply.push_str(&format!(
                "{} **{dates}**\n   Status: {}\n   Reason: {}\n   ID: {}\n\n",
                wfh.status.emoji(),
                wfh.status,
                if wfh.reason.is_empty() { "Personal" } else { wfh.reason.as_str() },
                wfh.id,
            ));
        }
    }
    reply.push_str("\n**Legend:**\n✅ Approved | ❌ Rejected | ⏳ Pending | 🚫 Cancelled\n");
    reply.push_str("\nWould you like to view details, edit, or cancel any request?");

    ChatReply::text(reply, ReplyIntent::ViewRequests)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_clean_reply() {
        assert_eq!(clean_reply("  a  \t b\n\n\n\nc  "), "a b\n\nc");
    }

    #[test]
    fn test_confirm_prompt_carries_draft() {
        let request = PendingConfirmation::Leave(LeaveRequestDraft {
            start_date: NaiveDate::from_ymd_opt(2026, 3, 3),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 4),
            leave_type: Some(LeaveType::Casual),
            reason: Some("doctor visit".into()),
            duration_days: Some(2.0),
            ..Default::default()
        });
        let reply = confirm_prompt(&request);

        assert_eq!(reply.intent, "confirm_leave");
        assert_eq!(reply.show_buttons, Some(true));
        assert!(reply.reply.contains("• **Type**: CASUAL"));
        assert!(reply.reply.contains("2026-03-03 to 2026-03-04"));
        assert!(reply.reply.contains("2 days"));
        let pending = reply.pending_request.unwrap();
        assert_eq!(pending["type"], "leave");
        assert_eq!(pending["details"]["durationDays"], 2.0);
    }

    #[test]
    fn test_canned_policy_lists_entitlements() {
        let answer = canned_answer(Intent::LeavePolicy, 2);
        assert!(answer.contains("• **ANNUAL**: 21 days per year"));
        assert!(canned_answer(Intent::WfhPolicy, 2).contains("up to 2 days per week"));
    }

    #[test]
    fn test_reply_wire_shape_skips_empty_fields() {
        let value = serde_json::to_value(ChatReply::text("hi", ReplyIntent::Greeting)).unwrap();
        assert_eq!(value["intent"], "greeting");
        assert!(value.get("showButtons").is_none());
        assert!(value.get("timestamp").is_some());
    }
}
