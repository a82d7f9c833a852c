use std::str::FromStr;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{error, info};
use utoipa::ToSchema;

use super::engine::{ChatEngine, MessagePayload};
use super::leave_flow::no_working_days;
use super::replies::{
    ChatReply, NOTHING_TO_EDIT, ReplyIntent, confirm_updated_prompt, edit_instructions,
};
use super::session::SessionContext;
use super::validation::GateOutcome;
use crate::model::{LeaveType, PendingConfirmation, RequestKind};
use crate::nlu::Intent;
use crate::nlu::entities::explicit_leave_type;
use crate::nlu::rules::entities_for;
use crate::parser::{DateParseError, DurationSpec, parse_single_date};

static REASON_CHANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\breason\b\s*(?:to|is|as|should\s+be|:|=)?\s*(.+)$").unwrap()
});
static BECAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:because(?:\s+of)?|due\s+to)\s+(.+)$").unwrap());

/// Fields submitted from the client's edit form. Dates may be ISO or any
/// phrasing the date parser understands.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditDetails {
    #[schema(example = "2026-03-05")]
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Single-day shorthand for WFH.
    pub date: Option<String>,
    #[schema(example = "CASUAL")]
    pub leave_type: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Default, PartialEq)]
struct EditChanges {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    duration: DurationSpec,
    leave_type: Option<LeaveType>,
    reason: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_field(value: Option<&str>, reference: NaiveDate) -> Result<Option<NaiveDate>, DateParseError> {
    match non_empty(value) {
        None => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .or_else(|_| parse_single_date(text, reference))
            .map(Some),
    }
}

/// Reason in a free-text edit, only when the message names one.
fn edited_reason(message: &str) -> Option<String> {
    REASON_CHANGE
        .captures(message)
        .or_else(|| BECAUSE.captures(message))
        .map(|caps| caps[1].trim().trim_end_matches(['.', '!']).to_string())
        .filter(|r| r.chars().count() >= 3)
}

impl EditChanges {
    fn is_empty(&self) -> bool {
        self.start.is_none()
            && self.end.is_none()
            && !self.duration.has_explicit_duration
            && !self.duration.is_half_day
            && self.leave_type.is_none()
            && self.reason.is_none()
    }

    fn from_details(details: &EditDetails, reference: NaiveDate) -> Result<Self, DateParseError> {
        let start = parse_field(
            details.start_date.as_deref().or(details.date.as_deref()),
            reference,
        )?;
        let end = parse_field(details.end_date.as_deref(), reference)?;
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err(DateParseError::EndBeforeStart);
            }
        }

        let leave_type = non_empty(details.leave_type.as_deref())
            .and_then(|t| LeaveType::from_str(t).ok().or_else(|| explicit_leave_type(t)));

        Ok(Self {
            start,
            end,
            duration: DurationSpec::default(),
            leave_type,
            reason: non_empty(details.reason.as_deref()).map(str::to_string),
        })
    }

    fn from_message(message: &str, kind: RequestKind, reference: NaiveDate) -> Result<Self, DateParseError> {
        let entities = entities_for(Intent::for_kind(kind), message, reference);
        if let Some(error) = entities.date_errors.into_iter().next() {
            return Err(error);
        }
        Ok(Self {
            start: entities.start_date,
            end: entities.end_date,
            duration: entities.duration,
            leave_type: explicit_leave_type(message),
            reason: edited_reason(message),
        })
    }

    /// New values replace old ones; a new start date brings its own end date
    /// and day count.
    fn apply(self, current: PendingConfirmation) -> PendingConfirmation {
        match current {
            PendingConfirmation::Leave(mut draft) => {
                if let Some(start) = self.start {
                    draft.start_date = Some(start);
                    draft.end_date = Some(self.end.unwrap_or(start));
                    draft.is_half_day = self.duration.is_half_day;
                    draft.duration_days = self
                        .duration
                        .days
                        .filter(|_| self.duration.has_explicit_duration);
                } else if let Some(end) = self.end {
                    draft.end_date = Some(end);
                    draft.is_half_day = false;
                    draft.duration_days = None;
                } else if self.duration.is_half_day || self.duration.has_explicit_duration {
                    draft.end_date = draft.start_date;
                    draft.is_half_day = self.duration.is_half_day;
                    draft.duration_days = self.duration.days;
                }
                if self.leave_type.is_some() {
                    draft.leave_type = self.leave_type;
                }
                if self.reason.is_some() {
                    draft.reason = self.reason;
                }
                PendingConfirmation::Leave(draft)
            }
            PendingConfirmation::Wfh(mut draft) => {
                if let Some(start) = self.start {
                    draft.set_dates(start, self.end.unwrap_or(start));
                } else if let (Some(end), Some(start)) = (self.end, draft.first_day()) {
                    draft.set_dates(start, end);
                }
                if self.reason.is_some() {
                    draft.reason = self.reason;
                }
                PendingConfirmation::Wfh(draft)
            }
        }
    }
}

/// An edit that does not go through leaves the old draft confirmable.
fn keep_pending(session: &mut SessionContext, current: PendingConfirmation) {
    if session.pending.is_none() && session.exception_offer.is_none() {
        session.pending = Some(current);
    }
}

impl ChatEngine {
    /// Merges new details over the pending draft and re-validates it.
    pub(super) async fn edit_request(
        &self,
        session: &mut SessionContext,
        message: &str,
        payload: &MessagePayload,
    ) -> ChatReply {
        let Some(current) = session
            .pending
            .clone()
            .or_else(|| payload.pending_request.clone())
        else {
            return match &session.last_request {
                Some(last) => ChatReply::text(
                    format!(
                        "Your last {} request ({}) has already been sent for approval. \
                         To change it, please contact your manager or submit a new request.",
                        last.kind(),
                        last.range()
                            .map(|r| format!("{} to {}", r.start(), r.end()))
                            .unwrap_or_default()
                    ),
                    ReplyIntent::EditRequest,
                ),
                None => ChatReply::text(NOTHING_TO_EDIT, ReplyIntent::EditRequest),
            };
        };
        let kind = current.kind();
        let today = self.clock.today();

        let changes = match &payload.edit_details {
            Some(details) => EditChanges::from_details(details, today),
            None => EditChanges::from_message(message, kind, today),
        };
        let changes = match changes {
            Ok(changes) => changes,
            Err(e) => {
                keep_pending(session, current);
                return ChatReply::text(
                    format!("❌ {e}\n\nPlease provide corrected dates to continue editing your {kind} request."),
                    ReplyIntent::DateParseError,
                );
            }
        };
        if changes.is_empty() {
            keep_pending(session, current.clone());
            return edit_instructions(&current);
        }

        let updated = match changes.apply(current.clone()) {
            PendingConfirmation::Leave(draft) => match self.finalize_leave(draft).await {
                Ok(draft) => PendingConfirmation::Leave(draft),
                Err(e) => {
                    error!(error = %e, "Could not count leave days for edit");
                    keep_pending(session, current);
                    return ChatReply::text(
                        format!("❌ Sorry, I couldn't check the holiday calendar right now: {e}. Please try again."),
                        ReplyIntent::Error,
                    );
                }
            },
            wfh => wfh,
        };

        match self.gate.check(&session.employee, &updated).await {
            Ok(GateOutcome::Accepted) => {
                if let PendingConfirmation::Leave(draft) = &updated {
                    if let Some(reply) = no_working_days(draft) {
                        keep_pending(session, current);
                        return reply;
                    }
                }
                info!(%kind, "Pending request edited");
                session.set_pending(updated.clone());
                confirm_updated_prompt(&updated)
            }
            Ok(GateOutcome::Rejected(rejection)) => {
                keep_pending(session, current);
                ChatReply::text(
                    format!(
                        "{}\n\nPlease provide corrected details to continue editing your {kind} request.",
                        rejection.message
                    ),
                    rejection.reason_code,
                )
            }
            Ok(GateOutcome::ExceptionOffered(offer)) => {
                session.set_exception_offer(updated.clone());
                ChatReply::text(offer.message, ReplyIntent::ExceptionOffer).with_pending(&updated)
            }
            Err(e) => {
                error!(error = %e, "Validation gate failed during edit");
                keep_pending(session, current);
                ChatReply::text(
                    format!("❌ Sorry, I couldn't check that change right now: {e}. Please try again."),
                    ReplyIntent::Error,
                )
            }
        }
    }
}
