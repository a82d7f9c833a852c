use chrono::Days;
use tracing::{debug, error};

use super::engine::ChatEngine;
use super::replies::{
    ASK_LEAVE_DATE, ASK_LEAVE_REASON_RETRY, ASK_LEAVE_TYPE_RETRY, ChatReply, ReplyIntent,
    ask_leave_reason, ask_leave_type, date_error,
};
use super::session::{ActiveFlow, FlowStep, SessionContext};
use super::validation::{ReasonCode, past_date_message};
use crate::error::StoreError;
use crate::model::{LeaveRequestDraft, PendingConfirmation, RequestKind};
use crate::nlu::entities::{explicit_leave_type, extract_leave_type, infer_leave_type};
use crate::nlu::{Analysis, AnalysisSource};
use crate::parser::{DateRange, is_past_date, reconcile_end_date, working_days};
use crate::services::with_timeout;

// Holidays are fetched this far past the start so a day count can slide over them.
const HOLIDAY_HORIZON_DAYS: u64 = 60;

/// Whole message as a reason, once it is more than a stray character or two.
pub(super) fn free_text_reason(message: &str) -> Option<String> {
    let trimmed = message.trim();
    (trimmed.chars().count() >= 3).then(|| trimmed.to_string())
}

/// Reply for a range with nothing to take off, or `None` when there is.
pub(super) fn no_working_days(draft: &LeaveRequestDraft) -> Option<ChatReply> {
    (draft.duration_days == Some(0.0)).then(|| {
        ChatReply::text(
            format!(
                "📅 {} falls entirely on weekends or company holidays, so there are no working days to take off.\n\n\
                 Please provide different date(s).",
                draft.date_label()
            ),
            ReplyIntent::NoWorkingDays,
        )
    })
}

fn at_step(step: FlowStep, draft: LeaveRequestDraft) -> Option<ActiveFlow> {
    Some(ActiveFlow::Leave { step, draft })
}

impl ChatEngine {
    /// Advances the leave flow by one message: dates, then reason, then type,
    /// then the validation gate.
    pub(super) async fn continue_leave(
        &self,
        session: &mut SessionContext,
        message: &str,
        analysis: Analysis,
    ) -> ChatReply {
        let today = self.clock.today();
        let (step, mut draft) = match session.flow.take() {
            Some(ActiveFlow::Leave { step, draft }) => (step, draft),
            _ => (FlowStep::Start, LeaveRequestDraft::default()),
        };
        let entities = analysis.entities;

        // 1️⃣ dates
        if !draft.has_dates() {
            if let Some(error) = entities.date_errors.first() {
                let reply = ChatReply::text(date_error(error), ReplyIntent::DateParseError);
                session.flow = at_step(FlowStep::Date, draft);
                return reply;
            }
            if let Some(start) = entities.start_date {
                if is_past_date(start, today) {
                    session.flow = at_step(FlowStep::Date, draft);
                    return ChatReply::text(
                        past_date_message(RequestKind::Leave, start),
                        ReasonCode::PastDate,
                    );
                }
                draft.start_date = Some(start);
                draft.end_date = Some(entities.end_date.unwrap_or(start));
                draft.is_half_day = entities.duration.is_half_day;
                if entities.duration.has_explicit_duration {
                    draft.duration_days = entities.duration.days;
                }
            }
        }

        // 2️⃣ reason
        if draft.reason.is_none() {
            draft.reason = entities
                .reason
                .clone()
                .or_else(|| (step == FlowStep::Reason).then(|| free_text_reason(message)).flatten());
        }

        // 3️⃣ type; an inferred type is only a hint until the type step
        if draft.leave_type.is_none() {
            draft.leave_type = match step {
                FlowStep::Type => entities.leave_type.or_else(|| extract_leave_type(message)),
                _ if analysis.source == AnalysisSource::Llm => {
                    entities.leave_type.or_else(|| explicit_leave_type(message))
                }
                _ => explicit_leave_type(message),
            };
        }

        draft.employee_name = Some(session.employee.name.clone());
        debug!(?step, ?draft, "Leave draft updated");

        // 4️⃣ ask for whatever is still missing
        if !draft.has_dates() {
            session.flow = at_step(FlowStep::Date, draft);
            return ChatReply::text(ASK_LEAVE_DATE, ReplyIntent::AskLeaveDate);
        }
        if draft.reason.is_none() {
            let reply = if step == FlowStep::Reason {
                ChatReply::text(ASK_LEAVE_REASON_RETRY, ReplyIntent::AskLeaveReasonRetry)
            } else {
                ChatReply::text(ask_leave_reason(&draft), ReplyIntent::AskLeaveReason)
            };
            session.flow = at_step(FlowStep::Reason, draft);
            return reply;
        }
        if draft.leave_type.is_none() {
            let reply = if step == FlowStep::Type {
                ChatReply::text(ASK_LEAVE_TYPE_RETRY, ReplyIntent::AskLeaveTypeRetry)
            } else {
                let hint = draft.reason.as_deref().and_then(infer_leave_type);
                ChatReply::text(ask_leave_type(hint), ReplyIntent::AskLeaveType)
            };
            session.flow = at_step(FlowStep::Type, draft);
            return reply;
        }

        // 5️⃣ count days, then validate
        let draft = match self.finalize_leave(draft.clone()).await {
            Ok(finalized) => finalized,
            Err(e) => {
                error!(error = %e, "Could not count leave days");
                session.flow = at_step(FlowStep::Type, draft);
                return ChatReply::text(
                    format!("❌ Sorry, I couldn't check the holiday calendar right now: {e}. Please try again."),
                    ReplyIntent::Error,
                );
            }
        };
        self.submit_for_confirmation(session, PendingConfirmation::Leave(draft))
            .await
    }

    /// Settles end date and day count against weekends and company holidays.
    ///
    /// An explicit count on a single start date ("3 days from Monday") moves
    /// the end date forward until that many working days fit. Any other range
    /// keeps its end date and is charged its working days.
    pub(super) async fn finalize_leave(
        &self,
        mut draft: LeaveRequestDraft,
    ) -> Result<LeaveRequestDraft, StoreError> {
        let Some(start) = draft.start_date else {
            return Ok(draft);
        };
        if draft.is_half_day {
            draft.end_date = Some(start);
            draft.duration_days = Some(0.5);
            return Ok(draft);
        }

        let end = draft.end_date.unwrap_or(start);
        let horizon_end = start
            .checked_add_days(Days::new(HOLIDAY_HORIZON_DAYS))
            .unwrap_or(start)
            .max(end);
        let horizon = DateRange::new(start, horizon_end).unwrap_or(DateRange::single(start));
        let holidays = with_timeout(self.timeout(), self.holidays.holiday_dates(horizon)).await?;

        match draft.duration_days {
            Some(days) if end == start && days > 1.0 => {
                draft.end_date = Some(reconcile_end_date(start, days, &holidays));
                draft.duration_days = Some(days.ceil());
            }
            _ => {
                draft.end_date = Some(end);
                draft.duration_days = Some(working_days(start, end, false, true, &holidays));
            }
        }
        Ok(draft)
    }
}
