use tracing::debug;

use super::engine::ChatEngine;
use super::leave_flow::free_text_reason;
use super::replies::{
    ASK_WFH_DATE, ASK_WFH_REASON_RETRY, ChatReply, ReplyIntent, ask_wfh_reason, date_error,
};
use super::session::{ActiveFlow, FlowStep, SessionContext};
use super::validation::{ReasonCode, past_date_message};
use crate::model::{PendingConfirmation, RequestKind, WfhRequestDraft};
use crate::nlu::Analysis;
use crate::nlu::entities::context_reason;
use crate::parser::is_past_date;

fn at_step(step: FlowStep, draft: WfhRequestDraft) -> Option<ActiveFlow> {
    Some(ActiveFlow::Wfh { step, draft })
}

impl ChatEngine {
    /// Advances the WFH flow by one message: dates, then reason, then the gate.
    pub(super) async fn continue_wfh(
        &self,
        session: &mut SessionContext,
        message: &str,
        analysis: Analysis,
    ) -> ChatReply {
        let today = self.clock.today();
        let (step, mut draft) = match session.flow.take() {
            Some(ActiveFlow::Wfh { step, draft }) => (step, draft),
            _ => (FlowStep::Start, WfhRequestDraft::default()),
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
                        past_date_message(RequestKind::Wfh, start),
                        ReasonCode::PastDate,
                    );
                }
                draft.set_dates(start, entities.end_date.unwrap_or(start));
            }
        }

        // 2️⃣ reason: stated, typed at the prompt, or implied by context words
        if draft.reason.is_none() {
            draft.reason = match step {
                FlowStep::Reason => entities.reason.clone().or_else(|| free_text_reason(message)),
                _ => entities.reason.clone().or_else(|| context_reason(message)),
            };
        }

        draft.employee_name = Some(session.employee.name.clone());
        debug!(?step, ?draft, "WFH draft updated");

        // 3️⃣ ask for whatever is still missing
        if !draft.has_dates() {
            session.flow = at_step(FlowStep::Date, draft);
            return ChatReply::text(ASK_WFH_DATE, ReplyIntent::AskWfhDate);
        }
        if draft.reason.is_none() {
            let reply = if step == FlowStep::Reason {
                ChatReply::text(ASK_WFH_REASON_RETRY, ReplyIntent::AskWfhReasonRetry)
            } else {
                ChatReply::text(ask_wfh_reason(&draft), ReplyIntent::AskWfhReason)
            };
            session.flow = at_step(FlowStep::Reason, draft);
            return reply;
        }

        self.submit_for_confirmation(session, PendingConfirmation::Wfh(draft))
            .await
    }
}
