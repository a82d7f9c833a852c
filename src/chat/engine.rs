use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use strum_macros::{Display, EnumString};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use super::edit::EditDetails;
use super::leave_flow::no_working_days;
use super::replies::{
    self, CONFIRMATION_NO, ChatReply, EXCEPTION_DECLINED, ReplyIntent, cancel_flow, commit_failed,
    confirm_prompt,
};
use super::session::{ActiveFlow, FlowStep, SessionContext, SessionStore};
use super::validation::{GateOutcome, ValidationGate};
use crate::error::{ChatError, ClassifyError};
use crate::model::{EmployeeIdentity, Gender, PendingConfirmation, RequestKind};
use crate::nlu::entities::{
    Confirmation, extract_confirmation, extract_request_filter, is_cancel_phrase, is_edit_request,
};
use crate::nlu::rules::entities_for;
use crate::nlu::{
    Analysis, ClassifyContext, Intent, IntentClassifier, Responder, Role, RuleBasedClassifier,
};
use crate::services::approval::ApprovalService;
use crate::services::clock::Clock;
use crate::services::holiday::HolidayCalendar;
use crate::services::record_store::RecordStore;
use crate::services::with_timeout;

static EXPLICIT_LEAVE_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:apply|applying|leaves?)\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ConfirmationAction {
    Yes,
    No,
    Edit,
}

/// Structured input riding along with the message text.
#[derive(Debug, Clone, Default)]
pub struct MessagePayload {
    pub edit_details: Option<EditDetails>,
    pub confirmation_action: Option<ConfirmationAction>,
    pub intent_override: Option<Intent>,
    /// Client-held copy of the draft, used when the session lost its own.
    pub pending_request: Option<PendingConfirmation>,
    pub employee_name: Option<String>,
    pub employee_email: Option<String>,
    pub gender: Option<Gender>,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub default_employee_name: String,
    pub wfh_weekly_cap: usize,
    pub collaborator_timeout: Duration,
    pub responder_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_employee_name: "Current User".to_string(),
            wfh_weekly_cap: 2,
            collaborator_timeout: Duration::from_secs(5),
            responder_timeout: Duration::from_secs(8),
        }
    }
}

/// Everything the engine talks to.
pub struct Collaborators {
    pub sessions: Arc<dyn SessionStore>,
    pub classifier: Arc<dyn IntentClassifier>,
    pub responder: Option<Arc<dyn Responder>>,
    pub records: Arc<dyn RecordStore>,
    pub holidays: Arc<dyn HolidayCalendar>,
    pub approvals: Arc<ApprovalService>,
    pub clock: Arc<dyn Clock>,
}

/// The conversation state machine.
///
/// Each message runs under its session's lock, so slot filling and commits
/// of one conversation never interleave.
pub struct ChatEngine {
    pub(super) sessions: Arc<dyn SessionStore>,
    pub(super) classifier: Arc<dyn IntentClassifier>,
    pub(super) responder: Option<Arc<dyn Responder>>,
    pub(super) records: Arc<dyn RecordStore>,
    pub(super) holidays: Arc<dyn HolidayCalendar>,
    pub(super) approvals: Arc<ApprovalService>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) gate: ValidationGate,
    pub(super) settings: EngineSettings,
}

impl ChatEngine {
    pub fn new(collaborators: Collaborators, settings: EngineSettings) -> Self {
        let gate = ValidationGate::new(
            collaborators.records.clone(),
            collaborators.holidays.clone(),
            collaborators.clock.clone(),
            settings.wfh_weekly_cap,
            settings.collaborator_timeout,
        );
        Self {
            sessions: collaborators.sessions,
            classifier: collaborators.classifier,
            responder: collaborators.responder,
            records: collaborators.records,
            holidays: collaborators.holidays,
            approvals: collaborators.approvals,
            clock: collaborators.clock,
            gate,
            settings,
        }
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub(super) fn timeout(&self) -> Duration {
        self.settings.collaborator_timeout
    }

    /// Single entry point for one inbound chat message.
    #[instrument(name = "chat_message", skip(self, message, payload), fields(session_id = %session_id))]
    pub async fn handle_message(
        &self,
        session_id: &str,
        message: &str,
        payload: MessagePayload,
    ) -> Result<ChatReply, ChatError> {
        let message = message.trim();
        let has_action = payload.confirmation_action.is_some() || payload.edit_details.is_some();
        if message.is_empty() && !has_action {
            return Err(ChatError::MalformedInput);
        }

        let now = self.clock.now();
        let fresh = SessionContext::new(
            EmployeeIdentity::new(self.settings.default_employee_name.clone()),
            now,
        );
        let handle = self.sessions.get_or_insert(session_id, fresh).await;
        let mut session = handle.lock().await;
        session.last_activity = now;
        apply_identity(&mut session.employee, &payload);

        let reply = self.respond(&mut session, message, &payload).await;

        if !message.is_empty() {
            session.push_history(Role::User, message);
        }
        session.push_history(Role::Assistant, reply.reply.clone());
        info!(intent = %reply.intent, "Reply ready");

        Ok(reply.at(now).cleaned())
    }

    async fn respond(
        &self,
        session: &mut SessionContext,
        message: &str,
        payload: &MessagePayload,
    ) -> ChatReply {
        let confirmation = match payload.confirmation_action {
            Some(ConfirmationAction::Yes) => Some(Confirmation::Yes),
            Some(ConfirmationAction::No) => Some(Confirmation::No),
            Some(ConfirmationAction::Edit) => None,
            None => extract_confirmation(message),
        };

        // 1️⃣ edits of a pending draft
        let wants_edit = payload.edit_details.is_some()
            || payload.confirmation_action == Some(ConfirmationAction::Edit)
            || (confirmation.is_none() && session.pending.is_some() && is_edit_request(message));
        if wants_edit {
            return self.edit_request(session, message, payload).await;
        }

        // 2️⃣ answer to an exception offer
        if let Some(offer) = session.exception_offer.take() {
            match confirmation {
                Some(Confirmation::Yes) => {
                    let mut request = offer;
                    request.mark_exception();
                    session.set_pending(request.clone());
                    info!(kind = %request.kind(), "Exception offer accepted");
                    return confirm_prompt(&request);
                }
                Some(Confirmation::No) => {
                    return ChatReply::text(EXCEPTION_DECLINED, ReplyIntent::ExceptionDeclined);
                }
                None => session.exception_offer = Some(offer),
            }
        }

        // 3️⃣ answer to a pending confirmation
        if let Some(answer) = confirmation {
            let pending = session.pending.take().or_else(|| {
                payload
                    .confirmation_action
                    .and(payload.pending_request.clone())
            });
            if let Some(request) = pending {
                return match answer {
                    Confirmation::Yes => self.commit(session, request).await,
                    Confirmation::No => ChatReply::text(CONFIRMATION_NO, ReplyIntent::ConfirmationNo),
                };
            }
        }

        // 4️⃣ answer to "which requests?"
        if session.awaiting_request_type {
            session.awaiting_request_type = false;
            if let Some(filter) = extract_request_filter(message) {
                return self.list_requests(&session.employee, filter).await;
            }
        }

        // 5️⃣ classify
        let today = self.clock.today();
        let context = ClassifyContext {
            reference: today,
            employee_name: session.employee.name.clone(),
            active_flow: session.active_kind(),
            history: session.history.iter().cloned().collect(),
        };
        let mut analysis = match self.classifier.classify(message, &context).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(error = %e, "Classifier failed, using rules");
                RuleBasedClassifier.analyze(message, today)
            }
        };
        if let Some(intent) = payload.intent_override {
            if intent != analysis.intent {
                analysis.intent = intent;
                analysis.entities = entities_for(intent, message, today);
            }
        }

        // 6️⃣ intent lock
        if let Some(flow) = &session.flow {
            let kind = flow.kind();
            if is_cancel_phrase(message) {
                session.flow = None;
                return ChatReply::text(cancel_flow(kind), ReplyIntent::CancelFlow);
            }
            if let Some(locked) = lock_intent(flow, &analysis, message) {
                analysis.intent = locked;
                analysis
                    .entities
                    .fill_missing_from(entities_for(locked, message, today));
            } else if !analysis.intent.passes_flow_lock() {
                info!(from = %kind, to = %analysis.intent, "Active flow abandoned");
                session.flow = None;
            }
        }

        // 7️⃣ dispatch
        match analysis.intent {
            Intent::ApplyLeave => self.continue_leave(session, message, analysis).await,
            Intent::ApplyWfh => self.continue_wfh(session, message, analysis).await,
            Intent::LeaveBalance => self.leave_balance(session, &analysis.entities).await,
            Intent::ViewRequests => {
                let filter = analysis
                    .entities
                    .request_filter
                    .or_else(|| extract_request_filter(message));
                self.view_requests(session, filter).await
            }
            Intent::HolidayList => self.holiday_query(message, &analysis.entities).await,
            Intent::Greeting => replies::greeting(&session.employee.name),
            other => self.free_text(message, other, &context).await,
        }
    }

    /// Runs the gate on a completed draft and moves the session to the
    /// matching state: confirm, exception offer, or back to the date step.
    pub(super) async fn submit_for_confirmation(
        &self,
        session: &mut SessionContext,
        request: PendingConfirmation,
    ) -> ChatReply {
        match self.gate.check(&session.employee, &request).await {
            Ok(GateOutcome::Accepted) => {
                // a range of only weekends and holidays passes the gate but has nothing to book
                if let PendingConfirmation::Leave(draft) = &request {
                    if let Some(reply) = no_working_days(draft) {
                        session.flow = Some(rewind_to_dates(request));
                        return reply;
                    }
                }
                session.flow = None;
                session.set_pending(request.clone());
                confirm_prompt(&request)
            }
            Ok(GateOutcome::Rejected(rejection)) => {
                session.flow = Some(rewind_to_dates(request));
                ChatReply::text(
                    format!("{}\n\nPlease provide different date(s).", rejection.message),
                    rejection.reason_code,
                )
            }
            Ok(GateOutcome::ExceptionOffered(offer)) => {
                session.flow = None;
                session.set_exception_offer(request.clone());
                ChatReply::text(offer.message, ReplyIntent::ExceptionOffer).with_pending(&request)
            }
            Err(e) => {
                error!(error = %e, "Validation gate failed");
                // keep every filled slot; the next message retries the gate
                session.flow = Some(match request {
                    PendingConfirmation::Leave(draft) => ActiveFlow::Leave {
                        step: FlowStep::Type,
                        draft,
                    },
                    PendingConfirmation::Wfh(draft) => ActiveFlow::Wfh {
                        step: FlowStep::Reason,
                        draft,
                    },
                });
                ChatReply::text(
                    format!("❌ Sorry, I couldn't check that request right now: {e}. Please try again."),
                    ReplyIntent::Error,
                )
            }
        }
    }

    /// Commits a confirmed draft. The pending confirmation is already gone
    /// from the session, so a failure here never leaves it behind.
    #[instrument(name = "commit_request", skip_all, fields(kind = %request.kind(), exception = request.is_exception()))]
    async fn commit(&self, session: &mut SessionContext, request: PendingConfirmation) -> ChatReply {
        let employee = session.employee.clone();
        match self.gate.check(&employee, &request).await {
            Err(e) => {
                error!(error = %e, "Validation failed during commit");
                return commit_failed(&e);
            }
            Ok(GateOutcome::Rejected(rejection)) => {
                return ChatReply::text(rejection.message, rejection.reason_code);
            }
            Ok(GateOutcome::ExceptionOffered(offer)) => {
                session.set_exception_offer(request.clone());
                return ChatReply::text(offer.message, ReplyIntent::ExceptionOffer)
                    .with_pending(&request);
            }
            Ok(GateOutcome::Accepted) => {}
        }

        if request.is_exception() {
            return match self.approvals.submit(&employee, request.clone()).await {
                Ok(record) => {
                    info!(approval_id = %record.id, "Exception request sent for approval");
                    session.last_request = Some(request);
                    replies::exception_submitted(&record.request)
                }
                Err(e) => {
                    error!(error = %e, "Exception submission failed");
                    commit_failed(&e)
                }
            };
        }

        let outcome = match &request {
            PendingConfirmation::Leave(draft) => {
                with_timeout(self.timeout(), self.records.create_leave_record(&employee, draft)).await
            }
            PendingConfirmation::Wfh(draft) => {
                with_timeout(self.timeout(), self.records.create_wfh_record(&employee, draft)).await
            }
        };

        match outcome {
            Ok(outcome) if outcome.success => {
                info!(record_id = ?outcome.id, "Request created");
                let reply = replies::created(&request, outcome.id.as_deref());
                session.last_request = Some(request);
                reply
            }
            Ok(outcome) => {
                warn!(message = %outcome.message, "Record store refused request");
                commit_failed(&outcome.message)
            }
            Err(e) => {
                error!(error = %e, "Record creation failed");
                commit_failed(&e)
            }
        }
    }

    async fn free_text(&self, message: &str, intent: Intent, context: &ClassifyContext) -> ChatReply {
        let Some(responder) = &self.responder else {
            return ChatReply::text(replies::canned_answer(intent, self.settings.wfh_weekly_cap), intent);
        };

        let answer = tokio::time::timeout(
            self.settings.responder_timeout,
            responder.respond(message, context),
        )
        .await
        .unwrap_or(Err(ClassifyError::Timeout));

        match answer {
            Ok(text) => ChatReply::text(text, intent),
            Err(e) => {
                warn!(error = %e, "Responder failed");
                let fallback = match intent {
                    Intent::GeneralQuery => replies::RESPONDER_UNAVAILABLE.to_string(),
                    other => replies::canned_answer(other, self.settings.wfh_weekly_cap),
                };
                ChatReply::text(fallback, intent)
            }
        }
    }
}

/// Intent an active flow claims the message for, or `None` when the message
/// leaves the flow (allow-listed or a different HR action).
fn lock_intent(flow: &ActiveFlow, analysis: &Analysis, message: &str) -> Option<Intent> {
    let flow_intent = Intent::for_kind(flow.kind());
    if analysis.intent == flow_intent {
        return Some(flow_intent);
    }
    if analysis.intent.passes_flow_lock() {
        return None;
    }

    // symptoms given as a WFH reason are not a leave request
    let wfh_reason = flow.kind() == RequestKind::Wfh
        && flow.step() == FlowStep::Reason
        && analysis.intent == Intent::ApplyLeave
        && !EXPLICIT_LEAVE_WORDS.is_match(message);

    if analysis.intent.is_hr_action() && !wfh_reason {
        return None;
    }
    Some(flow_intent)
}

fn rewind_to_dates(request: PendingConfirmation) -> ActiveFlow {
    match request {
        PendingConfirmation::Leave(mut draft) => {
            draft.clear_dates();
            ActiveFlow::Leave {
                step: FlowStep::Date,
                draft,
            }
        }
        PendingConfirmation::Wfh(mut draft) => {
            draft.clear_dates();
            ActiveFlow::Wfh {
                step: FlowStep::Date,
                draft,
            }
        }
    }
}

fn apply_identity(employee: &mut EmployeeIdentity, payload: &MessagePayload) {
    if let Some(name) = payload
        .employee_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
    {
        employee.name = name.to_string();
    }
    if let Some(email) = payload
        .employee_email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
    {
        employee.email = Some(email.to_string());
    }
    if payload.gender.is_some() {
        employee.gender = payload.gender;
    }
}
