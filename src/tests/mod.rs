mod approvals;
mod http;
mod parser;

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use crate::chat::{
    ChatEngine, ChatReply, Collaborators, EngineSettings, MessagePayload, MokaSessionStore,
    SessionStore,
};
use crate::model::{Holiday, PendingConfirmation};
use crate::nlu::HybridClassifier;
use crate::services::approval::ApprovalService;
use crate::services::clock::{Clock, FixedClock};
use crate::services::holiday::StaticHolidayCalendar;
use crate::services::notifier::LogNotifier;
use crate::services::pending_approval::PendingApprovalStore;
use crate::services::record_store::{InMemoryRecordStore, RecordStore};

pub const SECRET: &str = "test-approval-secret";
pub const LINK_BASE: &str = "http://localhost:8080/api/approvals";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// An engine wired to in-memory collaborators and a pinned clock.
pub struct Harness {
    pub engine: Arc<ChatEngine>,
    pub approvals: Arc<ApprovalService>,
    pub clock: Arc<FixedClock>,
    pub records: Arc<dyn RecordStore>,
}

pub struct HarnessBuilder {
    today: NaiveDate,
    holidays: Option<Vec<Holiday>>,
    records: Option<Arc<dyn RecordStore>>,
}

impl HarnessBuilder {
    pub fn on(today: NaiveDate) -> Self {
        Self {
            today,
            holidays: None,
            records: None,
        }
    }

    /// Replaces the bundled calendar.
    pub fn holidays(mut self, holidays: Vec<Holiday>) -> Self {
        self.holidays = Some(holidays);
        self
    }

    pub fn records(mut self, records: Arc<dyn RecordStore>) -> Self {
        self.records = Some(records);
        self
    }

    pub fn build(self) -> Harness {
        let clock = Arc::new(FixedClock::on(self.today));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let calendar = match self.holidays {
            Some(holidays) => StaticHolidayCalendar::new(holidays),
            None => StaticHolidayCalendar::bundled().unwrap(),
        };
        let records = self
            .records
            .unwrap_or_else(|| Arc::new(InMemoryRecordStore::new(dyn_clock.clone())));
        let timeout = Duration::from_secs(2);

        let approvals = Arc::new(ApprovalService::new(
            Arc::new(PendingApprovalStore::new(
                chrono::Duration::hours(72),
                dyn_clock.clone(),
            )),
            records.clone(),
            Arc::new(LogNotifier),
            dyn_clock.clone(),
            SECRET,
            LINK_BASE,
            timeout,
        ));

        let engine = ChatEngine::new(
            Collaborators {
                sessions: Arc::new(MokaSessionStore::new(Duration::from_secs(600))),
                classifier: Arc::new(HybridClassifier::new(None, timeout)),
                responder: None,
                records: records.clone(),
                holidays: Arc::new(calendar),
                approvals: approvals.clone(),
                clock: dyn_clock,
            },
            EngineSettings {
                default_employee_name: "Asha Rao".to_string(),
                collaborator_timeout: timeout,
                ..Default::default()
            },
        );

        Harness {
            engine: Arc::new(engine),
            approvals,
            clock,
            records,
        }
    }
}

impl Harness {
    pub async fn say(&self, session_id: &str, message: &str) -> ChatReply {
        self.engine
            .handle_message(session_id, message, MessagePayload::default())
            .await
            .unwrap()
    }

    pub async fn pending(&self, session_id: &str) -> Option<PendingConfirmation> {
        let handle = self.engine.sessions().get(session_id).await?;
        let session = handle.lock().await;
        session.pending.clone()
    }
}
