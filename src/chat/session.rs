use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tokio::sync::Mutex;

use crate::model::{
    EmployeeIdentity, LeaveRequestDraft, PendingConfirmation, RequestKind, WfhRequestDraft,
};
use crate::nlu::{HistoryEntry, Role};

const HISTORY_LIMIT: usize = 10;

/// Slot the active flow is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FlowStep {
    Start,
    Date,
    Reason,
    Type,
}

/// A request being slot-filled. At most one per session.
#[derive(Debug, Clone, PartialEq)]
pub enum ActiveFlow {
    Leave { step: FlowStep, draft: LeaveRequestDraft },
    Wfh { step: FlowStep, draft: WfhRequestDraft },
}

impl ActiveFlow {
    pub fn kind(&self) -> RequestKind {
        match self {
            ActiveFlow::Leave { .. } => RequestKind::Leave,
            ActiveFlow::Wfh { .. } => RequestKind::Wfh,
        }
    }

    pub fn step(&self) -> FlowStep {
        match self {
            ActiveFlow::Leave { step, .. } | ActiveFlow::Wfh { step, .. } => *step,
        }
    }
}

/// Everything the engine remembers about one conversation.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub employee: EmployeeIdentity,
    pub flow: Option<ActiveFlow>,
    /// Validated draft waiting for yes/no.
    pub pending: Option<PendingConfirmation>,
    /// Draft that failed the balance or WFH cap check, offered as an exception.
    pub exception_offer: Option<PendingConfirmation>,
    pub awaiting_request_type: bool,
    pub last_request: Option<PendingConfirmation>,
    pub history: VecDeque<HistoryEntry>,
    pub last_activity: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(employee: EmployeeIdentity, now: DateTime<Utc>) -> Self {
        Self {
            employee,
            flow: None,
            pending: None,
            exception_offer: None,
            awaiting_request_type: false,
            last_request: None,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            last_activity: now,
        }
    }

    pub fn push_history(&mut self, role: Role, text: impl Into<String>) {
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(HistoryEntry {
            role,
            text: text.into(),
        });
    }

    /// A new confirmation supersedes any outstanding exception offer.
    pub fn set_pending(&mut self, request: PendingConfirmation) {
        self.exception_offer = None;
        self.pending = Some(request);
    }

    /// A new exception offer supersedes any outstanding confirmation.
    pub fn set_exception_offer(&mut self, request: PendingConfirmation) {
        self.pending = None;
        self.exception_offer = Some(request);
    }

    pub fn active_kind(&self) -> Option<RequestKind> {
        self.flow.as_ref().map(ActiveFlow::kind)
    }
}

pub type SessionHandle = Arc<Mutex<SessionContext>>;

/// Keyed session storage. Holding a handle's lock serializes every message of
/// that session; distinct sessions never contend.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &str) -> Option<SessionHandle>;

    /// Existing session for `id`, or `init` stored under it.
    async fn get_or_insert(&self, id: &str, init: SessionContext) -> SessionHandle;

    async fn set(&self, id: &str, context: SessionContext);

    async fn delete(&self, id: &str);

    /// Evicts idle sessions now instead of lazily.
    async fn sweep_expired(&self);

    fn len(&self) -> u64;
}

/* =========================
Moka-backed session store
========================= */
pub struct MokaSessionStore {
    cache: Cache<String, SessionHandle>,
}

impl MokaSessionStore {
    pub fn new(idle: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(100_000)
            .time_to_idle(idle)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl SessionStore for MokaSessionStore {
    async fn get(&self, id: &str) -> Option<SessionHandle> {
        self.cache.get(id).await
    }

    async fn get_or_insert(&self, id: &str, init: SessionContext) -> SessionHandle {
        self.cache
            .get_with(id.to_string(), async move { Arc::new(Mutex::new(init)) })
            .await
    }

    async fn set(&self, id: &str, context: SessionContext) {
        self.cache
            .insert(id.to_string(), Arc::new(Mutex::new(context)))
            .await;
    }

    async fn delete(&self, id: &str) {
        self.cache.invalidate(id).await;
    }

    async fn sweep_expired(&self) {
        self.cache.run_pending_tasks().await;
    }

    fn len(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> SessionContext {
        SessionContext::new(EmployeeIdentity::new("Asha"), Utc::now())
    }

    #[actix_web::test]
    async fn test_same_id_shares_one_session() {
        let store = MokaSessionStore::new(Duration::from_secs(60));

        let first = store.get_or_insert("s1", context()).await;
        first.lock().await.awaiting_request_type = true;

        let second = store.get_or_insert("s1", context()).await;
        assert!(second.lock().await.awaiting_request_type);
        assert!(Arc::ptr_eq(&first, &second));

        store.delete("s1").await;
        assert!(store.get("s1").await.is_none());
    }

    #[actix_web::test]
    async fn test_idle_sessions_expire() {
        let store = MokaSessionStore::new(Duration::from_millis(50));
        store.set("s1", context()).await;

        tokio::time::sleep(Duration::from_millis(120)).await;
        store.sweep_expired().await;

        assert!(store.get("s1").await.is_none());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut session = context();
        for i in 0..15 {
            session.push_history(Role::User, format!("message {i}"));
        }
        assert_eq!(session.history.len(), HISTORY_LIMIT);
        assert_eq!(session.history.front().map(|e| e.text.as_str()), Some("message 5"));
    }

    #[test]
    fn test_pending_and_offer_are_exclusive() {
        let mut session = context();
        session.set_exception_offer(PendingConfirmation::Wfh(WfhRequestDraft::default()));
        session.set_pending(PendingConfirmation::Leave(LeaveRequestDraft::default()));
        assert!(session.exception_offer.is_none());
        assert!(session.pending.is_some());
    }
}
