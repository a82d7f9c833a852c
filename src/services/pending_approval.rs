use chrono::Duration;
use moka::future::Cache;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::model::{EmployeeIdentity, PendingApprovalRecord, PendingConfirmation};
use crate::services::clock::Clock;

/// Exception requests waiting on a manager, keyed by a generated id.
///
/// Expiry is checked against the injected clock on every read; moka's own
/// TTL only bounds memory for entries nobody ever reads again.
pub struct PendingApprovalStore {
    cache: Cache<String, PendingApprovalRecord>,
    clock: Arc<dyn Clock>,
    expiry: Duration,
}

impl PendingApprovalStore {
    pub fn new(expiry: Duration, clock: Arc<dyn Clock>) -> Self {
        let ttl = expiry.to_std().unwrap_or(std::time::Duration::from_secs(7 * 24 * 3600));
        Self {
            cache: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(ttl)
                .build(),
            clock,
            expiry,
        }
    }

    pub async fn store(
        &self,
        employee: &EmployeeIdentity,
        request: PendingConfirmation,
    ) -> PendingApprovalRecord {
        let now = self.clock.now();
        let record = PendingApprovalRecord {
            id: Uuid::new_v4().to_string(),
            employee_name: employee.name.clone(),
            employee_email: employee.email.clone(),
            request,
            timestamp: now,
            expires_at: now + self.expiry,
        };
        self.cache.insert(record.id.clone(), record.clone()).await;
        info!(approval_id = %record.id, "Pending approval stored");
        record
    }

    /// Live record for `id`; an expired one is dropped and reported missing.
    pub async fn get(&self, id: &str) -> Option<PendingApprovalRecord> {
        let record = self.cache.get(id).await?;
        if record.is_expired(self.clock.now()) {
            self.cache.invalidate(id).await;
            debug!(approval_id = %id, "Pending approval expired on read");
            return None;
        }
        Some(record)
    }

    pub async fn remove(&self, id: &str) -> Option<PendingApprovalRecord> {
        self.cache.remove(id).await
    }

    /// Removes and returns the live record for `id`. Only one caller can win
    /// a given record, so a decision is applied at most once.
    pub async fn take(&self, id: &str) -> Option<PendingApprovalRecord> {
        let record = self.cache.remove(id).await?;
        if record.is_expired(self.clock.now()) {
            debug!(approval_id = %id, "Pending approval expired on take");
            return None;
        }
        Some(record)
    }

    /// Puts back a record whose decision could not be applied.
    pub async fn restore(&self, record: PendingApprovalRecord) {
        self.cache.insert(record.id.clone(), record).await;
    }

    /// Drops every expired record and returns how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let expired: Vec<String> = self
            .cache
            .iter()
            .filter(|(_, record)| record.is_expired(now))
            .map(|(id, _)| id.as_ref().clone())
            .collect();

        for id in &expired {
            self.cache.invalidate(id).await;
        }
        if !expired.is_empty() {
            info!(removed = expired.len(), "Expired pending approvals swept");
        }
        expired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WfhRequestDraft;
    use crate::services::clock::FixedClock;
    use chrono::NaiveDate;

    fn wfh() -> PendingConfirmation {
        PendingConfirmation::Wfh(WfhRequestDraft {
            date: NaiveDate::from_ymd_opt(2026, 3, 5),
            reason: Some("plumber visit".into()),
            is_exception: true,
            ..Default::default()
        })
    }

    #[actix_web::test]
    async fn test_expiry_and_sweep() {
        let clock = Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()));
        let store = PendingApprovalStore::new(Duration::hours(168), clock.clone());
        let me = EmployeeIdentity::new("Current User");

        let first = store.store(&me, wfh()).await;
        let second = store.store(&me, wfh()).await;
        assert_ne!(first.id, second.id);
        assert!(store.get(&first.id).await.is_some());

        let taken = store.take(&second.id).await.unwrap();
        assert!(store.take(&second.id).await.is_none());
        store.restore(taken).await;
        assert!(store.get(&second.id).await.is_some());

        clock.advance(Duration::hours(169));
        assert!(store.get(&first.id).await.is_none());
        assert_eq!(store.cleanup_expired().await, 1);
        assert_eq!(store.cleanup_expired().await, 0);
        assert!(store.take(&second.id).await.is_none());
    }
}
