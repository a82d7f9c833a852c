use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{HarnessBuilder, LINK_BASE, SECRET, date};
use crate::error::{ApprovalError, StoreError};
use crate::model::{
    EmployeeIdentity, LeaveRequestDraft, LeaveType, PendingApprovalRecord, PendingConfirmation,
    RequestRecord, RequestStatus, WfhRequestDraft,
};
use crate::parser::DateRange;
use crate::services::approval::{ApprovalAction, ApprovalService};
use crate::services::clock::{Clock, FixedClock};
use crate::services::notifier::{ApprovalLinks, ApprovalNotifier};
use crate::services::pending_approval::PendingApprovalStore;
use crate::services::record_store::{
    CreateOutcome, InMemoryRecordStore, LeaveBalance, RecordStore, RequestFilter,
};

/// Takes a while to write leave, and can be switched off.
struct SlowStore {
    inner: InMemoryRecordStore,
    down: AtomicBool,
}

impl SlowStore {
    fn new(today: chrono::NaiveDate) -> Self {
        Self {
            inner: InMemoryRecordStore::new(Arc::new(FixedClock::on(today))),
            down: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl RecordStore for SlowStore {
    async fn check_overlap(
        &self,
        employee: &EmployeeIdentity,
        range: DateRange,
    ) -> Result<Option<RequestRecord>, StoreError> {
        self.inner.check_overlap(employee, range).await
    }

    async fn get_balance(
        &self,
        employee: &EmployeeIdentity,
        leave_type: LeaveType,
    ) -> Result<LeaveBalance, StoreError> {
        self.inner.get_balance(employee, leave_type).await
    }

    async fn create_leave_record(
        &self,
        employee: &EmployeeIdentity,
        draft: &LeaveRequestDraft,
    ) -> Result<CreateOutcome, StoreError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("database offline".to_string()));
        }
        self.inner.create_leave_record(employee, draft).await
    }

    async fn create_wfh_record(
        &self,
        employee: &EmployeeIdentity,
        draft: &WfhRequestDraft,
    ) -> Result<CreateOutcome, StoreError> {
        self.inner.create_wfh_record(employee, draft).await
    }

    async fn list_requests(
        &self,
        employee: &EmployeeIdentity,
        filter: RequestFilter,
    ) -> Result<Vec<RequestRecord>, StoreError> {
        self.inner.list_requests(employee, filter).await
    }

    async fn update_record_status(
        &self,
        id: &str,
        status: RequestStatus,
    ) -> Result<RequestRecord, StoreError> {
        self.inner.update_record_status(id, status).await
    }
}

struct UnreachableManager;

#[async_trait]
impl ApprovalNotifier for UnreachableManager {
    async fn notify_manager(
        &self,
        _record: &PendingApprovalRecord,
        _links: &ApprovalLinks,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("mail relay down".to_string()))
    }
}

fn annual_leave() -> PendingConfirmation {
    PendingConfirmation::Leave(LeaveRequestDraft {
        start_date: Some(date(2026, 4, 15)),
        end_date: Some(date(2026, 5, 19)),
        leave_type: Some(LeaveType::Annual),
        reason: Some("family trip".into()),
        duration_days: Some(25.0),
        ..Default::default()
    })
}

fn token_in(url: &str) -> String {
    url.split("token=").nth(1).unwrap().to_string()
}

#[actix_web::test]
async fn test_approve_link_creates_approved_record() {
    let harness = HarnessBuilder::on(date(2026, 3, 2)).build();
    let employee = EmployeeIdentity::new("Asha Rao");

    let record = harness
        .approvals
        .submit(&employee, annual_leave())
        .await
        .unwrap();
    assert!(record.request.is_exception());

    let links = harness.approvals.links_for(&record).unwrap();
    assert!(links.approve_url.starts_with(LINK_BASE));
    assert!(links.approve_url.contains("action=approve"));

    let decision = harness
        .approvals
        .decide(&record.id, ApprovalAction::Approve, &token_in(&links.approve_url))
        .await
        .unwrap();
    assert!(decision.record_id.is_some());

    let stored = harness
        .records
        .list_requests(&employee, RequestFilter::Leave)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, RequestStatus::Approved);
    assert!(stored[0].is_exception);

    // a link works once
    let again = harness
        .approvals
        .decide(&record.id, ApprovalAction::Approve, &token_in(&links.approve_url))
        .await;
    assert!(matches!(again, Err(ApprovalError::NotFound)));
}

#[actix_web::test]
async fn test_reject_link_persists_nothing() {
    let harness = HarnessBuilder::on(date(2026, 3, 2)).build();
    let employee = EmployeeIdentity::new("Asha Rao");

    let record = harness
        .approvals
        .submit(&employee, annual_leave())
        .await
        .unwrap();
    let links = harness.approvals.links_for(&record).unwrap();

    let decision = harness
        .approvals
        .decide(&record.id, ApprovalAction::Reject, &token_in(&links.reject_url))
        .await
        .unwrap();
    assert_eq!(decision.record_id, None);

    let stored = harness
        .records
        .list_requests(&employee, RequestFilter::All)
        .await
        .unwrap();
    assert!(stored.is_empty());
}

#[actix_web::test]
async fn test_token_bound_to_its_action_and_id() {
    let harness = HarnessBuilder::on(date(2026, 3, 2)).build();
    let employee = EmployeeIdentity::new("Asha Rao");

    let record = harness
        .approvals
        .submit(&employee, annual_leave())
        .await
        .unwrap();
    let links = harness.approvals.links_for(&record).unwrap();
    let reject_token = token_in(&links.reject_url);

    let swapped = harness
        .approvals
        .decide(&record.id, ApprovalAction::Approve, &reject_token)
        .await;
    assert!(matches!(swapped, Err(ApprovalError::InvalidToken)));

    let mut tampered = token_in(&links.approve_url);
    tampered.push('x');
    let tampered = harness
        .approvals
        .decide(&record.id, ApprovalAction::Approve, &tampered)
        .await;
    assert!(matches!(tampered, Err(ApprovalError::InvalidToken)));

    let wrong_id = harness
        .approvals
        .decide("not-a-real-id", ApprovalAction::Reject, &reject_token)
        .await;
    assert!(matches!(wrong_id, Err(ApprovalError::InvalidToken)));
}

#[actix_web::test]
async fn test_link_expires_with_the_clock() {
    let harness = HarnessBuilder::on(date(2026, 3, 2)).build();
    let employee = EmployeeIdentity::new("Asha Rao");

    let record = harness
        .approvals
        .submit(&employee, annual_leave())
        .await
        .unwrap();
    let links = harness.approvals.links_for(&record).unwrap();

    harness.clock.advance(chrono::Duration::hours(73));

    let result = harness
        .approvals
        .decide(&record.id, ApprovalAction::Approve, &token_in(&links.approve_url))
        .await;
    assert!(matches!(result, Err(ApprovalError::Expired)));
    assert_eq!(harness.approvals.approvals().cleanup_expired().await, 1);
}

#[actix_web::test]
async fn test_concurrent_approvals_persist_once() {
    let store = Arc::new(SlowStore::new(date(2026, 3, 2)));
    let harness = HarnessBuilder::on(date(2026, 3, 2))
        .records(store.clone())
        .build();
    let employee = EmployeeIdentity::new("Asha Rao");

    let record = harness
        .approvals
        .submit(&employee, annual_leave())
        .await
        .unwrap();
    let token = token_in(&harness.approvals.links_for(&record).unwrap().approve_url);

    let (a, b) = tokio::join!(
        harness.approvals.decide(&record.id, ApprovalAction::Approve, &token),
        harness.approvals.decide(&record.id, ApprovalAction::Approve, &token),
    );
    assert_eq!([&a, &b].iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        [&a, &b]
            .iter()
            .any(|r| matches!(r, Err(ApprovalError::NotFound)))
    );

    let stored = store
        .list_requests(&employee, RequestFilter::Leave)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[actix_web::test]
async fn test_failed_write_keeps_the_request_waiting() {
    let store = Arc::new(SlowStore::new(date(2026, 3, 2)));
    let harness = HarnessBuilder::on(date(2026, 3, 2))
        .records(store.clone())
        .build();
    let employee = EmployeeIdentity::new("Asha Rao");

    let record = harness
        .approvals
        .submit(&employee, annual_leave())
        .await
        .unwrap();
    let token = token_in(&harness.approvals.links_for(&record).unwrap().approve_url);

    store.down.store(true, Ordering::SeqCst);
    let result = harness
        .approvals
        .decide(&record.id, ApprovalAction::Approve, &token)
        .await;
    assert!(matches!(result, Err(ApprovalError::Store(_))));

    store.down.store(false, Ordering::SeqCst);
    let decision = harness
        .approvals
        .decide(&record.id, ApprovalAction::Approve, &token)
        .await
        .unwrap();
    assert!(decision.record_id.is_some());
}

#[actix_web::test]
async fn test_failed_notification_leaves_nothing_behind() {
    let fixed = Arc::new(FixedClock::on(date(2026, 3, 2)));
    let clock: Arc<dyn Clock> = fixed.clone();
    let pending = Arc::new(PendingApprovalStore::new(
        chrono::Duration::hours(72),
        clock.clone(),
    ));
    let service = ApprovalService::new(
        pending.clone(),
        Arc::new(InMemoryRecordStore::new(clock.clone())),
        Arc::new(UnreachableManager),
        clock,
        SECRET,
        LINK_BASE,
        Duration::from_secs(1),
    );

    let result = service
        .submit(&EmployeeIdentity::new("Asha Rao"), annual_leave())
        .await;
    assert!(matches!(result, Err(ApprovalError::Store(_))));

    fixed.advance(chrono::Duration::hours(73));
    assert_eq!(pending.cleanup_expired().await, 0);
}
