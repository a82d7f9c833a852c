pub mod approval;
pub mod clock;
pub mod holiday;
pub mod notifier;
pub mod pending_approval;
pub mod record_store;

use std::future::Future;
use std::time::Duration;

use crate::error::StoreError;

/// Bounds a collaborator call; running out of time is a [`StoreError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreError::Timeout)?
}
