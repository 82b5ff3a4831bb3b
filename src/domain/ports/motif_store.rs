//! Repository port for the motif store.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::DomainResult;
use crate::domain::models::{DuplicateStats, MotifRecord};

/// Persisted motif records with set-based duplicate queries.
#[async_trait]
pub trait MotifStore: Send + Sync {
    /// Total number of motif records.
    async fn count_total(&self) -> DomainResult<u64>;

    /// Group records by value and aggregate the groups of size two or more.
    ///
    /// Read-only; abandoned with `QueryTimeout` when `cancel` fires mid-scan.
    async fn measure_duplicates(&self, cancel: &CancellationToken) -> DomainResult<DuplicateStats>;

    /// Perturb every record whose value is repeated with its own position.
    ///
    /// Returns the number of records rewritten. Once issued the rewrite runs
    /// to completion; `cancel` is only consulted before it starts.
    async fn rewrite_duplicates(&self, cancel: &CancellationToken) -> DomainResult<u64>;

    /// Insert a batch of records in one transaction.
    async fn insert_batch(&self, records: &[MotifRecord]) -> DomainResult<u64>;

    /// Remove every record.
    async fn clear(&self) -> DomainResult<()>;
}
