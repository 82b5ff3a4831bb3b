//! Repository port for the iteration ledger.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::IterationRecord;

/// Per-round bookkeeping, ordered by `round_index`.
#[async_trait]
pub trait IterationLedger: Send + Sync {
    /// Most recent record by round index.
    async fn last_record(&self) -> DomainResult<Option<IterationRecord>>;

    /// Record for a specific round.
    async fn get(&self, round_index: i64) -> DomainResult<Option<IterationRecord>>;

    /// All records in round order.
    async fn list(&self) -> DomainResult<Vec<IterationRecord>>;

    /// Create the record for a new round with every measured field unset.
    async fn append(&self, round_index: i64) -> DomainResult<IterationRecord>;

    /// Persist the fields of an existing record. Safe to repeat.
    async fn update(&self, record: &IterationRecord) -> DomainResult<()>;

    /// Drop every record.
    async fn reset(&self) -> DomainResult<()>;
}
