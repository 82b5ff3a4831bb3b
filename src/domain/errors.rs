//! Domain errors for the motif reduction engine.

use thiserror::Error;

/// Domain-level errors raised by the stores, the engine and the loader.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The persistence connection is closed, exhausted or unreachable.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A store scan was abandoned before it produced a result.
    #[error("Query interrupted: {0}")]
    QueryTimeout(String),

    /// The rewrite touched a different number of rows than were measured.
    #[error(
        "Round {round_index}: measured {measured} repeating motifs but rewrote {rewritten}"
    )]
    MeasurementInconsistency {
        round_index: i64,
        measured: i64,
        rewritten: i64,
    },

    #[error(
        "Round {round_index}: continuation declined after duplicates grew from {previous} to {current}"
    )]
    UserDeclinedContinuation {
        round_index: i64,
        previous: i64,
        current: i64,
    },

    #[error("Run cancelled")]
    Cancelled,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Ingest failed: {0}")]
    IngestFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Whether this error ends a run as cancelled rather than failed.
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::UserDeclinedContinuation { .. })
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                Self::StoreUnavailable(err.to_string())
            }
            other => Self::DatabaseError(other.to_string()),
        }
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        Self::IngestFailed(err.to_string())
    }
}
