//! motif-reducer - resumable duplicate-motif reduction
//!
//! A digit sample (for example the decimal expansion of pi) is cut into
//! fixed-length motifs stored in SQLite. Each round measures how many motif
//! values repeat and rewrites every repeated occurrence with its position,
//! until no value repeats. Every round is recorded in an iteration ledger so
//! a run can be cancelled, paused and resumed at any phase boundary.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and the port traits
//! - **Adapters** (`adapters`): SQLite implementations of the ports
//! - **Service Layer** (`services`): convergence engine, run controller, sample loader
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use motif_reducer::adapters::sqlite::{initialize_database, SqliteIterationLedger, SqliteMotifStore};
//! use motif_reducer::services::{ConvergenceEngine, EngineConfig, RunController, TracingObserver};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = initialize_database("sqlite:motifs.db", None).await?;
//!     let engine = ConvergenceEngine::new(
//!         Arc::new(SqliteMotifStore::new(pool.clone())),
//!         Arc::new(SqliteIterationLedger::new(pool)),
//!         EngineConfig::default(),
//!     );
//!     let controller = RunController::new(engine, Duration::from_millis(500));
//!     let outcome = controller
//!         .start_run(false, Arc::new(TracingObserver::new(true)))
//!         .wait()
//!         .await;
//!     println!("{}", outcome.status);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Config, CountingMode, DatabaseConfig, DuplicateStats, IterationRecord, MotifRecord,
    ProgressUpdate, ReductionConfig, RoundPhase, RunOutcome, RunSummary, StopReason,
    TerminalStatus,
};
pub use domain::ports::{IterationLedger, MotifStore, RunObserver};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ConvergenceEngine, EngineConfig, RunControl, RunController, RunHandle, SampleLoader};
