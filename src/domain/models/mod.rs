//! Domain models for motif reduction.

pub mod config;
pub mod iteration;
pub mod motif;
pub mod run;

pub use config::{Config, DatabaseConfig, ReductionConfig};
pub use iteration::{CountingMode, IterationRecord, RoundPhase};
pub use motif::{DuplicateStats, MotifRecord, MAX_MOTIF_LENGTH};
pub use run::{ProgressUpdate, RunOutcome, RunSummary, StopReason, TerminalStatus};
