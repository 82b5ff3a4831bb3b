//! Port trait definitions (Hexagonal Architecture)
//!
//! - MotifStore: bulk motif queries and rewrites
//! - IterationLedger: per-round bookkeeping used for resumption
//! - RunObserver: progress, confirmation and terminal callbacks

pub mod iteration_ledger;
pub mod motif_store;
pub mod run_observer;

pub use iteration_ledger::IterationLedger;
pub use motif_store::MotifStore;
pub use run_observer::RunObserver;
