//! Collaborator port notified while a run progresses.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::errors::DomainError;
use crate::domain::models::{ProgressUpdate, TerminalStatus};

/// Receives progress from a run and answers its confirmation requests.
#[async_trait]
pub trait RunObserver: Send + Sync {
    /// Called after each phase completes.
    async fn on_progress(&self, update: ProgressUpdate);

    /// Called when a round measured more duplicates than the previous one.
    /// The run waits for the answer; `false` cancels it.
    async fn on_confirmation_required(&self, round_index: i64, previous: i64, current: i64) -> bool;

    /// Called exactly once when the run ends.
    async fn on_terminal(&self, status: TerminalStatus, message: Option<String>);

    /// Called once the sample size used for repeating rates is known.
    async fn on_sample_counted(&self, _total: u64, _elapsed: Duration) {}

    /// Called for conditions that are reported but do not stop the run.
    async fn on_warning(&self, _warning: &DomainError) {}
}
