//! Ready-made [`RunObserver`] implementations.
//!
//! [`TracingObserver`] drives unattended runs: it logs every event and answers
//! confirmations from a fixed policy. [`RecordingObserver`] keeps every event
//! in memory for callers that inspect a run afterwards.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::errors::DomainError;
use crate::domain::models::{ProgressUpdate, RoundPhase, TerminalStatus};
use crate::domain::ports::RunObserver;
use crate::services::run_control::RunControl;

/// Logs run events and answers confirmations without asking anyone.
#[derive(Debug, Clone, Copy)]
pub struct TracingObserver {
    accept_growth: bool,
}

impl TracingObserver {
    pub const fn new(accept_growth: bool) -> Self {
        Self { accept_growth }
    }
}

#[async_trait]
impl RunObserver for TracingObserver {
    async fn on_progress(&self, update: ProgressUpdate) {
        info!(
            round_index = update.round_index,
            phase = %update.phase,
            duplicates = update.duplicate_count,
            elapsed_ms = update.elapsed.as_millis() as u64,
            "phase complete"
        );
    }

    async fn on_confirmation_required(&self, round_index: i64, previous: i64, current: i64) -> bool {
        warn!(
            round_index,
            previous,
            current,
            accepted = self.accept_growth,
            "duplicates grew; answering from policy"
        );
        self.accept_growth
    }

    async fn on_terminal(&self, status: TerminalStatus, message: Option<String>) {
        info!(%status, message = message.as_deref().unwrap_or(""), "run ended");
    }

    async fn on_sample_counted(&self, total: u64, elapsed: Duration) {
        info!(total, elapsed_ms = elapsed.as_millis() as u64, "sample counted");
    }

    async fn on_warning(&self, warning: &DomainError) {
        warn!(%warning, "run warning");
    }
}

/// Terminal notification captured by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalEvent {
    pub status: TerminalStatus,
    pub message: Option<String>,
}

#[derive(Debug, Default)]
struct Recorded {
    progress: Vec<ProgressUpdate>,
    confirmations: Vec<(i64, i64, i64)>,
    terminals: Vec<TerminalEvent>,
    sample_counts: Vec<u64>,
    warnings: Vec<String>,
}

/// Collects every event of a run.
#[derive(Debug)]
pub struct RecordingObserver {
    accept_growth: bool,
    cancel_after: Option<(RoundPhase, RunControl)>,
    recorded: Mutex<Recorded>,
}

impl RecordingObserver {
    pub fn new(accept_growth: bool) -> Self {
        Self {
            accept_growth,
            cancel_after: None,
            recorded: Mutex::new(Recorded::default()),
        }
    }

    pub fn accepting() -> Self {
        Self::new(true)
    }

    pub fn declining() -> Self {
        Self::new(false)
    }

    /// Request cancellation on `control` once the first `phase` completes.
    #[must_use]
    pub fn cancelling_after(mut self, phase: RoundPhase, control: RunControl) -> Self {
        self.cancel_after = Some((phase, control));
        self
    }

    fn with<T>(&self, f: impl FnOnce(&mut Recorded) -> T) -> T {
        let mut recorded = self
            .recorded
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut recorded)
    }

    pub fn progress(&self) -> Vec<ProgressUpdate> {
        self.with(|r| r.progress.clone())
    }

    /// `(round_index, previous, current)` of every confirmation request.
    pub fn confirmations(&self) -> Vec<(i64, i64, i64)> {
        self.with(|r| r.confirmations.clone())
    }

    pub fn terminals(&self) -> Vec<TerminalEvent> {
        self.with(|r| r.terminals.clone())
    }

    pub fn sample_counts(&self) -> Vec<u64> {
        self.with(|r| r.sample_counts.clone())
    }

    /// Display text of every warning.
    pub fn warnings(&self) -> Vec<String> {
        self.with(|r| r.warnings.clone())
    }
}

#[async_trait]
impl RunObserver for RecordingObserver {
    async fn on_progress(&self, update: ProgressUpdate) {
        let phase = update.phase;
        self.with(|r| r.progress.push(update));
        if let Some((cancel_phase, control)) = &self.cancel_after {
            if *cancel_phase == phase {
                control.request_cancel();
            }
        }
    }

    async fn on_confirmation_required(&self, round_index: i64, previous: i64, current: i64) -> bool {
        self.with(|r| r.confirmations.push((round_index, previous, current)));
        self.accept_growth
    }

    async fn on_terminal(&self, status: TerminalStatus, message: Option<String>) {
        self.with(|r| r.terminals.push(TerminalEvent { status, message }));
    }

    async fn on_sample_counted(&self, total: u64, _elapsed: Duration) {
        self.with(|r| r.sample_counts.push(total));
    }

    async fn on_warning(&self, warning: &DomainError) {
        let text = warning.to_string();
        self.with(|r| r.warnings.push(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_observer_answers_from_policy() {
        let accepting = RecordingObserver::accepting();
        assert!(accepting.on_confirmation_required(2, 5, 7).await);
        assert_eq!(accepting.confirmations(), vec![(2, 5, 7)]);

        let declining = RecordingObserver::declining();
        assert!(!declining.on_confirmation_required(2, 5, 7).await);
    }

    #[tokio::test]
    async fn test_cancel_hook_fires_on_matching_phase() {
        let control = RunControl::default();
        let observer = RecordingObserver::accepting().cancelling_after(RoundPhase::Rewriting, control.clone());

        observer
            .on_progress(ProgressUpdate {
                round_index: 0,
                phase: RoundPhase::Measuring,
                elapsed: Duration::ZERO,
                duplicate_count: 1,
            })
            .await;
        assert!(!control.is_cancelled());

        observer
            .on_progress(ProgressUpdate {
                round_index: 0,
                phase: RoundPhase::Rewriting,
                elapsed: Duration::ZERO,
                duplicate_count: 1,
            })
            .await;
        assert!(control.is_cancelled());
        assert_eq!(observer.progress().len(), 2);
    }

    #[tokio::test]
    async fn test_tracing_observer_uses_policy() {
        assert!(TracingObserver::new(true).on_confirmation_required(1, 1, 2).await);
        assert!(!TracingObserver::new(false).on_confirmation_required(1, 1, 2).await);
    }
}
