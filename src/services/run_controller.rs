//! Background execution of convergence runs.
//!
//! [`RunController::start_run`] spawns the engine on a Tokio task and hands
//! back a [`RunHandle`] carrying the run's [`RunControl`]. When the task ends
//! the outcome is classified into exactly one [`TerminalStatus`] and reported
//! to the observer once.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{IterationRecord, RunOutcome, RunSummary, TerminalStatus};
use crate::domain::ports::{IterationLedger, MotifStore, RunObserver};
use crate::services::convergence_engine::ConvergenceEngine;
use crate::services::run_control::RunControl;

/// Handle to a run started by [`RunController::start_run`].
pub struct RunHandle {
    run_id: Uuid,
    control: RunControl,
    task: JoinHandle<RunOutcome>,
}

impl RunHandle {
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Ask the run to stop at its next checkpoint.
    pub fn request_cancel(&self) {
        info!("cancellation requested");
        self.control.request_cancel();
    }

    /// Pause or resume the run, returning whether it is now paused.
    pub fn request_pause_toggle(&self) -> bool {
        let paused = self.control.request_pause_toggle();
        info!(paused, "pause toggled");
        paused
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Clone of the run's control object, for signal handlers.
    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    /// Wait for the run to end and return its outcome.
    pub async fn wait(self) -> RunOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(join_error) => RunOutcome {
                status: TerminalStatus::Error,
                message: Some(flatten_message(&join_error.to_string())),
                summary: None,
            },
        }
    }
}

/// Message of a run refused because another run holds the engine.
pub const RUN_IN_PROGRESS: &str = "run already in progress";

/// Starts runs of one engine and reads its ledger.
///
/// At most one run executes at a time; the engine task holds `run_lock`
/// until it returns.
pub struct RunController<S: MotifStore, L: IterationLedger> {
    engine: Arc<ConvergenceEngine<S, L>>,
    poll_interval: Duration,
    run_lock: Arc<Mutex<()>>,
}

impl<S, L> RunController<S, L>
where
    S: MotifStore + 'static,
    L: IterationLedger + 'static,
{
    pub fn new(engine: ConvergenceEngine<S, L>, poll_interval: Duration) -> Self {
        Self {
            engine: Arc::new(engine),
            poll_interval,
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn engine(&self) -> &ConvergenceEngine<S, L> {
        &self.engine
    }

    /// Begin or resume a run in the background.
    ///
    /// With `reset`, the motif store and the ledger are emptied first and the
    /// run starts at round 0. While another run is active the new one ends
    /// immediately with [`TerminalStatus::Error`].
    pub fn start_run(&self, reset: bool, observer: Arc<dyn RunObserver>) -> RunHandle {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, reset);
        let control = RunControl::new(self.poll_interval);

        let Ok(guard) = Arc::clone(&self.run_lock).try_lock_owned() else {
            return Self::refuse_run(run_id, control, observer, span);
        };

        let engine = Arc::clone(&self.engine);
        let run_control = control.clone();
        let run_observer = Arc::clone(&observer);
        let run = tokio::spawn(async move {
            let _guard = guard;
            if reset {
                engine.reset().await?;
            }
            engine.run(&run_control, run_observer.as_ref()).await
        }
        .instrument(span.clone()));

        let finish_control = control.clone();
        let task = tokio::spawn(async move {
            let outcome = classify_outcome(run.await, finish_control.is_cancelled());
            match outcome.status {
                TerminalStatus::Finished => info!(summary = ?outcome.summary, "run finished"),
                TerminalStatus::Canceled => warn!(message = ?outcome.message, "run canceled"),
                TerminalStatus::Error => error!(message = ?outcome.message, "run failed"),
            }
            observer.on_terminal(outcome.status, outcome.message.clone()).await;
            outcome
        }
        .instrument(span));

        RunHandle {
            run_id,
            control,
            task,
        }
    }

    fn refuse_run(
        run_id: Uuid,
        control: RunControl,
        observer: Arc<dyn RunObserver>,
        span: tracing::Span,
    ) -> RunHandle {
        let task = tokio::spawn(async move {
            warn!("{RUN_IN_PROGRESS}; refusing to start");
            let outcome = RunOutcome {
                status: TerminalStatus::Error,
                message: Some(RUN_IN_PROGRESS.to_string()),
                summary: None,
            };
            observer.on_terminal(outcome.status, outcome.message.clone()).await;
            outcome
        }
        .instrument(span));

        RunHandle {
            run_id,
            control,
            task,
        }
    }

    /// Last ledger record, read while a run may still be writing.
    pub async fn latest_record(&self) -> DomainResult<Option<IterationRecord>> {
        self.engine.ledger().last_record().await
    }

    pub async fn reset(&self) -> DomainResult<()> {
        self.engine.reset().await
    }
}

/// Replace line breaks so the message fits on one line.
pub fn flatten_message(message: &str) -> String {
    message
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Map the engine task's result to the single terminal status of the run.
pub fn classify_outcome(
    result: Result<DomainResult<RunSummary>, JoinError>,
    cancel_requested: bool,
) -> RunOutcome {
    match result {
        Ok(Ok(summary)) => RunOutcome {
            status: TerminalStatus::Finished,
            message: None,
            summary: Some(summary),
        },
        Ok(Err(err)) => {
            let status = match &err {
                e if e.is_cancellation() => TerminalStatus::Canceled,
                DomainError::QueryTimeout(_) if cancel_requested => TerminalStatus::Canceled,
                _ => TerminalStatus::Error,
            };
            RunOutcome {
                status,
                message: Some(flatten_message(&err.to_string())),
                summary: None,
            }
        }
        Err(join_error) => RunOutcome {
            status: TerminalStatus::Error,
            message: Some(flatten_message(&format!("Run task failed: {join_error}"))),
            summary: None,
        },
    }
}
