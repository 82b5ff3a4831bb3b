//! Implementation of the `motif-reducer run` command.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::adapters::sqlite::{SqliteIterationLedger, SqliteMotifStore};
use crate::cli::commands::open_database;
use crate::cli::observer::ConsoleObserver;
use crate::cli::output::{format_rate, output, CommandOutput};
use crate::domain::models::{Config, IterationRecord, ReductionConfig, RunSummary, StopReason, TerminalStatus};
use crate::domain::ports::RunObserver;
use crate::services::{
    ConvergenceEngine, EngineConfig, RunControl, RunController, SampleLoader, TracingObserver,
};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Drop all motifs and rounds, re-ingest --digits, then start at round 0
    #[arg(long, requires = "digits")]
    pub reset: bool,

    /// Digit file to ingest after --reset
    #[arg(long, value_name = "FILE", requires = "reset")]
    pub digits: Option<PathBuf>,

    /// Stop after one round
    #[arg(long)]
    pub single_round: bool,

    /// Stop after this many rounds
    #[arg(long)]
    pub max_rounds: Option<u64>,

    /// Continue without asking when duplicates grow
    #[arg(long, short)]
    pub yes: bool,
}

impl RunArgs {
    fn apply_to(&self, reduction: &mut ReductionConfig) {
        if self.single_round {
            reduction.auto_loop = false;
        }
        if self.max_rounds.is_some() {
            reduction.max_rounds = self.max_rounds;
        }
        reduction.assume_yes |= self.yes;
    }
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub run_id: String,
    pub status: TerminalStatus,
    pub message: Option<String>,
    pub summary: Option<RunSummary>,
    pub last_round: Option<IterationRecord>,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        match (&self.summary, self.status) {
            (Some(summary), TerminalStatus::Finished) => {
                let reason = match summary.stop_reason {
                    StopReason::Converged => "converged: no repeated motifs left",
                    StopReason::AlreadyConverged => "already converged; nothing to do",
                    StopReason::SingleRound => "single round finished",
                    StopReason::RoundLimit => "round limit reached",
                };
                lines.push(format!(
                    "Run finished after {} round(s): {reason}",
                    summary.rounds_completed
                ));
            }
            _ => lines.push(format!(
                "Run {}: {}",
                self.status,
                self.message.as_deref().unwrap_or("no details")
            )),
        }
        if let Some(record) = &self.last_round {
            lines.push(format!(
                "Last round {} ({}): {} unique, {} total repeating, remaining {}",
                record.round_index,
                record.phase,
                record.unique_repeating_count.map_or_else(|| "-".to_string(), |c| c.to_string()),
                record.all_repeating_count.map_or_else(|| "-".to_string(), |c| c.to_string()),
                format_rate(record.remaining_rate),
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Spinner and prompts on a terminal; log lines and the `--yes` policy otherwise.
fn run_observer(assume_yes: bool, json_mode: bool, attended: bool) -> Arc<dyn RunObserver> {
    if json_mode || !attended {
        Arc::new(TracingObserver::new(assume_yes))
    } else {
        Arc::new(ConsoleObserver::new(assume_yes, false))
    }
}

/// Cancel on Ctrl-C and toggle pause on SIGUSR1 until the run ends.
fn spawn_signal_listener(control: RunControl) -> JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut usr1 = match signal(SignalKind::user_defined1()) {
                Ok(stream) => Some(stream),
                Err(err) => {
                    warn!(error = %err, "SIGUSR1 handler unavailable; pause disabled");
                    None
                }
            };

            loop {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if result.is_ok() {
                            info!("interrupt received; cancelling run");
                            control.request_cancel();
                        }
                        break;
                    }
                    Some(()) = async { usr1.as_mut()?.recv().await } => {
                        let paused = control.request_pause_toggle();
                        info!(paused, "SIGUSR1 received");
                    }
                }
            }
        }

        #[cfg(not(unix))]
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; cancelling run");
            control.request_cancel();
        }
    })
}

pub async fn execute(args: RunArgs, config: &Config, json_mode: bool) -> Result<()> {
    let mut reduction = config.reduction.clone();
    args.apply_to(&mut reduction);

    let pool = open_database(config).await?;
    let store = Arc::new(SqliteMotifStore::new(pool.clone()));
    let ledger = Arc::new(SqliteIterationLedger::new(pool));
    let engine = ConvergenceEngine::new(Arc::clone(&store), ledger, EngineConfig::from(&reduction));
    let controller = RunController::new(engine, Duration::from_millis(reduction.pause_poll_ms));

    if let Some(digits) = &args.digits {
        let loader = SampleLoader::new(Arc::clone(&store), reduction.motif_length, reduction.batch_size)?;
        controller.reset().await.context("Failed to reset motif store")?;
        let report = loader
            .load_file(digits)
            .await
            .with_context(|| format!("Failed to load {}", digits.display()))?;
        info!(motifs = report.motifs, "sample re-ingested");
    }

    let observer = run_observer(reduction.assume_yes, json_mode, console::user_attended_stderr());
    let handle = controller.start_run(false, observer);
    let run_id = handle.run_id();
    let signals = spawn_signal_listener(handle.control());

    let outcome = handle.wait().await;
    signals.abort();

    if outcome.status == TerminalStatus::Error {
        bail!(
            "Run {run_id} failed: {}",
            outcome.message.unwrap_or_default()
        );
    }

    let last_round = controller.latest_record().await?;
    output(
        &RunOutput {
            run_id: run_id.to_string(),
            status: outcome.status,
            message: outcome.message,
            summary: outcome.summary,
            last_round,
        },
        json_mode,
    );
    Ok(())
}
