//! Convergence engine for iterative motif reduction.
//!
//! Each round measures how many motif values repeat, records the result in
//! the iteration ledger, and rewrites every repeated occurrence with its own
//! position. Rounds repeat until no value repeats, the run is cancelled, or
//! the collaborator refuses to continue a round whose duplicates grew.
//!
//! Every phase boundary is persisted with the round's [`RoundPhase`], so a run
//! interrupted at any point resumes from the ledger's last record:
//!
//! - `measuring`: the measurement never landed; measure the round again.
//! - `rewriting`: the rewrite may have partially landed, so the measurement
//!   is cleared and the round is measured again before rewriting.
//! - `complete`: start the next round, unless the round found no duplicates.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CountingMode, IterationRecord, ProgressUpdate, ReductionConfig, RoundPhase, RunSummary,
    StopReason,
};
use crate::domain::ports::{IterationLedger, MotifStore, RunObserver};
use crate::services::run_control::RunControl;

/// Engine settings derived from [`ReductionConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub counting_mode: CountingMode,
    /// Denominator of the repeating rate; counted from the store when `None`.
    pub sample_size: Option<u64>,
    /// Stop after one round instead of looping to convergence.
    pub single_round: bool,
    /// Optional safety bound on rounds completed per run.
    pub max_rounds: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            counting_mode: CountingMode::Unique,
            sample_size: None,
            single_round: false,
            max_rounds: None,
        }
    }
}

impl From<&ReductionConfig> for EngineConfig {
    fn from(config: &ReductionConfig) -> Self {
        Self {
            counting_mode: config.counting_mode,
            sample_size: config.sample_size,
            single_round: !config.auto_loop,
            max_rounds: config.max_rounds,
        }
    }
}

/// Where a run picks up, decided from the ledger's last record.
#[derive(Debug, Clone, PartialEq)]
pub enum ResumePoint {
    /// Measure `round_index`, reusing `record` when the ledger already has it.
    Round {
        round_index: i64,
        count_previous: i64,
        record: Option<IterationRecord>,
    },
    /// The last recorded round found no duplicates.
    AlreadyConverged { round_index: i64 },
}

pub struct ConvergenceEngine<S: MotifStore, L: IterationLedger> {
    store: Arc<S>,
    ledger: Arc<L>,
    config: EngineConfig,
}

impl<S: MotifStore, L: IterationLedger> ConvergenceEngine<S, L> {
    pub fn new(store: Arc<S>, ledger: Arc<L>, config: EngineConfig) -> Self {
        Self {
            store,
            ledger,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Drop the ledger and every motif so the next run starts at round 0.
    pub async fn reset(&self) -> DomainResult<()> {
        self.ledger.reset().await?;
        self.store.clear().await?;
        info!("motif store and iteration ledger reset");
        Ok(())
    }

    /// Inspect the ledger and decide where the next run starts.
    ///
    /// A round left in `rewriting` has its measurement cleared and persisted
    /// here, before anything else touches the store.
    pub async fn resume_point(&self) -> DomainResult<ResumePoint> {
        let Some(last) = self.ledger.last_record().await? else {
            return Ok(ResumePoint::Round {
                round_index: 0,
                count_previous: 0,
                record: None,
            });
        };

        match last.phase {
            RoundPhase::Measuring => {
                info!(round_index = last.round_index, "resuming interrupted measurement");
                Ok(ResumePoint::Round {
                    round_index: last.round_index,
                    count_previous: self.previous_measure(last.round_index).await?,
                    record: Some(last),
                })
            }
            RoundPhase::Rewriting => {
                warn!(
                    round_index = last.round_index,
                    "rewrite did not complete; measuring the round again"
                );
                let mut record = last;
                record.clear_measurement();
                self.ledger.update(&record).await?;
                Ok(ResumePoint::Round {
                    round_index: record.round_index,
                    count_previous: self.previous_measure(record.round_index).await?,
                    record: Some(record),
                })
            }
            RoundPhase::Complete if last.is_fixed_point() => Ok(ResumePoint::AlreadyConverged {
                round_index: last.round_index,
            }),
            RoundPhase::Complete => {
                let count_previous = last.measure(self.config.counting_mode).ok_or_else(|| {
                    DomainError::SerializationError(format!(
                        "Round {} is complete but has no measurement",
                        last.round_index
                    ))
                })?;
                Ok(ResumePoint::Round {
                    round_index: last.round_index + 1,
                    count_previous,
                    record: None,
                })
            }
        }
    }

    async fn previous_measure(&self, round_index: i64) -> DomainResult<i64> {
        if round_index == 0 {
            return Ok(0);
        }
        let previous = self.ledger.get(round_index - 1).await?;
        Ok(previous
            .and_then(|r| r.measure(self.config.counting_mode))
            .unwrap_or(0))
    }

    async fn sample_size(&self, control: &RunControl, observer: &dyn RunObserver) -> DomainResult<u64> {
        if let Some(total) = self.config.sample_size {
            return Ok(total);
        }

        control.checkpoint().await?;
        let started = Instant::now();
        let total = self.store.count_total().await?;
        let elapsed = started.elapsed();
        debug!(total, elapsed_ms = elapsed.as_millis() as u64, "counted motif sample");
        observer.on_sample_counted(total, elapsed).await;
        Ok(total)
    }

    /// Run rounds from the resume point until the run stops.
    ///
    /// Returns normally when the run converged, finished its single round, or
    /// hit the round bound. Cancellation surfaces as `Cancelled` (or
    /// `QueryTimeout` for an abandoned scan) and a refused confirmation as
    /// `UserDeclinedContinuation`; the ledger is resumable in every case.
    #[instrument(skip_all, fields(counting_mode = ?self.config.counting_mode))]
    pub async fn run(&self, control: &RunControl, observer: &dyn RunObserver) -> DomainResult<RunSummary> {
        let (mut round_index, mut count_previous, mut pending) = match self.resume_point().await? {
            ResumePoint::AlreadyConverged { round_index } => {
                info!(round_index, "ledger already at fixed point");
                return Ok(RunSummary {
                    rounds_completed: 0,
                    last_round: Some(round_index),
                    last_duplicate_count: Some(0),
                    stop_reason: StopReason::AlreadyConverged,
                });
            }
            ResumePoint::Round {
                round_index,
                count_previous,
                record,
            } => (round_index, count_previous, record),
        };

        let total = self.sample_size(control, observer).await?;
        let mut rounds_completed = 0u64;

        loop {
            control.checkpoint().await?;
            let mut record = match pending.take() {
                Some(record) => record,
                None => self.ledger.append(round_index).await?,
            };

            let measure = self
                .measure_round(&mut record, count_previous, total, control, observer)
                .await?;

            if round_index > 0 && measure > count_previous {
                warn!(round_index, previous = count_previous, current = measure, "duplicates grew");
                if !observer
                    .on_confirmation_required(round_index, count_previous, measure)
                    .await
                {
                    return Err(DomainError::UserDeclinedContinuation {
                        round_index,
                        previous: count_previous,
                        current: measure,
                    });
                }
            }

            control.checkpoint().await?;
            let converged = self.rewrite_round(&mut record, measure, control, observer).await?;

            rounds_completed += 1;
            count_previous = measure;

            let stop_reason = if converged {
                Some(StopReason::Converged)
            } else if self.config.single_round {
                Some(StopReason::SingleRound)
            } else if self.config.max_rounds.is_some_and(|max| rounds_completed >= max) {
                Some(StopReason::RoundLimit)
            } else {
                None
            };

            if let Some(stop_reason) = stop_reason {
                info!(round_index, rounds_completed, ?stop_reason, "run stopped");
                return Ok(RunSummary {
                    rounds_completed,
                    last_round: Some(round_index),
                    last_duplicate_count: Some(measure),
                    stop_reason,
                });
            }

            round_index += 1;
        }
    }

    #[instrument(skip_all, fields(round_index = record.round_index))]
    async fn measure_round(
        &self,
        record: &mut IterationRecord,
        count_previous: i64,
        total: u64,
        control: &RunControl,
        observer: &dyn RunObserver,
    ) -> DomainResult<i64> {
        let started = Instant::now();
        let stats = self.store.measure_duplicates(control.token()).await?;
        // A measurement that finished after cancellation is discarded unpersisted.
        control.ensure_active()?;
        let elapsed = started.elapsed();

        record.apply_measurement(&stats, self.config.counting_mode, count_previous, total, elapsed);
        self.ledger.update(record).await?;

        let measure = self.config.counting_mode.measure(&stats);
        info!(
            unique_repeating = stats.unique_repeating_count,
            all_repeating = stats.all_repeating_count,
            max_occurrences = stats.max_occurrences,
            remaining_rate = record.remaining_rate,
            repeating_rate = record.repeating_rate,
            elapsed_ms = elapsed.as_millis() as u64,
            "measured duplicates"
        );

        observer
            .on_progress(ProgressUpdate {
                round_index: record.round_index,
                phase: RoundPhase::Measuring,
                elapsed,
                duplicate_count: measure,
            })
            .await;
        Ok(measure)
    }

    /// Returns whether the round found the store already free of duplicates.
    #[instrument(skip_all, fields(round_index = record.round_index))]
    async fn rewrite_round(
        &self,
        record: &mut IterationRecord,
        measure: i64,
        control: &RunControl,
        observer: &dyn RunObserver,
    ) -> DomainResult<bool> {
        if measure == 0 {
            record.complete_rewrite(Duration::ZERO);
            self.ledger.update(record).await?;
            info!("no duplicates left; rewrite skipped");
            observer
                .on_progress(ProgressUpdate {
                    round_index: record.round_index,
                    phase: RoundPhase::Rewriting,
                    elapsed: Duration::ZERO,
                    duplicate_count: 0,
                })
                .await;
            return Ok(true);
        }

        let started = Instant::now();
        let rewritten = self.store.rewrite_duplicates(control.token()).await?;
        let elapsed = started.elapsed();

        record.complete_rewrite(elapsed);
        self.ledger.update(record).await?;

        let rewritten = i64::try_from(rewritten).unwrap_or(i64::MAX);
        let measured = record.all_repeating_count.unwrap_or_default();
        info!(rewritten, elapsed_ms = elapsed.as_millis() as u64, "rewrote repeating motifs");

        if rewritten != measured {
            let warning = DomainError::MeasurementInconsistency {
                round_index: record.round_index,
                measured,
                rewritten,
            };
            warn!(%warning, "rewrite count differs from measurement");
            observer.on_warning(&warning).await;
        }

        observer
            .on_progress(ProgressUpdate {
                round_index: record.round_index,
                phase: RoundPhase::Rewriting,
                elapsed,
                duplicate_count: measure,
            })
            .await;
        Ok(false)
    }
}
