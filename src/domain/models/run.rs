//! Run-level types shared by the engine, the controller and their observers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::iteration::RoundPhase;

/// Progress reported after each phase completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub round_index: i64,
    pub phase: RoundPhase,
    pub elapsed: Duration,
    /// Active duplicate measure of the round.
    pub duplicate_count: i64,
}

/// How a run ended, reported exactly once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Finished,
    Canceled,
    Error,
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished => f.write_str("Finished"),
            Self::Canceled => f.write_str("Canceled"),
            Self::Error => f.write_str("Error"),
        }
    }
}

/// Why a run that did not fail stopped looping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A round measured no duplicates.
    Converged,
    /// The ledger already ended on a converged round; nothing ran.
    AlreadyConverged,
    /// Single-round execution finished its round.
    SingleRound,
    /// The configured safety bound on rounds was reached.
    RoundLimit,
}

/// What the engine did during a run that returned normally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Rounds that reached `Complete` during this run.
    pub rounds_completed: u64,
    /// Index of the last round touched, if any.
    pub last_round: Option<i64>,
    /// Active duplicate measure of the last completed round.
    pub last_duplicate_count: Option<i64>,
    pub stop_reason: StopReason,
}

/// Terminal report for a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub status: TerminalStatus,
    /// Newline-flattened error message for non-finished runs.
    pub message: Option<String>,
    /// Present when the engine returned normally.
    pub summary: Option<RunSummary>,
}
