//! Iteration ledger records and the per-round phase machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::motif::DuplicateStats;
use crate::domain::errors::DomainError;

/// Phase a round has reached, persisted alongside its ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Duplicate measurement has not completed.
    Measuring,
    /// Measurement is persisted; the rewrite has not completed.
    Rewriting,
    /// Both phases are persisted.
    Complete,
}

impl RoundPhase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Measuring => "measuring",
            Self::Rewriting => "rewriting",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoundPhase {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "measuring" => Ok(Self::Measuring),
            "rewriting" => Ok(Self::Rewriting),
            "complete" => Ok(Self::Complete),
            other => Err(DomainError::SerializationError(format!(
                "Unknown round phase: {other}"
            ))),
        }
    }
}

/// Which duplicate measure drives rates, the growth gate and convergence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountingMode {
    /// Distinct repeated values.
    #[default]
    Unique,
    /// Every occurrence of a repeated value.
    All,
}

impl CountingMode {
    pub const fn measure(&self, stats: &DuplicateStats) -> i64 {
        match self {
            Self::Unique => stats.unique_repeating_count,
            Self::All => stats.all_repeating_count,
        }
    }
}

/// One convergence round as persisted in the iteration ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub round_index: i64,
    pub phase: RoundPhase,
    pub unique_repeating_count: Option<i64>,
    pub all_repeating_count: Option<i64>,
    pub max_occurrences: Option<i64>,
    pub remaining_rate: Option<f64>,
    pub repeating_rate: Option<f64>,
    pub elapsed_counting: Option<Duration>,
    pub elapsed_adding: Option<Duration>,
    pub started_at: DateTime<Utc>,
}

impl IterationRecord {
    /// A freshly appended record with every measured field unset.
    pub fn new(round_index: i64) -> Self {
        Self {
            round_index,
            phase: RoundPhase::Measuring,
            unique_repeating_count: None,
            all_repeating_count: None,
            max_occurrences: None,
            remaining_rate: None,
            repeating_rate: None,
            elapsed_counting: None,
            elapsed_adding: None,
            started_at: Utc::now(),
        }
    }

    /// Drop everything measured for this round and return it to `Measuring`.
    pub fn clear_measurement(&mut self) {
        self.phase = RoundPhase::Measuring;
        self.max_occurrences = None;
        self.unique_repeating_count = None;
        self.all_repeating_count = None;
        self.remaining_rate = None;
        self.repeating_rate = None;
        self.elapsed_counting = None;
        self.elapsed_adding = None;
    }

    /// Record a completed measurement and move the round to `Rewriting`.
    pub fn apply_measurement(
        &mut self,
        stats: &DuplicateStats,
        mode: CountingMode,
        count_previous: i64,
        total: u64,
        elapsed: Duration,
    ) {
        self.unique_repeating_count = Some(stats.unique_repeating_count);
        self.all_repeating_count = Some(stats.all_repeating_count);
        self.max_occurrences = Some(stats.max_occurrences);
        self.remaining_rate = Some(remaining_rate(
            mode.measure(stats),
            count_previous,
            self.round_index,
        ));
        self.repeating_rate = Some(repeating_rate(stats, total));
        self.elapsed_counting = Some(elapsed);
        self.phase = RoundPhase::Rewriting;
    }

    /// Record a completed (or skipped) rewrite and close the round.
    pub fn complete_rewrite(&mut self, elapsed: Duration) {
        self.elapsed_adding = Some(elapsed);
        self.phase = RoundPhase::Complete;
    }

    /// Measured duplicate statistics, when the measurement is persisted.
    pub fn stats(&self) -> Option<DuplicateStats> {
        Some(DuplicateStats {
            unique_repeating_count: self.unique_repeating_count?,
            all_repeating_count: self.all_repeating_count?,
            max_occurrences: self.max_occurrences?,
        })
    }

    /// The active duplicate measure, when the measurement is persisted.
    pub fn measure(&self, mode: CountingMode) -> Option<i64> {
        match mode {
            CountingMode::Unique => self.unique_repeating_count,
            CountingMode::All => self.all_repeating_count,
        }
    }

    /// A completed round that found no duplicates left.
    pub fn is_fixed_point(&self) -> bool {
        self.phase == RoundPhase::Complete
            && self.unique_repeating_count == Some(0)
            && self.remaining_rate == Some(0.0)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Current duplicate measure as a percentage of the previous round's.
pub fn remaining_rate(current: i64, count_previous: i64, round_index: i64) -> f64 {
    if current == 0 {
        0.0
    } else if round_index == 0 || count_previous <= 0 {
        100.0
    } else {
        round2(current as f64 * 100.0 / count_previous as f64)
    }
}

/// Repeating occurrences as a percentage of the whole sample.
pub fn repeating_rate(stats: &DuplicateStats, total: u64) -> f64 {
    if stats.all_repeating_count == 0 || total == 0 {
        0.0
    } else if stats.all_repeating_count == stats.unique_repeating_count {
        100.0
    } else {
        round2(stats.all_repeating_count as f64 * 100.0 / total as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(unique: i64, all: i64, max: i64) -> DuplicateStats {
        DuplicateStats {
            unique_repeating_count: unique,
            all_repeating_count: all,
            max_occurrences: max,
        }
    }

    #[test]
    fn test_phase_round_trips_through_text() {
        for phase in [RoundPhase::Measuring, RoundPhase::Rewriting, RoundPhase::Complete] {
            assert_eq!(phase.as_str().parse::<RoundPhase>().unwrap(), phase);
        }
        assert!("adding".parse::<RoundPhase>().is_err());
    }

    #[test]
    fn test_remaining_rate_boundaries() {
        assert!((remaining_rate(5, 0, 0) - 100.0).abs() < f64::EPSILON);
        assert!(remaining_rate(0, 0, 0).abs() < f64::EPSILON);
        assert!(remaining_rate(0, 12, 4).abs() < f64::EPSILON);
        assert!((remaining_rate(1, 3, 2) - 33.33).abs() < f64::EPSILON);
    }

    #[test]
    fn test_repeating_rate_boundaries() {
        assert!(repeating_rate(&stats(0, 0, 0), 10).abs() < f64::EPSILON);
        assert!((repeating_rate(&stats(2, 2, 1), 10) - 100.0).abs() < f64::EPSILON);
        assert!((repeating_rate(&stats(1, 3, 3), 5) - 60.0).abs() < f64::EPSILON);
        assert!(repeating_rate(&stats(1, 3, 3), 0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_apply_measurement_moves_to_rewriting() {
        let mut record = IterationRecord::new(0);
        record.apply_measurement(
            &stats(1, 3, 3),
            CountingMode::Unique,
            0,
            5,
            Duration::from_millis(7),
        );

        assert_eq!(record.phase, RoundPhase::Rewriting);
        assert_eq!(record.unique_repeating_count, Some(1));
        assert_eq!(record.remaining_rate, Some(100.0));
        assert_eq!(record.repeating_rate, Some(60.0));
        assert_eq!(record.elapsed_counting, Some(Duration::from_millis(7)));
        assert!(record.elapsed_adding.is_none());
    }

    #[test]
    fn test_clear_measurement_resets_every_measured_field() {
        let mut record = IterationRecord::new(2);
        record.apply_measurement(&stats(4, 9, 3), CountingMode::All, 12, 100, Duration::ZERO);
        record.clear_measurement();

        assert_eq!(record.phase, RoundPhase::Measuring);
        assert!(record.stats().is_none());
        assert!(record.remaining_rate.is_none());
        assert!(record.repeating_rate.is_none());
        assert!(record.elapsed_counting.is_none());
    }

    #[test]
    fn test_fixed_point_requires_complete_phase() {
        let mut record = IterationRecord::new(3);
        record.apply_measurement(&stats(0, 0, 0), CountingMode::Unique, 2, 10, Duration::ZERO);
        assert!(!record.is_fixed_point());

        record.complete_rewrite(Duration::ZERO);
        assert!(record.is_fixed_point());
    }

    #[test]
    fn test_counting_mode_selects_measure() {
        let s = stats(2, 7, 4);
        assert_eq!(CountingMode::Unique.measure(&s), 2);
        assert_eq!(CountingMode::All.measure(&s), 7);
    }
}
