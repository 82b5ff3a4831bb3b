//! Motif records and duplicate statistics.

use serde::{Deserialize, Serialize};

/// Longest motif that still fits an `i64` value after positional perturbation.
pub const MAX_MOTIF_LENGTH: usize = 18;

/// A fixed-width digit group tagged with its offset in the digit sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MotifRecord {
    /// 0-based offset of the group; unique and immutable.
    pub position: i64,
    /// Digit group read as a base-10 integer.
    pub value: i64,
}

impl MotifRecord {
    pub const fn new(position: i64, value: i64) -> Self {
        Self { position, value }
    }

    /// Value this record takes when its group is rewritten.
    ///
    /// Distinct positions yield distinct outputs for a shared value, which is
    /// what makes one rewrite pass split every duplicate group apart.
    pub const fn perturbed(&self) -> i64 {
        self.value + self.position
    }
}

/// Result of one duplicate measurement pass over the motif store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateStats {
    /// Distinct values that occur more than once.
    pub unique_repeating_count: i64,
    /// Occurrences belonging to any repeated value.
    pub all_repeating_count: i64,
    /// Largest occurrence count of a single value.
    pub max_occurrences: i64,
}

impl DuplicateStats {
    pub const fn is_converged(&self) -> bool {
        self.unique_repeating_count == 0
    }
}
