use serde::{Deserialize, Serialize};

use super::iteration::CountingMode;
use crate::infrastructure::logging::LogConfig;

/// Main configuration structure for motif-reducer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LogConfig,

    /// Reduction run configuration
    #[serde(default)]
    pub reduction: ReductionConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".motif-reducer/motifs.db".to_string()
}

const fn default_max_connections() -> u32 {
    4
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        format!("sqlite:{}", self.path)
    }
}

/// Reduction run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReductionConfig {
    /// Duplicate measure driving rates and convergence: unique or all
    #[serde(default)]
    pub counting_mode: CountingMode,

    /// Fixed sample size for the repeating rate; counted from the store when unset
    #[serde(default)]
    pub sample_size: Option<u64>,

    /// Keep looping rounds until convergence; false runs a single round
    #[serde(default = "default_auto_loop")]
    pub auto_loop: bool,

    /// Optional safety bound on rounds per run
    #[serde(default)]
    pub max_rounds: Option<u64>,

    /// Poll interval while paused, in milliseconds
    #[serde(default = "default_pause_poll_ms")]
    pub pause_poll_ms: u64,

    /// Accept growing-duplicate confirmations without asking
    #[serde(default)]
    pub assume_yes: bool,

    /// Digits per motif when loading a sample
    #[serde(default = "default_motif_length")]
    pub motif_length: usize,

    /// Motifs inserted per transaction when loading a sample
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

const fn default_auto_loop() -> bool {
    true
}

const fn default_pause_poll_ms() -> u64 {
    500
}

const fn default_motif_length() -> usize {
    10
}

const fn default_batch_size() -> usize {
    10_000
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            counting_mode: CountingMode::default(),
            sample_size: None,
            auto_loop: default_auto_loop(),
            max_rounds: None,
            pause_poll_ms: default_pause_poll_ms(),
            assume_yes: false,
            motif_length: default_motif_length(),
            batch_size: default_batch_size(),
        }
    }
}
