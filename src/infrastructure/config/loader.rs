use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::MAX_MOTIF_LENGTH;

/// Project config file, created by `init`
pub const PROJECT_CONFIG_FILE: &str = ".motif-reducer/config.yaml";

/// Optional local overrides
pub const LOCAL_CONFIG_FILE: &str = ".motif-reducer/local.yaml";

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "MOTIF_REDUCER_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid pause_poll_ms: {0}. Must be at least 1")]
    InvalidPausePoll(u64),

    #[error("Invalid max_rounds: {0}. Must be at least 1 when set")]
    InvalidMaxRounds(u64),

    #[error("Invalid sample_size: {0}. Must be at least 1 when set")]
    InvalidSampleSize(u64),

    #[error("Invalid motif_length: {0}. Must be between 1 and 18")]
    InvalidMotifLength(usize),

    #[error("Invalid batch_size: {0}. Must be at least 1")]
    InvalidBatchSize(usize),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .motif-reducer/config.yaml (project config, created by init)
    /// 3. .motif-reducer/local.yaml (local overrides, optional)
    /// 4. Environment variables (MOTIF_REDUCER_* prefix, `__` between sections)
    pub fn load() -> Result<Config> {
        Self::load_layered(&[Path::new(PROJECT_CONFIG_FILE), Path::new(LOCAL_CONFIG_FILE)])
    }

    /// Merge the given YAML files in order over the defaults, then the environment
    pub fn load_layered(files: &[&Path]) -> Result<Config> {
        let figment = files
            .iter()
            .fold(Figment::new().merge(Serialized::defaults(Config::default())), |figment, file| {
                figment.merge(Yaml::file(file))
            });

        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let reduction = &config.reduction;
        if reduction.pause_poll_ms == 0 {
            return Err(ConfigError::InvalidPausePoll(reduction.pause_poll_ms));
        }

        if reduction.max_rounds == Some(0) {
            return Err(ConfigError::InvalidMaxRounds(0));
        }

        if reduction.sample_size == Some(0) {
            return Err(ConfigError::InvalidSampleSize(0));
        }

        if reduction.motif_length == 0 || reduction.motif_length > MAX_MOTIF_LENGTH {
            return Err(ConfigError::InvalidMotifLength(reduction.motif_length));
        }

        if reduction.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(reduction.batch_size));
        }

        Ok(())
    }
}
