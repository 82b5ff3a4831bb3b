//! Implementation of the `motif-reducer init` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::cli::commands::open_database;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::PROJECT_CONFIG_FILE;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing project config file with the defaults
    #[arg(long, short)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub database_path: String,
    pub config_path: PathBuf,
    pub config_written: bool,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("Database initialized at {}", self.database_path)];
        if self.config_written {
            lines.push(format!("Wrote default config to {}", self.config_path.display()));
        } else {
            lines.push(format!(
                "Kept existing config at {} (use --force to overwrite)",
                self.config_path.display()
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

async fn write_default_config(path: &Path, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let yaml = serde_yaml::to_string(&Config::default()).context("Failed to serialize default config")?;
    fs::write(path, yaml)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

pub async fn execute(args: InitArgs, config: &Config, json_mode: bool) -> Result<()> {
    let pool = open_database(config).await?;
    pool.close().await;

    let config_path = PathBuf::from(PROJECT_CONFIG_FILE);
    let config_written = write_default_config(&config_path, args.force).await?;

    let output_data = InitOutput {
        success: true,
        database_path: config.database.path.clone(),
        config_path,
        config_written,
    };
    output(&output_data, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_config_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        assert!(write_default_config(&path, false).await.unwrap());
        fs::write(&path, "reduction:\n  max_rounds: 3\n").await.unwrap();
        assert!(!write_default_config(&path, false).await.unwrap());
        assert!(write_default_config(&path, true).await.unwrap());

        let written = fs::read_to_string(&path).await.unwrap();
        let parsed: Config = serde_yaml::from_str(&written).unwrap();
        assert_eq!(parsed.reduction.max_rounds, None);
    }
}
