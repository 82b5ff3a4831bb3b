//! Implementation of the `motif-reducer load` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::sqlite::{SqliteIterationLedger, SqliteMotifStore};
use crate::cli::commands::open_database;
use crate::cli::output::progress::{create_spinner_with_message, ProgressBarExt};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::domain::ports::{IterationLedger, MotifStore};
use crate::services::{LoadReport, SampleLoader};

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Text file of digits, e.g. "3.14159..."
    pub file: PathBuf,

    /// Digits per motif (1-18); defaults to reduction.motif_length
    #[arg(long)]
    pub motif_length: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LoadOutput {
    pub file: PathBuf,
    pub motif_length: usize,
    #[serde(flatten)]
    pub report: LoadReport,
}

impl CommandOutput for LoadOutput {
    fn to_human(&self) -> String {
        let mut line = format!(
            "Loaded {} motifs of {} digits from {}",
            self.report.motifs,
            self.motif_length,
            self.file.display()
        );
        if self.report.discarded_tail > 0 {
            line.push_str(&format!(
                " ({} trailing digits dropped)",
                self.report.discarded_tail
            ));
        }
        line
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Clear the store and the ledger, then ingest `file`.
pub async fn execute(args: LoadArgs, config: &Config, json_mode: bool) -> Result<()> {
    let motif_length = args.motif_length.unwrap_or(config.reduction.motif_length);
    let pool = open_database(config).await?;
    let store = Arc::new(SqliteMotifStore::new(pool.clone()));
    let ledger = SqliteIterationLedger::new(pool);

    let loader = SampleLoader::new(Arc::clone(&store), motif_length, config.reduction.batch_size)?;

    ledger.reset().await.context("Failed to clear iteration ledger")?;
    store.clear().await.context("Failed to clear motif store")?;

    let spinner = create_spinner_with_message(format!("loading {}", args.file.display()), json_mode);
    let report = match loader.load_file(&args.file).await {
        Ok(report) => report,
        Err(err) => {
            spinner.finish_error("load failed");
            return Err(err).with_context(|| format!("Failed to load {}", args.file.display()));
        }
    };
    spinner.finish_success(format!("{} motifs loaded", report.motifs));

    output(
        &LoadOutput {
            file: args.file,
            motif_length,
            report,
        },
        json_mode,
    );
    Ok(())
}
