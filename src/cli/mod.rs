//! Command-line interface for motif-reducer.

pub mod commands;
pub mod observer;
pub mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

use commands::init::InitArgs;
use commands::load::LoadArgs;
use commands::run::RunArgs;
use commands::status::StatusArgs;

#[derive(Parser, Debug)]
#[command(name = "motif-reducer", version, about = "Resumable duplicate-motif reduction over digit samples")]
pub struct Cli {
    /// Print command results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of .motif-reducer/
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database and a default project config
    Init(InitArgs),
    /// Replace the motif sample with the digits of a file
    Load(LoadArgs),
    /// Start or resume a reduction run
    Run(RunArgs),
    /// Show the iteration ledger
    Status(StatusArgs),
}

impl Cli {
    /// Load configuration from `--config` or the project hierarchy.
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => ConfigLoader::load_from_file(path),
            None => ConfigLoader::load(),
        }
    }
}

/// Dispatch the parsed command.
pub async fn execute(cli: Cli, config: &Config) -> Result<()> {
    let json = cli.json;
    match cli.command {
        Commands::Init(args) => commands::init::execute(args, config, json).await,
        Commands::Load(args) => commands::load::execute(args, config, json).await,
        Commands::Run(args) => commands::run::execute(args, config, json).await,
        Commands::Status(args) => commands::status::execute(args, config, json).await,
    }
}

/// Report a failed command and exit with a non-zero status.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({ "success": false, "error": format!("{err:#}") });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", console::style("error:").red().bold());
    }
    std::process::exit(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "motif-reducer",
            "--json",
            "run",
            "--reset",
            "--digits",
            "pi.txt",
            "--max-rounds",
            "3",
            "-y",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Run(args) => {
                assert!(args.reset);
                assert_eq!(args.digits, Some(PathBuf::from("pi.txt")));
                assert_eq!(args.max_rounds, Some(3));
                assert!(args.yes);
                assert!(!args.single_round);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn test_reset_requires_digits() {
        assert!(Cli::try_parse_from(["motif-reducer", "run", "--reset"]).is_err());
        assert!(Cli::try_parse_from(["motif-reducer", "run", "--digits", "pi.txt"]).is_err());
    }

    #[test]
    fn test_parse_load_with_motif_length() {
        let cli = Cli::try_parse_from(["motif-reducer", "load", "pi.txt", "--motif-length", "8"]).unwrap();
        match cli.command {
            Commands::Load(args) => {
                assert_eq!(args.file, PathBuf::from("pi.txt"));
                assert_eq!(args.motif_length, Some(8));
            }
            other => panic!("expected load, got {other:?}"),
        }
    }
}
