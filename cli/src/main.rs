//! `deadline-sim`: run deadline propagation scenarios and print the report.

mod commands;
mod exit_codes;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use report::Format;

#[derive(Parser)]
#[command(
    name = "deadline-sim",
    version,
    about = "Simulate how a deadline degrades across dependent calls"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a scenario file and print the per-call report.
    Run {
        /// Scenario TOML file.
        scenario: PathBuf,
        /// Report format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Parse and validate a scenario file without running it.
    Validate { scenario: PathBuf },
    /// List scenario files in a directory.
    List {
        #[arg(long, default_value = "scenarios")]
        dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Table => Format::Table,
            OutputFormat::Json => Format::Json,
        }
    }
}

#[tokio::main]
async fn main() {
    simulator::logging::init();
    match run().await {
        Ok(()) => std::process::exit(exit_codes::OK),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run { scenario, format } => {
            commands::run_scenario(&scenario, format.into()).await
        }
        Command::Validate { scenario } => commands::validate_scenario(&scenario),
        Command::List { dir } => commands::list_scenarios(&dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_defaults_to_table() {
        let cli = Cli::parse_from(["deadline-sim", "run", "scenarios/reference.toml"]);
        assert!(matches!(
            cli.command,
            Command::Run {
                format: OutputFormat::Table,
                ..
            }
        ));
    }

    #[test]
    fn parse_run_json() {
        let cli = Cli::parse_from(["deadline-sim", "run", "x.toml", "--format", "json"]);
        assert!(matches!(
            cli.command,
            Command::Run {
                format: OutputFormat::Json,
                ..
            }
        ));
    }

    #[test]
    fn parse_list_default_dir() {
        let cli = Cli::parse_from(["deadline-sim", "list"]);
        match cli.command {
            Command::List { dir } => assert_eq!(dir, PathBuf::from("scenarios")),
            _ => panic!("expected list command"),
        }
    }
}
