//! Command-line interface definitions.

pub mod control;
pub mod report;
pub mod run;
pub mod status;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::Result;

/// Pairlock - complete-set arbitrage engine for binary prediction markets.
#[derive(Parser, Debug)]
#[command(name = "pairlock")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the engine (foreground)
    Run(RunArgs),

    /// Show ledger totals and recent risk events
    Status,

    /// Render a performance report
    Report(ReportArgs),

    /// Halt trading (operator note)
    Halt,

    /// Resume trading after a halt (operator note)
    Resume,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Force paper mode (no real orders)
    #[arg(long, conflicts_with = "live")]
    pub paper: bool,

    /// Force live mode (real orders)
    #[arg(long)]
    pub live: bool,
}

/// Arguments for the `report` subcommand.
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Trailing window in days
    #[arg(long, default_value = "7")]
    pub days: u32,
}

/// Route a parsed invocation to its handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run::execute(&cli.config, &args).await,
        Commands::Status => status::execute(&cli.config),
        Commands::Report(args) => report::execute(&cli.config, &args),
        Commands::Halt => {
            control::halt();
            Ok(())
        }
        Commands::Resume => {
            control::resume();
            Ok(())
        }
    }
}
