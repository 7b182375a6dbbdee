//! CLI argument parsing for sr

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// sr - test sequence CSV reporting
#[derive(Parser, Debug)]
#[command(name = "sr")]
#[command(author, version, about = "Durable CSV reports from test sequence events", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay an event script into a CSV report
    Replay {
        /// Event script (JSON Lines, one event per line)
        #[arg(required = true)]
        events: PathBuf,

        /// Path of the test script the events came from
        #[arg(short, long)]
        script: PathBuf,

        /// Version of the test script
        #[arg(short = 'v', long, default_value = "unknown")]
        script_version: String,

        /// Directory to write the report to (overrides config)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Summarize a CSV report
    Show {
        /// Report file
        #[arg(required = true)]
        report: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for report summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
