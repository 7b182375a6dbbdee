//! sr - test sequence CSV reporting
//!
//! CLI entry point for replaying event scripts into reports and summarizing
//! existing reports.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use seqreport::cli::{Cli, Command, OutputFormat};
use seqreport::config::Config;
use seqreport::report::{CsvReporter, ReportSummary, ScriptIdentity, read_report};
use seqreport::{create_event_bus, replay};

fn parse_level(level: &str) -> tracing::Level {
    match level.to_uppercase().as_str() {
        "TRACE" => tracing::Level::TRACE,
        "DEBUG" => tracing::Level::DEBUG,
        "INFO" => tracing::Level::INFO,
        "WARN" | "WARNING" => tracing::Level::WARN,
        "ERROR" => tracing::Level::ERROR,
        _ => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", level);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > config file > default (INFO)
    let level = cli_log_level
        .or(config_log_level)
        .map(parse_level)
        .unwrap_or(tracing::Level::INFO);
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("seqreport")
        .join("logs");
    let log_file = fs::create_dir_all(&log_dir).and_then(|_| fs::File::create(log_dir.join("sr.log")));

    match log_file {
        Ok(file) => tracing_subscriber::fmt()
            .with_writer(file)
            .with_ansi(false)
            .with_env_filter(filter)
            .init(),
        Err(e) => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
            debug!(error = %e, "setup_logging: log file unavailable, logging to stderr");
        }
    }

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    debug!(?config, "main: loaded config");

    match cli.command {
        Command::Replay {
            events,
            script,
            script_version,
            output_dir,
        } => cmd_replay(&config, &events, &script, &script_version, output_dir),
        Command::Show { report, format } => cmd_show(&report, format),
    }
}

fn cmd_replay(
    config: &Config,
    events: &Path,
    script: &Path,
    script_version: &str,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    debug!(events = %events.display(), script = %script.display(), "cmd_replay: called");
    let mut config = config.clone();
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }

    let events = replay::load_events(events).context(format!("Failed to load events from {}", events.display()))?;
    info!(count = events.len(), "cmd_replay: loaded events");

    let bus = create_event_bus();
    let reporter = CsvReporter::new(bus.clone(), config.report_settings(ScriptIdentity::from_path(script, script_version)));
    reporter.install().context("Failed to install reporter")?;
    replay::publish_all(&bus, &events);
    reporter.uninstall().context("Failed to flush report")?;

    let reports = reporter.recorder().report_paths();
    if reports.is_empty() {
        println!("{} No sequence was started, nothing written", "!".yellow());
        return Ok(());
    }

    println!("{} Wrote {} rows", "✓".green(), reporter.sink().lines_written());
    for path in reports {
        println!("  {}", path.display().to_string().cyan());
    }
    Ok(())
}

fn cmd_show(report: &Path, format: OutputFormat) -> Result<()> {
    debug!(report = %report.display(), ?format, "cmd_show: called");
    let summary = read_report(report).context(format!("Failed to read report {}", report.display()))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => print_summary(&summary),
    }
    Ok(())
}

fn print_summary(summary: &ReportSummary) {
    println!(
        "Script: {} (version {})",
        summary.script_name.cyan(),
        summary.script_version
    );
    println!("  Started: {}", summary.started);
    if summary.sessions > 1 {
        println!("  Sessions: {} (sharing this file)", summary.sessions.to_string().yellow());
    }
    match (&summary.ended, &summary.sequence_status) {
        (Some(ended), Some(status)) => {
            let status = match status.as_str() {
                "PASSED" => status.green(),
                s if s.contains("ABORT") => status.yellow(),
                _ => status.red(),
            };
            println!("  Ended: {} {}", ended, status);
        }
        _ => println!("  Ended: {}", "incomplete".yellow()),
    }
    println!(
        "  Tests: {} started, {} passed, {} failed, {} error",
        summary.tests_started, summary.tests_passed, summary.tests_failed, summary.tests_errored
    );
    println!(
        "  Checks: {} passed, {} failed",
        summary.checks_passed, summary.checks_failed
    );
    println!("  Exceptions: {}", summary.exceptions);
    println!("  Elapsed: {:.2}s over {} rows", summary.elapsed, summary.rows);
}
