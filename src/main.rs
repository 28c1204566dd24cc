//! Binary entry point for slackprune.
//!
//! Previews, and with `--commit` deletes, your own Slack messages and files.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stdout/print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::Parser;
use slackprune::config::{ConfigOverrides, PruneConfig, TOKEN_ENV};
use slackprune::models::{Cutoff, from_remote_timestamp};
use slackprune::observability::{self, LogFormat, LoggingConfig};
use slackprune::services::{PruneOutcome, PruneService};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

/// Slackprune - delete your own messages and files from private Slack conversations.
#[derive(Parser)]
#[command(name = "slackprune")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Slack OAuth token.
    #[arg(long, env = TOKEN_ENV, hide_env_values = true)]
    token: Option<String>,

    /// Your Slack username.
    #[arg(long)]
    me: Option<String>,

    /// Comma-separated terms; only conversations whose name matches are pruned.
    #[arg(long)]
    filter: Option<String>,

    /// Only prune items from before this date (YYYYMMDD).
    #[arg(long)]
    before: Option<String>,

    /// Actually delete. Without this flag the run is a preview.
    #[arg(long)]
    commit: bool,

    /// Path to configuration file.
    #[arg(short, long, env = "SLACKPRUNE_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Log output format.
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Slack Web API base URL.
    #[arg(long)]
    api_url: Option<String>,
}

/// Main entry point.
fn main() -> ExitCode {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let logging =
        LoggingConfig::from_settings(&config.logging, cli.verbose).with_format(cli.log_format);
    if let Err(e) = observability::init(&logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(&config) {
        Ok(outcome) => {
            print_summary(&outcome);
            ExitCode::SUCCESS
        },
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration and layers environment and CLI values over it.
fn load_config(cli: &Cli) -> slackprune::Result<PruneConfig> {
    let config = PruneConfig::load(cli.config.as_deref())?
        .with_env_overrides()
        .with_cli_overrides(ConfigOverrides {
            token: cli.token.clone(),
            me: cli.me.clone(),
            filter: cli.filter.clone(),
            before: cli.before.clone(),
            commit: cli.commit,
            api_url: cli.api_url.clone(),
        });
    Ok(config)
}

/// Validates configuration and runs the pipeline.
fn run(config: &PruneConfig) -> slackprune::Result<PruneOutcome> {
    let options = config.prune_options()?;
    let client = config.slack_client()?;

    if let Some(cutoff) = options.cutoff.as_ref() {
        log_cutoff(cutoff);
    }
    debug!(
        endpoint = %config.api.base_url,
        rate_limit_wait_ms = config.pacing.rate_limit_wait_ms,
        delete_pause_ms = config.pacing.delete_pause_ms,
        "Starting run"
    );

    PruneService::new(Arc::new(client), options, config.retry_policy()).run()
}

/// Logs the cutoff in every form it is compared in.
fn log_cutoff(cutoff: &Cutoff) {
    let decoded = from_remote_timestamp(cutoff.timestamp())
        .map_or_else(|e| e.to_string(), |instant| instant.to_rfc3339());
    info!(
        date = %cutoff.instant().format("%Y-%m-%d"),
        ts = cutoff.timestamp(),
        epoch_seconds = cutoff.epoch_seconds(),
        decoded = %decoded,
        "Cutoff"
    );
}

/// Prints the run summary to stdout.
fn print_summary(outcome: &PruneOutcome) {
    let plan = &outcome.plan;
    println!(
        "Found {} messages and {} files to delete!",
        plan.messages.len(),
        plan.files.len()
    );

    if plan.is_empty() {
        println!("Nothing to delete.");
        return;
    }

    match outcome.report {
        None => println!("Dry run: nothing was deleted. Run again with --commit to delete."),
        Some(report) => {
            println!(
                "Deleted {} messages and {} files.",
                report.messages_deleted, report.files_deleted
            );
            if report.failed() > 0 {
                println!(
                    "Could not delete {} messages and {} files; see the log for details.",
                    report.messages_failed, report.files_failed
                );
            }
        },
    }
}
