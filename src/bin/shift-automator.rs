//! Shift Automator CLI Binary
//!
//! Prints recurring shift-schedule documents for a date range.

use anyhow::Context;
use clap::Parser;
use shift_automator::cli::{command_name, map_error, Cli, RunContext};
use shift_automator::config::ConfigLoader;
use shift_automator::error::AutomatorError;
use shift_automator::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info, warn};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        error!("Command failed: {:#}", e);
        let message = match e.downcast_ref::<AutomatorError>() {
            Some(inner) => map_error(inner),
            None => format!("{:#}", e),
        };
        eprintln!("{}", message);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let logging_config = build_logging_config(cli);
    init_logging(Some(&logging_config)).context("Failed to initialize logging")?;

    info!(command = %command_name(&cli.command), "Shift Automator starting");

    let context = RunContext::new(cli.config.clone())?;

    // Ctrl-C stops the batch between host calls so the current document is
    // still released and the failure report is still written.
    let cancel = context.cancellation();
    if let Err(e) = ctrlc::set_handler(move || {
        if !cancel.is_cancelled() {
            eprintln!("Cancelling after the current step...");
        }
        cancel.cancel();
    }) {
        warn!(error = %e, "Cannot install Ctrl-C handler");
    }

    let output = context.execute(&cli.command)?;
    info!("Command completed successfully");
    println!("{}", output);
    Ok(())
}

/// Build logging configuration from CLI args and the config file.
/// Logging stays off unless `--verbose` or `--log-level` asks for it.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = ConfigLoader::load(cli.config.as_deref())
        .map(|c| c.logging)
        .unwrap_or_default();

    config.level = match (&cli.log_level, cli.verbose) {
        (Some(level), _) => level.clone(),
        (None, true) => "debug".to_string(),
        (None, false) => "off".to_string(),
    };
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = file.clone();
    }
    config
}
