//! CLI parse: clap types for shift-automator. No behavior; definitions only.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::types::ShiftKind;

/// Shift Automator - batch printing of shift-schedule documents
#[derive(Parser)]
#[command(name = "shift-automator", version)]
#[command(about = "Print daily shift documents for a date range, one template per day and shift")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the per-user config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable logging (default: off)
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (when output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print every document in the date range
    Run(RunArgs),
    /// Run the preflight checks only; the document host is never started
    Check {
        #[command(flatten)]
        batch: BatchArgs,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show which template each date and shift resolves to
    Plan(PlanArgs),
    /// Inspect or change the saved settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Batch selection plus per-run overrides of the saved settings.
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// First date (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Last date, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub end: NaiveDate,

    /// Shift to print (repeatable; default from config)
    #[arg(long = "shift")]
    pub shifts: Vec<ShiftKind>,

    /// Target printer
    #[arg(long)]
    pub printer: Option<String>,

    /// Day-shift templates folder
    #[arg(long)]
    pub day_folder: Option<PathBuf>,

    /// Night-shift templates folder
    #[arg(long)]
    pub night_folder: Option<PathBuf>,

    /// Only rewrite dates in headers and footers
    #[arg(long)]
    pub headers_footers_only: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub batch: BatchArgs,

    /// Use the in-memory simulated host instead of spooling print jobs
    #[arg(long)]
    pub simulate: bool,

    /// Directory the spool host writes print jobs into
    #[arg(long)]
    pub spool_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// First date (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Last date, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub end: NaiveDate,

    /// Shift to plan (repeatable; default from config)
    #[arg(long = "shift")]
    pub shifts: Vec<ShiftKind>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Save a setting, e.g. `config set printer.name "Ward 3"`
    Set {
        /// Dotted key (section.field)
        key: String,
        /// New value
        value: String,
    },
    /// Show where settings are saved
    Path,
}
