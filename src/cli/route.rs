//! CLI route: single route table and run context. Dispatches to the batch
//! engine, config store and presentation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn};

use crate::batch::failures::write_failure_report;
use crate::batch::{preflight, BatchOrchestrator, BatchSettings};
use crate::cancel::CancellationToken;
use crate::cli::parse::{BatchArgs, Commands, ConfigCommands, OutputFormat, PlanArgs, RunArgs};
use crate::cli::presentation::{
    format_check_json, format_check_text, format_config_json, format_config_text,
    format_plan_json, format_plan_text, format_report_json, format_report_text,
};
use crate::cli::command_name;
use crate::config::{AutomatorConfig, ConfigLoader, ConfigStore, DebouncedSaver};
use crate::error::AutomatorError;
use crate::host::{HostFactory, SimulatedHostFactory, SpoolHostFactory};
use crate::schedule::assignments;
use crate::types::{DateRange, ShiftKind};

/// Runtime context for CLI execution: the effective configuration and where
/// settings are saved.
pub struct RunContext {
    config: AutomatorConfig,
    store: ConfigStore,
    cancel: CancellationToken,
}

impl RunContext {
    /// Load the layered configuration. An explicit `--config` file is also
    /// where `config set` saves; otherwise the per-user file is.
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, AutomatorError> {
        let config = ConfigLoader::load(config_path.as_deref())?.validated()?;
        let store = match config_path {
            Some(path) => ConfigStore::new(path),
            None => ConfigStore::user(),
        };
        Ok(Self::with_config(config, store))
    }

    /// Build a context from an already loaded configuration.
    pub fn with_config(config: AutomatorConfig, store: ConfigStore) -> Self {
        Self {
            config,
            store,
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &AutomatorConfig {
        &self.config
    }

    /// Handle that stops a running batch at its next safe checkpoint.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, AutomatorError> {
        let name = command_name(command);
        let span = info_span!("command", name = %name);
        let _enter = span.enter();
        let started = Instant::now();

        let result = match command {
            Commands::Run(args) => self.handle_run(args),
            Commands::Check { batch, format } => self.handle_check(batch, *format),
            Commands::Plan(args) => self.handle_plan(args),
            Commands::Config { command } => self.handle_config(command),
        };

        info!(
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn requested_shifts(&self, shifts: &[ShiftKind]) -> Vec<ShiftKind> {
        if shifts.is_empty() {
            self.config.processing.shifts.clone()
        } else {
            shifts.to_vec()
        }
    }

    /// Batch-start snapshot with the command line's overrides applied.
    fn settings_for(&self, args: &BatchArgs) -> BatchSettings {
        let mut settings = self.config.batch_settings();
        if let Some(printer) = &args.printer {
            settings.printer = printer.clone();
        }
        if let Some(folder) = &args.day_folder {
            settings.day_folder = folder.clone();
        }
        if let Some(folder) = &args.night_folder {
            settings.night_folder = folder.clone();
        }
        if args.headers_footers_only {
            settings.headers_footers_only = true;
        }
        settings
    }

    fn handle_run(&self, args: &RunArgs) -> Result<String, AutomatorError> {
        let settings = self.settings_for(&args.batch);
        let shifts = self.requested_shifts(&args.batch.shifts);

        let factory: Arc<dyn HostFactory> = if args.simulate {
            Arc::new(SimulatedHostFactory::default())
        } else {
            let spool_dir = args
                .spool_dir
                .clone()
                .unwrap_or_else(|| self.config.spool_dir());
            Arc::new(SpoolHostFactory::new(spool_dir))
        };

        let orchestrator = BatchOrchestrator::new(settings, factory);
        let progress = |fraction: f64, message: &str| {
            eprintln!("[{:>3.0}%] {}", fraction * 100.0, message);
        };

        let report = orchestrator.run(
            args.batch.start,
            args.batch.end,
            &shifts,
            &progress,
            &self.cancel,
        )?;

        let failure_report = match write_failure_report(&self.config.report_dir(), &report) {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "Could not write failure report");
                None
            }
        };

        match args.format {
            OutputFormat::Json => format_report_json(&report, failure_report.as_deref()),
            OutputFormat::Text => Ok(format_report_text(&report, failure_report.as_deref())),
        }
    }

    fn handle_check(&self, args: &BatchArgs, format: OutputFormat) -> Result<String, AutomatorError> {
        let settings = self.settings_for(args);
        let shifts = self.requested_shifts(&args.shifts);
        let plan = preflight(&settings, args.start, args.end, &shifts)?;
        match format {
            OutputFormat::Json => format_check_json(&plan, &settings.printer),
            OutputFormat::Text => Ok(format_check_text(&plan, &settings.printer)),
        }
    }

    fn handle_plan(&self, args: &PlanArgs) -> Result<String, AutomatorError> {
        let range = DateRange::new(args.start, args.end)?;
        let units = assignments(&range, &self.requested_shifts(&args.shifts));
        match args.format {
            OutputFormat::Json => format_plan_json(&units),
            OutputFormat::Text => Ok(format_plan_text(&units)),
        }
    }

    fn handle_config(&self, command: &ConfigCommands) -> Result<String, AutomatorError> {
        match command {
            ConfigCommands::Show { format } => match format {
                OutputFormat::Json => format_config_json(&self.config),
                OutputFormat::Text => format_config_text(&self.config, self.store.path()),
            },
            ConfigCommands::Set { key, value } => {
                // Edit the saved file, not the effective config, so that
                // environment overrides never get persisted.
                let mut saved = self.store.load();
                saved.set_value(key, value)?;
                let saved = saved.validated()?;

                let saver = DebouncedSaver::with_default_delay(self.store.clone());
                saver.schedule(saved);
                saver.flush()?;
                info!(key = %key, path = %self.store.path().display(), "Saved setting");
                Ok(format!("Set {} = {} in {}", key, value, self.store.path().display()))
            }
            ConfigCommands::Path => {
                let path = self.store.path();
                let state = if path.exists() { "exists" } else { "not created yet" };
                Ok(format!("{} ({})", path.display(), state))
            }
        }
    }
}
