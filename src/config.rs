//! Configuration System
//!
//! Layered configuration for the automator: built-in defaults, the per-user
//! config file, an explicit file, then `SHIFT_AUTOMATOR__*` environment
//! overrides. Values are read once at batch start.

use crate::batch::BatchSettings;
use crate::error::AutomatorError;
use crate::logging::LoggingConfig;
use crate::retry::BackoffPolicy;
use crate::session::SessionTimeouts;
use crate::types::ShiftKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod merge;
mod persist;
mod sources;

pub use persist::{ConfigStore, DebouncedSaver, DEFAULT_DEBOUNCE};
pub use sources::global_file::{config_dir, global_config_path, CONFIG_DIR_ENV};

/// Prefix for environment overrides, e.g. `SHIFT_AUTOMATOR__PRINTER__NAME`.
pub const ENV_PREFIX: &str = "SHIFT_AUTOMATOR";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomatorConfig {
    #[serde(default)]
    pub templates: TemplatesConfig,

    #[serde(default)]
    pub printer: PrinterConfig,

    #[serde(default)]
    pub processing: ProcessingConfig,

    #[serde(default)]
    pub host: HostConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Template root folders, one per shift
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatesConfig {
    #[serde(default)]
    pub day_folder: PathBuf,

    #[serde(default)]
    pub night_folder: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterConfig {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Restrict date substitution to headers and footers
    #[serde(default)]
    pub headers_footers_only: bool,

    /// Shifts printed when none are given on the command line
    #[serde(default = "default_shifts")]
    pub shifts: Vec<ShiftKind>,
}

fn default_shifts() -> Vec<ShiftKind> {
    ShiftKind::ALL.to_vec()
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            headers_footers_only: false,
            shifts: default_shifts(),
        }
    }
}

/// Host call deadlines, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    #[serde(default = "default_print_timeout_ms")]
    pub print_timeout_ms: u64,

    #[serde(default = "default_release_timeout_ms")]
    pub release_timeout_ms: u64,

    /// Where the spool host writes print jobs
    #[serde(default)]
    pub spool_dir: Option<PathBuf>,
}

fn default_call_timeout_ms() -> u64 {
    30_000
}

fn default_print_timeout_ms() -> u64 {
    120_000
}

fn default_release_timeout_ms() -> u64 {
    30_000
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: default_call_timeout_ms(),
            print_timeout_ms: default_print_timeout_ms(),
            release_timeout_ms: default_release_timeout_ms(),
            spool_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    2_000
}

fn default_max_delay_ms() -> u64 {
    10_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Where failure reports go; the per-user data directory when unset
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Host(String),
    Retry(String),
    Processing(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Host(msg) => write!(f, "Host: {}", msg),
            ValidationError::Retry(msg) => write!(f, "Retry: {}", msg),
            ValidationError::Processing(msg) => write!(f, "Processing: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl AutomatorConfig {
    /// Validate the configuration. Folder and printer checks belong to batch
    /// preflight, since they depend on the machine rather than the file.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (name, value) in [
            ("call_timeout_ms", self.host.call_timeout_ms),
            ("print_timeout_ms", self.host.print_timeout_ms),
            ("release_timeout_ms", self.host.release_timeout_ms),
        ] {
            if value == 0 {
                errors.push(ValidationError::Host(format!("{} must be positive", name)));
            }
        }

        if self.retry.max_attempts == 0 {
            errors.push(ValidationError::Retry(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            errors.push(ValidationError::Retry(format!(
                "initial_delay_ms ({}) exceeds max_delay_ms ({})",
                self.retry.initial_delay_ms, self.retry.max_delay_ms
            )));
        }

        if self.processing.shifts.is_empty() {
            errors.push(ValidationError::Processing(
                "at least one shift must be configured".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            errors.push(ValidationError::Logging(format!(
                "format must be 'text' or 'json', got '{}'",
                self.logging.format
            )));
        }
        if !matches!(self.logging.output.as_str(), "stdout" | "stderr" | "file") {
            errors.push(ValidationError::Logging(format!(
                "output must be 'stdout', 'stderr' or 'file', got '{}'",
                self.logging.output
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold the errors into one message.
    pub fn validated(self) -> Result<Self, AutomatorError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            AutomatorError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;
        Ok(self)
    }

    pub fn session_timeouts(&self) -> SessionTimeouts {
        SessionTimeouts {
            call: Duration::from_millis(self.host.call_timeout_ms),
            print: Duration::from_millis(self.host.print_timeout_ms),
            release: Duration::from_millis(self.host.release_timeout_ms),
        }
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.retry.initial_delay_ms),
            Duration::from_millis(self.retry.max_delay_ms),
            self.retry.max_attempts,
        )
    }

    /// The batch-start snapshot the orchestrator works from.
    pub fn batch_settings(&self) -> BatchSettings {
        BatchSettings {
            day_folder: self.templates.day_folder.clone(),
            night_folder: self.templates.night_folder.clone(),
            printer: self.printer.name.clone(),
            headers_footers_only: self.processing.headers_footers_only,
            timeouts: self.session_timeouts(),
            connect_timeout: Duration::from_millis(self.host.call_timeout_ms),
            backoff: self.backoff(),
        }
    }

    /// Failure report directory, falling back to the per-user data directory.
    pub fn report_dir(&self) -> PathBuf {
        self.report
            .directory
            .clone()
            .unwrap_or_else(|| sources::global_file::data_dir().join("reports"))
    }

    /// Spool directory, falling back to the per-user data directory.
    pub fn spool_dir(&self) -> PathBuf {
        self.host
            .spool_dir
            .clone()
            .unwrap_or_else(|| sources::global_file::data_dir().join("spool"))
    }

    /// Set one dotted key (e.g. `printer.name`) from its string form.
    ///
    /// The value is parsed as a TOML literal when possible (`true`, `30000`,
    /// `["day"]`) and taken as a plain string otherwise.
    pub fn set_value(&mut self, key: &str, raw: &str) -> Result<(), AutomatorError> {
        let mut root = toml::Value::try_from(&*self)
            .map_err(|e| AutomatorError::ConfigError(format!("Cannot serialize config: {}", e)))?;

        let segments: Vec<&str> = key.split('.').filter(|s| !s.is_empty()).collect();
        let Some((last, parents)) = segments.split_last() else {
            return Err(AutomatorError::InvalidArgument("empty config key".to_string()));
        };

        let mut table = root
            .as_table_mut()
            .ok_or_else(|| AutomatorError::ConfigError("config root is not a table".to_string()))?;
        for segment in parents {
            table = table
                .get_mut(*segment)
                .and_then(|v| v.as_table_mut())
                .ok_or_else(|| {
                    AutomatorError::InvalidArgument(format!("unknown config section '{}'", segment))
                })?;
        }
        let existing = table.get(*last);
        if existing.is_none() && !OPTIONAL_PATH_KEYS.contains(&key) {
            return Err(AutomatorError::InvalidArgument(format!(
                "unknown config key '{}'",
                key
            )));
        }

        let value = parse_value(raw, existing);
        table.insert((*last).to_string(), value);

        *self = root.try_into().map_err(|e| {
            AutomatorError::InvalidArgument(format!("invalid value for '{}': {}", key, e))
        })?;
        Ok(())
    }
}

/// Keys whose value may be absent from the serialized form.
const OPTIONAL_PATH_KEYS: [&str; 2] = ["host.spool_dir", "report.directory"];

fn parse_value(raw: &str, existing: Option<&toml::Value>) -> toml::Value {
    if existing.map_or(true, toml::Value::is_str) {
        return toml::Value::String(raw.to_string());
    }
    format!("value = {}", raw)
        .parse::<toml::Table>()
        .ok()
        .and_then(|mut table| table.remove("value"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}

/// Loads configuration from every layer.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then the per-user file, then `explicit` (which must exist when
    /// given), then environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<AutomatorConfig, AutomatorError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::explicit_file::add_to_builder(builder, explicit)?;
        let builder = sources::environment::add_to_builder(builder);

        let config = builder.build()?;
        let parsed: AutomatorConfig = config.try_deserialize()?;
        Ok(parsed)
    }
}
