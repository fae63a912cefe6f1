//! Error types for the shift automation engine.
//!
//! Host failures are plain values (`HostError`) so the retry loop can inspect and
//! classify them. `AutomationError` is the per-document taxonomy the orchestrator
//! reasons about; `AutomatorError` is what the outer surfaces (CLI, config, report
//! writer) propagate.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Broad category a host implementation attaches to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostErrorKind {
    /// The host cannot be started or the connection to it is gone
    Unavailable,
    /// The host rejected the call (busy, retry later)
    Rejected,
    /// Printer offline, not ready, or reporting an error
    Printer,
    TemplateNotFound,
    InvalidDocument,
    Protected,
    /// The worker thread running the call panicked
    Panicked,
    Other,
}

/// A failure reported by the automation host for one call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HostError {
    pub kind: HostErrorKind,
    pub message: String,
}

impl HostError {
    pub fn new(kind: HostErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::Unavailable, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::Rejected, message)
    }

    pub fn printer(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::Printer, message)
    }

    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::InvalidDocument, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::Other, message)
    }
}

/// Outcome taxonomy for one unit of work against the host.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AutomationError {
    #[error("Host call '{operation}' timed out after {}ms", timeout.as_millis())]
    TimedOut {
        operation: String,
        timeout: Duration,
    },

    #[error("Host call failed: {0}")]
    TransientHost(HostError),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Environment error: {0}")]
    Environment(String),

    #[error("Cancellation requested")]
    CancellationRequested,

    #[error("Cannot {action} while session is {state}")]
    InvalidState { state: String, action: String },
}

impl AutomationError {
    /// Wrap a host failure, routing kinds that are clearly scoped to the document
    /// or the environment to their own variants.
    pub fn from_host(error: HostError) -> Self {
        match error.kind {
            HostErrorKind::Unavailable => AutomationError::Environment(error.message),
            HostErrorKind::TemplateNotFound
            | HostErrorKind::InvalidDocument
            | HostErrorKind::Protected => AutomationError::Document(error.message),
            _ => AutomationError::TransientHost(error),
        }
    }
}

/// Reasons a batch is rejected before the host is touched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PreflightError {
    #[error("End date cannot be before start date ({start} > {end})")]
    InvertedRange { start: String, end: String },

    #[error("Date range exceeds maximum allowed ({max} days, requested {requested})")]
    RangeTooLarge { requested: i64, max: i64 },

    #[error("No shift kinds selected")]
    NoShifts,

    #[error("Invalid {shift} templates folder: {reason}")]
    InvalidFolder { shift: String, reason: String },

    #[error("{shift} templates folder contains no templates: {}", path.display())]
    EmptyFolder { shift: String, path: PathBuf },

    #[error("Please select a target printer")]
    NoPrinter,
}

/// Crate-level error for the outer surfaces.
#[derive(Debug, Error)]
pub enum AutomatorError {
    #[error("Preflight failed: {0}")]
    Preflight(#[from] PreflightError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Report error: {0}")]
    ReportError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<config::ConfigError> for AutomatorError {
    fn from(err: config::ConfigError) -> Self {
        AutomatorError::ConfigError(err.to_string())
    }
}
