//! Failure Classifier: decides whether a failure is worth retrying, ends only the
//! current document, or ends the whole batch.

use serde::{Deserialize, Serialize};

use crate::error::{AutomationError, HostError, HostErrorKind};

/// Lower-cased fragments that mark a host message as recoverable.
pub const TRANSIENT_KEYWORDS: &[&str] = &[
    "offline",
    "not ready",
    "busy",
    "timeout",
    "timed out",
    "temporarily",
    "unavailable",
    "rejected",
    "retry later",
    // RPC_E_CALL_REJECTED
    "0x80010001",
    // RPC_E_SERVERCALL_RETRYLATER
    "0x80010101",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Expected to clear on its own; retry with backoff
    Transient,
    /// Skip this document, continue the batch
    FatalDocument,
    /// The host is unusable; stop the batch
    FatalBatch,
}

/// Classify a failure. Pure; no side effects.
pub fn classify(cause: &AutomationError) -> FailureClass {
    match cause {
        AutomationError::TimedOut { .. } => FailureClass::Transient,
        AutomationError::Environment(_) => FailureClass::FatalBatch,
        AutomationError::Document(_) => FailureClass::FatalDocument,
        AutomationError::InvalidState { .. } => FailureClass::FatalDocument,
        AutomationError::CancellationRequested => FailureClass::FatalDocument,
        AutomationError::TransientHost(error) => classify_host_error(error),
    }
}

fn classify_host_error(error: &HostError) -> FailureClass {
    match error.kind {
        HostErrorKind::Unavailable => FailureClass::FatalBatch,
        HostErrorKind::Rejected | HostErrorKind::Printer => FailureClass::Transient,
        HostErrorKind::TemplateNotFound
        | HostErrorKind::InvalidDocument
        | HostErrorKind::Protected
        | HostErrorKind::Panicked => FailureClass::FatalDocument,
        HostErrorKind::Other => {
            if message_is_transient(&error.message) {
                FailureClass::Transient
            } else {
                FailureClass::FatalDocument
            }
        }
    }
}

fn message_is_transient(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSIENT_KEYWORDS.iter().any(|kw| lower.contains(kw))
}
