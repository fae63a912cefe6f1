//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::AutomatorError;

/// Map an error to the single line shown to the user. Preflight messages
/// are already written for the user and are shown without a prefix.
pub fn map_error(e: &AutomatorError) -> String {
    match e {
        AutomatorError::Preflight(inner) => inner.to_string(),
        other => other.to_string(),
    }
}
