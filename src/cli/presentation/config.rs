//! Config presentation: effective settings as TOML or JSON.

use owo_colors::OwoColorize;
use std::path::Path;

use crate::config::AutomatorConfig;
use crate::error::AutomatorError;

pub fn format_config_text(config: &AutomatorConfig, saved_at: &Path) -> Result<String, AutomatorError> {
    let body = toml::to_string_pretty(config)
        .map_err(|e| AutomatorError::ConfigError(format!("Cannot serialize config: {}", e)))?;
    Ok(format!(
        "{}\n# saved settings: {}\n\n{}",
        "Effective configuration".bold().underline(),
        saved_at.display(),
        body.trim_end()
    ))
}

pub fn format_config_json(config: &AutomatorConfig) -> Result<String, AutomatorError> {
    serde_json::to_string_pretty(config)
        .map_err(|e| AutomatorError::ConfigError(format!("Cannot serialize config: {}", e)))
}
