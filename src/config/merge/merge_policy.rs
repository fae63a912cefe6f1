//! Merge rules: built-in defaults sit under every other layer.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with the built-in defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("templates.day_folder", "")?
        .set_default("templates.night_folder", "")?
        .set_default("printer.name", "")?
        .set_default("processing.headers_footers_only", false)?
        .set_default("processing.shifts", vec!["day", "night"])?
        .set_default("host.call_timeout_ms", 30_000_i64)?
        .set_default("host.print_timeout_ms", 120_000_i64)?
        .set_default("host.release_timeout_ms", 30_000_i64)?
        .set_default("retry.max_attempts", 3_i64)?
        .set_default("retry.initial_delay_ms", 2_000_i64)?
        .set_default("retry.max_delay_ms", 10_000_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AutomatorConfig;

    #[test]
    fn defaults_alone_match_the_struct_defaults() {
        let parsed: AutomatorConfig = builder_with_defaults()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(parsed, AutomatorConfig::default());
    }
}
