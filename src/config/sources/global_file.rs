//! Per-user config file: `<config dir>/shift-automator/config.toml`.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::{File, FileFormat};
use directories::ProjectDirs;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Overrides the per-user config directory.
pub const CONFIG_DIR_ENV: &str = "SHIFT_AUTOMATOR_CONFIG_DIR";

pub const CONFIG_FILE_NAME: &str = "config.toml";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "shift-automator")
}

pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    project_dirs()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".shift-automator"))
}

pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".shift-automator"))
}

/// Path to the per-user config file.
pub fn global_config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Add the per-user file to the builder if it exists and parses.
/// A corrupt file is skipped with a warning so the defaults still apply.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let path = global_config_path();
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) => {
            debug!(config_path = %path.display(), error = %e, "No per-user config file");
            return Ok(builder);
        }
    };

    if let Err(e) = contents.parse::<toml::Table>() {
        warn!(
            config_path = %path.display(),
            error = %e,
            "Per-user config file is corrupt; using defaults"
        );
        return Ok(builder);
    }

    Ok(builder.add_source(File::from_str(&contents, FileFormat::Toml)))
}
