//! Stable command names for log spans.

use crate::cli::parse::{Commands, ConfigCommands};

/// Command name string (e.g. "run", "config.set").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Run(_) => "run".to_string(),
        Commands::Check { .. } => "check".to_string(),
        Commands::Plan(_) => "plan".to_string(),
        Commands::Config { command } => format!("config.{}", config_command_name(command)),
    }
}

pub fn config_command_name(command: &ConfigCommands) -> &'static str {
    match command {
        ConfigCommands::Show { .. } => "show",
        ConfigCommands::Set { .. } => "set",
        ConfigCommands::Path => "path",
    }
}
