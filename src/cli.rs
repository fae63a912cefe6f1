//! CLI domain: parse, route, help, output, and presentation only.
//! Batch work lives in the library; the route table calls into it.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{BatchArgs, Cli, Commands, ConfigCommands, OutputFormat, PlanArgs, RunArgs};
pub use presentation::{
    format_check_json, format_check_text, format_config_json, format_config_text,
    format_plan_json, format_plan_text, format_report_json, format_report_text,
};
pub use route::RunContext;
