//! CLI presentation: text and json formatters per command family.

mod batch;
mod config;
mod plan;

pub use batch::{format_check_json, format_check_text, format_report_json, format_report_text};
pub use config::{format_config_json, format_config_text};
pub use plan::{format_plan_json, format_plan_text};
