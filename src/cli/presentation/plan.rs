//! Plan presentation: template assignment table, text/json.

use comfy_table::Table;
use serde_json::json;

use crate::error::AutomatorError;
use crate::schedule::english_day_name;
use crate::types::TemplateAssignment;

pub fn format_plan_text(units: &[TemplateAssignment]) -> String {
    if units.is_empty() {
        return "Nothing to print.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Date", "Weekday", "Shift", "Template"]);
    for unit in units {
        table.add_row(vec![
            unit.date.format("%Y-%m-%d").to_string(),
            english_day_name(unit.date).to_string(),
            unit.shift.title().to_string(),
            unit.template_id.to_string(),
        ]);
    }
    format!("{}\n\nTotal: {} document(s)", table, units.len())
}

pub fn format_plan_json(units: &[TemplateAssignment]) -> Result<String, AutomatorError> {
    let out = json!({ "assignments": units, "total": units.len() });
    serde_json::to_string_pretty(&out)
        .map_err(|e| AutomatorError::ReportError(format!("cannot encode JSON: {}", e)))
}
