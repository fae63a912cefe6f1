//! Batch presentation: run report and preflight result, text/json.

use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::Path;

use crate::batch::{BatchPlan, BatchReport, BatchTermination, DocumentStatus};
use crate::error::AutomatorError;

fn to_json(value: &serde_json::Value) -> Result<String, AutomatorError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AutomatorError::ReportError(format!("cannot encode JSON: {}", e)))
}

pub fn format_report_text(report: &BatchReport, failure_report: Option<&Path>) -> String {
    let summary = report.summary();
    let mut output = match report.termination {
        BatchTermination::Completed if report.is_clean() => format!("{}", summary.green()),
        BatchTermination::Completed => format!("{}", summary.yellow()),
        _ => format!("{}", summary.red()),
    };

    let counts = report.counts();
    output.push_str(&format!(
        "\n  Succeeded: {}  Failed: {}  Unprocessed: {}  Total: {}",
        counts.succeeded, counts.failed, counts.unprocessed, counts.total
    ));

    if counts.failed > 0 {
        let mut table = Table::new();
        table.load_preset(comfy_table::presets::UTF8_FULL);
        table.set_header(vec!["Date", "Shift", "Template", "Attempts", "Reason"]);
        for outcome in report.failures() {
            let reason = match &outcome.status {
                DocumentStatus::Failed { reason } => reason.as_str(),
                _ => "",
            };
            table.add_row(vec![
                outcome.date.format("%Y-%m-%d").to_string(),
                outcome.shift.title().to_string(),
                outcome.template_id.to_string(),
                outcome.attempts.to_string(),
                reason.to_string(),
            ]);
        }
        output.push_str("\n\n");
        output.push_str(&table.to_string());
    }

    if let Some(path) = failure_report {
        output.push_str(&format!("\n\nFailure report: {}", path.display()));
    }
    output
}

pub fn format_report_json(
    report: &BatchReport,
    failure_report: Option<&Path>,
) -> Result<String, AutomatorError> {
    let out = json!({
        "summary": report.summary(),
        "counts": report.counts(),
        "report": report,
        "failure_report": failure_report.map(|p| p.display().to_string()),
    });
    to_json(&out)
}

pub fn format_check_text(plan: &BatchPlan, printer: &str) -> String {
    let shifts: Vec<&str> = plan.shifts.iter().map(|s| s.title()).collect();
    format!(
        "{}\n  Dates: {} to {} ({} days)\n  Shifts: {}\n  Printer: {}\n  Documents: {}",
        "Preflight passed".green(),
        plan.range.start(),
        plan.range.end(),
        plan.range.len(),
        shifts.join(", "),
        printer,
        plan.range.len() * plan.shifts.len()
    )
}

pub fn format_check_json(plan: &BatchPlan, printer: &str) -> Result<String, AutomatorError> {
    let out = json!({
        "ok": true,
        "start": plan.range.start(),
        "end": plan.range.end(),
        "days": plan.range.len(),
        "shifts": plan.shifts,
        "printer": printer,
        "documents": plan.range.len() * plan.shifts.len(),
    });
    to_json(&out)
}
