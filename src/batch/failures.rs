//! Failure report: one CSV row per failed document.

use chrono::Local;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use super::report::{BatchReport, DocumentStatus};
use crate::error::AutomatorError;
use crate::paths::sanitize_filename;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRow {
    pub date: String,
    pub shift: String,
    pub template: String,
    pub attempts: u32,
    pub reason: String,
}

pub fn failure_rows(report: &BatchReport) -> Vec<FailureRow> {
    report
        .outcomes
        .iter()
        .filter_map(|outcome| match &outcome.status {
            DocumentStatus::Failed { reason } => Some(FailureRow {
                date: outcome.date.format("%Y-%m-%d").to_string(),
                shift: outcome.shift.to_string(),
                template: outcome.template_id.to_string(),
                attempts: outcome.attempts,
                reason: reason.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// Serialize rows as CSV with a header line, quoting fields as needed.
pub fn write_csv<W: Write>(writer: W, rows: &[FailureRow]) -> Result<(), csv::Error> {
    let mut csv_writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write `failures-YYYYMMDD-HHMMSS.csv` into `dir` when the report has any
/// failures. Returns the path written, or `None` when there was nothing to write.
pub fn write_failure_report(
    dir: &Path,
    report: &BatchReport,
) -> Result<Option<PathBuf>, AutomatorError> {
    let rows = failure_rows(report);
    if rows.is_empty() {
        return Ok(None);
    }

    fs::create_dir_all(dir).map_err(|e| {
        AutomatorError::ReportError(format!(
            "cannot create report directory {}: {}",
            dir.display(),
            e
        ))
    })?;
    let stamp = report
        .finished_at
        .unwrap_or_else(Local::now)
        .format("%Y%m%d-%H%M%S");
    let path = dir.join(sanitize_filename(&format!("failures-{}.csv", stamp)));
    let file = fs::File::create(&path).map_err(|e| {
        AutomatorError::ReportError(format!("cannot create {}: {}", path.display(), e))
    })?;
    write_csv(file, &rows).map_err(|e| {
        AutomatorError::ReportError(format!("cannot write {}: {}", path.display(), e))
    })?;
    info!(path = %path.display(), failures = rows.len(), "Wrote failure report");
    Ok(Some(path))
}
