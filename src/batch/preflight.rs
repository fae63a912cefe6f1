//! Checks that reject a batch before the host is touched.

use chrono::NaiveDate;
use tracing::debug;

use super::BatchSettings;
use crate::error::PreflightError;
use crate::paths::{is_within_base, validate_folder_path};
use crate::templates::count_templates;
use crate::types::{DateRange, ShiftKind};

/// Placeholder shown before a printer is chosen; never a real target.
pub const PRINTER_PLACEHOLDER: &str = "Select Printer";

/// What a batch will do once preflight has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    pub range: DateRange,
    /// Requested shifts, de-duplicated, in request order
    pub shifts: Vec<ShiftKind>,
}

pub fn preflight(
    settings: &BatchSettings,
    start: NaiveDate,
    end: NaiveDate,
    shifts: &[ShiftKind],
) -> Result<BatchPlan, PreflightError> {
    let range = DateRange::new(start, end)?;

    let mut unique = Vec::with_capacity(shifts.len());
    for shift in shifts {
        if !unique.contains(shift) {
            unique.push(*shift);
        }
    }
    if unique.is_empty() {
        return Err(PreflightError::NoShifts);
    }

    for shift in &unique {
        check_folder(settings, *shift)?;
    }

    let printer = settings.printer.trim();
    if printer.is_empty() || printer == PRINTER_PLACEHOLDER {
        return Err(PreflightError::NoPrinter);
    }

    debug!(
        start = %range.start(),
        end = %range.end(),
        days = range.len(),
        shifts = ?unique,
        "Preflight passed"
    );
    Ok(BatchPlan {
        range,
        shifts: unique,
    })
}

fn check_folder(settings: &BatchSettings, shift: ShiftKind) -> Result<(), PreflightError> {
    let folder = settings.folder_for(shift);
    let invalid = |reason: String| PreflightError::InvalidFolder {
        shift: shift.title().to_string(),
        reason,
    };

    let canonical = validate_folder_path(folder).map_err(|e| invalid(e.to_string()))?;
    if !is_within_base(folder, &canonical) {
        return Err(invalid(format!(
            "{} does not resolve inside itself",
            folder.display()
        )));
    }
    let templates = count_templates(&canonical).map_err(|e| invalid(e.to_string()))?;
    if templates == 0 {
        return Err(PreflightError::EmptyFolder {
            shift: shift.title().to_string(),
            path: canonical,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn settings(temp: &TempDir) -> BatchSettings {
        let day = temp.path().join("day");
        let night = temp.path().join("night");
        fs::create_dir_all(&day).unwrap();
        fs::create_dir_all(&night).unwrap();
        fs::write(day.join("Monday.docx"), "x").unwrap();
        fs::write(night.join("Monday Night.docx"), "x").unwrap();
        BatchSettings::new(day, night, "Ward Printer")
    }

    #[test]
    fn valid_request_passes_and_dedups_shifts() {
        let temp = TempDir::new().unwrap();
        let plan = preflight(
            &settings(&temp),
            d(2026, 1, 5),
            d(2026, 1, 7),
            &[ShiftKind::Night, ShiftKind::Day, ShiftKind::Night],
        )
        .unwrap();
        assert_eq!(plan.shifts, vec![ShiftKind::Night, ShiftKind::Day]);
        assert_eq!(plan.range.len(), 3);
    }

    #[test]
    fn each_check_has_its_own_error() {
        let temp = TempDir::new().unwrap();
        let base = settings(&temp);

        assert!(matches!(
            preflight(&base, d(2026, 1, 7), d(2026, 1, 5), &ShiftKind::ALL),
            Err(PreflightError::InvertedRange { .. })
        ));
        assert!(matches!(
            preflight(&base, d(2026, 1, 1), d(2027, 1, 2), &ShiftKind::ALL),
            Err(PreflightError::RangeTooLarge { .. })
        ));
        assert_eq!(
            preflight(&base, d(2026, 1, 5), d(2026, 1, 5), &[]),
            Err(PreflightError::NoShifts)
        );

        let mut no_printer = base.clone();
        no_printer.printer = PRINTER_PLACEHOLDER.to_string();
        assert_eq!(
            preflight(&no_printer, d(2026, 1, 5), d(2026, 1, 5), &ShiftKind::ALL),
            Err(PreflightError::NoPrinter)
        );
        no_printer.printer = "   ".to_string();
        assert_eq!(
            preflight(&no_printer, d(2026, 1, 5), d(2026, 1, 5), &ShiftKind::ALL),
            Err(PreflightError::NoPrinter)
        );
    }

    #[test]
    fn folders_must_exist_and_hold_templates() {
        let temp = TempDir::new().unwrap();
        let mut missing = settings(&temp);
        missing.night_folder = temp.path().join("nowhere");
        assert!(matches!(
            preflight(&missing, d(2026, 1, 5), d(2026, 1, 5), &ShiftKind::ALL),
            Err(PreflightError::InvalidFolder { .. })
        ));

        let empty = temp.path().join("empty");
        fs::create_dir_all(&empty).unwrap();
        fs::write(empty.join("~$Monday.docx"), "lock").unwrap();
        let mut empty_settings = settings(&temp);
        empty_settings.day_folder = empty;
        assert!(matches!(
            preflight(&empty_settings, d(2026, 1, 5), d(2026, 1, 5), &[ShiftKind::Day]),
            Err(PreflightError::EmptyFolder { .. })
        ));
    }

    #[test]
    fn only_requested_shift_folders_are_checked() {
        let temp = TempDir::new().unwrap();
        let mut day_only = settings(&temp);
        day_only.night_folder = temp.path().join("nowhere");
        assert!(preflight(&day_only, d(2026, 1, 5), d(2026, 1, 5), &[ShiftKind::Day]).is_ok());
    }
}
