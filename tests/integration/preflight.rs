//! Preflight rejections never reach the host.

use crate::integration::test_utils::{d, fast_settings};
use shift_automator::batch::{BatchOrchestrator, NullProgress, PRINTER_PLACEHOLDER};
use shift_automator::cancel::CancellationToken;
use shift_automator::error::PreflightError;
use shift_automator::host::SimulatedHostFactory;
use shift_automator::types::ShiftKind;
use std::sync::Arc;
use tempfile::TempDir;

fn run_expecting_rejection(
    settings: shift_automator::batch::BatchSettings,
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
    shifts: &[ShiftKind],
) -> PreflightError {
    let factory = SimulatedHostFactory::new();
    let orchestrator = BatchOrchestrator::new(settings, Arc::new(factory.clone()));
    let err = orchestrator
        .run(start, end, shifts, &NullProgress, &CancellationToken::new())
        .unwrap_err();
    let counts = factory.counts();
    assert_eq!(counts.connects, 0);
    assert_eq!(counts.total_document_calls(), 0);
    err
}

#[test]
fn inverted_range_is_rejected_without_host_calls() {
    let temp = TempDir::new().unwrap();
    let err = run_expecting_rejection(
        fast_settings(&temp),
        d(2026, 1, 7),
        d(2026, 1, 5),
        &ShiftKind::ALL,
    );
    assert!(matches!(err, PreflightError::InvertedRange { .. }));
}

#[test]
fn range_longer_than_a_year_is_rejected() {
    let temp = TempDir::new().unwrap();
    let err = run_expecting_rejection(
        fast_settings(&temp),
        d(2026, 1, 1),
        d(2027, 1, 2),
        &[ShiftKind::Day],
    );
    assert!(matches!(err, PreflightError::RangeTooLarge { .. }));
}

#[test]
fn placeholder_printer_is_rejected() {
    let temp = TempDir::new().unwrap();
    let mut settings = fast_settings(&temp);
    settings.printer = PRINTER_PLACEHOLDER.to_string();
    let err = run_expecting_rejection(settings, d(2026, 1, 5), d(2026, 1, 5), &[ShiftKind::Day]);
    assert_eq!(err, PreflightError::NoPrinter);
}

#[test]
fn missing_or_empty_template_folders_are_rejected() {
    let temp = TempDir::new().unwrap();
    let mut settings = fast_settings(&temp);
    settings.day_folder = temp.path().join("does-not-exist");
    let err = run_expecting_rejection(settings, d(2026, 1, 5), d(2026, 1, 5), &[ShiftKind::Day]);
    assert!(matches!(err, PreflightError::InvalidFolder { .. }));

    let empty = temp.path().join("empty");
    std::fs::create_dir_all(&empty).unwrap();
    let mut settings = fast_settings(&temp);
    settings.night_folder = empty;
    let err = run_expecting_rejection(settings, d(2026, 1, 5), d(2026, 1, 5), &[ShiftKind::Night]);
    assert!(matches!(err, PreflightError::EmptyFolder { .. }));
}
