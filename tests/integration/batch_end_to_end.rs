//! Full batches against the simulated host.

use crate::integration::test_utils::{d, fast_settings, run_batch};
use shift_automator::batch::{BatchTermination, DocumentStatus};
use shift_automator::host::SimulatedHostFactory;
use shift_automator::host::{Story, StoryKind};
use shift_automator::types::ShiftKind;
use tempfile::TempDir;

#[test]
fn three_day_shifts_all_succeed() {
    let temp = TempDir::new().unwrap();
    let factory = SimulatedHostFactory::new();
    let report = run_batch(
        fast_settings(&temp),
        &factory,
        d(2026, 1, 5),
        d(2026, 1, 7),
        &[ShiftKind::Day],
    );

    assert_eq!(report.termination, BatchTermination::Completed);
    assert!(report.is_clean());
    let counts = report.counts();
    assert_eq!(counts.succeeded, 3);
    assert_eq!(counts.failed, 0);

    let templates: Vec<&str> = report
        .outcomes
        .iter()
        .map(|o| o.template_id.as_str())
        .collect();
    assert_eq!(templates, vec!["Monday", "Tuesday", "Wednesday"]);
    assert!(report.outcomes.iter().all(|o| o.attempts == 1));
    assert_eq!(report.summary(), "Completed: all 3 documents sent to the printer");
}

#[test]
fn third_thursday_uses_its_own_template() {
    let temp = TempDir::new().unwrap();
    let factory = SimulatedHostFactory::new();
    let report = run_batch(
        fast_settings(&temp),
        &factory,
        d(2026, 1, 8),
        d(2026, 1, 15),
        &[ShiftKind::Day],
    );
    let thursday = report.outcomes.first().unwrap();
    let third = report.outcomes.last().unwrap();
    assert_eq!(thursday.template_id.as_str(), "Thursday");
    assert_eq!(third.template_id.as_str(), "THIRD Thursday");

    let printed = factory.printed();
    assert!(printed[0].path.ends_with("Thursday.docx"));
    assert!(printed[7].path.ends_with("THIRD Thursday.docx"));
}

#[test]
fn printed_documents_carry_the_target_date() {
    let temp = TempDir::new().unwrap();
    let factory = SimulatedHostFactory::new();
    factory.with_content(
        "Tuesday Night",
        vec![
            Story {
                id: 0,
                kind: StoryKind::MainText,
                text: "Roster for Sunday, January 04, 2026 (01/04/2026)".to_string(),
            },
            Story {
                id: 1,
                kind: StoryKind::PrimaryFooter,
                text: "Printed 2026-01-04".to_string(),
            },
        ],
    );
    let report = run_batch(
        fast_settings(&temp),
        &factory,
        d(2026, 1, 6),
        d(2026, 1, 6),
        &[ShiftKind::Night],
    );
    assert!(report.is_clean());

    let printed = factory.printed();
    assert_eq!(printed.len(), 1);
    assert_eq!(printed[0].printer.as_deref(), Some("Ward Printer"));
    assert_eq!(
        printed[0].stories[0].text,
        "Roster for Tuesday, January 06, 2026 (01/06/2026)"
    );
    assert_eq!(printed[0].stories[1].text, "Printed 2026-01-06");
}

#[test]
fn headers_footers_only_leaves_body_untouched() {
    let temp = TempDir::new().unwrap();
    let factory = SimulatedHostFactory::new();
    let mut settings = fast_settings(&temp);
    settings.headers_footers_only = true;
    let report = run_batch(settings, &factory, d(2026, 1, 5), d(2026, 1, 5), &[ShiftKind::Day]);
    assert!(report.is_clean());

    let printed = factory.printed();
    assert_eq!(
        printed[0].stories[0].text,
        "Shift roster for January 04, 2026. Posted 01/04/2026."
    );
    assert_eq!(printed[0].stories[1].text, "Monday, January 05, 2026");
}

#[test]
fn document_errors_are_recorded_and_the_batch_moves_on() {
    let temp = TempDir::new().unwrap();
    let factory = SimulatedHostFactory::new();
    factory.fail_open_for(
        "Tuesday",
        shift_automator::error::HostError::invalid_document("file is corrupt"),
    );
    let report = run_batch(
        fast_settings(&temp),
        &factory,
        d(2026, 1, 5),
        d(2026, 1, 7),
        &[ShiftKind::Day],
    );

    let statuses: Vec<&str> = report.outcomes.iter().map(|o| o.status.as_str()).collect();
    assert_eq!(statuses, vec!["succeeded", "failed", "succeeded"]);
    assert_eq!(report.outcomes[1].attempts, 1);
    match &report.outcomes[1].status {
        DocumentStatus::Failed { reason } => assert!(reason.contains("corrupt")),
        other => panic!("unexpected status {:?}", other),
    }
    assert_eq!(report.summary(), "Completed with 1 of 3 failures");
}

#[test]
fn host_is_shut_down_after_the_batch() {
    let temp = TempDir::new().unwrap();
    let factory = SimulatedHostFactory::new();
    run_batch(fast_settings(&temp), &factory, d(2026, 1, 5), d(2026, 1, 6), &ShiftKind::ALL);
    let counts = factory.counts();
    assert_eq!(counts.connects, 1);
    assert_eq!(counts.shutdowns, 1);
    assert_eq!(counts.prints, 4);
    assert_eq!(counts.concurrent_entries, 0);
}
