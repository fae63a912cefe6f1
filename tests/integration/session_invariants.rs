//! Every opened document is closed or force-closed, whatever the outcome.

use crate::integration::test_utils::{d, fast_settings, run_batch};
use shift_automator::batch::DocumentStatus;
use shift_automator::error::HostError;
use shift_automator::host::{HostCall, ScriptedFailure, SimulatedHostFactory};
use shift_automator::session::SessionTimeouts;
use shift_automator::types::ShiftKind;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn assert_balanced(factory: &SimulatedHostFactory) {
    let counts = factory.counts();
    assert_eq!(
        counts.opens,
        counts.closes + counts.force_closes,
        "open/close imbalance: {:?}",
        counts
    );
    assert_eq!(counts.concurrent_entries, 0);
}

#[test]
fn clean_batch_is_balanced() {
    let temp = TempDir::new().unwrap();
    let factory = SimulatedHostFactory::new();
    run_batch(fast_settings(&temp), &factory, d(2026, 1, 1), d(2026, 1, 10), &ShiftKind::ALL);
    assert_balanced(&factory);
    assert_eq!(factory.counts().force_closes, 0);
}

#[test]
fn timed_out_print_is_force_closed_and_retried() {
    let temp = TempDir::new().unwrap();
    let factory = SimulatedHostFactory::new();
    // print deadline is 500 ms; the hang outlives it but drains inside the
    // release deadline, so the force close goes through.
    factory.script(HostCall::Print, [ScriptedFailure::Hang(Duration::from_millis(700))]);

    let report = run_batch(
        fast_settings(&temp),
        &factory,
        d(2026, 1, 5),
        d(2026, 1, 6),
        &[ShiftKind::Day],
    );

    assert_eq!(report.outcomes[0].status, DocumentStatus::Succeeded);
    assert_eq!(report.outcomes[0].attempts, 2);
    assert_eq!(report.outcomes[1].status, DocumentStatus::Succeeded);
    assert_balanced(&factory);
    assert_eq!(factory.counts().force_closes, 1);
}

#[test]
fn print_hang_past_release_deadline_is_released_after_it_drains() {
    let temp = TempDir::new().unwrap();
    let factory = SimulatedHostFactory::new();
    let mut settings = fast_settings(&temp);
    settings.timeouts = SessionTimeouts {
        call: Duration::from_millis(300),
        print: Duration::from_millis(300),
        release: Duration::from_millis(300),
    };
    // Outlives the print deadline, the force-close wait and the restart wait.
    factory.script(HostCall::Print, [ScriptedFailure::Hang(Duration::from_millis(1500))]);

    let report = run_batch(settings, &factory, d(2026, 1, 5), d(2026, 1, 7), &[ShiftKind::Day]);
    assert_eq!(report.counts().succeeded, 3);
    assert_eq!(report.outcomes[0].attempts, 2);

    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let counts = factory.counts();
        if counts.shutdowns == counts.connects || Instant::now() >= deadline {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    let counts = factory.counts();
    assert_eq!(counts.connects, 2);
    assert_eq!(counts.shutdowns, counts.connects, "retired host leaked: {:?}", counts);
    assert_eq!(counts.force_closes, 1);
    assert_balanced(&factory);
}

#[test]
fn failed_mutations_and_prints_are_balanced() {
    let temp = TempDir::new().unwrap();
    let factory = SimulatedHostFactory::new();
    factory.protect("Tuesday");
    factory.script(
        HostCall::Unprotect,
        [ScriptedFailure::Fail(HostError::other("password required"))],
    );
    factory.script(
        HostCall::Print,
        (0..3).map(|_| ScriptedFailure::Fail(HostError::printer("Printer offline"))),
    );
    factory.fail_open_for("Wednesday", HostError::invalid_document("not a document"));

    let report = run_batch(
        fast_settings(&temp),
        &factory,
        d(2026, 1, 5),
        d(2026, 1, 8),
        &[ShiftKind::Day],
    );

    assert_eq!(report.counts().total, 4);
    assert_balanced(&factory);
}
