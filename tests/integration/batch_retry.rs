//! Retry and backoff behaviour of the batch loop.

use crate::integration::test_utils::{d, fast_settings, run_batch};
use shift_automator::batch::{BatchTermination, DocumentStatus};
use shift_automator::error::HostError;
use shift_automator::host::{HostCall, ScriptedFailure, SimulatedHostFactory};
use shift_automator::types::ShiftKind;
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[test]
fn transient_failure_then_success_takes_two_attempts() {
    let temp = TempDir::new().unwrap();
    let factory = SimulatedHostFactory::new();
    factory.script(
        HostCall::Print,
        [ScriptedFailure::Fail(HostError::printer("Printer offline"))],
    );

    let started = Instant::now();
    let report = run_batch(
        fast_settings(&temp),
        &factory,
        d(2026, 1, 5),
        d(2026, 1, 5),
        &[ShiftKind::Day],
    );

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.status, DocumentStatus::Succeeded);
    assert_eq!(outcome.attempts, 2);
    // one initial_delay (20 ms) between the attempts
    assert!(started.elapsed() >= Duration::from_millis(20));
    assert_eq!(factory.counts().prints, 2);
    assert_eq!(factory.counts().opens, 2);
}

#[test]
fn exhausted_attempts_fail_the_document_and_the_batch_continues() {
    let temp = TempDir::new().unwrap();
    let factory = SimulatedHostFactory::new();
    factory.script(
        HostCall::Print,
        (0..3).map(|_| ScriptedFailure::Fail(HostError::rejected("Call was rejected by callee"))),
    );

    let started = Instant::now();
    let report = run_batch(
        fast_settings(&temp),
        &factory,
        d(2026, 1, 5),
        d(2026, 1, 6),
        &[ShiftKind::Day],
    );

    assert_eq!(report.termination, BatchTermination::Completed);
    let first = &report.outcomes[0];
    assert!(matches!(first.status, DocumentStatus::Failed { .. }));
    assert_eq!(first.attempts, 3);
    assert_eq!(report.outcomes[1].status, DocumentStatus::Succeeded);
    assert_eq!(report.outcomes[1].attempts, 1);

    // 20 ms then 40 ms of backoff before giving up
    assert!(started.elapsed() >= Duration::from_millis(60));
    assert_eq!(report.summary(), "Completed with 1 of 2 failures");
}

#[test]
fn unavailable_host_aborts_the_remaining_batch() {
    let temp = TempDir::new().unwrap();
    let factory = SimulatedHostFactory::new();
    factory.script(
        HostCall::Open,
        [ScriptedFailure::Fail(HostError::unavailable("RPC server is unavailable"))],
    );

    let report = run_batch(
        fast_settings(&temp),
        &factory,
        d(2026, 1, 5),
        d(2026, 1, 7),
        &[ShiftKind::Day],
    );

    assert!(matches!(report.termination, BatchTermination::Aborted { .. }));
    let counts = report.counts();
    assert_eq!(counts.failed, 1);
    assert_eq!(counts.unprocessed, 2);
    assert!(report.summary().starts_with("Stopped early due to environment failure"));
    assert_eq!(factory.counts().opens, 1);
}
