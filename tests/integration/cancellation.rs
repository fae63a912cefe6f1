//! Cancellation between documents and during backoff.

use crate::integration::test_utils::{d, fast_settings};
use shift_automator::batch::{BatchOrchestrator, BatchTermination, DocumentStatus};
use shift_automator::cancel::CancellationToken;
use shift_automator::error::HostError;
use shift_automator::host::{HostCall, ScriptedFailure, SimulatedHostFactory};
use shift_automator::retry::BackoffPolicy;
use shift_automator::types::ShiftKind;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[test]
fn cancel_after_first_document_leaves_the_rest_unprocessed() {
    let temp = TempDir::new().unwrap();
    let factory = SimulatedHostFactory::new();
    let orchestrator = BatchOrchestrator::new(fast_settings(&temp), Arc::new(factory.clone()));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let progress = move |fraction: f64, _message: &str| {
        if fraction > 0.0 && fraction < 1.0 {
            trigger.cancel();
        }
    };

    let report = orchestrator
        .run(d(2026, 1, 5), d(2026, 1, 8), &[ShiftKind::Day], &progress, &cancel)
        .unwrap();

    assert_eq!(report.termination, BatchTermination::Cancelled);
    assert_eq!(report.outcomes[0].status, DocumentStatus::Succeeded);
    assert!(report.outcomes[1..]
        .iter()
        .all(|o| o.status == DocumentStatus::Unprocessed));
    assert_eq!(report.counts().unprocessed, 3);

    let counts = factory.counts();
    assert_eq!(counts.opens, 1);
    assert_eq!(counts.prints, 1);
}

#[test]
fn cancel_during_backoff_returns_promptly() {
    let temp = TempDir::new().unwrap();
    let factory = SimulatedHostFactory::new();
    factory.script(
        HostCall::Print,
        (0..5).map(|_| ScriptedFailure::Fail(HostError::printer("Printer not ready"))),
    );
    let mut settings = fast_settings(&temp);
    settings.backoff = BackoffPolicy::new(Duration::from_secs(5), Duration::from_secs(10), 3);
    let orchestrator = BatchOrchestrator::new(settings, Arc::new(factory.clone()));

    let cancel = CancellationToken::new();
    let remote = cancel.clone();
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(150));
        remote.cancel();
    });

    let started = Instant::now();
    let report = orchestrator
        .run(
            d(2026, 1, 5),
            d(2026, 1, 6),
            &[ShiftKind::Day],
            &shift_automator::batch::NullProgress,
            &cancel,
        )
        .unwrap();
    canceller.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(report.termination, BatchTermination::Cancelled);
    match &report.outcomes[0].status {
        DocumentStatus::Failed { reason } => {
            assert!(reason.starts_with("cancelled before retry:"), "{}", reason)
        }
        other => panic!("unexpected status {:?}", other),
    }
    assert_eq!(report.outcomes[1].status, DocumentStatus::Unprocessed);
    assert_eq!(factory.counts().prints, 1);
}

#[test]
fn cancelled_before_start_touches_nothing() {
    let temp = TempDir::new().unwrap();
    let factory = SimulatedHostFactory::new();
    let orchestrator = BatchOrchestrator::new(fast_settings(&temp), Arc::new(factory.clone()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = orchestrator
        .run(
            d(2026, 1, 5),
            d(2026, 1, 6),
            &ShiftKind::ALL,
            &shift_automator::batch::NullProgress,
            &cancel,
        )
        .unwrap();
    assert_eq!(report.counts().unprocessed, 4);
    assert_eq!(factory.counts().connects, 0);
}
