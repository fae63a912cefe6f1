//! Shared test utilities for integration tests
//!
//! Template folders on disk, fast batch settings, and an environment guard
//! for tests that touch process-wide variables.

use shift_automator::batch::{BatchOrchestrator, BatchReport, BatchSettings, NullProgress};
use shift_automator::cancel::CancellationToken;
use shift_automator::host::SimulatedHostFactory;
use shift_automator::retry::BackoffPolicy;
use shift_automator::session::SessionTimeouts;
use shift_automator::types::ShiftKind;
use chrono::NaiveDate;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

pub const DAY_TEMPLATES: [&str; 8] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "THIRD Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Day and night folders holding a full template set.
pub fn template_folders(temp: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
    let day = temp.path().join("Day Shift");
    let night = temp.path().join("Night Shift");
    std::fs::create_dir_all(&day).unwrap();
    std::fs::create_dir_all(&night).unwrap();
    for name in DAY_TEMPLATES {
        touch(&day.join(format!("{}.docx", name)));
    }
    for name in ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"] {
        touch(&night.join(format!("{} Night.docx", name)));
    }
    (day, night)
}

fn touch(path: &Path) {
    std::fs::write(path, "Sunday, January 04, 2026").unwrap();
}

/// Settings with millisecond backoff and short host deadlines.
pub fn fast_settings(temp: &TempDir) -> BatchSettings {
    let (day, night) = template_folders(temp);
    let mut settings = BatchSettings::new(day, night, "Ward Printer");
    settings.backoff = BackoffPolicy::new(Duration::from_millis(20), Duration::from_millis(80), 3);
    settings.timeouts = SessionTimeouts {
        call: Duration::from_millis(500),
        print: Duration::from_millis(500),
        release: Duration::from_millis(500),
    };
    settings.connect_timeout = Duration::from_millis(500);
    settings
}

pub fn run_batch(
    settings: BatchSettings,
    factory: &SimulatedHostFactory,
    start: NaiveDate,
    end: NaiveDate,
    shifts: &[ShiftKind],
) -> BatchReport {
    let orchestrator = BatchOrchestrator::new(settings, Arc::new(factory.clone()));
    orchestrator
        .run(start, end, shifts, &NullProgress, &CancellationToken::new())
        .unwrap()
}

/// Run `f` with the given environment variables set, restoring them afterwards.
pub fn with_env<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let previous: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(key, _)| (key.to_string(), std::env::var(key).ok()))
        .collect();
    for (key, value) in vars {
        std::env::set_var(key, value);
    }

    let result = f();

    for (key, value) in previous {
        match value {
            Some(v) => std::env::set_var(&key, v),
            None => std::env::remove_var(&key),
        }
    }
    result
}
