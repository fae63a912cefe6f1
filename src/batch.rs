//! Batch Orchestrator
//!
//! Expands a date range into units of work and drives each one through a
//! document session, strictly one at a time, with bounded retries. All host
//! interaction happens on the calling (control) thread via guarded calls.

pub mod failures;
mod preflight;
mod progress;
mod report;

pub use preflight::{preflight, BatchPlan, PRINTER_PLACEHOLDER};
pub use progress::{NullProgress, ProgressSink};
pub use report::{BatchCounts, BatchReport, BatchTermination, DocumentOutcome, DocumentStatus};

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, info_span, warn};

use crate::cancel::{CancellationToken, SleepOutcome};
use crate::error::{AutomationError, PreflightError};
use crate::host::{DocumentId, HostFactory};
use crate::paths::is_within_base;
use crate::retry::{classify, BackoffPolicy, FailureClass};
use crate::schedule::assignments;
use crate::session::substitution::SubstitutionScope;
use crate::session::{DocumentSession, HostConnection, RetiredHost, SessionTimeouts};
use crate::templates::TemplateCatalog;
use crate::types::{ShiftKind, TemplateAssignment};

/// Everything a batch needs from configuration, read once at batch start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSettings {
    pub day_folder: PathBuf,
    pub night_folder: PathBuf,
    pub printer: String,
    pub headers_footers_only: bool,
    pub timeouts: SessionTimeouts,
    pub connect_timeout: Duration,
    pub backoff: BackoffPolicy,
}

impl BatchSettings {
    pub fn new(
        day_folder: impl Into<PathBuf>,
        night_folder: impl Into<PathBuf>,
        printer: impl Into<String>,
    ) -> Self {
        Self {
            day_folder: day_folder.into(),
            night_folder: night_folder.into(),
            printer: printer.into(),
            headers_footers_only: false,
            timeouts: SessionTimeouts::default(),
            connect_timeout: Duration::from_secs(30),
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn folder_for(&self, shift: ShiftKind) -> &Path {
        match shift {
            ShiftKind::Day => &self.day_folder,
            ShiftKind::Night => &self.night_folder,
        }
    }
}

/// How long a retired host may keep an abandoned call before its cleanup is
/// given up, once the batch itself is over.
const RETIRED_HOST_PATIENCE: Duration = Duration::from_secs(300);

/// The live host instance plus any retired ones still waiting to be released.
#[derive(Default)]
struct HostSlot {
    active: Option<HostConnection>,
    retired: Vec<RetiredHost>,
}

impl HostSlot {
    /// The live connection, starting a host if there is none. Retired hosts
    /// that have gone idle are released first.
    fn connection(
        &mut self,
        factory: &Arc<dyn HostFactory>,
        settings: &BatchSettings,
    ) -> Result<&HostConnection, AutomationError> {
        if self.active.is_none() {
            self.reap(Duration::ZERO, settings.timeouts.release);
            let connection = HostConnection::connect(Arc::clone(factory), settings.connect_timeout)?;
            self.active = Some(connection);
        }
        self.active.as_ref().ok_or_else(|| {
            AutomationError::Environment("automation host connection missing".to_string())
        })
    }

    /// Take the live host out of service.
    fn retire(&mut self, unreleased: Option<Option<DocumentId>>, release: Duration) {
        let Some(old) = self.active.take() else {
            return;
        };
        if let Some(busy) = RetiredHost::new(old, unreleased).try_release(release, release) {
            info!(
                holds_document = busy.holds_document(),
                "Retired host still busy; releasing it later"
            );
            self.retired.push(busy);
        }
    }

    fn reap(&mut self, wait: Duration, release: Duration) {
        let pending = std::mem::take(&mut self.retired);
        self.retired = pending
            .into_iter()
            .filter_map(|host| host.try_release(wait, release))
            .collect();
    }

    /// Shut everything down at batch end. Retired hosts that are still busy
    /// finish their release in the background.
    fn close(mut self, release: Duration) {
        if let Some(connection) = self.active.take() {
            connection.shutdown(release);
        }
        self.reap(release, release);
        for host in self.retired {
            warn!("Host call still running at batch end; releasing in the background");
            host.release_in_background(RETIRED_HOST_PATIENCE, release);
        }
    }
}

/// How one unit of work ended, and what that means for the batch.
enum UnitEnd {
    Continue(DocumentOutcome),
    Cancelled(DocumentOutcome),
    Abort(DocumentOutcome, String),
}

pub struct BatchOrchestrator {
    settings: BatchSettings,
    factory: Arc<dyn HostFactory>,
    catalog: TemplateCatalog,
}

impl BatchOrchestrator {
    pub fn new(settings: BatchSettings, factory: Arc<dyn HostFactory>) -> Self {
        Self {
            settings,
            factory,
            catalog: TemplateCatalog::new(),
        }
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Run a batch. Preflight failures are returned before any host call;
    /// everything after preflight is reported in the `BatchReport`.
    pub fn run(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        shifts: &[ShiftKind],
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, PreflightError> {
        let plan = preflight(&self.settings, start, end, shifts)?;
        let units = assignments(&plan.range, &plan.shifts);
        let total = units.len();
        let span = info_span!("batch", start = %start, end = %end, units = total);
        let _enter = span.enter();

        info!(host = %self.factory.describe(), "Starting batch");
        progress.report(0.0, &format!("Starting batch of {} documents", total));
        self.catalog.clear(None);

        let mut report = BatchReport::new();
        let mut hosts = HostSlot::default();
        let mut termination = BatchTermination::Completed;

        for (index, unit) in units.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(remaining = total - index, "Cancellation requested; stopping batch");
                report.mark_unprocessed(&units[index..]);
                termination = BatchTermination::Cancelled;
                break;
            }

            let stop = match self.process_unit(unit, &mut hosts, cancel) {
                UnitEnd::Continue(outcome) => {
                    report.record(outcome);
                    None
                }
                UnitEnd::Cancelled(outcome) => {
                    report.record(outcome);
                    Some(BatchTermination::Cancelled)
                }
                UnitEnd::Abort(outcome, reason) => {
                    report.record(outcome);
                    Some(BatchTermination::Aborted { reason })
                }
            };

            let fraction = (index + 1) as f64 / total as f64;
            progress.report(fraction, &describe(report.outcomes.last()));

            if let Some(stop) = stop {
                report.mark_unprocessed(&units[index + 1..]);
                termination = stop;
                break;
            }
        }

        hosts.close(self.settings.timeouts.release);

        report.finish(termination);
        match &report.termination {
            BatchTermination::Aborted { reason } => error!(reason = %reason, "Batch aborted"),
            _ => info!(summary = %report.summary(), "Batch finished"),
        }
        progress.report(1.0, &report.summary());
        Ok(report)
    }

    fn process_unit(
        &self,
        unit: &TemplateAssignment,
        hosts: &mut HostSlot,
        cancel: &CancellationToken,
    ) -> UnitEnd {
        let policy = self.settings.backoff;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match self.attempt(unit, hosts) {
                Ok(()) => {
                    info!(date = %unit.date, shift = %unit.shift, attempt, "Sent to printer");
                    return UnitEnd::Continue(DocumentOutcome::succeeded(unit, attempt));
                }
                Err(error) => error,
            };

            let class = classify(&error);
            match class {
                FailureClass::FatalBatch => {
                    error!(date = %unit.date, error = %error, "Host unusable; aborting batch");
                    let reason = error.to_string();
                    return UnitEnd::Abort(DocumentOutcome::failed(unit, &reason, attempt), reason);
                }
                FailureClass::FatalDocument => {
                    warn!(date = %unit.date, shift = %unit.shift, error = %error, "Document failed");
                    return UnitEnd::Continue(DocumentOutcome::failed(
                        unit,
                        error.to_string(),
                        attempt,
                    ));
                }
                FailureClass::Transient if policy.should_retry(class, attempt) => {
                    let delay = policy.delay_for(attempt);
                    warn!(
                        date = %unit.date,
                        shift = %unit.shift,
                        attempt,
                        max_attempts = policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Transient failure; retrying"
                    );
                    if let Err(stop) = wait_before_retry(cancel, delay) {
                        info!(date = %unit.date, shift = %unit.shift, reason = %stop, "Stopping before retry");
                        return UnitEnd::Cancelled(DocumentOutcome::failed(
                            unit,
                            format!("cancelled before retry: {}", error),
                            attempt,
                        ));
                    }
                }
                FailureClass::Transient => {
                    warn!(date = %unit.date, shift = %unit.shift, attempt, error = %error, "Giving up after retries");
                    return UnitEnd::Continue(DocumentOutcome::failed(
                        unit,
                        format!("{} (after {} attempts)", error, attempt),
                        attempt,
                    ));
                }
            }
        }
    }

    /// One attempt: locate the template, then open, rewrite, print and close.
    fn attempt(
        &self,
        unit: &TemplateAssignment,
        hosts: &mut HostSlot,
    ) -> Result<(), AutomationError> {
        let folder = self.settings.folder_for(unit.shift);
        let path = self.catalog.resolve(folder, &unit.template_id)?;
        if !is_within_base(&path, folder) {
            return Err(AutomationError::Document(format!(
                "template {} resolves outside {}",
                path.display(),
                folder.display()
            )));
        }

        let conn = hosts.connection(&self.factory, &self.settings)?;
        let mut session = DocumentSession::new(conn, self.settings.timeouts);
        let result = self.drive(&mut session, &path, unit);
        session.finish();
        let restart = session.needs_restart();
        let unreleased = session.unreleased();
        drop(session);

        if restart {
            warn!("Document was not released; restarting automation host");
            hosts.retire(unreleased, self.settings.timeouts.release);
        }
        result
    }

    fn drive(
        &self,
        session: &mut DocumentSession<'_>,
        path: &Path,
        unit: &TemplateAssignment,
    ) -> Result<(), AutomationError> {
        session.open(path)?;
        session.apply_date_substitution(
            unit.date,
            SubstitutionScope::from_headers_footers_only(self.settings.headers_footers_only),
        )?;
        session.print(&self.settings.printer)
    }
}

/// Backoff pause that gives way to a cancellation request.
fn wait_before_retry(cancel: &CancellationToken, delay: Duration) -> Result<(), AutomationError> {
    match cancel.sleep(delay) {
        SleepOutcome::Elapsed => Ok(()),
        SleepOutcome::Cancelled => Err(AutomationError::CancellationRequested),
    }
}

fn describe(outcome: Option<&DocumentOutcome>) -> String {
    let Some(outcome) = outcome else {
        return String::new();
    };
    let label = format!(
        "{} {} shift ({})",
        outcome.date.format("%A %Y-%m-%d"),
        outcome.shift.title(),
        outcome.template_id
    );
    match &outcome.status {
        DocumentStatus::Succeeded => format!("Sent {} to printer", label),
        DocumentStatus::Failed { reason } => format!("Failed {}: {}", label, reason),
        DocumentStatus::Unprocessed => format!("Skipped {}", label),
    }
}
