//! Document Session
//!
//! Drives one document through open, date substitution, print and close. Every
//! host call goes through the connection's [`GuardedExecutor`]. A session that
//! issued an open always issues exactly one close or force-close before it is
//! gone, whichever way processing ended. When an abandoned call keeps the host
//! busy past the release deadline, that release is handed to a [`RetiredHost`]
//! instead.

pub mod substitution;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{AutomationError, HostError};
use crate::guard::{AutomationCallResult, GuardedExecutor};
use crate::host::{AutomationHost, DocumentId, HostFactory, Protection};
use substitution::SubstitutionScope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Opening,
    Open,
    Mutating,
    Printing,
    Closing,
    Closed,
    Faulted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Opening => write!(f, "opening"),
            Self::Open => write!(f, "open"),
            Self::Mutating => write!(f, "mutating"),
            Self::Printing => write!(f, "printing"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
            Self::Faulted => write!(f, "faulted"),
        }
    }
}

/// Deadlines for the three kinds of host call a session makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    pub call: Duration,
    pub print: Duration,
    /// Close and force-close
    pub release: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            call: Duration::from_secs(30),
            print: Duration::from_secs(120),
            release: Duration::from_secs(30),
        }
    }
}

/// A live host instance together with the executor that owns its call lane.
pub struct HostConnection {
    host: Arc<dyn AutomationHost>,
    executor: GuardedExecutor,
}

impl HostConnection {
    pub fn new(host: Arc<dyn AutomationHost>) -> Self {
        Self {
            host,
            executor: GuardedExecutor::new(),
        }
    }

    /// Start a host instance through `factory`, bounded by `timeout`.
    ///
    /// Any failure here means the host cannot be used at all.
    pub fn connect(
        factory: Arc<dyn HostFactory>,
        timeout: Duration,
    ) -> Result<Self, AutomationError> {
        let executor = GuardedExecutor::new();
        let description = factory.describe();
        match executor.execute("connect", timeout, move || factory.connect()) {
            AutomationCallResult::Success(host) => {
                info!(host = %description, "Connected to automation host");
                Ok(Self { host, executor })
            }
            AutomationCallResult::TimedOut => Err(AutomationError::Environment(format!(
                "{} did not start within {}ms",
                description,
                timeout.as_millis()
            ))),
            AutomationCallResult::Failed(e) => Err(AutomationError::Environment(format!(
                "{} could not be started: {}",
                description, e
            ))),
        }
    }

    /// Run one host call under `timeout`.
    pub fn call<T, F>(&self, operation: &str, timeout: Duration, f: F) -> AutomationCallResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn AutomationHost) -> Result<T, HostError> + Send + 'static,
    {
        self.try_call(operation, timeout, f)
            .unwrap_or(AutomationCallResult::TimedOut)
    }

    /// Run one host call under `timeout`; `None` if it was never issued
    /// because an abandoned call kept the host busy.
    pub fn try_call<T, F>(
        &self,
        operation: &str,
        timeout: Duration,
        f: F,
    ) -> Option<AutomationCallResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&dyn AutomationHost) -> Result<T, HostError> + Send + 'static,
    {
        let host = Arc::clone(&self.host);
        self.executor
            .try_execute(operation, timeout, move || f(host.as_ref()))
    }

    /// Whether an abandoned call is still inside the host.
    pub fn in_flight(&self) -> bool {
        self.executor.in_flight()
    }

    /// Wait up to `timeout` for an abandoned call to leave the host.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.executor.wait_idle(timeout)
    }

    /// Best-effort shutdown; failures are logged.
    pub fn shutdown(&self, timeout: Duration) {
        match self.call("shutdown", timeout, |host| host.shutdown()) {
            AutomationCallResult::Success(()) => debug!("Automation host shut down"),
            AutomationCallResult::TimedOut => warn!("Automation host shutdown timed out"),
            AutomationCallResult::Failed(e) => warn!(error = %e, "Automation host shutdown failed"),
        }
    }
}

/// A host instance taken out of service after a failed release.
///
/// If the release never reached the host (an abandoned call held it), the
/// document is still open in there; it is force-closed once the abandoned
/// call returns, and only then is the instance shut down.
pub struct RetiredHost {
    connection: HostConnection,
    unreleased: Option<Option<DocumentId>>,
}

impl RetiredHost {
    pub fn new(connection: HostConnection, unreleased: Option<Option<DocumentId>>) -> Self {
        Self {
            connection,
            unreleased,
        }
    }

    /// Whether a document is still waiting for its release.
    pub fn holds_document(&self) -> bool {
        self.unreleased.is_some()
    }

    /// Release and shut down if the host goes idle within `wait`. Hands the
    /// instance back when it is still busy.
    pub fn try_release(self, wait: Duration, timeout: Duration) -> Option<Self> {
        if !self.connection.wait_idle(wait) {
            debug!("Retired automation host still busy");
            return Some(self);
        }
        if let Some(doc) = self.unreleased {
            match self
                .connection
                .call("force_close", timeout, move |h| h.force_close(doc))
            {
                AutomationCallResult::Success(()) => {
                    info!(doc = ?doc.map(|d| d.0), "Released document left open by an abandoned call")
                }
                AutomationCallResult::TimedOut => {
                    warn!(doc = ?doc.map(|d| d.0), "Deferred force-close timed out")
                }
                AutomationCallResult::Failed(e) => {
                    warn!(doc = ?doc.map(|d| d.0), error = %e, "Deferred force-close failed")
                }
            }
        }
        self.connection.shutdown(timeout);
        None
    }

    /// Finish the release on a background thread, waiting at most `patience`
    /// for the abandoned call to return.
    pub fn release_in_background(self, patience: Duration, timeout: Duration) {
        let spawned = std::thread::Builder::new()
            .name("retired-host".to_string())
            .spawn(move || {
                if self.try_release(patience, timeout).is_some() {
                    warn!(
                        patience_ms = patience.as_millis() as u64,
                        "Abandoned host call never returned; giving up on retired host"
                    );
                }
            });
        if let Err(e) = spawned {
            warn!(error = %e, "Cannot start retired host cleanup");
        }
    }
}

/// One document's trip through the host.
pub struct DocumentSession<'c> {
    connection: &'c HostConnection,
    timeouts: SessionTimeouts,
    state: SessionState,
    path: Option<PathBuf>,
    document: Option<DocumentId>,
    open_issued: bool,
    released: bool,
    needs_restart: bool,
    unreleased: Option<Option<DocumentId>>,
}

impl<'c> DocumentSession<'c> {
    pub fn new(connection: &'c HostConnection, timeouts: SessionTimeouts) -> Self {
        Self {
            connection,
            timeouts,
            state: SessionState::Idle,
            path: None,
            document: None,
            open_issued: false,
            released: false,
            needs_restart: false,
            unreleased: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn document(&self) -> Option<DocumentId> {
        self.document
    }

    /// Whether cleanup released the document. Meaningful once closed.
    pub fn released(&self) -> bool {
        self.released
    }

    /// Whether the host must be restarted before the next document.
    pub fn needs_restart(&self) -> bool {
        self.needs_restart
    }

    /// The document whose release never reached the host, if any. `Some(None)`
    /// means an open was issued but its handle is unknown.
    pub fn unreleased(&self) -> Option<Option<DocumentId>> {
        self.unreleased
    }

    fn require(&self, expected: SessionState, action: &str) -> Result<(), AutomationError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(AutomationError::InvalidState {
                state: self.state.to_string(),
                action: action.to_string(),
            })
        }
    }

    fn fault(&mut self, error: AutomationError) -> AutomationError {
        warn!(
            path = ?self.path,
            state = %self.state,
            error = %error,
            "Document session faulted"
        );
        self.state = SessionState::Faulted;
        error
    }

    fn timed_out(&self, operation: &str, timeout: Duration) -> AutomationError {
        AutomationError::TimedOut {
            operation: operation.to_string(),
            timeout,
        }
    }

    pub fn open(&mut self, path: &Path) -> Result<(), AutomationError> {
        self.require(SessionState::Idle, "open")?;
        self.state = SessionState::Opening;
        self.path = Some(path.to_path_buf());
        self.open_issued = true;

        let target = path.to_path_buf();
        let timeout = self.timeouts.call;
        match self
            .connection
            .call("open", timeout, move |host| host.open_document(&target))
        {
            AutomationCallResult::Success(id) => {
                debug!(path = %path.display(), doc = id.0, "Document opened");
                self.document = Some(id);
                self.state = SessionState::Open;
                Ok(())
            }
            AutomationCallResult::TimedOut => {
                let err = self.timed_out("open", timeout);
                Err(self.fault(err))
            }
            AutomationCallResult::Failed(e) => Err(self.fault(AutomationError::from_host(e))),
        }
    }

    /// Rewrite the document's date fields to `date`. Returns the number of date
    /// fields found; zero is logged but is not a failure.
    pub fn apply_date_substitution(
        &mut self,
        date: NaiveDate,
        scope: SubstitutionScope,
    ) -> Result<usize, AutomationError> {
        self.require(SessionState::Open, "apply date substitution")?;
        let doc = self.require_document()?;
        self.state = SessionState::Mutating;
        let timeout = self.timeouts.call;

        match self.connection.call("protection", timeout, move |h| h.protection(doc)) {
            AutomationCallResult::Success(Protection::None) => {}
            AutomationCallResult::Success(protection) => {
                match self.connection.call("unprotect", timeout, move |h| h.unprotect(doc)) {
                    AutomationCallResult::Success(()) => {
                        debug!(?protection, "Removed document protection")
                    }
                    AutomationCallResult::TimedOut => {
                        let err = self.timed_out("unprotect", timeout);
                        return Err(self.fault(err));
                    }
                    AutomationCallResult::Failed(e) => {
                        warn!(error = %e, ?protection, "Could not unprotect document; edits may fail")
                    }
                }
            }
            AutomationCallResult::TimedOut => {
                let err = self.timed_out("protection", timeout);
                return Err(self.fault(err));
            }
            AutomationCallResult::Failed(e) => {
                warn!(error = %e, "Could not read document protection")
            }
        }

        let stories = match self.connection.call("stories", timeout, move |h| h.stories(doc)) {
            AutomationCallResult::Success(stories) => stories,
            AutomationCallResult::TimedOut => {
                let err = self.timed_out("stories", timeout);
                return Err(self.fault(err));
            }
            AutomationCallResult::Failed(e) => {
                return Err(self.fault(AutomationError::from_host(e)))
            }
        };

        let plan = substitution::plan(&stories, date, scope);
        for edit in plan.normalise.iter().chain(plan.edits.iter()).cloned() {
            let result = self.connection.call("replace", timeout, move |h| {
                h.replace_in_story(doc, edit.story, &edit.find, &edit.replace)
            });
            match result {
                AutomationCallResult::Success(_) => {}
                AutomationCallResult::TimedOut => {
                    let err = self.timed_out("replace", timeout);
                    return Err(self.fault(err));
                }
                AutomationCallResult::Failed(e) => {
                    return Err(self.fault(AutomationError::from_host(e)))
                }
            }
        }

        if plan.is_empty() {
            warn!(
                path = ?self.path,
                %date,
                "No date patterns matched; the template may use an unsupported date format"
            );
        } else {
            debug!(%date, matches = plan.matches, edits = plan.edits.len(), "Dates substituted");
        }
        self.state = SessionState::Open;
        Ok(plan.matches)
    }

    /// Select `printer` (best-effort) and print synchronously.
    ///
    /// A host-reported print failure returns the session to `Open` so the caller
    /// can classify it; a timeout faults the session.
    pub fn print(&mut self, printer: &str) -> Result<(), AutomationError> {
        self.require(SessionState::Open, "print")?;
        let doc = self.require_document()?;
        self.state = SessionState::Printing;

        let name = printer.to_string();
        let call_timeout = self.timeouts.call;
        match self
            .connection
            .call("set_printer", call_timeout, move |h| h.set_active_printer(&name))
        {
            AutomationCallResult::Success(()) => {}
            AutomationCallResult::TimedOut => {
                let err = self.timed_out("set_printer", call_timeout);
                return Err(self.fault(err));
            }
            AutomationCallResult::Failed(e) => {
                warn!(printer, error = %e, "Could not select printer; using host default")
            }
        }

        let print_timeout = self.timeouts.print;
        match self.connection.call("print", print_timeout, move |h| h.print(doc)) {
            AutomationCallResult::Success(()) => {
                info!(path = ?self.path, printer, "Document printed");
                self.state = SessionState::Open;
                Ok(())
            }
            AutomationCallResult::TimedOut => {
                let err = self.timed_out("print", print_timeout);
                Err(self.fault(err))
            }
            AutomationCallResult::Failed(e) => {
                self.state = SessionState::Open;
                Err(AutomationError::from_host(e))
            }
        }
    }

    /// Release the document. Closes normally from `Open`, force-closes from
    /// `Faulted`, and is a no-op once `Closed`. Returns whether the document
    /// was released.
    pub fn finish(&mut self) -> bool {
        match self.state {
            SessionState::Closed => return self.released,
            SessionState::Idle => {
                self.released = true;
            }
            SessionState::Open => self.close(),
            _ => self.force_close(),
        }
        self.state = SessionState::Closed;
        self.released
    }

    fn close(&mut self) {
        self.state = SessionState::Closing;
        let Some(doc) = self.document else {
            self.force_close();
            return;
        };
        let timeout = self.timeouts.release;
        let Some(result) = self.connection.try_call("close", timeout, move |h| h.close(doc)) else {
            warn!(doc = doc.0, "Host busy; close deferred to host restart");
            self.unreleased = Some(Some(doc));
            self.needs_restart = true;
            return;
        };
        match result {
            AutomationCallResult::Success(()) => {
                debug!(doc = doc.0, "Document closed");
                self.released = true;
            }
            AutomationCallResult::TimedOut => {
                warn!(doc = doc.0, "Close timed out; host will be restarted");
                self.needs_restart = true;
            }
            AutomationCallResult::Failed(e) => {
                warn!(doc = doc.0, error = %e, "Close failed; host will be restarted");
                self.needs_restart = true;
            }
        }
    }

    fn force_close(&mut self) {
        if !self.open_issued {
            self.released = true;
            return;
        }
        let doc = self.document;
        let timeout = self.timeouts.release;
        let Some(result) = self
            .connection
            .try_call("force_close", timeout, move |h| h.force_close(doc))
        else {
            warn!(doc = ?doc.map(|d| d.0), "Host busy; force-close deferred to host restart");
            self.unreleased = Some(doc);
            self.needs_restart = true;
            return;
        };
        match result {
            AutomationCallResult::Success(()) => {
                debug!(doc = ?doc.map(|d| d.0), "Document force-closed");
                self.released = true;
            }
            AutomationCallResult::TimedOut => {
                warn!(doc = ?doc.map(|d| d.0), "Force-close timed out; host will be restarted");
                self.needs_restart = true;
            }
            AutomationCallResult::Failed(e) => {
                warn!(doc = ?doc.map(|d| d.0), error = %e, "Force-close failed; host will be restarted");
                self.needs_restart = true;
            }
        }
    }

    fn require_document(&self) -> Result<DocumentId, AutomationError> {
        self.document.ok_or_else(|| AutomationError::InvalidState {
            state: self.state.to_string(),
            action: "use document".to_string(),
        })
    }
}

impl Drop for DocumentSession<'_> {
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            debug!(state = %self.state, "Session dropped before finish; releasing document");
            self.finish();
        }
    }
}
