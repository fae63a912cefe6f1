//! Guarded Call Executor
//!
//! Every interaction with the automation host runs on its own short-lived worker
//! thread while the control thread waits, bounded, for the result. A worker that
//! overruns its deadline is abandoned, never killed: the host offers no safe way
//! to interrupt a call.
//!
//! The executor also owns the host's single call lane. The lane is raised while a
//! worker is inside the host and lowered when that worker returns, even if it was
//! abandoned long ago. A new call waits for the lane first, so two calls can never
//! be inside the same host at once.

use parking_lot::{Condvar, Mutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{HostError, HostErrorKind};

static CALL_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Outcome of one guarded host call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutomationCallResult<T> {
    Success(T),
    TimedOut,
    Failed(HostError),
}

impl<T> AutomationCallResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, AutomationCallResult::Success(_))
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, AutomationCallResult::TimedOut)
    }
}

#[derive(Debug, Default)]
struct Lane {
    busy: Mutex<bool>,
    drained: Condvar,
}

impl Lane {
    /// Wait until no call is in flight, then claim the lane. Returns false if the
    /// lane did not drain before `deadline`.
    fn acquire(&self, deadline: Instant) -> bool {
        let mut busy = self.busy.lock();
        while *busy {
            if self.drained.wait_until(&mut busy, deadline).timed_out() && *busy {
                return false;
            }
        }
        *busy = true;
        true
    }

    fn release(&self) {
        let mut busy = self.busy.lock();
        *busy = false;
        self.drained.notify_all();
    }

    fn is_busy(&self) -> bool {
        *self.busy.lock()
    }

    /// Wait until no call is in flight without claiming the lane.
    fn wait_drained(&self, deadline: Instant) -> bool {
        let mut busy = self.busy.lock();
        while *busy {
            if self.drained.wait_until(&mut busy, deadline).timed_out() {
                return !*busy;
            }
        }
        true
    }
}

/// Lowers the lane when the worker exits, whichever way it exits.
struct LaneRelease(Arc<Lane>);

impl Drop for LaneRelease {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// Runs host operations under a hard deadline, one at a time.
///
/// Cloning shares the lane; one executor (and its clones) belongs to exactly one
/// host instance.
#[derive(Debug, Clone, Default)]
pub struct GuardedExecutor {
    lane: Arc<Lane>,
}

impl GuardedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a call (possibly an abandoned one) is still inside the host.
    pub fn in_flight(&self) -> bool {
        self.lane.is_busy()
    }

    /// Wait up to `timeout` for an abandoned call to leave the host. Returns
    /// whether the lane is free.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.lane.wait_drained(Instant::now() + timeout)
    }

    /// Run `op` on a dedicated worker thread and wait at most `timeout`.
    ///
    /// The wait includes any time spent waiting for a previous, abandoned call to
    /// leave the host. If the lane does not drain in time the operation is not
    /// issued at all and `TimedOut` is returned.
    pub fn execute<T, F>(&self, operation: &str, timeout: Duration, op: F) -> AutomationCallResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, HostError> + Send + 'static,
    {
        self.try_execute(operation, timeout, op)
            .unwrap_or(AutomationCallResult::TimedOut)
    }

    /// Like [`execute`](Self::execute), but returns `None` when the lane never
    /// drained and `op` was not issued.
    pub fn try_execute<T, F>(
        &self,
        operation: &str,
        timeout: Duration,
        op: F,
    ) -> Option<AutomationCallResult<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, HostError> + Send + 'static,
    {
        let started = Instant::now();
        let deadline = started + timeout;

        if !self.lane.acquire(deadline) {
            warn!(
                operation,
                timeout_ms = timeout.as_millis() as u64,
                "Host still busy with an abandoned call; not issuing"
            );
            return None;
        }

        let call_id = CALL_COUNTER.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::sync_channel(1);
        let release = LaneRelease(Arc::clone(&self.lane));
        let op_name = operation.to_string();

        let spawned = thread::Builder::new()
            .name(format!("host-call-{}", call_id))
            .spawn(move || {
                let _release = release;
                let result = panic::catch_unwind(AssertUnwindSafe(op)).unwrap_or_else(|_| {
                    Err(HostError::new(
                        HostErrorKind::Panicked,
                        format!("host call '{}' panicked", op_name),
                    ))
                });
                // The receiver is gone if the caller already gave up.
                let _ = tx.send(result);
            });

        if let Err(e) = spawned {
            // The closure (and with it the lane release) was dropped with the error.
            return Some(AutomationCallResult::Failed(HostError::other(format!(
                "failed to spawn host call thread: {}",
                e
            ))));
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        let result = match rx.recv_timeout(remaining) {
            Ok(Ok(value)) => {
                debug!(
                    operation,
                    call_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Host call succeeded"
                );
                AutomationCallResult::Success(value)
            }
            Ok(Err(error)) => {
                debug!(operation, call_id, error = %error, "Host call failed");
                AutomationCallResult::Failed(error)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(
                    operation,
                    call_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Host call timed out; abandoning worker"
                );
                AutomationCallResult::TimedOut
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => AutomationCallResult::Failed(
                HostError::new(
                    HostErrorKind::Panicked,
                    format!("host call '{}' exited without a result", operation),
                ),
            ),
        };
        Some(result)
    }
}
