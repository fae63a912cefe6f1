//! Deadline behaviour of the guarded executor.

use shift_automator::error::HostError;
use shift_automator::guard::{AutomationCallResult, GuardedExecutor};
use std::thread;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_millis(300);
const TOLERANCE: Duration = Duration::from_millis(150);

#[test]
fn call_finishing_inside_the_deadline_succeeds() {
    let executor = GuardedExecutor::new();
    let result = executor.execute("quick", TIMEOUT, || {
        thread::sleep(Duration::from_millis(100));
        Ok(7)
    });
    assert_eq!(result, AutomationCallResult::Success(7));
}

#[test]
fn call_overrunning_the_deadline_times_out_on_time() {
    let executor = GuardedExecutor::new();
    let started = Instant::now();
    let result: AutomationCallResult<()> = executor.execute("slow", TIMEOUT, || {
        thread::sleep(Duration::from_millis(600));
        Ok(())
    });
    let waited = started.elapsed();
    assert!(result.is_timed_out());
    assert!(waited >= TIMEOUT);
    assert!(waited < TIMEOUT + TOLERANCE, "waited {:?}", waited);
}

#[test]
fn abandoned_call_blocks_the_next_one_until_it_drains() {
    let executor = GuardedExecutor::new();
    let first: AutomationCallResult<()> = executor.execute("hang", Duration::from_millis(100), || {
        thread::sleep(Duration::from_millis(400));
        Ok(())
    });
    assert!(first.is_timed_out());
    assert!(executor.in_flight());

    // Lane does not drain inside 50 ms, so the second call is never issued.
    let second = executor.execute("next", Duration::from_millis(50), || Ok(1));
    assert!(second.is_timed_out());

    // Once the abandoned worker finishes, calls go through again.
    let third = executor.execute("later", Duration::from_secs(2), || Ok(2));
    assert_eq!(third, AutomationCallResult::Success(2));
}

#[test]
fn host_errors_and_panics_come_back_as_failures() {
    let executor = GuardedExecutor::new();
    let failed: AutomationCallResult<()> =
        executor.execute("print", TIMEOUT, || Err(HostError::printer("Printer offline")));
    assert!(matches!(failed, AutomationCallResult::Failed(_)));

    let panicked: AutomationCallResult<()> = executor.execute("boom", TIMEOUT, || panic!("boom"));
    assert!(matches!(panicked, AutomationCallResult::Failed(_)));

    // The panicked worker released the lane.
    assert_eq!(executor.execute("after", TIMEOUT, || Ok(3)), AutomationCallResult::Success(3));
}
