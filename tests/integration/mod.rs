//! Integration tests for the shift automator

mod batch_end_to_end;
mod batch_retry;
mod cancellation;
mod config_persistence;
mod guarded_calls;
mod preflight;
mod session_invariants;
mod test_utils;
