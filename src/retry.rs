//! Retry policy: failure classification and capped exponential backoff.

mod backoff;
mod classify;

pub use backoff::BackoffPolicy;
pub use classify::{classify, FailureClass, TRANSIENT_KEYWORDS};
