/// Receives batch progress on the orchestrator's control thread.
///
/// Implementations must return promptly; a presentation layer with thread
/// affinity should queue the update rather than render it here.
pub trait ProgressSink {
    /// `fraction` is in `0.0..=1.0`.
    fn report(&self, fraction: f64, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(f64, &str),
{
    fn report(&self, fraction: f64, message: &str) {
        self(fraction, message)
    }
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _fraction: f64, _message: &str) {}
}
