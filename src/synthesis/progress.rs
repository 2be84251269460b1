//! Progress reporting for speech synthesis.

use std::sync::Mutex;

/// Highest fraction reported before synthesis is confirmed.
const PENDING_CEILING: f32 = 0.99;

/// One progress notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub message: String,
    /// Completion fraction in `[0, 1]`.
    pub fraction: f32,
}

/// Receives synthesis progress.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Progress sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Forwards events to a sink, keeping fractions non-decreasing.
///
/// Fractions stay below 1.0 until [`complete`](Self::complete) is called, so
/// retried attempts never move the bar backwards and a failed call never
/// reports completion.
pub(crate) struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    high_water: Mutex<f32>,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            high_water: Mutex::new(0.0),
        }
    }

    pub(crate) fn report(&self, message: impl Into<String>, fraction: f32) {
        let fraction = fraction.clamp(0.0, PENDING_CEILING);
        let fraction = {
            let mut high = self.high_water.lock().unwrap_or_else(|e| e.into_inner());
            *high = high.max(fraction);
            *high
        };
        self.sink.report(ProgressEvent {
            message: message.into(),
            fraction,
        });
    }

    pub(crate) fn complete(&self, message: impl Into<String>) {
        *self.high_water.lock().unwrap_or_else(|e| e.into_inner()) = 1.0;
        self.sink.report(ProgressEvent {
            message: message.into(),
            fraction: 1.0,
        });
    }
}
