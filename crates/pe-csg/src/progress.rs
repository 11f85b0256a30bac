//! Progress reporting and cooperative cancellation

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// A progress update: fraction done in `[0, 1]` and a phase label
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressStatus {
    pub progress: f64,
    pub status: String,
}

impl ProgressStatus {
    pub fn new(progress: f64, status: impl Into<String>) -> Self {
        Self {
            progress,
            status: status.into(),
        }
    }
}

/// Receives progress updates
pub trait ProgressSink: Send + Sync {
    fn report(&self, status: &ProgressStatus);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressStatus) + Send + Sync,
{
    fn report(&self, status: &ProgressStatus) {
        self(status)
    }
}

/// Records every update; handy for tests and task status panels
#[derive(Debug, Default)]
pub struct ProgressLog {
    entries: Mutex<Vec<ProgressStatus>>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ProgressStatus> {
        self.entries.lock().clone()
    }

    pub fn last(&self) -> Option<ProgressStatus> {
        self.entries.lock().last().cloned()
    }
}

impl ProgressSink for ProgressLog {
    fn report(&self, status: &ProgressStatus) {
        self.entries.lock().push(status.clone());
    }
}

/// Forwards updates clamped to `[0, 1]` and never below an earlier value.
pub struct MonotonicProgress<'a> {
    inner: Option<&'a dyn ProgressSink>,
    last: Mutex<f64>,
}

impl<'a> MonotonicProgress<'a> {
    pub fn new(inner: Option<&'a dyn ProgressSink>) -> Self {
        Self {
            inner,
            last: Mutex::new(0.0),
        }
    }

    /// Report a fraction with a label
    pub fn update(&self, progress: f64, status: &str) {
        self.report(&ProgressStatus::new(progress, status));
    }
}

impl ProgressSink for MonotonicProgress<'_> {
    fn report(&self, status: &ProgressStatus) {
        let Some(inner) = self.inner else {
            return;
        };
        let progress = {
            let mut last = self.last.lock();
            let value = status.progress.clamp(0.0, 1.0).max(*last);
            *last = value;
            value
        };
        inner.report(&ProgressStatus::new(progress, status.status.clone()));
    }
}

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clamps() {
        let log = ProgressLog::new();
        let progress = MonotonicProgress::new(Some(&log));
        progress.update(0.3, "a");
        progress.update(0.2, "b");
        progress.update(1.5, "c");
        let values: Vec<f64> = log.entries().iter().map(|e| e.progress).collect();
        assert_eq!(values, vec![0.3, 0.3, 1.0]);
        assert_eq!(log.last().unwrap().status, "c");
    }

    #[test]
    fn test_monotonic_without_sink() {
        let progress = MonotonicProgress::new(None);
        progress.update(0.5, "ignored");
    }

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_closure_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |s: &ProgressStatus| seen.lock().push(s.progress);
        sink.report(&ProgressStatus::new(0.25, "x"));
        assert_eq!(*seen.lock(), vec![0.25]);
    }
}
