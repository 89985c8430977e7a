//! Progress reporting and cooperative cancellation for indexing runs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives `(processed, total)` after every file of an indexing run.
///
/// Called synchronously on the update thread. `processed` never decreases
/// within a run and the last call of a completed run has `processed == total`.
pub trait ProgressObserver {
    fn on_progress(&self, processed: usize, total: usize);
}

impl<F> ProgressObserver for F
where
    F: Fn(usize, usize),
{
    fn on_progress(&self, processed: usize, total: usize) {
        self(processed, total)
    }
}

/// Observer that ignores every update
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _processed: usize, _total: usize) {}
}

/// Shared request to stop a run between two files
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_closure_is_an_observer() {
        let calls = RefCell::new(Vec::new());
        let observer =
            |processed: usize, total: usize| calls.borrow_mut().push((processed, total));

        observer.on_progress(1, 3);
        observer.on_progress(2, 3);
        assert_eq!(*calls.borrow(), vec![(1, 3), (2, 3)]);
    }

    #[test]
    fn test_stop_flag_is_shared_between_clones() {
        let flag = StopFlag::new();
        let handle = flag.clone();
        assert!(!flag.is_stop_requested());

        handle.request_stop();
        assert!(flag.is_stop_requested());
        assert!(handle.is_stop_requested());
    }
}
