//! Progress-callback trait for per-input batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ExtractorConfigBuilder::progress_callback`] to receive
//! events as the batch orchestrator works through its inputs.
//!
//! # Example
//!
//! ```rust
//! use edgequake_doc2llm::{BatchProgressCallback, ExtractorConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_input_complete(&self, index: usize, total: usize, processor: &str) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("[{}/{}] done by {}", index + 1, total, processor);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ExtractorConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch orchestrator as it processes each input.
///
/// All methods have default no-op implementations. With `concurrency > 1`
/// the per-input methods may be called from several tasks at once, so
/// shared state needs `Mutex` / atomics.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first input is attempted.
    fn on_batch_start(&self, total_inputs: usize) {
        let _ = total_inputs;
    }

    /// Called just before an input is classified and dispatched.
    ///
    /// `index` is 0-based.
    fn on_input_start(&self, index: usize, total_inputs: usize, input: &str) {
        let _ = (index, total_inputs, input);
    }

    /// Called when an input converted successfully.
    fn on_input_complete(&self, index: usize, total_inputs: usize, processor: &str) {
        let _ = (index, total_inputs, processor);
    }

    /// Called when an input failed.
    fn on_input_error(&self, index: usize, total_inputs: usize, error: &str) {
        let _ = (index, total_inputs, error);
    }

    /// Called once after every input has been attempted.
    fn on_batch_complete(&self, total_inputs: usize, success_count: usize) {
        let _ = (total_inputs, success_count);
    }
}

/// A no-op implementation, the default when no callback is configured.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractorConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        started_total: AtomicUsize,
        completed_total: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total_inputs: usize) {
            self.started_total.store(total_inputs, Ordering::SeqCst);
        }

        fn on_input_start(&self, _index: usize, _total: usize, _input: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_input_complete(&self, _index: usize, _total: usize, _processor: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_input_error(&self, _index: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total: usize, success_count: usize) {
            self.completed_total.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(3);
        cb.on_input_start(0, 3, "a.pdf");
        cb.on_input_complete(0, 3, "AcceleratedProcessor");
        cb.on_input_error(1, 3, "File not found");
        cb.on_batch_complete(3, 2);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_batch_start(3);
        tracker.on_input_start(0, 3, "a");
        tracker.on_input_complete(0, 3, "TextConverter");
        tracker.on_input_start(1, 3, "b");
        tracker.on_input_error(1, 3, "boom");
        tracker.on_input_start(2, 3, "c");
        tracker.on_input_complete(2, 3, "TextConverter");
        tracker.on_batch_complete(3, 2);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completed_total.load(Ordering::SeqCst), 2);
    }
}
