//! Progress-callback trait for batch reading events.
//!
//! Inject an [`Arc<dyn ReadProgressCallback>`] via
//! [`crate::config::ReaderSettingsBuilder::progress_callback`] to hear about
//! each document as [`crate::reader::MystReader::process_all`] works through
//! a batch. Single-document calls to `process` do not fire events.
//!
//! # Example
//!
//! ```rust
//! use myst_reader::{ReadProgressCallback, ReaderSettings};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ReadProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, path: &Path, html_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{} done ({} bytes)", path.display(), html_len);
//!     }
//! }
//!
//! let settings = ReaderSettings::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the reader as it processes each document of a batch.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync` because a
/// reader may be shared between threads.
pub trait ReadProgressCallback: Send + Sync {
    /// Called once before the first document is read.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called just before a document is read.
    ///
    /// # Arguments
    /// * `path`: source path as given to the reader
    /// * `index`: 1-indexed position in the batch
    /// * `total`: batch size
    fn on_document_start(&self, path: &Path, index: usize, total: usize) {
        let _ = (path, index, total);
    }

    /// Called when a document produced a fragment.
    ///
    /// `html_len` is the byte length of the fragment.
    fn on_document_complete(&self, path: &Path, html_len: usize) {
        let _ = (path, html_len);
    }

    /// Called when a document failed. The batch carries on.
    fn on_document_error(&self, path: &Path, error: &str) {
        let _ = (path, error);
    }

    /// Called once after every document has been attempted.
    fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
        let _ = (total_documents, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ReadProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ReaderSettings`].
pub type ProgressCallback = Arc<dyn ReadProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: Mutex<Vec<String>>,
        batch_total: AtomicUsize,
        batch_success: AtomicUsize,
    }

    impl ReadProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total_documents: usize) {
            self.batch_total.store(total_documents, Ordering::SeqCst);
        }

        fn on_document_start(&self, _path: &Path, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _path: &Path, _html_len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_error(&self, path: &Path, error: &str) {
            self.errors
                .lock()
                .unwrap()
                .push(format!("{}: {error}", path.display()));
        }

        fn on_batch_complete(&self, _total_documents: usize, success_count: usize) {
            self.batch_success.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_document_start(Path::new("a.md"), 1, 2);
        cb.on_document_complete(Path::new("a.md"), 42);
        cb.on_document_error(Path::new("b.md"), "boom");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_batch_start(2);
        tracker.on_document_start(Path::new("a.md"), 1, 2);
        tracker.on_document_complete(Path::new("a.md"), 10);
        tracker.on_document_start(Path::new("b.md"), 2, 2);
        tracker.on_document_error(Path::new("b.md"), "Could not find end of metadata block.");
        tracker.on_batch_complete(2, 1);

        assert_eq!(tracker.batch_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(
            *tracker.errors.lock().unwrap(),
            vec!["b.md: Could not find end of metadata block.".to_string()]
        );
        assert_eq!(tracker.batch_success.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(1);
        cb.on_document_complete(Path::new("x.md"), 0);
    }
}
