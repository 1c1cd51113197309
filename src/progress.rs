//! Progress-callback trait for per-page sweep events.
//!
//! Inject an [`Arc<dyn RedactionProgressCallback>`] via
//! [`crate::config::RedactionConfigBuilder::progress_callback`] to receive
//! events as the sweep walks the document.
//!
//! Pages are processed strictly one after another, so events for page N+1
//! never arrive before page N has completed or failed. The trait is still
//! `Send + Sync` because the sweep runs on a blocking worker thread, not on
//! the caller's thread.
//!
//! # Example
//!
//! ```rust
//! use pdf_face_redact::{RedactionProgressCallback, RedactionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FaceCounter {
//!     faces: AtomicUsize,
//! }
//!
//! impl RedactionProgressCallback for FaceCounter {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, faces: usize) {
//!         self.faces.fetch_add(faces, Ordering::SeqCst);
//!         eprintln!("Page {}/{}: {} faces", page_num, total_pages, faces);
//!     }
//! }
//!
//! let counter = Arc::new(FaceCounter { faces: AtomicUsize::new(0) });
//!
//! let config = RedactionConfig::builder()
//!     .progress_callback(counter as Arc<dyn RedactionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the page sweep as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait RedactionProgressCallback: Send + Sync {
    /// Called once before the first page is rasterised.
    fn on_sweep_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called immediately before a page enters rasterisation.
    ///
    /// `page_num` is 1-indexed; `total_pages` is the number of selected pages.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page reaches `Done`. `faces` is the number of
    /// detections that went into the page's marker (0 means no marker).
    fn on_page_complete(&self, page_num: usize, total_pages: usize, faces: usize) {
        let _ = (page_num, total_pages, faces);
    }

    /// Called when a page fails. The sweep stops after this event.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every selected page reached `Done`.
    ///
    /// Not called when the sweep aborts.
    fn on_sweep_complete(&self, total_pages: usize, markers_committed: usize, faces: usize) {
        let _ = (total_pages, markers_committed, faces);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RedactionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RedactionConfig`].
pub type ProgressCallback = Arc<dyn RedactionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        faces: AtomicUsize,
    }

    impl RedactionProgressCallback for TrackingCallback {
        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page_num: usize, _total_pages: usize, faces: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            self.faces.fetch_add(faces, Ordering::SeqCst);
        }

        fn on_page_error(&self, _page_num: usize, _total_pages: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_sweep_start(5);
        cb.on_page_start(1, 5);
        cb.on_page_complete(1, 5, 3);
        cb.on_page_error(2, 5, "render failed");
        cb.on_sweep_complete(5, 1, 3);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_page_start(1, 3);
        tracker.on_page_complete(1, 3, 4);
        tracker.on_page_start(2, 3);
        tracker.on_page_complete(2, 3, 0);
        tracker.on_page_start(3, 3);
        tracker.on_page_error(3, 3, "detector crashed");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.faces.load(Ordering::SeqCst), 4);
    }
}
