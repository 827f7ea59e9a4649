//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn RosterProgressCallback>`] via
//! [`crate::config::RosterConfigBuilder::progress_callback`] to be told as
//! each page of the roster is read and assembled.
//!
//! # Why callbacks instead of channels?
//!
//! The host decides how to surface progress (terminal bar, log line, UI
//! event) without the library knowing. Callbacks fire from whichever task
//! drives the conversion, so implementations must be `Send + Sync`.
//!
//! # Example
//!
//! ```rust
//! use pharmacy_roster::{RosterProgressCallback, RosterConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct RecordCounter {
//!     records: AtomicUsize,
//! }
//!
//! impl RosterProgressCallback for RecordCounter {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, record_count: usize) {
//!         self.records.fetch_add(record_count, Ordering::SeqCst);
//!         eprintln!("Page {}/{}: {} records", page_num, total_pages, record_count);
//!     }
//! }
//!
//! let counter = Arc::new(RecordCounter { records: AtomicUsize::new(0) });
//!
//! let config = RosterConfig::builder()
//!     .progress_callback(counter as Arc<dyn RosterProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it processes each page.
///
/// All methods have default no-op implementations so callers only
/// override what they care about.
pub trait RosterProgressCallback: Send + Sync {
    /// Called once before the first page is read.
    ///
    /// # Arguments
    /// * `total_pages` — number of selected pages that will be processed
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when a page's tokens have arrived and assembly begins.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page has been assembled.
    ///
    /// # Arguments
    /// * `page_num`     — 1-indexed page number
    /// * `total_pages`  — selected pages
    /// * `record_count` — rows found on this page (may be zero)
    fn on_page_complete(&self, page_num: usize, total_pages: usize, record_count: usize) {
        let _ = (page_num, total_pages, record_count);
    }

    /// Called once after the last page.
    fn on_extraction_complete(&self, total_pages: usize, total_records: usize) {
        let _ = (total_pages, total_records);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RosterProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RosterConfig`].
pub type ProgressCallback = Arc<dyn RosterProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        starts: AtomicUsize,
        records: AtomicUsize,
        finished_records: AtomicUsize,
    }

    impl RosterProgressCallback for TrackingCallback {
        fn on_extraction_start(&self, total_pages: usize) {
            self.started_total.store(total_pages, Ordering::SeqCst);
        }

        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page_num: usize, _total_pages: usize, record_count: usize) {
            self.records.fetch_add(record_count, Ordering::SeqCst);
        }

        fn on_extraction_complete(&self, _total_pages: usize, total_records: usize) {
            self.finished_records.store(total_records, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_extraction_start(5);
        cb.on_page_start(1, 5);
        cb.on_page_complete(1, 5, 42);
        cb.on_extraction_complete(5, 42);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_extraction_start(2);
        tracker.on_page_start(1, 2);
        tracker.on_page_complete(1, 2, 30);
        tracker.on_page_start(2, 2);
        tracker.on_page_complete(2, 2, 0);
        tracker.on_extraction_complete(2, 30);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.records.load(Ordering::SeqCst), 30);
        assert_eq!(tracker.finished_records.load(Ordering::SeqCst), 30);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_extraction_start(10);
        cb.on_page_complete(1, 10, 12);
    }
}
