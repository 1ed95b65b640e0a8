//! Progress-callback trait for per-page composition events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the assembler loads and composes each page.
//!
//! # Example
//!
//! ```rust
//! use pdf2pptx::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     composed: Arc<AtomicUsize>,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_composed(&self, page_num: usize, total_pages: usize, shape_count: usize) {
//!         self.composed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Slide {}/{} ({} shapes)", page_num, total_pages, shape_count);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     composed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it processes each page.
///
/// Implementations must be `Send + Sync`: page results are loaded
/// concurrently. Composition itself runs on a single thread in page order.
/// All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before any page result is loaded.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when a page result has been loaded and parsed.
    ///
    /// * `page_num`      — 1-indexed page number
    /// * `element_count` — entries in the page's content list
    fn on_page_loaded(&self, page_num: usize, total_pages: usize, element_count: usize) {
        let _ = (page_num, total_pages, element_count);
    }

    /// Called when a page's slide has been composed.
    ///
    /// * `shape_count` — shapes placed on the slide
    fn on_page_composed(&self, page_num: usize, total_pages: usize, shape_count: usize) {
        let _ = (page_num, total_pages, shape_count);
    }

    /// Called when a page result failed to load and the page is omitted.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after the deck is finalised.
    ///
    /// * `slide_count` — slides in the finished deck
    fn on_conversion_complete(&self, total_pages: usize, slide_count: usize) {
        let _ = (total_pages, slide_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
