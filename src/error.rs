//! Error types for the pdf2pptx library.
//!
//! Three layers reflect three distinct failure modes:
//!
//! * [`Pdf2PptxError`], **fatal**: the conversion cannot proceed at all
//!   (source not found, bad configuration, every page unusable, output not
//!   writable). Returned as `Err(Pdf2PptxError)` from the top-level
//!   `convert*` functions.
//!
//! * [`PageError`], **page-fatal**: the result for one page is missing or
//!   cannot be parsed as structured data. That page is omitted from the
//!   deck; the rest of the document is still composed.
//!
//! * [`Diagnostic`], **recovered**: a malformed element, a degraded page or
//!   a coordinate mismatch was handled locally. Diagnostics accumulate on
//!   [`crate::output::OutputDocument`] and never abort composition.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2pptx library.
#[derive(Debug, Error)]
pub enum Pdf2PptxError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Source path does not exist.
    #[error("Result source not found: '{path}'\nCheck the path exists and is readable.")]
    SourceNotFound { path: PathBuf },

    /// Process does not have read permission on the source.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is neither a path nor an HTTP(S) URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// No page sources were given (or a cache root held no pages).
    #[error("No page results to convert")]
    NoPages,

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// Every page failed to load; the deck would be empty.
    #[error("All {total} page results failed to load.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The presentation package could not be produced.
    #[error("Failed to serialise presentation: {0}")]
    Serialize(String),

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A TOML configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {detail}")]
    ConfigFile { path: PathBuf, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<zip::result::ZipError> for Pdf2PptxError {
    fn from(e: zip::result::ZipError) -> Self {
        Pdf2PptxError::Serialize(e.to_string())
    }
}

/// A page whose result could not be turned into structured data.
///
/// Pages are 1-indexed in messages.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
pub enum PageError {
    /// No result exists for the page (upload/poll failed upstream).
    #[error("Page {page}: result missing: {detail}")]
    Missing { page: usize, detail: String },

    /// The result exists but is not a readable archive or JSON document.
    #[error("Page {page}: result unparseable: {detail}")]
    Unparseable { page: usize, detail: String },

    /// The archive was read but holds no content list.
    #[error("Page {page}: no content list in result")]
    NoContentList { page: usize },
}

impl PageError {
    /// 1-indexed page number the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::Missing { page, .. }
            | PageError::Unparseable { page, .. }
            | PageError::NoContentList { page } => *page,
        }
    }
}

/// A recovered condition recorded while composing the deck.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// An element was skipped (bad bbox, empty payload, unknown category,
    /// missing image bytes, ...).
    MalformedElement {
        page: usize,
        element: usize,
        reason: String,
    },

    /// A table's markup could not be parsed; it was rendered through a
    /// fallback instead of a native table.
    TableFallback {
        page: usize,
        element: usize,
        reason: String,
    },

    /// Page dimensions were missing or zero; the default page size was used.
    DegradedPage { page: usize, reason: String },

    /// Layout and content-list coordinate systems disagreed; content-list
    /// boxes were rescaled by `(scale_x, scale_y)`.
    CoordinateMismatch {
        page: usize,
        scale_x: f64,
        scale_y: f64,
    },

    /// A page result could not be loaded; the page was omitted.
    FatalInput { page: usize, detail: String },
}

impl Diagnostic {
    /// 1-indexed page number the diagnostic belongs to.
    pub fn page(&self) -> usize {
        match self {
            Diagnostic::MalformedElement { page, .. }
            | Diagnostic::TableFallback { page, .. }
            | Diagnostic::DegradedPage { page, .. }
            | Diagnostic::CoordinateMismatch { page, .. }
            | Diagnostic::FatalInput { page, .. } => *page,
        }
    }

    pub(crate) fn malformed(page: usize, element: usize, reason: impl Into<String>) -> Self {
        Diagnostic::MalformedElement {
            page,
            element,
            reason: reason.into(),
        }
    }
}

impl From<&PageError> for Diagnostic {
    fn from(e: &PageError) -> Self {
        Diagnostic::FatalInput {
            page: e.page(),
            detail: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_pages_failed_display() {
        let e = Pdf2PptxError::AllPagesFailed {
            total: 4,
            first_error: "Page 1: no content list in result".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("All 4"), "got: {msg}");
        assert!(msg.contains("no content list"));
    }

    #[test]
    fn download_timeout_display() {
        let e = Pdf2PptxError::DownloadTimeout {
            url: "https://cdn.example.org/r.zip".into(),
            secs: 30,
        };
        assert!(e.to_string().contains("30s"));
    }

    #[test]
    fn page_error_reports_page() {
        let e = PageError::Unparseable {
            page: 7,
            detail: "expected value at line 1".into(),
        };
        assert_eq!(e.page(), 7);
        assert!(e.to_string().starts_with("Page 7"));
    }

    #[test]
    fn page_error_becomes_fatal_input_diagnostic() {
        let e = PageError::NoContentList { page: 3 };
        let d = Diagnostic::from(&e);
        assert_eq!(d.page(), 3);
        assert!(matches!(d, Diagnostic::FatalInput { .. }));
    }

    #[test]
    fn diagnostic_serialises_with_kind_tag() {
        let d = Diagnostic::DegradedPage {
            page: 2,
            reason: "page_size missing".into(),
        };
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains("\"kind\":\"degraded_page\""), "got: {json}");
    }
}
