//! # pdf2pptx
//!
//! Rebuild editable PowerPoint decks from document-parser results.
//!
//! ## What it does
//!
//! A layout-analysis service turns each page of a PDF into structured data:
//! a *content list* (typed elements with bounding boxes) plus a *layout*
//! result (page size, caption boxes) and the extracted images. This crate
//! turns those per-page results into a deck with one slide per page, where
//! every element becomes a native, editable object: text boxes, pictures
//! and tables.
//!
//! ## Pipeline Overview
//!
//! ```text
//! page results (dir / zip / URL)
//!  │
//!  ├─ 1. Input      resolve sources, load and parse each page concurrently
//!  ├─ 2. Normalize  map boxes into slide points, fix coordinate mismatches
//!  ├─ 3. Font       estimate a font size per element
//!  ├─ 4. Watermark  cross-page stats pass, then per-element verdict
//!  ├─ 5. Render     text boxes, pictures, tables (with fallbacks), lists
//!  └─ 6. Output     OutputDocument → .pptx package
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2pptx::{convert_to_file, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let report = convert_to_file(&["results/"], "deck.pptx", &config).await?;
//!     eprintln!("{} slides, {} diagnostics", report.slides, report.diagnostics.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2pptx` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2pptx = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod compose;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod pptx;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use compose::{compose, AssemblerState, DocumentAssembler};
pub use config::{
    ConversionConfig, ConversionConfigBuilder, CoordinateConfig, FontConfig, FontRange,
    WatermarkConfig,
};
pub use convert::{convert, convert_sync, convert_to_bytes, convert_to_file};
pub use error::{Diagnostic, PageError, Pdf2PptxError};
pub use model::{
    BBox, Caption, ContentElement, ContentListResult, CoordSpace, ElementKind, LayoutRegion,
    LayoutResult, ListItem, PageResult, Payload, Size,
};
pub use output::{ComposeStats, ConversionReport, OutputDocument, Rect, Shape, Slide};
pub use pptx::{write_pptx, PptxWriter};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
