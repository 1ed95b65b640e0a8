//! Pipeline stages for turning parser results into slides.
//!
//! Each submodule implements one transformation step and is testable on
//! its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ result ──▶ normalize ──▶ font ──▶ watermark ──▶ render
//! (path/URL)  (zip/json)  (slide pt)   (size)   (2 passes)   (shapes)
//! ```
//!
//! 1. [`input`]     resolve paths, cache roots and URLs to page sources and
//!    load each one
//! 2. [`result`]    read a page's content list, layout and images
//! 3. [`normalize`] map element boxes into slide points, reconciling
//!    mismatched coordinate spaces
//! 4. [`font`]      estimate a font size per element category
//! 5. [`watermark`] collect cross-page statistics, then decide
//! 6. [`render`]    emit text boxes, pictures and tables
//!
//! [`cleanup`] (invisible characters, LaTeX fragments) and [`table`]
//! (HTML table markup) are used by `render`.

pub mod cleanup;
pub mod font;
pub mod input;
pub mod normalize;
pub mod render;
pub mod result;
pub mod table;
pub mod watermark;
