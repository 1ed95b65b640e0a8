//! PresentationML serialisation of a composed [`OutputDocument`].
//!
//! [`OutputDocument`]: crate::output::OutputDocument

pub mod writer;

pub use writer::{write_pptx, PptxWriter};

/// Package-level constants.
pub mod constants {
    /// EMU per point.
    pub const EMU_PER_POINT: f64 = 12_700.0;

    /// Hundredths of a point per point (font sizes).
    pub const FONT_UNITS_PER_POINT: u32 = 100;

    pub const NS_PRESENTATION: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
    pub const NS_DRAWING: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
    pub const NS_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
    pub const NS_PACKAGE_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships";
    pub const NS_TABLE: &str = "http://schemas.openxmlformats.org/drawingml/2006/table";

    pub const REL_TYPE_SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
    pub const REL_TYPE_SLIDE_LAYOUT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
    pub const REL_TYPE_SLIDE_MASTER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
    pub const REL_TYPE_THEME: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
    pub const REL_TYPE_IMAGE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

    /// Typeface used for monospace text blocks.
    pub const MONOSPACE_FACE: &str = "Consolas";
}
