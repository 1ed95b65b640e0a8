//! Configuration types for deck reconstruction.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`] or loaded from a TOML file. The layout
//! pipeline never owns configuration; it borrows it read-only for the
//! duration of a compose run.

use crate::error::Pdf2PptxError;
use crate::model::Size;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Points per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// Configuration for a conversion run.
///
/// # Example
/// ```rust
/// use pdf2pptx::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .slide_size_inches(13.333, 7.5)
///     .watermark_threshold(0.6)
///     .watermark_keywords(["draft", "confidential"])
///     .build()
///     .unwrap();
/// assert_eq!(config.slide_height_in, 7.5);
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Slide width in inches. Default: 16.
    pub slide_width_in: f64,

    /// Slide height in inches. Default: 9.
    pub slide_height_in: f64,

    /// Drop repeated overlay text (watermarks). Default: true.
    pub remove_watermark: bool,

    pub watermark: WatermarkConfig,

    pub fonts: FontConfig,

    pub coordinates: CoordinateConfig,

    /// LaTeX command → replacement, applied in order.
    pub latex_substitutions: Vec<(String, String)>,

    /// Indentation per list nesting level, in points. Default: 18.
    pub list_indent_pt: f64,

    /// Insert a notice slide for pages whose result failed to load, instead
    /// of omitting them. Default: false.
    pub placeholder_for_failed_pages: bool,

    /// Page results loaded concurrently. Default: 8.
    pub concurrency: usize,

    /// Timeout for result archives fetched by URL, in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives per-page events while composing.
    #[serde(skip)]
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            slide_width_in: 16.0,
            slide_height_in: 9.0,
            remove_watermark: true,
            watermark: WatermarkConfig::default(),
            fonts: FontConfig::default(),
            coordinates: CoordinateConfig::default(),
            latex_substitutions: default_latex_substitutions(),
            list_indent_pt: 18.0,
            placeholder_for_failed_pages: false,
            concurrency: 8,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("slide_width_in", &self.slide_width_in)
            .field("slide_height_in", &self.slide_height_in)
            .field("remove_watermark", &self.remove_watermark)
            .field("watermark", &self.watermark)
            .field("fonts", &self.fonts)
            .field("coordinates", &self.coordinates)
            .field("latex_substitutions", &self.latex_substitutions.len())
            .field("list_indent_pt", &self.list_indent_pt)
            .field("placeholder_for_failed_pages", &self.placeholder_for_failed_pages)
            .field("concurrency", &self.concurrency)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Continue building from an existing configuration (e.g. one loaded
    /// from TOML) so that later setters override it.
    pub fn into_builder(self) -> ConversionConfigBuilder {
        ConversionConfigBuilder { config: self }
    }

    /// Slide dimensions in points.
    pub fn slide_size_pt(&self) -> Size {
        Size::new(
            self.slide_width_in * POINTS_PER_INCH,
            self.slide_height_in * POINTS_PER_INCH,
        )
    }

    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, Pdf2PptxError> {
        let config: ConversionConfig = toml::from_str(s).map_err(|e| Pdf2PptxError::ConfigFile {
            path: "<inline>".into(),
            detail: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, Pdf2PptxError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Pdf2PptxError::ConfigFile {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let config: ConversionConfig =
            toml::from_str(&text).map_err(|e| Pdf2PptxError::ConfigFile {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), Pdf2PptxError> {
        if !Size::new(self.slide_width_in, self.slide_height_in).is_usable() {
            return Err(Pdf2PptxError::InvalidConfig(format!(
                "slide size must be positive, got {}x{} in",
                self.slide_width_in, self.slide_height_in
            )));
        }
        let w = &self.watermark;
        if !(w.page_fraction > 0.0 && w.page_fraction <= 1.0) {
            return Err(Pdf2PptxError::InvalidConfig(format!(
                "watermark page fraction must be in (0, 1], got {}",
                w.page_fraction
            )));
        }
        if w.position_tolerance < 0.0 || w.keyword_tolerance_factor < 1.0 {
            return Err(Pdf2PptxError::InvalidConfig(
                "watermark tolerance must be ≥ 0 and keyword factor ≥ 1".into(),
            ));
        }
        for (name, range) in [
            ("general", self.fonts.general),
            ("title", self.fonts.title),
            ("list", self.fonts.list),
            ("table", self.fonts.table),
        ] {
            if range.min == 0 || range.min > range.max {
                return Err(Pdf2PptxError::InvalidConfig(format!(
                    "font range '{name}' is invalid: {}–{}",
                    range.min, range.max
                )));
            }
        }
        for (name, size) in [("footer", self.fonts.footer), ("caption", self.fonts.caption)] {
            if size == 0 {
                return Err(Pdf2PptxError::InvalidConfig(format!(
                    "{name} font size must be ≥ 1"
                )));
            }
        }
        let c = &self.coordinates;
        if !c.default_page_size.is_usable() {
            return Err(Pdf2PptxError::InvalidConfig(
                "default page size must be positive".into(),
            ));
        }
        if !(0.0..1.0).contains(&c.min_size_fraction) {
            return Err(Pdf2PptxError::InvalidConfig(format!(
                "minimum size fraction must be in [0, 1), got {}",
                c.min_size_fraction
            )));
        }
        if !(c.mismatch_tolerance >= 0.0 && c.mismatch_tolerance.is_finite()) {
            return Err(Pdf2PptxError::InvalidConfig(format!(
                "mismatch tolerance must be ≥ 0, got {}",
                c.mismatch_tolerance
            )));
        }
        if self.concurrency == 0 {
            return Err(Pdf2PptxError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        Ok(())
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn slide_size_inches(mut self, width: f64, height: f64) -> Self {
        // PowerPoint caps slides at 56 inches per side.
        self.config.slide_width_in = width.clamp(1.0, 56.0);
        self.config.slide_height_in = height.clamp(1.0, 56.0);
        self
    }

    pub fn remove_watermark(mut self, v: bool) -> Self {
        self.config.remove_watermark = v;
        self
    }

    pub fn watermark_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.watermark.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn watermark_threshold(mut self, fraction: f64) -> Self {
        self.config.watermark.page_fraction = fraction.clamp(0.01, 1.0);
        self
    }

    pub fn watermark_min_pages(mut self, pages: usize) -> Self {
        self.config.watermark.min_pages = pages.max(1);
        self
    }

    pub fn watermark_position_tolerance(mut self, tolerance: f64) -> Self {
        self.config.watermark.position_tolerance = tolerance.max(0.0);
        self
    }

    pub fn fonts(mut self, fonts: FontConfig) -> Self {
        self.config.fonts = fonts;
        self
    }

    pub fn font_face(mut self, face: impl Into<String>) -> Self {
        self.config.fonts.font_face = face.into();
        self
    }

    pub fn default_page_size(mut self, size: Size) -> Self {
        self.config.coordinates.default_page_size = size;
        self
    }

    pub fn mismatch_tolerance(mut self, tolerance: f64) -> Self {
        self.config.coordinates.mismatch_tolerance = tolerance.max(0.0);
        self
    }

    pub fn content_grid(mut self, grid: Option<Size>) -> Self {
        self.config.coordinates.content_grid = grid;
        self
    }

    pub fn latex_substitutions(mut self, table: Vec<(String, String)>) -> Self {
        self.config.latex_substitutions = table;
        self
    }

    pub fn list_indent_pt(mut self, pt: f64) -> Self {
        self.config.list_indent_pt = pt.max(0.0);
        self
    }

    pub fn placeholder_for_failed_pages(mut self, v: bool) -> Self {
        self.config.placeholder_for_failed_pages = v;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2PptxError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Nested sections ──────────────────────────────────────────────────────

/// Repeated-overlay detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    /// Case-insensitive substrings that mark likely overlays. A hit widens
    /// the position tolerance; it is never sufficient on its own.
    pub keywords: Vec<String>,
    /// Fraction of pages an overlay must appear on. Default: 0.5.
    pub page_fraction: f64,
    /// Absolute floor on the number of pages. Default: 2.
    pub min_pages: usize,
    /// Max per-coordinate drift, relative to the slide. Default: 0.02.
    pub position_tolerance: f64,
    /// Tolerance multiplier applied on a keyword hit. Default: 2.
    pub keyword_tolerance_factor: f64,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            keywords: vec![
                "notebooklm".into(),
                "notebook lm".into(),
                "confidential".into(),
            ],
            page_fraction: 0.5,
            min_pages: 2,
            position_tolerance: 0.02,
            keyword_tolerance_factor: 2.0,
        }
    }
}

/// Inclusive point-size range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontRange {
    pub min: u32,
    pub max: u32,
}

impl FontRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, size: u32) -> u32 {
        size.clamp(self.min, self.max)
    }

    pub fn contains(&self, size: u32) -> bool {
        (self.min..=self.max).contains(&size)
    }
}

/// Area-based font estimation constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub general: FontRange,
    pub title: FontRange,
    pub list: FontRange,
    pub table: FontRange,
    /// Fixed size for footers that survive watermark filtering.
    pub footer: u32,
    /// Fixed size for captions.
    pub caption: u32,
    /// Size used when a box carries no characters.
    pub empty_text: u32,
    /// Average area of one character, as a multiple of size².
    pub char_area_factor: f64,
    /// Final shrink factor to avoid overflow.
    pub scale: f64,
    pub single_line_max_chars: usize,
    pub single_line_min_aspect: f64,
    pub single_line_height_ratio: f64,
    pub max_height_ratio: f64,
    pub table_cell_height_ratio: f64,
    /// Text this short is not word-wrapped.
    pub no_wrap_max_chars: usize,
    pub font_face: String,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            general: FontRange::new(10, 44),
            title: FontRange::new(20, 44),
            list: FontRange::new(10, 20),
            table: FontRange::new(10, 16),
            footer: 10,
            caption: 10,
            empty_text: 14,
            char_area_factor: 0.8,
            scale: 0.95,
            single_line_max_chars: 15,
            single_line_min_aspect: 2.0,
            single_line_height_ratio: 0.7,
            max_height_ratio: 0.9,
            table_cell_height_ratio: 0.6,
            no_wrap_max_chars: 6,
            font_face: "Microsoft YaHei".into(),
        }
    }
}

/// Coordinate reconciliation between the layout and content-list documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateConfig {
    /// Used when the layout declares no usable page size.
    pub default_page_size: Size,
    /// Relative disagreement tolerated before correcting. Default: 0.05.
    pub mismatch_tolerance: f64,
    /// Fixed grid the content list is expressed in (e.g. 1000×1000), if the
    /// parser normalises its coordinates. `None` infers from box extents.
    pub content_grid: Option<Size>,
    /// Minimum element size as a fraction of the slide. Default: 0.01.
    pub min_size_fraction: f64,
}

impl Default for CoordinateConfig {
    fn default() -> Self {
        Self {
            default_page_size: Size::new(1000.0, 1000.0),
            mismatch_tolerance: 0.05,
            content_grid: None,
            min_size_fraction: 0.01,
        }
    }
}

/// Built-in LaTeX command table.
pub fn default_latex_substitutions() -> Vec<(String, String)> {
    [
        (r"\circ", "°"),
        (r"\degree", "°"),
        (r"\times", "×"),
        (r"\div", "÷"),
        (r"\pm", "±"),
        (r"\leq", "≤"),
        (r"\geq", "≥"),
        (r"\neq", "≠"),
        (r"\approx", "≈"),
        (r"\sim", "~"),
        (r"\cdot", "·"),
        (r"\cdots", "⋯"),
        (r"\ldots", "…"),
        (r"\dots", "…"),
        (r"\infty", "∞"),
        (r"\alpha", "α"),
        (r"\beta", "β"),
        (r"\mu", "μ"),
        (r"\rightarrow", "→"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
