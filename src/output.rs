//! Output types: normalised elements, slide shapes and the composed deck.

use crate::error::Diagnostic;
use crate::model::{ContentElement, ElementKind, Size};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rectangle in slide points, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// `[x1, y1, x2, y2]` as fractions of `slide`.
    pub fn relative_to(&self, slide: Size) -> [f64; 4] {
        [
            self.x / slide.width,
            self.y / slide.height,
            self.right() / slide.width,
            self.bottom() / slide.height,
        ]
    }

    /// Whether the rectangle lies inside `[0, slide]` on both axes.
    pub fn within(&self, slide: Size) -> bool {
        const EPS: f64 = 1e-6;
        self.x >= -EPS
            && self.y >= -EPS
            && self.right() <= slide.width + EPS
            && self.bottom() <= slide.height + EPS
    }
}

/// A content element re-expressed in slide coordinates with a resolved
/// font size. This is the unit every renderer consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedElement {
    /// Position of the element in the page's content list.
    pub index: usize,
    pub element: ContentElement,
    pub rect: Rect,
    /// Normalised caption box, when the caption carried its own bbox.
    pub caption_rect: Option<Rect>,
    pub font_size: u32,
}

impl NormalizedElement {
    pub fn kind(&self) -> ElementKind {
        self.element.kind
    }
}

/// Horizontal paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
}

/// One paragraph of a text box.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub text: String,
    pub size_pt: u32,
    pub bold: bool,
    pub italic: bool,
    pub monospace: bool,
    pub indent_pt: f64,
    pub align: Align,
}

impl Paragraph {
    pub fn plain(text: impl Into<String>, size_pt: u32) -> Self {
        Self {
            text: text.into(),
            size_pt,
            bold: false,
            italic: false,
            monospace: false,
            indent_pt: 0.0,
            align: Align::Left,
        }
    }
}

/// Free-floating text box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub rect: Rect,
    pub paragraphs: Vec<Paragraph>,
    pub wrap: bool,
    /// Category the box was rendered from (captions report `Text`).
    pub source: ElementKind,
}

impl TextBox {
    /// All paragraph texts joined by newlines.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Picture referencing an entry of [`OutputDocument::media`].
#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    pub rect: Rect,
    pub media: usize,
    pub description: String,
}

/// A table cell, always centred horizontally and vertically.
#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub text: String,
    pub size_pt: u32,
    pub bold: bool,
}

/// Native table shape. Rows may be ragged; the writer pads them.
#[derive(Debug, Clone, PartialEq)]
pub struct TableShape {
    pub rect: Rect,
    pub rows: Vec<Vec<TableCell>>,
}

impl TableShape {
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// A native slide object.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Text(TextBox),
    Picture(Picture),
    Table(TableShape),
}

impl Shape {
    pub fn rect(&self) -> Rect {
        match self {
            Shape::Text(t) => t.rect,
            Shape::Picture(p) => p.rect,
            Shape::Table(t) => t.rect,
        }
    }

    pub fn as_text(&self) -> Option<&TextBox> {
        match self {
            Shape::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&TableShape> {
        match self {
            Shape::Table(t) => Some(t),
            _ => None,
        }
    }
}

/// One output slide, corresponding to one source page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Slide {
    /// 0-based source page index.
    pub page_index: usize,
    pub shapes: Vec<Shape>,
    /// The page was composed with the fallback page size.
    pub degraded: bool,
    /// The page failed to load; the slide only carries a notice.
    pub placeholder: bool,
}

impl Slide {
    /// Every text box's text, in shape order.
    pub fn texts(&self) -> Vec<String> {
        self.shapes
            .iter()
            .filter_map(Shape::as_text)
            .map(TextBox::text)
            .collect()
    }
}

/// An embedded image file.
#[derive(Debug, Clone, PartialEq)]
pub struct Media {
    /// Part name under `ppt/media/`, e.g. `image3.png`.
    pub name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Counters collected while composing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeStats {
    pub total_pages: usize,
    pub composed_pages: usize,
    pub failed_pages: usize,
    pub degraded_pages: usize,
    pub elements_rendered: usize,
    pub elements_skipped: usize,
    pub watermarks_removed: usize,
    /// Rendered elements per category.
    pub by_kind: BTreeMap<String, usize>,
}

impl ComposeStats {
    pub(crate) fn count_rendered(&mut self, kind: ElementKind) {
        self.elements_rendered += 1;
        *self.by_kind.entry(kind.as_str().to_string()).or_default() += 1;
    }
}

/// The composed deck, handed to the serialiser.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDocument {
    /// Slide size in points.
    pub slide_size: Size,
    pub font_face: String,
    pub slides: Vec<Slide>,
    pub media: Vec<Media>,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: ComposeStats,
}

impl OutputDocument {
    pub(crate) fn new(slide_size: Size, font_face: impl Into<String>) -> Self {
        Self {
            slide_size,
            font_face: font_face.into(),
            slides: Vec::new(),
            media: Vec::new(),
            diagnostics: Vec::new(),
            stats: ComposeStats::default(),
        }
    }

    /// Register an image and return its media index.
    pub(crate) fn push_media(&mut self, extension: &str, content_type: &'static str, bytes: Vec<u8>) -> usize {
        let index = self.media.len();
        self.media.push(Media {
            name: format!("image{}.{}", index + 1, extension),
            content_type,
            bytes,
        });
        index
    }

    /// Stats and diagnostics, for JSON reporting.
    pub fn report(&self) -> ConversionReport {
        ConversionReport {
            slides: self.slides.len(),
            stats: self.stats.clone(),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

/// Serializable summary of a conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    pub slides: usize,
    pub stats: ComposeStats,
    pub diagnostics: Vec<Diagnostic>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_relative() {
        let r = Rect::new(100.0, 50.0, 200.0, 100.0);
        let rel = r.relative_to(Size::new(1000.0, 500.0));
        assert_eq!(rel, [0.1, 0.1, 0.3, 0.3]);
    }

    #[test]
    fn rect_within() {
        let slide = Size::new(100.0, 100.0);
        assert!(Rect::new(0.0, 0.0, 100.0, 100.0).within(slide));
        assert!(!Rect::new(50.0, 0.0, 60.0, 10.0).within(slide));
    }

    #[test]
    fn media_names_are_sequential() {
        let mut doc = OutputDocument::new(Size::new(720.0, 540.0), "Arial");
        assert_eq!(doc.push_media("png", "image/png", vec![1]), 0);
        assert_eq!(doc.push_media("jpeg", "image/jpeg", vec![2]), 1);
        assert_eq!(doc.media[1].name, "image2.jpeg");
    }

    #[test]
    fn table_column_count_uses_widest_row() {
        let cell = |t: &str| TableCell { text: t.into(), size_pt: 12, bold: false };
        let t = TableShape {
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            rows: vec![vec![cell("a")], vec![cell("b"), cell("c"), cell("d")]],
        };
        assert_eq!(t.column_count(), 3);
    }
}
