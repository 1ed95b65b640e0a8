//! Input data model: what the document parser reports for each page.
//!
//! A page arrives as two parallel documents, the layout description
//! ([`LayoutResult`]) and the flat content list ([`ContentListResult`]), plus
//! the image files the content list refers to. Everything here is read-only
//! once parsed; derived geometry lives in [`crate::output`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Width/height pair. Units depend on context (source pixels, points).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both dimensions finite and strictly positive.
    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Axis-aligned box `[x1, y1, x2, y2]` in source coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BBox {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build from a raw coordinate slice; `None` unless exactly four values.
    pub fn from_slice(coords: &[f64]) -> Option<Self> {
        match coords {
            [x1, y1, x2, y2] => Some(Self::new(*x1, *y1, *x2, *y2)),
            _ => None,
        }
    }

    /// `x1 < x2` and `y1 < y2` with all coordinates finite.
    pub fn is_valid(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
            && self.x1 < self.x2
            && self.y1 < self.y2
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.x1, self.y1, self.x2, self.y2)
    }
}

/// Which of the two result documents a box was reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordSpace {
    /// Content-list coordinates; subject to mismatch correction.
    #[default]
    ContentList,
    /// Layout coordinates; already in the page's declared space.
    Layout,
}

/// The closed set of element categories reported by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Title,
    Text,
    Image,
    Table,
    List,
    Footer,
}

impl ElementKind {
    /// Map a parser `type` tag onto a category.
    ///
    /// `text_level >= 1` promotes plain text to a title.
    pub fn from_tag(tag: &str, text_level: Option<u8>) -> Option<Self> {
        let kind = match tag {
            "title" => ElementKind::Title,
            "text" if text_level.is_some_and(|l| l >= 1) => ElementKind::Title,
            "text" | "equation" | "aside_text" | "page_footnote" => ElementKind::Text,
            "footer" | "header" | "page_number" => ElementKind::Footer,
            "image" => ElementKind::Image,
            "table" => ElementKind::Table,
            "list" => ElementKind::List,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Title => "title",
            ElementKind::Text => "text",
            ElementKind::Image => "image",
            ElementKind::Table => "table",
            ElementKind::List => "list",
            ElementKind::Footer => "footer",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One list entry with its nesting depth (0 = top level).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub text: String,
    pub level: u8,
    pub ordered: bool,
}

/// Category-specific payload of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Text {
        text: String,
    },
    Image {
        /// File name inside the result's `images/` folder.
        image_ref: String,
    },
    Table {
        /// HTML table markup, if the parser produced any.
        markup: Option<String>,
        /// Rendered table picture used as a fallback.
        image_ref: Option<String>,
        /// Plain-text rendition used as the last fallback.
        text: Option<String>,
        /// Caption lines shown beneath the table.
        caption: Vec<String>,
    },
    List {
        items: Vec<ListItem>,
    },
}

impl Payload {
    /// Textual content, if this payload carries any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Payload::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Text { text } => text.trim().is_empty(),
            Payload::Image { image_ref } => image_ref.trim().is_empty(),
            Payload::Table {
                markup,
                image_ref,
                text,
                ..
            } => markup.is_none() && image_ref.is_none() && text.is_none(),
            Payload::List { items } => items.iter().all(|i| i.text.trim().is_empty()),
        }
    }
}

/// A caption attached to an image element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub text: String,
    pub bbox: Option<BBox>,
    #[serde(default)]
    pub space: CoordSpace,
}

/// One positioned element from the content list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentElement {
    pub kind: ElementKind,
    pub bbox: BBox,
    pub payload: Payload,
    pub caption: Option<Caption>,
    /// Heading or list level reported by the parser.
    pub level: Option<u8>,
    #[serde(default)]
    pub space: CoordSpace,
}

impl ContentElement {
    pub fn new(kind: ElementKind, bbox: BBox, payload: Payload) -> Self {
        Self {
            kind,
            bbox,
            payload,
            caption: None,
            level: None,
            space: CoordSpace::ContentList,
        }
    }

    /// Shorthand for a text-bearing element.
    pub fn text(kind: ElementKind, bbox: BBox, text: impl Into<String>) -> Self {
        Self::new(kind, bbox, Payload::Text { text: text.into() })
    }

    pub fn with_caption(mut self, caption: Caption) -> Self {
        self.caption = Some(caption);
        self
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = Some(level);
        self
    }
}

/// A coarse region from the layout description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutRegion {
    pub kind: String,
    pub bbox: Option<BBox>,
}

/// The page-level layout description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    /// Page dimensions as declared by the layout document.
    pub page_size: Option<Size>,
    pub regions: Vec<LayoutRegion>,
}

impl LayoutResult {
    /// Max `x2`/`y2` over every region with a valid box.
    pub fn extent(&self) -> Option<Size> {
        let mut extent: Option<Size> = None;
        for bbox in self.regions.iter().filter_map(|r| r.bbox) {
            if !bbox.is_valid() {
                continue;
            }
            let e = extent.get_or_insert(Size::new(0.0, 0.0));
            e.width = e.width.max(bbox.x2);
            e.height = e.height.max(bbox.y2);
        }
        extent.filter(Size::is_usable)
    }
}

/// The flat, ordered element list of a page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentListResult {
    /// Raw entries in reported order. An entry is `Err` when it could not be
    /// turned into a [`ContentElement`]; its position is kept so diagnostics
    /// can point at it.
    pub elements: Vec<Result<ContentElement, String>>,
    /// Coordinate extent the list was expressed in, when known.
    pub declared_size: Option<Size>,
}

impl ContentListResult {
    pub fn new(elements: Vec<ContentElement>) -> Self {
        Self {
            elements: elements.into_iter().map(Ok).collect(),
            declared_size: None,
        }
    }

    /// Max `x2`/`y2` over every valid content-list box.
    pub fn extent(&self) -> Option<Size> {
        let mut extent: Option<Size> = None;
        for el in self.elements.iter().flatten() {
            if el.space != CoordSpace::ContentList || !el.bbox.is_valid() {
                continue;
            }
            let e = extent.get_or_insert(Size::new(0.0, 0.0));
            e.width = e.width.max(el.bbox.x2);
            e.height = e.height.max(el.bbox.y2);
        }
        extent.filter(Size::is_usable)
    }
}

/// Everything the parser returned for one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
    /// 0-based page index in the source document.
    pub index: usize,
    pub layout: LayoutResult,
    pub content: ContentListResult,
    /// Image bytes keyed by file name.
    pub images: HashMap<String, Vec<u8>>,
}

impl PageResult {
    pub fn new(index: usize, layout: LayoutResult, content: ContentListResult) -> Self {
        Self {
            index,
            layout,
            content,
            images: HashMap::new(),
        }
    }

    pub fn with_image(mut self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.images.insert(name.into(), bytes);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_validity() {
        assert!(BBox::new(0.0, 0.0, 10.0, 5.0).is_valid());
        assert!(!BBox::new(0.0, 0.0, -1.0, 5.0).is_valid());
        assert!(!BBox::new(0.0, 5.0, 10.0, 5.0).is_valid());
        assert!(!BBox::new(f64::NAN, 0.0, 10.0, 5.0).is_valid());
    }

    #[test]
    fn bbox_from_slice_requires_four() {
        assert!(BBox::from_slice(&[1.0, 2.0, 3.0]).is_none());
        assert_eq!(
            BBox::from_slice(&[1.0, 2.0, 3.0, 4.0]),
            Some(BBox::new(1.0, 2.0, 3.0, 4.0))
        );
    }

    #[test]
    fn kind_from_tag() {
        assert_eq!(ElementKind::from_tag("text", None), Some(ElementKind::Text));
        assert_eq!(ElementKind::from_tag("text", Some(1)), Some(ElementKind::Title));
        assert_eq!(ElementKind::from_tag("text", Some(0)), Some(ElementKind::Text));
        assert_eq!(ElementKind::from_tag("page_number", None), Some(ElementKind::Footer));
        assert_eq!(ElementKind::from_tag("equation", None), Some(ElementKind::Text));
        assert_eq!(ElementKind::from_tag("chart", None), None);
    }

    #[test]
    fn extent_ignores_layout_space_and_invalid_boxes() {
        let mut caption_like = ContentElement::text(
            ElementKind::Text,
            BBox::new(0.0, 0.0, 5000.0, 5000.0),
            "from layout",
        );
        caption_like.space = CoordSpace::Layout;
        let content = ContentListResult::new(vec![
            ContentElement::text(ElementKind::Text, BBox::new(10.0, 10.0, 900.0, 400.0), "a"),
            ContentElement::text(ElementKind::Text, BBox::new(0.0, 0.0, -1.0, 5.0), "bad"),
            caption_like,
        ]);
        assert_eq!(content.extent(), Some(Size::new(900.0, 400.0)));
    }

    #[test]
    fn layout_extent_skips_regions_without_boxes() {
        let layout = LayoutResult {
            page_size: None,
            regions: vec![
                LayoutRegion { kind: "text".into(), bbox: Some(BBox::new(10.0, 10.0, 300.0, 120.0)) },
                LayoutRegion { kind: "image".into(), bbox: None },
                LayoutRegion { kind: "table".into(), bbox: Some(BBox::new(50.0, 200.0, 250.0, 640.0)) },
            ],
        };
        assert_eq!(layout.extent(), Some(Size::new(300.0, 640.0)));
        assert_eq!(LayoutResult::default().extent(), None);
    }
}
