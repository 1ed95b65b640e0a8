//! Element renderers: one strategy per category.
//!
//! Each renderer takes a [`NormalizedElement`] and places native shapes on a
//! [`Canvas`]. Renderers never fail the page: an element that cannot be drawn
//! returns `Err(reason)` and the composer records it as malformed.
//!
//! | Category        | Shapes                                              |
//! |-----------------|-----------------------------------------------------|
//! | Title/Text      | one text box, one paragraph per line                |
//! | Footer          | one small fixed-size text box                       |
//! | Image           | picture, plus a caption text box when present       |
//! | Table           | native table → table picture → monospace text       |
//! | List            | one text box, one indented paragraph per item       |

use crate::config::ConversionConfig;
use crate::error::Diagnostic;
use crate::model::{ElementKind, Payload, Size};
use crate::output::{
    Align, NormalizedElement, OutputDocument, Paragraph, Picture, Rect, Shape, TableCell,
    TableShape, TextBox,
};
use crate::pipeline::cleanup::{clean_text, display_chars};
use crate::pipeline::font;
use crate::pipeline::table::parse_table;
use image::ImageFormat;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

/// Caption height, as a fraction of the slide height, when the caption has
/// no box of its own.
const CAPTION_HEIGHT_FRACTION: f64 = 0.05;

/// Read-only inputs shared by every renderer on a page.
pub struct RenderContext<'a> {
    pub config: &'a ConversionConfig,
    /// Image files of the page, keyed by file name.
    pub images: &'a HashMap<String, Vec<u8>>,
    /// 1-indexed page number.
    pub page: usize,
    pub slide: Size,
}

/// The slide under construction.
///
/// Shapes are collected locally; media and diagnostics go straight to the
/// document so indices stay global.
pub struct Canvas<'d> {
    pub shapes: Vec<Shape>,
    doc: &'d mut OutputDocument,
}

impl<'d> Canvas<'d> {
    pub fn new(doc: &'d mut OutputDocument) -> Self {
        Self {
            shapes: Vec::new(),
            doc,
        }
    }

    pub fn push(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    pub fn diagnose(&mut self, diagnostic: Diagnostic) {
        self.doc.diagnostics.push(diagnostic);
    }

    fn add_media(&mut self, extension: &str, content_type: &'static str, bytes: Vec<u8>) -> usize {
        self.doc.push_media(extension, content_type, bytes)
    }

    pub fn into_shapes(self) -> Vec<Shape> {
        self.shapes
    }
}

/// Render one element.
///
/// Dispatches on the element's category. A payload that does not match its
/// category is rejected.
pub fn render_element(
    el: &NormalizedElement,
    ctx: &RenderContext<'_>,
    canvas: &mut Canvas<'_>,
) -> Result<(), String> {
    match el.kind() {
        ElementKind::Title | ElementKind::Text | ElementKind::Footer => {
            render_text(el, ctx, canvas)
        }
        ElementKind::Image => render_image(el, ctx, canvas),
        ElementKind::Table => render_table(el, ctx, canvas),
        ElementKind::List => render_list(el, ctx, canvas),
    }
}

// ── Text, Title, Footer ──────────────────────────────────────────────────────

/// Text box at the element's rectangle; titles and headings are bold.
pub fn render_text(
    el: &NormalizedElement,
    ctx: &RenderContext<'_>,
    canvas: &mut Canvas<'_>,
) -> Result<(), String> {
    let raw = match &el.element.payload {
        Payload::Text { text } => text,
        other => return Err(format!("{} element carries a {} payload", el.kind(), payload_name(other))),
    };
    let text = clean_text(raw, &ctx.config.latex_substitutions);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return Err("text is empty after cleanup".into());
    }

    let heading = el.element.level.is_some_and(|l| l >= 1);
    let bold = el.kind() == ElementKind::Title || heading;
    let chars = display_chars(&text);
    let paragraphs = lines
        .into_iter()
        .map(|line| Paragraph {
            bold,
            ..Paragraph::plain(line, el.font_size)
        })
        .collect();

    canvas.push(Shape::Text(TextBox {
        rect: el.rect,
        paragraphs,
        wrap: font::wraps(chars, &ctx.config.fonts),
        source: el.kind(),
    }));
    Ok(())
}

// ── Image ────────────────────────────────────────────────────────────────────

/// Picture at the element's rectangle, plus its caption.
pub fn render_image(
    el: &NormalizedElement,
    ctx: &RenderContext<'_>,
    canvas: &mut Canvas<'_>,
) -> Result<(), String> {
    let image_ref = match &el.element.payload {
        Payload::Image { image_ref } => image_ref,
        other => return Err(format!("image element carries a {} payload", payload_name(other))),
    };
    let caption = el
        .element
        .caption
        .as_ref()
        .map(|c| clean_text(&c.text, &ctx.config.latex_substitutions))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let media = embed_image(image_ref, ctx, canvas)?;
    canvas.push(Shape::Picture(Picture {
        rect: el.rect,
        media,
        description: caption.clone().unwrap_or_else(|| image_ref.clone()),
    }));

    if let Some(text) = caption {
        let rect = el
            .caption_rect
            .unwrap_or_else(|| caption_rect_below(&el.rect, ctx.slide));
        canvas.push(caption_box(text, rect, ctx));
    }
    Ok(())
}

/// Look up, sniff and register an image file; returns its media index.
fn embed_image(
    image_ref: &str,
    ctx: &RenderContext<'_>,
    canvas: &mut Canvas<'_>,
) -> Result<usize, String> {
    let bytes = lookup_image(ctx.images, image_ref)
        .ok_or_else(|| format!("image '{}' is missing from the result", image_ref))?;
    let format = image::guess_format(bytes)
        .map_err(|e| format!("image '{}' has an unknown format: {}", image_ref, e))?;
    let (extension, content_type) = match format {
        ImageFormat::Png => ("png", "image/png"),
        ImageFormat::Jpeg => ("jpeg", "image/jpeg"),
        ImageFormat::Gif => ("gif", "image/gif"),
        ImageFormat::Bmp => ("bmp", "image/bmp"),
        other => {
            return Err(format!(
                "image '{}' is {:?}, which slides cannot embed",
                image_ref, other
            ))
        }
    };
    debug!("Page {}: embedding {} ({} bytes)", ctx.page, image_ref, bytes.len());
    Ok(canvas.add_media(extension, content_type, bytes.clone()))
}

/// Match by exact key first, then by file name.
fn lookup_image<'a>(images: &'a HashMap<String, Vec<u8>>, image_ref: &str) -> Option<&'a Vec<u8>> {
    images.get(image_ref).or_else(|| {
        let name = image_ref.rsplit(['/', '\\']).next()?;
        images.get(name)
    })
}

// ── Table ────────────────────────────────────────────────────────────────────

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Native table, falling back to the table picture and then to text.
pub fn render_table(
    el: &NormalizedElement,
    ctx: &RenderContext<'_>,
    canvas: &mut Canvas<'_>,
) -> Result<(), String> {
    let (markup, image_ref, text, caption) = match &el.element.payload {
        Payload::Table {
            markup,
            image_ref,
            text,
            caption,
        } => (markup, image_ref, text, caption),
        other => return Err(format!("table element carries a {} payload", payload_name(other))),
    };
    let latex = &ctx.config.latex_substitutions;

    let parsed = match markup.as_deref() {
        Some(m) => parse_table(m).map_err(|e| e.to_string()),
        None => Err("no table markup".to_string()),
    };

    match parsed {
        Ok(grid) => {
            let row_height = el.rect.height / grid.rows.len() as f64;
            let size = font::table_cell_size(row_height, &ctx.config.fonts);
            let rows = grid
                .rows
                .iter()
                .enumerate()
                .map(|(i, row)| {
                    row.iter()
                        .map(|cell| TableCell {
                            text: clean_text(cell, latex),
                            size_pt: size,
                            bold: i == 0,
                        })
                        .collect()
                })
                .collect();
            canvas.push(Shape::Table(TableShape {
                rect: el.rect,
                rows,
            }));
        }
        Err(reason) => {
            debug!("Page {}: table {} falls back: {}", ctx.page, el.index, reason);
            canvas.diagnose(Diagnostic::TableFallback {
                page: ctx.page,
                element: el.index,
                reason: reason.clone(),
            });
            render_table_fallback(el, ctx, canvas, image_ref.as_deref(), text.as_deref(), markup.as_deref())
                .map_err(|e| format!("{}; {}", reason, e))?;
        }
    }

    let caption = clean_text(&caption.join("\n"), latex).trim().to_string();
    if !caption.is_empty() {
        canvas.push(caption_box(caption, caption_rect_below(&el.rect, ctx.slide), ctx));
    }
    Ok(())
}

fn render_table_fallback(
    el: &NormalizedElement,
    ctx: &RenderContext<'_>,
    canvas: &mut Canvas<'_>,
    image_ref: Option<&str>,
    text: Option<&str>,
    markup: Option<&str>,
) -> Result<(), String> {
    if let Some(image_ref) = image_ref {
        match embed_image(image_ref, ctx, canvas) {
            Ok(media) => {
                canvas.push(Shape::Picture(Picture {
                    rect: el.rect,
                    media,
                    description: image_ref.to_string(),
                }));
                return Ok(());
            }
            Err(e) => debug!("Page {}: table picture unusable: {}", ctx.page, e),
        }
    }

    let body = text
        .map(str::to_string)
        .or_else(|| markup.map(|m| RE_TAGS.replace_all(m, " ").into_owned()))
        .map(|t| clean_text(&t, &ctx.config.latex_substitutions))
        .unwrap_or_default();
    let lines: Vec<&str> = body
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return Err("table has no picture or text to fall back on".into());
    }

    let paragraphs = lines
        .into_iter()
        .map(|l| {
            let mut p = Paragraph::plain(l.split_whitespace().collect::<Vec<_>>().join(" "), el.font_size);
            p.monospace = true;
            p
        })
        .collect();
    canvas.push(Shape::Text(TextBox {
        rect: el.rect,
        paragraphs,
        wrap: true,
        source: ElementKind::Table,
    }));
    Ok(())
}

// ── List ─────────────────────────────────────────────────────────────────────

/// One text box, one paragraph per item, indented by nesting level.
pub fn render_list(
    el: &NormalizedElement,
    ctx: &RenderContext<'_>,
    canvas: &mut Canvas<'_>,
) -> Result<(), String> {
    let items = match &el.element.payload {
        Payload::List { items } => items,
        other => return Err(format!("list element carries a {} payload", payload_name(other))),
    };

    let paragraphs: Vec<Paragraph> = items
        .iter()
        .filter_map(|item| {
            let text = clean_text(&item.text, &ctx.config.latex_substitutions);
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            let text = if item.ordered || starts_with_bullet(text) {
                text.to_string()
            } else {
                format!("• {}", text)
            };
            Some(Paragraph {
                indent_pt: f64::from(item.level) * ctx.config.list_indent_pt,
                ..Paragraph::plain(text, el.font_size)
            })
        })
        .collect();
    if paragraphs.is_empty() {
        return Err("list has no items".into());
    }

    canvas.push(Shape::Text(TextBox {
        rect: el.rect,
        paragraphs,
        wrap: true,
        source: ElementKind::List,
    }));
    Ok(())
}

fn starts_with_bullet(text: &str) -> bool {
    text.starts_with(['•', '·', '-', '*', '–', '▪', '◦', '●'])
}

// ── Shared helpers ───────────────────────────────────────────────────────────

/// Caption slot directly below `rect`, moved above it when it would leave
/// the slide.
pub fn caption_rect_below(rect: &Rect, slide: Size) -> Rect {
    let height = slide.height * CAPTION_HEIGHT_FRACTION;
    let y = if rect.bottom() + height <= slide.height {
        rect.bottom()
    } else {
        (rect.y - height).max(0.0)
    };
    Rect::new(rect.x, y, rect.width, height)
}

fn caption_box(text: String, rect: Rect, ctx: &RenderContext<'_>) -> Shape {
    let size = ctx.config.fonts.caption;
    let paragraphs = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| Paragraph {
            italic: true,
            align: Align::Center,
            ..Paragraph::plain(l, size)
        })
        .collect();
    Shape::Text(TextBox {
        rect,
        paragraphs,
        wrap: true,
        source: ElementKind::Text,
    })
}

/// Notice shown on a slide standing in for a page that failed to load.
pub fn placeholder_shape(page: usize, detail: &str, slide: Size) -> Shape {
    let rect = Rect::new(
        slide.width * 0.1,
        slide.height * 0.4,
        slide.width * 0.8,
        slide.height * 0.2,
    );
    Shape::Text(TextBox {
        rect,
        paragraphs: vec![
            Paragraph {
                bold: true,
                align: Align::Center,
                ..Paragraph::plain(format!("Page {} failed", page), 24)
            },
            Paragraph {
                align: Align::Center,
                italic: true,
                ..Paragraph::plain(detail, 12)
            },
        ],
        wrap: true,
        source: ElementKind::Text,
    })
}

fn payload_name(payload: &Payload) -> &'static str {
    match payload {
        Payload::Text { .. } => "text",
        Payload::Image { .. } => "image",
        Payload::Table { .. } => "table",
        Payload::List { .. } => "list",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, Caption, ContentElement, CoordSpace, ListItem};

    const SLIDE: Size = Size::new(1152.0, 648.0);
    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn normalized(element: ContentElement, rect: Rect, font_size: u32) -> NormalizedElement {
        NormalizedElement {
            index: 0,
            element,
            rect,
            caption_rect: None,
            font_size,
        }
    }

    fn run(el: &NormalizedElement, images: &HashMap<String, Vec<u8>>) -> (Result<(), String>, Vec<Shape>, OutputDocument) {
        let config = ConversionConfig::default();
        let ctx = RenderContext {
            config: &config,
            images,
            page: 1,
            slide: SLIDE,
        };
        let mut doc = OutputDocument::new(SLIDE, "Arial");
        let mut canvas = Canvas::new(&mut doc);
        let result = render_element(el, &ctx, &mut canvas);
        let shapes = canvas.into_shapes();
        (result, shapes, doc)
    }

    fn bbox() -> BBox {
        BBox::new(0.0, 0.0, 10.0, 10.0)
    }

    fn rect() -> Rect {
        Rect::new(100.0, 100.0, 400.0, 200.0)
    }

    #[test]
    fn test_title_is_bold_and_cleaned() {
        let el = normalized(
            ContentElement::text(ElementKind::Title, bbox(), r"Rotate 90\circ"),
            rect(),
            40,
        );
        let (res, shapes, _) = run(&el, &HashMap::new());
        res.unwrap();
        let tb = shapes[0].as_text().unwrap();
        assert_eq!(tb.text(), "Rotate 90°");
        assert!(tb.paragraphs[0].bold);
        assert_eq!(tb.paragraphs[0].size_pt, 40);
    }

    #[test]
    fn test_heading_level_is_bold() {
        let footer = ContentElement::text(ElementKind::Footer, bbox(), "Section 2").with_level(1);
        let (res, shapes, _) = run(&normalized(footer, rect(), 14), &HashMap::new());
        res.unwrap();
        assert!(shapes[0].as_text().unwrap().paragraphs[0].bold);

        let body = ContentElement::text(ElementKind::Text, bbox(), "Body").with_level(0);
        let (_, shapes, _) = run(&normalized(body, rect(), 14), &HashMap::new());
        assert!(!shapes[0].as_text().unwrap().paragraphs[0].bold);
    }

    #[test]
    fn test_short_text_does_not_wrap() {
        let el = normalized(ContentElement::text(ElementKind::Text, bbox(), "p. 3"), rect(), 12);
        let (_, shapes, _) = run(&el, &HashMap::new());
        assert!(!shapes[0].as_text().unwrap().wrap);
    }

    #[test]
    fn test_empty_text_rejected() {
        let el = normalized(ContentElement::text(ElementKind::Text, bbox(), " \u{200B} "), rect(), 12);
        let (res, shapes, _) = run(&el, &HashMap::new());
        assert!(res.is_err());
        assert!(shapes.is_empty());
    }

    #[test]
    fn test_image_with_caption_below() {
        let element = ContentElement::new(
            ElementKind::Image,
            bbox(),
            Payload::Image {
                image_ref: "images/fig1.png".into(),
            },
        )
        .with_caption(Caption {
            text: "Figure 1: Growth".into(),
            bbox: None,
            space: CoordSpace::ContentList,
        });
        let el = normalized(element, rect(), 14);
        let mut images = HashMap::new();
        images.insert("fig1.png".to_string(), PNG_MAGIC.to_vec());

        let (res, shapes, doc) = run(&el, &images);
        res.unwrap();
        assert_eq!(doc.media.len(), 1);
        assert_eq!(doc.media[0].content_type, "image/png");
        assert!(matches!(shapes[0], Shape::Picture(_)));
        let caption = shapes[1].as_text().unwrap();
        assert_eq!(caption.text(), "Figure 1: Growth");
        assert_eq!(caption.rect.y, rect().bottom());
        assert!(caption.paragraphs[0].italic);
    }

    #[test]
    fn test_missing_image_rejected() {
        let element = ContentElement::new(
            ElementKind::Image,
            bbox(),
            Payload::Image {
                image_ref: "gone.jpg".into(),
            },
        );
        let (res, shapes, doc) = run(&normalized(element, rect(), 14), &HashMap::new());
        assert!(res.unwrap_err().contains("missing"));
        assert!(shapes.is_empty());
        assert!(doc.media.is_empty());
    }

    #[test]
    fn test_table_native_with_bold_header() {
        let element = ContentElement::new(
            ElementKind::Table,
            bbox(),
            Payload::Table {
                markup: Some("<table><tr><td>A</td><td>B</td></tr><tr><td>1</td><td>2</td></tr></table>".into()),
                image_ref: None,
                text: None,
                caption: vec!["Table 1".into()],
            },
        );
        let (res, shapes, doc) = run(&normalized(element, rect(), 12), &HashMap::new());
        res.unwrap();
        let table = shapes[0].as_table().unwrap();
        assert!(table.rows[0].iter().all(|c| c.bold));
        assert!(table.rows[1].iter().all(|c| !c.bold));
        for cell in table.rows.iter().flatten() {
            assert!((10..=16).contains(&cell.size_pt));
        }
        assert_eq!(shapes[1].as_text().unwrap().text(), "Table 1");
        assert!(doc.diagnostics.is_empty());
    }

    #[test]
    fn test_table_falls_back_to_text() {
        let element = ContentElement::new(
            ElementKind::Table,
            bbox(),
            Payload::Table {
                markup: Some("<table><tr><td>Q1</td><td>42".into()),
                image_ref: None,
                text: None,
                caption: Vec::new(),
            },
        );
        let (res, shapes, doc) = run(&normalized(element, rect(), 12), &HashMap::new());
        res.unwrap();
        let tb = shapes[0].as_text().unwrap();
        assert!(tb.text().contains("Q1"));
        assert!(tb.paragraphs[0].monospace);
        assert!(matches!(doc.diagnostics[0], Diagnostic::TableFallback { .. }));
    }

    #[test]
    fn test_table_falls_back_to_picture() {
        let element = ContentElement::new(
            ElementKind::Table,
            bbox(),
            Payload::Table {
                markup: None,
                image_ref: Some("t.png".into()),
                text: None,
                caption: Vec::new(),
            },
        );
        let mut images = HashMap::new();
        images.insert("t.png".to_string(), PNG_MAGIC.to_vec());
        let (res, shapes, _) = run(&normalized(element, rect(), 12), &images);
        res.unwrap();
        assert!(matches!(shapes[0], Shape::Picture(_)));
    }

    #[test]
    fn test_list_indents_by_level() {
        let element = ContentElement::new(
            ElementKind::List,
            bbox(),
            Payload::List {
                items: vec![
                    ListItem { text: "Top".into(), level: 0, ordered: false },
                    ListItem { text: "Nested".into(), level: 2, ordered: false },
                    ListItem { text: "1. First".into(), level: 0, ordered: true },
                ],
            },
        );
        let (res, shapes, _) = run(&normalized(element, rect(), 16), &HashMap::new());
        res.unwrap();
        let tb = shapes[0].as_text().unwrap();
        assert_eq!(tb.paragraphs.len(), 3);
        assert_eq!(tb.paragraphs[0].text, "• Top");
        assert_eq!(tb.paragraphs[1].indent_pt, 36.0);
        assert_eq!(tb.paragraphs[2].text, "1. First");
    }

    #[test]
    fn test_payload_mismatch_rejected() {
        let el = normalized(ContentElement::text(ElementKind::Image, bbox(), "oops"), rect(), 12);
        assert!(run(&el, &HashMap::new()).0.is_err());
    }

    #[test]
    fn test_caption_moves_above_at_slide_bottom() {
        let r = Rect::new(0.0, 600.0, 100.0, 48.0);
        let c = caption_rect_below(&r, SLIDE);
        assert!(c.bottom() <= SLIDE.height);
        assert!(c.y < r.y);
    }
}
