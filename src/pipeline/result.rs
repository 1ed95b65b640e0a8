//! Parsing-service results → [`PageResult`].
//!
//! One result covers one page and arrives either as a ZIP archive or as the
//! same files unpacked into a directory:
//!
//! ```text
//! <name>_content_list.json   ordered element list (required)
//! layout.json                page size + layout blocks (optional)
//! images/<file>              pictures referenced by `img_path`
//! ```
//!
//! Anything that stops the content list from being read is a [`PageError`];
//! problems with individual entries are kept as `Err` entries so the
//! composer can report them against their position.

use crate::error::PageError;
use crate::model::{
    BBox, Caption, ContentElement, ContentListResult, CoordSpace, ElementKind, LayoutRegion,
    LayoutResult, ListItem, PageResult, Payload, Size,
};
use crate::pipeline::watermark::signature;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, warn};

/// The raw files of one result, before parsing.
#[derive(Debug, Default)]
pub struct RawResult {
    pub content_list: Option<Vec<u8>>,
    pub layout: Option<Vec<u8>>,
    /// Image bytes keyed by file name.
    pub images: HashMap<String, Vec<u8>>,
}

impl RawResult {
    /// Sort one archive/directory entry into its slot. `name` is the path
    /// relative to the result root, using `/` separators.
    fn offer(&mut self, name: &str, read: impl FnOnce() -> std::io::Result<Vec<u8>>) -> std::io::Result<()> {
        let file_name = name.rsplit('/').next().unwrap_or(name);
        if file_name.ends_with("content_list.json") {
            if self.content_list.is_none() {
                self.content_list = Some(read()?);
            }
        } else if file_name.ends_with("layout.json") {
            if self.layout.is_none() {
                self.layout = Some(read()?);
            }
        } else if name.contains("images/") && !file_name.is_empty() {
            self.images.insert(file_name.to_string(), read()?);
        }
        Ok(())
    }
}

/// Parse a result ZIP held in memory. `index` is the 0-based page index.
pub fn parse_zip(index: usize, bytes: &[u8]) -> Result<PageResult, PageError> {
    let page = index + 1;
    let unparseable = |detail: String| PageError::Unparseable { page, detail };

    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| unparseable(e.to_string()))?;
    let mut raw = RawResult::default();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(|e| unparseable(e.to_string()))?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().replace('\\', "/");
        raw.offer(&name, || {
            let mut buf = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut buf)?;
            Ok(buf)
        })
        .map_err(|e| unparseable(format!("{}: {}", name, e)))?;
    }
    assemble(index, raw)
}

/// Parse a result unpacked into `dir`.
pub fn parse_dir(index: usize, dir: &Path) -> Result<PageResult, PageError> {
    let mut raw = RawResult::default();
    collect_dir(dir, "", &mut raw).map_err(|e| PageError::Unparseable {
        page: index + 1,
        detail: format!("{}: {}", dir.display(), e),
    })?;
    assemble(index, raw)
}

fn collect_dir(dir: &Path, prefix: &str, raw: &mut RawResult) -> std::io::Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let path = entry.path();
        let name = format!("{}{}", prefix, entry.file_name().to_string_lossy());
        if path.is_dir() {
            collect_dir(&path, &format!("{}/", name), raw)?;
        } else {
            raw.offer(&name, || std::fs::read(&path))?;
        }
    }
    Ok(())
}

/// Build a [`PageResult`] from raw files.
pub fn assemble(index: usize, raw: RawResult) -> Result<PageResult, PageError> {
    let page = index + 1;
    let content_bytes = raw
        .content_list
        .ok_or(PageError::NoContentList { page })?;
    let mut content = parse_content_list(&content_bytes)
        .map_err(|detail| PageError::Unparseable { page, detail })?;

    let layout = match raw.layout.as_deref().map(parse_layout) {
        Some(Ok(parsed)) => {
            attach_layout_captions(&mut content, parsed.captions);
            parsed.layout
        }
        Some(Err(e)) => {
            warn!("Page {}: layout unreadable, ignoring it: {}", page, e);
            LayoutResult::default()
        }
        None => LayoutResult::default(),
    };

    debug!(
        "Page {}: {} content entries, {} images",
        page,
        content.elements.len(),
        raw.images.len()
    );
    Ok(PageResult {
        index,
        layout,
        content,
        images: raw.images,
    })
}

// ── Content list ─────────────────────────────────────────────────────────────

/// Parse a content-list JSON array. Nested `blocks` are flattened in order.
pub fn parse_content_list(bytes: &[u8]) -> Result<ContentListResult, String> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    let items = value
        .as_array()
        .ok_or_else(|| "content list is not a JSON array".to_string())?;

    let mut flat = Vec::new();
    flatten_blocks(items, &mut flat);
    Ok(ContentListResult {
        elements: flat.into_iter().map(parse_item).collect(),
        declared_size: None,
    })
}

fn flatten_blocks<'a>(items: &'a [Value], out: &mut Vec<&'a Value>) {
    for item in items {
        match item.get("blocks").and_then(Value::as_array) {
            Some(children) => flatten_blocks(children, out),
            None => out.push(item),
        }
    }
}

fn parse_item(item: &Value) -> Result<ContentElement, String> {
    let tag = item
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| "entry has no type".to_string())?;
    let text_level = item
        .get("text_level")
        .and_then(Value::as_u64)
        .map(|l| l.min(u64::from(u8::MAX)) as u8);
    let kind = ElementKind::from_tag(tag, text_level)
        .ok_or_else(|| format!("unknown element type '{}'", tag))?;
    let bbox = item
        .get("bbox")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_f64).collect::<Vec<_>>())
        .and_then(|coords| BBox::from_slice(&coords))
        .ok_or_else(|| format!("{} entry has no four-number bbox", tag))?;

    let text = || {
        str_field(item, "text")
            .or_else(|| str_field(item, "content"))
            .unwrap_or_default()
    };

    let mut element = match kind {
        ElementKind::Title | ElementKind::Text | ElementKind::Footer => {
            ContentElement::text(kind, bbox, text())
        }
        ElementKind::Image => {
            let image_ref = str_field(item, "img_path")
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| "image entry has no img_path".to_string())?;
            let mut el = ContentElement::new(kind, bbox, Payload::Image { image_ref });
            let caption = string_list(item, "image_caption")
                .or_else(|| string_list(item, "img_caption"))
                .unwrap_or_default()
                .join(" ");
            if !caption.trim().is_empty() {
                el = el.with_caption(Caption {
                    text: caption,
                    bbox: None,
                    space: CoordSpace::ContentList,
                });
            }
            el
        }
        ElementKind::Table => ContentElement::new(
            kind,
            bbox,
            Payload::Table {
                markup: str_field(item, "table_body").filter(|m| !m.trim().is_empty()),
                image_ref: str_field(item, "img_path").filter(|p| !p.trim().is_empty()),
                text: Some(text()).filter(|t| !t.trim().is_empty()),
                caption: string_list(item, "table_caption").unwrap_or_default(),
            },
        ),
        ElementKind::List => {
            let lines = string_list(item, "list_items")
                .unwrap_or_else(|| text().lines().map(str::to_string).collect());
            ContentElement::new(
                kind,
                bbox,
                Payload::List {
                    items: parse_list_items(&lines),
                },
            )
        }
    };
    if let Some(level) = text_level {
        element = element.with_level(level);
    }
    Ok(element)
}

fn str_field(item: &Value, key: &str) -> Option<String> {
    item.get(key).and_then(Value::as_str).map(str::to_string)
}

fn string_list(item: &Value, key: &str) -> Option<Vec<String>> {
    match item.get(key)? {
        Value::Array(a) => Some(a.iter().filter_map(Value::as_str).map(str::to_string).collect()),
        Value::String(s) => Some(vec![s.clone()]),
        _ => None,
    }
}

static RE_ORDERED_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+[.)]|[A-Za-z][.)]|\(\d+\)|[ivxIVX]+[.)])\s").unwrap());

/// Turn raw list lines into items.
///
/// Nesting comes from leading indentation: one level per tab or per two
/// spaces. Items starting with `1.`, `a)`, `(3)` etc. are ordered.
pub fn parse_list_items(lines: &[String]) -> Vec<ListItem> {
    lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let mut columns = 0usize;
            for c in line.chars() {
                match c {
                    ' ' => columns += 1,
                    '\t' => columns += 2,
                    _ => break,
                }
            }
            let text = line.trim().to_string();
            ListItem {
                ordered: RE_ORDERED_MARKER.is_match(&text),
                level: (columns / 2).min(u8::MAX as usize) as u8,
                text,
            }
        })
        .collect()
}

// ── Layout ───────────────────────────────────────────────────────────────────

/// Caption text and box found in the layout document, in layout coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutCaption {
    pub text: String,
    pub bbox: BBox,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLayout {
    pub layout: LayoutResult,
    pub captions: Vec<LayoutCaption>,
}

/// Parse `layout.json`: page size, block regions and image captions.
pub fn parse_layout(bytes: &[u8]) -> Result<ParsedLayout, String> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    let Some(info) = value
        .get("pdf_info")
        .and_then(Value::as_array)
        .and_then(|a| a.first())
    else {
        return Ok(ParsedLayout::default());
    };

    let page_size = info
        .get("page_size")
        .and_then(Value::as_array)
        .and_then(|a| match a.as_slice() {
            [w, h] => Some(Size::new(w.as_f64()?, h.as_f64()?)),
            _ => None,
        });

    let blocks = info
        .get("para_blocks")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut parsed = ParsedLayout {
        layout: LayoutResult {
            page_size,
            regions: Vec::with_capacity(blocks.len()),
        },
        captions: Vec::new(),
    };
    for block in blocks {
        let kind = block.get("type").and_then(Value::as_str).unwrap_or("unknown");
        parsed.layout.regions.push(LayoutRegion {
            kind: kind.to_string(),
            bbox: value_bbox(block.get("bbox")),
        });
        if kind != "image" {
            continue;
        }
        let subs = block.get("blocks").and_then(Value::as_array);
        for sub in subs.into_iter().flatten() {
            if sub.get("type").and_then(Value::as_str) == Some("image_caption") {
                if let Some(caption) = caption_from_block(sub) {
                    parsed.captions.push(caption);
                }
            }
        }
    }
    Ok(parsed)
}

fn value_bbox(v: Option<&Value>) -> Option<BBox> {
    let coords: Vec<f64> = v?.as_array()?.iter().filter_map(Value::as_f64).collect();
    BBox::from_slice(&coords).filter(BBox::is_valid)
}

/// Join a caption block's text spans; its box is the union of the spans.
fn caption_from_block(block: &Value) -> Option<LayoutCaption> {
    let mut texts = Vec::new();
    let mut bbox: Option<BBox> = None;
    let lines = block.get("lines").and_then(Value::as_array);
    for line in lines.into_iter().flatten() {
        let spans = line.get("spans").and_then(Value::as_array);
        for span in spans.into_iter().flatten() {
            if span.get("type").and_then(Value::as_str) != Some("text") {
                continue;
            }
            let Some(content) = span.get("content").and_then(Value::as_str) else {
                continue;
            };
            let Some(b) = value_bbox(span.get("bbox")) else {
                continue;
            };
            if content.trim().is_empty() {
                continue;
            }
            texts.push(content.trim().to_string());
            bbox = Some(match bbox {
                Some(u) => BBox::new(u.x1.min(b.x1), u.y1.min(b.y1), u.x2.max(b.x2), u.y2.max(b.y2)),
                None => b,
            });
        }
    }
    Some(LayoutCaption {
        text: texts.join(" "),
        bbox: bbox?,
    })
}

/// Give content-list images the caption boxes found in the layout.
///
/// A caption goes to the image whose caption text matches it; failing that,
/// to the next image that has no caption box yet.
fn attach_layout_captions(content: &mut ContentListResult, captions: Vec<LayoutCaption>) {
    for caption in captions {
        let wanted = signature(&caption.text);
        let images = content
            .elements
            .iter_mut()
            .flatten()
            .filter(|e| e.kind == ElementKind::Image)
            .filter(|e| e.caption.as_ref().and_then(|c| c.bbox).is_none());

        let mut fallback: Option<&mut ContentElement> = None;
        let mut matched: Option<&mut ContentElement> = None;
        for el in images {
            let text_match = el.caption.as_ref().is_some_and(|c| {
                let have = signature(&c.text);
                !have.is_empty() && (have.contains(&wanted) || wanted.contains(&have))
            });
            if text_match {
                matched = Some(el);
                break;
            }
            if fallback.is_none() {
                fallback = Some(el);
            }
        }

        match matched.or(fallback) {
            Some(el) => {
                let text = el
                    .caption
                    .as_ref()
                    .map(|c| c.text.clone())
                    .unwrap_or_else(|| caption.text.clone());
                el.caption = Some(Caption {
                    text,
                    bbox: Some(caption.bbox),
                    space: CoordSpace::Layout,
                });
            }
            None => debug!("Layout caption '{}' matches no image", caption.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn content_json() -> Vec<u8> {
        serde_json::to_vec(&json!([
            {"type": "text", "text": "Quarterly Review", "text_level": 1, "bbox": [50, 40, 950, 120]},
            {"type": "text", "text": "Revenue grew.", "bbox": [50, 150, 500, 300]},
            {"type": "image", "img_path": "images/chart.png", "image_caption": ["Figure 1"], "bbox": [500, 150, 950, 600]},
            {"type": "table", "table_body": "<table><tr><td>a</td></tr></table>", "table_caption": ["Table 1"], "bbox": [50, 620, 950, 900]},
            {"type": "list", "list_items": ["- one", "  - two"], "bbox": [50, 300, 500, 400]},
            {"type": "page_number", "text": "3", "bbox": [900, 950, 950, 980]},
            {"type": "chart", "bbox": [0, 0, 1, 1]},
            {"blocks": [{"type": "text", "text": "nested", "bbox": [1, 1, 2, 2]}]}
        ]))
        .unwrap()
    }

    fn layout_json() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "pdf_info": [{
                "page_size": [612, 792],
                "para_blocks": [
                    {"type": "title", "bbox": [30, 25, 580, 75]},
                    {"type": "image", "bbox": [306, 95, 580, 380], "blocks": [
                        {"type": "image_body", "bbox": [306, 95, 580, 360]},
                        {"type": "image_caption", "bbox": [306, 362, 580, 380], "lines": [
                            {"spans": [{"type": "text", "content": "Figure 1", "bbox": [306, 362, 400, 380]}]}
                        ]}
                    ]}
                ]
            }]
        }))
        .unwrap()
    }

    fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            for (name, data) in files {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(data).unwrap();
            }
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn test_content_list_categories() {
        let content = parse_content_list(&content_json()).unwrap();
        assert_eq!(content.elements.len(), 8);
        let kinds: Vec<_> = content
            .elements
            .iter()
            .map(|e| e.as_ref().map(|el| el.kind).ok())
            .collect();
        assert_eq!(
            kinds,
            vec![
                Some(ElementKind::Title),
                Some(ElementKind::Text),
                Some(ElementKind::Image),
                Some(ElementKind::Table),
                Some(ElementKind::List),
                Some(ElementKind::Footer),
                None,
                Some(ElementKind::Text),
            ]
        );
        let err = content.elements[6].as_ref().unwrap_err();
        assert!(err.contains("chart"));
    }

    #[test]
    fn test_list_items_nesting_and_order() {
        let items = parse_list_items(&[
            "1. First".to_string(),
            "  a) sub".to_string(),
            "\t\tdeep".to_string(),
            "plain".to_string(),
            "   ".to_string(),
        ]);
        assert_eq!(items.len(), 4);
        assert!(items[0].ordered);
        assert_eq!(items[1].level, 1);
        assert!(items[1].ordered);
        assert_eq!(items[2].level, 2);
        assert!(!items[3].ordered);
    }

    #[test]
    fn test_layout_page_size_and_captions() {
        let parsed = parse_layout(&layout_json()).unwrap();
        assert_eq!(parsed.layout.page_size, Some(Size::new(612.0, 792.0)));
        assert_eq!(parsed.layout.regions.len(), 2);
        assert_eq!(parsed.captions.len(), 1);
        assert_eq!(parsed.captions[0].bbox, BBox::new(306.0, 362.0, 400.0, 380.0));
    }

    #[test]
    fn test_zip_result_attaches_layout_caption() {
        let content = content_json();
        let layout = layout_json();
        let png = [0x89u8, b'P', b'N', b'G'];
        let bytes = zip_bytes(&[
            ("doc_content_list.json", content.as_slice()),
            ("layout.json", layout.as_slice()),
            ("images/chart.png", &png[..]),
        ]);
        let page = parse_zip(2, &bytes).unwrap();
        assert_eq!(page.index, 2);
        assert_eq!(page.layout.page_size, Some(Size::new(612.0, 792.0)));
        assert!(page.images.contains_key("chart.png"));

        let image = page.content.elements[2].as_ref().unwrap();
        let caption = image.caption.as_ref().unwrap();
        assert_eq!(caption.text, "Figure 1");
        assert_eq!(caption.space, CoordSpace::Layout);
        assert!(caption.bbox.is_some());
    }

    #[test]
    fn test_zip_without_content_list() {
        let bytes = zip_bytes(&[("layout.json", &b"{}"[..])]);
        assert_eq!(parse_zip(0, &bytes), Err(PageError::NoContentList { page: 1 }));
    }

    #[test]
    fn test_garbage_is_unparseable() {
        assert!(matches!(
            parse_zip(4, b"not a zip"),
            Err(PageError::Unparseable { page: 5, .. })
        ));
        let bytes = zip_bytes(&[("x_content_list.json", &b"{\"oops\": 1}"[..])]);
        assert!(matches!(parse_zip(0, &bytes), Err(PageError::Unparseable { .. })));
    }

    #[test]
    fn test_bad_layout_is_ignored() {
        let content = content_json();
        let bytes = zip_bytes(&[
            ("a_content_list.json", content.as_slice()),
            ("layout.json", &b"{{{"[..]),
        ]);
        let page = parse_zip(0, &bytes).unwrap();
        assert_eq!(page.layout.page_size, None);
    }

    #[test]
    fn test_directory_result() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("p_content_list.json"), content_json()).unwrap();
        std::fs::create_dir(dir.path().join("images")).unwrap();
        std::fs::write(dir.path().join("images").join("chart.png"), [1u8, 2, 3]).unwrap();
        let page = parse_dir(0, dir.path()).unwrap();
        assert_eq!(page.content.elements.len(), 8);
        assert_eq!(page.images.get("chart.png").map(Vec::len), Some(3));
    }
}
