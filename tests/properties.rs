//! Behavioural properties of the composer, checked through the public API.
//!
//! Pages are built directly as [`PageResult`] values so each property can be
//! stated without archive plumbing.
//!
//! Run with:
//!   cargo test --test properties

use pdf2pptx::pipeline::font;
use pdf2pptx::{
    compose, write_pptx, BBox, ContentElement, ContentListResult, ConversionConfig, Diagnostic,
    ElementKind, LayoutResult, PageError, PageResult, Payload, Rect, Shape, Size,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn page(index: usize, elements: Vec<ContentElement>) -> Result<PageResult, PageError> {
    let layout = LayoutResult {
        page_size: Some(Size::new(1000.0, 1000.0)),
        regions: Vec::new(),
    };
    Ok(PageResult::new(index, layout, ContentListResult::new(elements)))
}

fn text(kind: ElementKind, bbox: [f64; 4], s: &str) -> ContentElement {
    ContentElement::text(kind, BBox::new(bbox[0], bbox[1], bbox[2], bbox[3]), s)
}

fn table(bbox: [f64; 4], rows: usize) -> ContentElement {
    let body: String = (0..rows)
        .map(|r| format!("<tr><td>r{r}a</td><td>r{r}b</td></tr>"))
        .collect();
    ContentElement::new(
        ElementKind::Table,
        BBox::new(bbox[0], bbox[1], bbox[2], bbox[3]),
        Payload::Table {
            markup: Some(format!("<table>{body}</table>")),
            image_ref: None,
            text: None,
            caption: Vec::new(),
        },
    )
}

fn config() -> ConversionConfig {
    ConversionConfig::default()
}

fn all_texts(doc: &pdf2pptx::OutputDocument) -> Vec<Vec<String>> {
    doc.slides.iter().map(|s| s.texts()).collect()
}

// ── Geometry ─────────────────────────────────────────────────────────────────

#[test]
fn test_out_of_range_boxes_are_clamped_onto_the_slide() {
    let cfg = config();
    let doc = compose(
        vec![page(
            0,
            vec![
                text(ElementKind::Text, [-200.0, -50.0, 400.0, 300.0], "left overhang"),
                text(ElementKind::Text, [700.0, 900.0, 1800.0, 1400.0], "bottom right overhang"),
                text(ElementKind::Text, [100.0, 400.0, 900.0, 600.0], "inside"),
            ],
        )],
        &cfg,
    );

    let slide_size = cfg.slide_size_pt();
    let shapes = &doc.slides[0].shapes;
    assert_eq!(shapes.len(), 3);
    for shape in shapes {
        let r = shape.rect();
        assert!(r.within(slide_size), "{r:?} escapes {slide_size:?}");
        assert!(r.width > 0.0 && r.height > 0.0);
    }
}

#[test]
fn test_invalid_bbox_dropped_siblings_render() {
    let doc = compose(
        vec![page(
            0,
            vec![
                text(ElementKind::Text, [0.0, 0.0, -1.0, 5.0], "never shown"),
                text(ElementKind::Title, [100.0, 50.0, 900.0, 150.0], "Heading"),
                text(ElementKind::Text, [100.0, 200.0, 900.0, 400.0], "Body"),
            ],
        )],
        &config(),
    );

    let texts = doc.slides[0].texts();
    assert_eq!(texts, vec!["Heading", "Body"]);
    assert_eq!(doc.stats.elements_skipped, 1);
    assert!(doc
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::MalformedElement { page: 1, element: 0, .. })));
}

// ── Font sizing ──────────────────────────────────────────────────────────────

#[test]
fn test_font_estimation_is_deterministic() {
    let fonts = config().fonts;
    let rect = Rect::new(57.6, 120.0, 400.0, 90.0);
    let first = font::estimate(ElementKind::Text, &rect, 137, &fonts);
    for _ in 0..100 {
        assert_eq!(font::estimate(ElementKind::Text, &rect, 137, &fonts), first);
    }
}

#[test]
fn test_compose_and_serialise_are_deterministic() {
    let pages = || {
        vec![
            page(
                0,
                vec![
                    text(ElementKind::Title, [50.0, 40.0, 950.0, 120.0], "Agenda"),
                    text(ElementKind::Text, [50.0, 200.0, 950.0, 600.0], "Some words here"),
                    table([50.0, 650.0, 950.0, 950.0], 3),
                ],
            ),
            page(1, vec![text(ElementKind::Text, [10.0, 10.0, 500.0, 90.0], "Next")]),
        ]
    };
    let cfg = config();
    let a = compose(pages(), &cfg);
    let b = compose(pages(), &cfg);
    assert_eq!(a, b);
    assert_eq!(write_pptx(&a).unwrap(), write_pptx(&b).unwrap());
}

#[test]
fn test_table_cells_stay_in_table_range() {
    let cfg = config();
    let doc = compose(
        vec![
            page(0, vec![table([0.0, 0.0, 1000.0, 1000.0], 2)]),
            page(1, vec![table([100.0, 100.0, 300.0, 140.0], 40)]),
        ],
        &cfg,
    );

    let mut sizes = Vec::new();
    for slide in &doc.slides {
        for t in slide.shapes.iter().filter_map(Shape::as_table) {
            sizes.extend(t.rows.iter().flatten().map(|c| c.size_pt));
        }
    }
    assert_eq!(sizes.len(), 2 * 2 + 40 * 2);
    assert!(sizes.iter().all(|s| (10..=16).contains(s)), "{sizes:?}");
    // The two extremes hit both ends of the range.
    assert!(sizes.contains(&16));
    assert!(sizes.contains(&10));
}

#[test]
fn test_general_text_sizes_stay_in_general_range() {
    let fonts = config().fonts;
    let rects = [
        Rect::new(0.0, 0.0, 1152.0, 648.0),
        Rect::new(0.0, 0.0, 2.0, 2.0),
        Rect::new(10.0, 10.0, 600.0, 20.0),
        Rect::new(10.0, 10.0, 30.0, 500.0),
    ];
    for rect in &rects {
        for chars in [1, 5, 14, 15, 80, 2000] {
            let size = font::estimate(ElementKind::Text, rect, chars, &fonts);
            assert!(
                fonts.general.contains(size),
                "{size} out of range for {rect:?} / {chars} chars"
            );
        }
    }
}

#[test]
fn test_large_single_line_title_hits_title_ceiling() {
    let cfg = config();
    let doc = compose(
        vec![page(
            0,
            vec![text(ElementKind::Title, [100.0, 100.0, 900.0, 300.0], "Chapter 1")],
        )],
        &cfg,
    );

    let tb = doc.slides[0].shapes[0].as_text().unwrap();
    let size = tb.paragraphs[0].size_pt;
    assert_eq!(size, cfg.fonts.title.max);
    assert!(size > cfg.fonts.table.max);
    assert!(tb.paragraphs[0].bold);
}

// ── Text cleanup ─────────────────────────────────────────────────────────────

#[test]
fn test_circ_is_rendered_as_degree_glyph() {
    let doc = compose(
        vec![page(
            0,
            vec![
                text(ElementKind::Text, [50.0, 50.0, 950.0, 150.0], r"Rotate by $90^{\circ}$ now"),
                text(ElementKind::Text, [50.0, 200.0, 950.0, 300.0], r"Bake at 180\circ C"),
            ],
        )],
        &config(),
    );

    let texts = doc.slides[0].texts();
    assert_eq!(texts, vec!["Rotate by 90° now", "Bake at 180° C"]);
    assert!(texts.iter().all(|t| !t.contains(r"\circ")));
}

// ── Watermarks ───────────────────────────────────────────────────────────────

#[test]
fn test_majority_overlay_removed_minority_kept() {
    let footer = [300.0, 950.0, 700.0, 980.0];
    let pages = (0..10)
        .map(|i| {
            let mut els = vec![text(ElementKind::Text, [100.0, 100.0, 900.0, 400.0], &format!("Body {i}"))];
            // "Internal" on 6 of 10 pages, "Draft" on 4 of 10.
            if i < 6 {
                els.push(text(ElementKind::Footer, footer, "Internal"));
            } else {
                els.push(text(ElementKind::Footer, [50.0, 20.0, 250.0, 50.0], "Draft"));
            }
            page(i, els)
        })
        .collect::<Vec<_>>();

    let doc = compose(pages, &config());
    let texts = all_texts(&doc);
    assert!(texts.iter().flatten().all(|t| t != "Internal"));
    assert_eq!(texts.iter().flatten().filter(|t| *t == "Draft").count(), 4);
    assert_eq!(doc.stats.watermarks_removed, 6);
}

#[test]
fn test_confidential_footer_removed_including_variant_title_kept() {
    let pages = (0..10)
        .map(|i| {
            let footer = if i == 9 {
                text(ElementKind::Footer, [805.0, 962.0, 995.0, 992.0], "Confidential - Draft")
            } else {
                text(ElementKind::Footer, [800.0, 960.0, 990.0, 990.0], "CONFIDENTIAL")
            };
            page(
                i,
                vec![
                    text(ElementKind::Title, [100.0, 50.0, 900.0, 120.0], "Section Overview"),
                    text(ElementKind::Text, [100.0, 200.0, 900.0, 700.0], &format!("Content of page {}", i + 1)),
                    footer,
                ],
            )
        })
        .collect::<Vec<_>>();

    let doc = compose(pages, &config());
    assert_eq!(doc.slides.len(), 10);
    for (i, slide) in doc.slides.iter().enumerate() {
        let texts = slide.texts();
        assert!(
            texts.iter().all(|t| !t.to_lowercase().contains("confidential")),
            "slide {} still has {:?}",
            i + 1,
            texts
        );
        assert!(texts.contains(&"Section Overview".to_string()));
        assert_eq!(texts.len(), 2);
    }
    assert_eq!(doc.stats.watermarks_removed, 10);
}

#[test]
fn test_watermark_filter_disabled_keeps_everything() {
    let cfg = ConversionConfig::builder()
        .remove_watermark(false)
        .build()
        .unwrap();
    let pages = (0..3)
        .map(|i| page(i, vec![text(ElementKind::Footer, [800.0, 960.0, 990.0, 990.0], "CONFIDENTIAL")]))
        .collect::<Vec<_>>();

    let doc = compose(pages, &cfg);
    assert!(all_texts(&doc).iter().all(|t| t == &vec!["CONFIDENTIAL".to_string()]));
    assert_eq!(doc.stats.watermarks_removed, 0);
}

// ── Page count ───────────────────────────────────────────────────────────────

#[test]
fn test_empty_pages_yield_one_slide_each() {
    for n in [1usize, 3, 12] {
        let doc = compose((0..n).map(|i| page(i, Vec::new())), &config());
        assert_eq!(doc.slides.len(), n);
        assert!(doc.slides.iter().all(|s| s.shapes.is_empty() && !s.placeholder));
        assert_eq!(doc.stats.composed_pages, n);

        let bytes = write_pptx(&doc).unwrap();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let slides = archive
            .file_names()
            .filter(|f| f.starts_with("ppt/slides/slide") && f.ends_with(".xml"))
            .count();
        assert_eq!(slides, n);
    }
}
