//! Page composer and document assembler.
//!
//! ## Lifecycle
//!
//! ```text
//! Initialized ──add_page──▶ PagesAvailable ──compose──▶ Composing(i of N) ──▶ Finalized
//! ```
//!
//! Composition is synchronous and single-threaded. It makes two passes over
//! the document:
//!
//! 1. **Prepare**: every element of every page is validated, normalised
//!    into slide coordinates (once) and given a font size; eligible text is
//!    recorded in the [`WatermarkCandidateSet`].
//! 2. **Render**: pages are visited in ascending index order; watermark
//!    verdicts are applied and the remaining elements are rendered in the
//!    order the parser reported them.
//!
//! Nothing in here returns an error. Bad elements and bad pages become
//! [`Diagnostic`]s on the [`OutputDocument`].

use crate::config::ConversionConfig;
use crate::error::{Diagnostic, PageError};
use crate::model::{ElementKind, PageResult, Size};
use crate::output::{NormalizedElement, OutputDocument, Slide};
use crate::pipeline::cleanup::payload_chars;
use crate::pipeline::font;
use crate::pipeline::normalize::PageFrame;
use crate::pipeline::render::{placeholder_shape, render_element, Canvas, RenderContext};
use crate::pipeline::watermark::{WatermarkCandidateSet, WatermarkVerdict};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Where the assembler is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    Initialized,
    PagesAvailable { total: usize },
    /// Rendering page `page` (1-indexed position) of `total`.
    Composing { page: usize, total: usize },
    Finalized,
}

/// A page after the prepare pass.
#[derive(Debug)]
struct PreparedPage {
    index: usize,
    frame: PageFrame,
    elements: Vec<NormalizedElement>,
    images: HashMap<String, Vec<u8>>,
}

/// Drives composition across all pages of one document.
///
/// # Example
/// ```rust
/// use pdf2pptx::{ConversionConfig, DocumentAssembler, PageResult};
///
/// let config = ConversionConfig::default();
/// let mut assembler = DocumentAssembler::new(&config);
/// assembler.add_page(Ok(PageResult::default()));
/// let doc = assembler.compose();
/// assert_eq!(doc.slides.len(), 1);
/// ```
pub struct DocumentAssembler<'c> {
    config: &'c ConversionConfig,
    state: AssemblerState,
    pages: Vec<Result<PageResult, PageError>>,
}

impl<'c> DocumentAssembler<'c> {
    pub fn new(config: &'c ConversionConfig) -> Self {
        Self {
            config,
            state: AssemblerState::Initialized,
            pages: Vec::new(),
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// Queue one page result, or the error that prevented loading it.
    pub fn add_page(&mut self, page: Result<PageResult, PageError>) {
        self.pages.push(page);
        self.state = AssemblerState::PagesAvailable {
            total: self.pages.len(),
        };
    }

    pub fn add_pages(&mut self, pages: impl IntoIterator<Item = Result<PageResult, PageError>>) {
        for page in pages {
            self.add_page(page);
        }
    }

    /// Compose every queued page into a finished document.
    pub fn compose(mut self) -> OutputDocument {
        let config = self.config;
        let slide = config.slide_size_pt();
        let mut doc = OutputDocument::new(slide, config.fonts.font_face.clone());

        let mut pages = std::mem::take(&mut self.pages);
        pages.sort_by_key(page_order);
        let total = pages.len();
        doc.stats.total_pages = total;
        info!("Composing {} pages onto {}x{}pt slides", total, slide.width, slide.height);

        // Pass 1: normalise, size, collect watermark statistics.
        let mut candidates = WatermarkCandidateSet::new();
        let prepared: Vec<Result<PreparedPage, PageError>> = pages
            .into_iter()
            .map(|page| {
                page.map(|p| {
                    let prepared = prepare_page(p, slide, config, &mut doc.diagnostics, &mut doc.stats.elements_skipped);
                    if config.remove_watermark {
                        record_candidates(&prepared, slide, config, &mut candidates);
                    }
                    prepared
                })
            })
            .collect();

        let verdict = if config.remove_watermark {
            candidates.finalize(&config.watermark)
        } else {
            WatermarkVerdict::keep_all()
        };

        // Pass 2: apply verdicts and render, in page order.
        for (position, page) in prepared.into_iter().enumerate() {
            self.state = AssemblerState::Composing {
                page: position + 1,
                total,
            };
            match page {
                Ok(prepared) => {
                    let slide = compose_page(prepared, &verdict, config, &mut doc);
                    if let Some(cb) = &config.progress_callback {
                        cb.on_page_composed(slide.page_index + 1, total, slide.shapes.len());
                    }
                    doc.slides.push(slide);
                }
                Err(e) => {
                    warn!("{}; page omitted", e);
                    doc.diagnostics.push(Diagnostic::from(&e));
                    doc.stats.failed_pages += 1;
                    if config.placeholder_for_failed_pages {
                        doc.slides.push(Slide {
                            page_index: e.page().saturating_sub(1),
                            shapes: vec![placeholder_shape(e.page(), &e.to_string(), slide)],
                            degraded: false,
                            placeholder: true,
                        });
                    }
                }
            }
        }

        self.state = AssemblerState::Finalized;
        info!(
            "Composed {} slides: {} elements rendered, {} skipped, {} watermarks removed",
            doc.slides.len(),
            doc.stats.elements_rendered,
            doc.stats.elements_skipped,
            doc.stats.watermarks_removed
        );
        if let Some(cb) = &config.progress_callback {
            cb.on_conversion_complete(total, doc.slides.len());
        }
        doc
    }
}

/// Compose a whole document in one call.
///
/// `pages` is the ordered sequence of per-page results; a page that could
/// not be loaded is passed as its [`PageError`] and is omitted from the deck
/// (or replaced by a notice slide when configured).
pub fn compose(
    pages: impl IntoIterator<Item = Result<PageResult, PageError>>,
    config: &ConversionConfig,
) -> OutputDocument {
    let mut assembler = DocumentAssembler::new(config);
    assembler.add_pages(pages);
    assembler.compose()
}

fn page_order(page: &Result<PageResult, PageError>) -> usize {
    match page {
        Ok(p) => p.index,
        Err(e) => e.page().saturating_sub(1),
    }
}

/// Validate, normalise and size every element of one page.
fn prepare_page(
    page: PageResult,
    slide: Size,
    config: &ConversionConfig,
    diagnostics: &mut Vec<Diagnostic>,
    skipped: &mut usize,
) -> PreparedPage {
    let frame = PageFrame::resolve(&page, slide, &config.coordinates, diagnostics);
    let page_num = frame.page;
    let mut malformed = |i: usize, reason: String| {
        warn!("Page {}: element {} skipped: {}", page_num, i, reason);
        diagnostics.push(Diagnostic::malformed(page_num, i, reason));
        *skipped += 1;
    };

    let mut elements = Vec::with_capacity(page.content.elements.len());
    for (i, entry) in page.content.elements.into_iter().enumerate() {
        let element = match entry {
            Ok(el) => el,
            Err(reason) => {
                malformed(i, reason);
                continue;
            }
        };
        if !element.bbox.is_valid() {
            malformed(i, format!("invalid bbox {}", element.bbox));
            continue;
        }
        if element.payload.is_empty() {
            malformed(i, format!("{} element has an empty payload", element.kind));
            continue;
        }

        let rect = frame.to_slide(&element.bbox, element.space);
        let caption_rect = element
            .caption
            .as_ref()
            .and_then(|c| c.bbox.filter(|b| b.is_valid()).map(|b| frame.to_slide(&b, c.space)));
        let font_size = font::estimate(
            element.kind,
            &rect,
            payload_chars(&element.payload, &config.latex_substitutions),
            &config.fonts,
        );
        debug!(
            "Page {}: element {} {} at ({:.1}, {:.1}) {:.1}x{:.1}pt, {}pt",
            page_num, i, element.kind, rect.x, rect.y, rect.width, rect.height, font_size
        );
        elements.push(NormalizedElement {
            index: i,
            element,
            rect,
            caption_rect,
            font_size,
        });
    }

    PreparedPage {
        index: page.index,
        frame,
        elements,
        images: page.images,
    }
}

fn record_candidates(
    page: &PreparedPage,
    slide: Size,
    config: &ConversionConfig,
    candidates: &mut WatermarkCandidateSet,
) {
    candidates.add_page(page.index);
    for el in &page.elements {
        if let Some(text) = el.element.payload.text() {
            candidates.record(
                (page.index, el.index),
                el.kind(),
                text,
                &el.rect,
                slide,
                &config.watermark,
            );
        }
    }
}

/// Render one prepared page onto a new slide.
fn compose_page(
    page: PreparedPage,
    verdict: &WatermarkVerdict,
    config: &ConversionConfig,
    doc: &mut OutputDocument,
) -> Slide {
    let page_num = page.frame.page;
    let ctx = RenderContext {
        config,
        images: &page.images,
        page: page_num,
        slide: page.frame.slide,
    };

    let mut rendered: Vec<ElementKind> = Vec::new();
    let mut removed = 0usize;
    let mut failures: Vec<(usize, String)> = Vec::new();

    let shapes = {
        let mut canvas = Canvas::new(doc);
        for el in &page.elements {
            if verdict.is_watermark((page.index, el.index)) {
                debug!("Page {}: element {} removed as watermark", page_num, el.index);
                removed += 1;
                continue;
            }
            match render_element(el, &ctx, &mut canvas) {
                Ok(()) => rendered.push(el.kind()),
                Err(reason) => failures.push((el.index, reason)),
            }
        }
        canvas.into_shapes()
    };

    for kind in rendered {
        doc.stats.count_rendered(kind);
    }
    doc.stats.watermarks_removed += removed;
    for (index, reason) in failures {
        warn!("Page {}: element {} skipped: {}", page_num, index, reason);
        doc.diagnostics.push(Diagnostic::malformed(page_num, index, reason));
        doc.stats.elements_skipped += 1;
    }
    doc.stats.composed_pages += 1;
    if page.frame.degraded {
        doc.stats.degraded_pages += 1;
    }

    Slide {
        page_index: page.index,
        shapes,
        degraded: page.frame.degraded,
        placeholder: false,
    }
}
