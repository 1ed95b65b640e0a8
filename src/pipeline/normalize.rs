//! Coordinate normalisation: source page boxes → slide rectangles.
//!
//! A page's two result documents may disagree on scale. The layout document
//! declares the page size and is authoritative; content-list boxes are
//! checked against it and, when they disagree beyond the configured
//! tolerance, rescaled before the page → slide mapping is applied.

use crate::config::CoordinateConfig;
use crate::error::Diagnostic;
use crate::model::{BBox, CoordSpace, PageResult, Size};
use crate::output::Rect;
use tracing::warn;

/// Per-page mapping from source coordinates to slide points.
///
/// Resolve once per page with [`PageFrame::resolve`], then map every box
/// with [`PageFrame::to_slide`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    /// 1-indexed page number, for diagnostics.
    pub page: usize,
    /// Page size in layout coordinates.
    pub source: Size,
    /// Slide size in points.
    pub slide: Size,
    /// Content-list → layout correction per axis. `(1, 1)` when the two
    /// documents agree.
    pub correction: (f64, f64),
    /// Minimum rectangle size as a fraction of the slide.
    pub min_size_fraction: f64,
    /// The page size was missing and the default was substituted.
    pub degraded: bool,
}

impl PageFrame {
    /// Work out the page's source size and content-list correction.
    ///
    /// Records `DegradedPage` and `CoordinateMismatch` diagnostics as needed.
    pub fn resolve(
        page: &PageResult,
        slide: Size,
        config: &CoordinateConfig,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Self {
        let page_num = page.index + 1;

        let (source, degraded) = match page.layout.page_size {
            Some(size) if size.is_usable() => (size, false),
            declared => {
                let reason = match declared {
                    Some(s) => format!("page size {}x{} is unusable", s.width, s.height),
                    None => "layout declares no page size".to_string(),
                };
                warn!(
                    "Page {}: {}; using default {}x{}",
                    page_num, reason, config.default_page_size.width, config.default_page_size.height
                );
                diagnostics.push(Diagnostic::DegradedPage {
                    page: page_num,
                    reason,
                });
                (config.default_page_size, true)
            }
        };

        let correction = match content_correction(source, page, config) {
            Some((cx, cy)) => {
                warn!(
                    "Page {}: content list disagrees with layout; rescaling by ({:.4}, {:.4})",
                    page_num, cx, cy
                );
                diagnostics.push(Diagnostic::CoordinateMismatch {
                    page: page_num,
                    scale_x: cx,
                    scale_y: cy,
                });
                (cx, cy)
            }
            None => (1.0, 1.0),
        };

        Self {
            page: page_num,
            source,
            slide,
            correction,
            min_size_fraction: config.min_size_fraction,
            degraded,
        }
    }

    /// Map a source box to a slide rectangle.
    ///
    /// The result always lies inside the slide and is at least
    /// `min_size_fraction` of the slide on each axis.
    pub fn to_slide(&self, bbox: &BBox, space: CoordSpace) -> Rect {
        let (cx, cy) = match space {
            CoordSpace::ContentList => self.correction,
            CoordSpace::Layout => (1.0, 1.0),
        };
        let sx = cx * self.slide.width / self.source.width;
        let sy = cy * self.slide.height / self.source.height;

        let (x1, x2) = fit_axis(
            bbox.x1 * sx,
            bbox.x2 * sx,
            self.slide.width,
            self.slide.width * self.min_size_fraction,
        );
        let (y1, y2) = fit_axis(
            bbox.y1 * sy,
            bbox.y2 * sy,
            self.slide.height,
            self.slide.height * self.min_size_fraction,
        );
        Rect::new(x1, y1, x2 - x1, y2 - y1)
    }
}

/// Clamp `[lo, hi]` into `[0, limit]` and widen it to at least `min`.
fn fit_axis(lo: f64, hi: f64, limit: f64, min: f64) -> (f64, f64) {
    let min = min.min(limit);
    let mut lo = lo.clamp(0.0, limit);
    let mut hi = hi.clamp(0.0, limit);
    if hi - lo < min {
        hi = lo + min;
        if hi > limit {
            hi = limit;
            lo = limit - min;
        }
    }
    (lo, hi)
}

/// Correction to apply to content-list coordinates, if any.
///
/// A declared reference (explicit size or configured grid) is compared both
/// ways. Without one, the boxes' own extent is cross-checked against the
/// layout regions: a list that is larger than the regions on both axes is
/// on a different scale. Failing that, an extent that overshoots the page
/// is scaled back onto it. Content rarely reaches the page edge, so an
/// undershoot alone proves nothing.
fn content_correction(
    source: Size,
    page: &PageResult,
    config: &CoordinateConfig,
) -> Option<(f64, f64)> {
    let tol = config.mismatch_tolerance;
    let declared = page
        .content
        .declared_size
        .or(config.content_grid)
        .filter(Size::is_usable);

    if let Some(reference) = declared {
        let rx = reference.width / source.width;
        let ry = reference.height / source.height;
        let mismatch = (rx - 1.0).abs() > tol || (ry - 1.0).abs() > tol;
        return mismatch.then(|| (source.width / reference.width, source.height / reference.height));
    }

    let extent = page.content.extent()?;
    if let Some(regions) = page.layout.extent() {
        let rx = regions.width / extent.width;
        let ry = regions.height / extent.height;
        if rx < 1.0 - tol && ry < 1.0 - tol {
            return Some((rx, ry));
        }
    }
    let overshoot =
        extent.width > source.width * (1.0 + tol) || extent.height > source.height * (1.0 + tol);
    overshoot.then(|| (source.width / extent.width, source.height / extent.height))
}
