//! Watermark detection across a whole document.
//!
//! Overlays such as "CONFIDENTIAL" stamps or generator banners repeat at the
//! same spot on most pages. Detection runs in two explicit passes:
//!
//! 1. **Stats**: every eligible element is recorded in a
//!    [`WatermarkCandidateSet`] with its signature and slide-relative
//!    position.
//! 2. **Apply**: [`WatermarkCandidateSet::finalize`] turns the statistics
//!    into a [`WatermarkVerdict`], which the composer consults per element.
//!
//! Only Text and Footer elements are eligible. A keyword hit widens the
//! position tolerance but never lowers the page requirement.

use crate::config::WatermarkConfig;
use crate::model::{ElementKind, Size};
use crate::output::Rect;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Identifies one element: `(page index, element index)`.
pub type ElementId = (usize, usize);

#[derive(Debug, Clone)]
struct Occurrence {
    id: ElementId,
    rel: [f64; 4],
    alnum: String,
    keyword: bool,
}

/// Per-document record of eligible text and where it appeared.
#[derive(Debug, Clone, Default)]
pub struct WatermarkCandidateSet {
    by_signature: HashMap<String, Vec<Occurrence>>,
    pages: HashSet<usize>,
}

impl WatermarkCandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a page, whether or not it holds any candidates.
    pub fn add_page(&mut self, page: usize) {
        self.pages.insert(page);
    }

    /// Record one element. Ineligible kinds and empty text are ignored.
    pub fn record(
        &mut self,
        id: ElementId,
        kind: ElementKind,
        text: &str,
        rect: &Rect,
        slide: Size,
        config: &WatermarkConfig,
    ) {
        if !is_eligible(kind) {
            return;
        }
        let sig = signature(text);
        if sig.is_empty() {
            return;
        }
        self.pages.insert(id.0);
        let keyword = config
            .keywords
            .iter()
            .map(|k| signature(k))
            .any(|k| !k.is_empty() && sig.contains(&k));
        self.by_signature.entry(sig.clone()).or_default().push(Occurrence {
            id,
            rel: rect.relative_to(slide),
            alnum: alnumeric(&sig),
            keyword,
        });
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages an overlay must appear on to be treated as one.
    pub fn required_pages(&self, config: &WatermarkConfig) -> usize {
        let by_fraction = (config.page_fraction * self.page_count() as f64).ceil() as usize;
        by_fraction.max(config.min_pages)
    }

    /// Decide which recorded elements are watermarks.
    pub fn finalize(&self, config: &WatermarkConfig) -> WatermarkVerdict {
        let required = self.required_pages(config);
        let tolerance = |o: &Occurrence| {
            if o.keyword {
                config.position_tolerance * config.keyword_tolerance_factor
            } else {
                config.position_tolerance
            }
        };

        let mut confirmed: Vec<&Occurrence> = Vec::new();
        for (sig, occurrences) in &self.by_signature {
            for o in occurrences {
                let tol = tolerance(o);
                let pages: HashSet<usize> = occurrences
                    .iter()
                    .filter(|other| drift(&o.rel, &other.rel) <= tol)
                    .map(|other| other.id.0)
                    .collect();
                if pages.len() >= required {
                    debug!("Watermark '{}' on {} pages", sig, pages.len());
                    confirmed.push(o);
                }
            }
        }

        let mut removed: HashSet<ElementId> = confirmed.iter().map(|o| o.id).collect();

        // Near variants: same spot, text that overlaps a confirmed overlay.
        for occurrences in self.by_signature.values() {
            for o in occurrences {
                if removed.contains(&o.id) || o.alnum.is_empty() {
                    continue;
                }
                let hit = confirmed.iter().any(|c| {
                    let tol = tolerance(c).max(tolerance(o));
                    drift(&o.rel, &c.rel) <= tol
                        && !c.alnum.is_empty()
                        && (o.alnum.contains(&c.alnum) || c.alnum.contains(&o.alnum))
                });
                if hit {
                    removed.insert(o.id);
                }
            }
        }

        if !removed.is_empty() {
            info!(
                "Watermark filter: {} elements removed (threshold {} of {} pages)",
                removed.len(),
                required,
                self.page_count()
            );
        }
        WatermarkVerdict { removed }
    }
}

/// Outcome of watermark detection; consulted per element while composing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatermarkVerdict {
    removed: HashSet<ElementId>,
}

impl WatermarkVerdict {
    /// A verdict that removes nothing.
    pub fn keep_all() -> Self {
        Self::default()
    }

    pub fn is_watermark(&self, id: ElementId) -> bool {
        self.removed.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }
}

pub fn is_eligible(kind: ElementKind) -> bool {
    matches!(kind, ElementKind::Text | ElementKind::Footer)
}

/// Whitespace-collapsed, case-folded text.
pub fn signature(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn alnumeric(sig: &str) -> String {
    sig.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Largest per-coordinate difference between two relative boxes.
fn drift(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: Size = Size::new(1000.0, 1000.0);

    fn rect(x: f64, y: f64) -> Rect {
        Rect::new(x, y, 200.0, 30.0)
    }

    fn cfg() -> WatermarkConfig {
        WatermarkConfig::default()
    }

    #[test]
    fn test_signature_collapses_and_folds() {
        assert_eq!(signature("  Draft\n  COPY \t"), "draft copy");
    }

    #[test]
    fn test_majority_overlay_removed() {
        let mut set = WatermarkCandidateSet::new();
        for page in 0..4 {
            set.record((page, 0), ElementKind::Footer, "Internal draft", &rect(400.0, 950.0), SLIDE, &cfg());
        }
        let verdict = set.finalize(&cfg());
        assert_eq!(verdict.len(), 4);
    }

    #[test]
    fn test_minority_repeat_kept() {
        let mut set = WatermarkCandidateSet::new();
        for page in 0..10 {
            set.add_page(page);
        }
        for page in 0..4 {
            set.record((page, 0), ElementKind::Text, "Internal draft", &rect(400.0, 950.0), SLIDE, &cfg());
        }
        assert_eq!(set.required_pages(&cfg()), 5);
        assert!(set.finalize(&cfg()).is_empty());
    }

    #[test]
    fn test_single_page_never_loses_text() {
        let mut set = WatermarkCandidateSet::new();
        set.record((0, 0), ElementKind::Text, "CONFIDENTIAL", &rect(0.0, 0.0), SLIDE, &cfg());
        assert!(set.finalize(&cfg()).is_empty());
    }

    #[test]
    fn test_titles_are_not_eligible() {
        let mut set = WatermarkCandidateSet::new();
        for page in 0..5 {
            set.record((page, 0), ElementKind::Title, "Overview", &rect(100.0, 50.0), SLIDE, &cfg());
        }
        assert!(set.finalize(&cfg()).is_empty());
    }

    #[test]
    fn test_drift_beyond_tolerance_kept() {
        let mut set = WatermarkCandidateSet::new();
        for page in 0..4 {
            // 5% of the slide between pages.
            let r = rect(100.0 + page as f64 * 50.0, 500.0);
            set.record((page, 0), ElementKind::Text, "Section notes", &r, SLIDE, &cfg());
        }
        assert!(set.finalize(&cfg()).is_empty());
    }

    #[test]
    fn test_keyword_widens_tolerance() {
        let record = |text: &str| {
            let mut set = WatermarkCandidateSet::new();
            for page in 0..4 {
                // 3% drift per page: outside 0.02, inside 0.04.
                let r = rect(100.0 + page as f64 * 30.0, 900.0);
                set.record((page, 0), ElementKind::Footer, text, &r, SLIDE, &cfg());
            }
            set.finalize(&cfg())
        };
        assert!(record("Quarterly figures").is_empty());
        assert_eq!(record("Made with NotebookLM").len(), 4);
    }

    #[test]
    fn test_near_variant_removed() {
        let mut set = WatermarkCandidateSet::new();
        for page in 0..9 {
            set.record((page, 3), ElementKind::Footer, "CONFIDENTIAL", &rect(800.0, 960.0), SLIDE, &cfg());
        }
        set.record((9, 3), ElementKind::Footer, "Confidential - Draft", &rect(805.0, 962.0), SLIDE, &cfg());
        set.record((9, 4), ElementKind::Text, "Confidentiality matters", &rect(100.0, 300.0), SLIDE, &cfg());
        let verdict = set.finalize(&cfg());
        assert!(verdict.is_watermark((9, 3)));
        assert!(!verdict.is_watermark((9, 4)));
        assert_eq!(verdict.len(), 10);
    }

    #[test]
    fn test_verdict_keep_all() {
        assert!(!WatermarkVerdict::keep_all().is_watermark((0, 0)));
    }
}
