//! Font-size estimation from box geometry.
//!
//! The parser reports no font metadata, so sizes are inferred from how much
//! text has to fit into how much room. All inputs are slide points; the
//! result is an integer point size inside the category's configured range.
//!
//! Two regimes:
//!
//! * **Single line**: short text in a wide box. The box height is the
//!   signal: `size = height × single_line_height_ratio`.
//! * **Multi line**: each character occupies roughly
//!   `char_area_factor × size²`, so `size = √(area / (factor × chars))`,
//!   capped at `height × max_height_ratio`.
//!
//! Both are then multiplied by `scale` and floored before clamping.

use crate::config::{FontConfig, FontRange};
use crate::model::ElementKind;
use crate::output::Rect;

/// The clamp range applied to a category.
pub fn category_range(kind: ElementKind, fonts: &FontConfig) -> FontRange {
    match kind {
        ElementKind::Title => fonts.title,
        ElementKind::List => fonts.list,
        ElementKind::Table => fonts.table,
        ElementKind::Footer => FontRange::new(fonts.footer, fonts.footer),
        ElementKind::Text | ElementKind::Image => fonts.general,
    }
}

/// Font size for an element of `kind` occupying `rect` with `chars`
/// characters of text.
///
/// Deterministic: identical inputs always give the identical size.
pub fn estimate(kind: ElementKind, rect: &Rect, chars: usize, fonts: &FontConfig) -> u32 {
    let range = category_range(kind, fonts);
    if kind == ElementKind::Footer {
        return fonts.footer;
    }
    if chars == 0 {
        return range.clamp(fonts.empty_text);
    }
    let raw = raw_size(rect.width, rect.height, chars, fonts) * fonts.scale;
    if !raw.is_finite() || raw <= 0.0 {
        return range.min;
    }
    range.clamp(raw.floor().min(u32::MAX as f64) as u32)
}

/// Unscaled, unclamped estimate in points.
fn raw_size(width: f64, height: f64, chars: usize, fonts: &FontConfig) -> f64 {
    let aspect = if height > 0.0 { width / height } else { 0.0 };
    if chars < fonts.single_line_max_chars && aspect > fonts.single_line_min_aspect {
        return height * fonts.single_line_height_ratio;
    }
    let area = width * height;
    let by_area = (area / (fonts.char_area_factor * chars as f64)).sqrt();
    by_area.min(height * fonts.max_height_ratio)
}

/// Font size for every cell of a table row `row_height` points tall.
///
/// Cells scale with their own row, not the whole table; the result always
/// lies in the table range.
pub fn table_cell_size(row_height: f64, fonts: &FontConfig) -> u32 {
    let raw = row_height * fonts.table_cell_height_ratio;
    if !raw.is_finite() || raw <= 0.0 {
        return fonts.table.min;
    }
    fonts.table.clamp(raw.floor().min(u32::MAX as f64) as u32)
}

/// Whether text of `chars` characters should word-wrap.
pub fn wraps(chars: usize, fonts: &FontConfig) -> bool {
    chars > fonts.no_wrap_max_chars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fonts() -> FontConfig {
        FontConfig::default()
    }

    #[test]
    fn test_title_chapter_hits_top_of_title_range() {
        let f = fonts();
        let rect = Rect::new(100.0, 80.0, 900.0, 120.0);
        let size = estimate(ElementKind::Title, &rect, "Chapter 1".chars().count(), &f);
        assert!(size >= f.title.max - 2, "got {size}");
        assert!(f.title.contains(size));
    }

    #[test]
    fn test_title_in_square_box_still_large() {
        let f = fonts();
        let rect = Rect::new(0.0, 0.0, 600.0, 300.0);
        let size = estimate(ElementKind::Title, &rect, 9, &f);
        assert_eq!(size, f.title.max);
    }

    #[test]
    fn test_dense_paragraph_gets_small_font() {
        let f = fonts();
        let rect = Rect::new(0.0, 0.0, 400.0, 100.0);
        let size = estimate(ElementKind::Text, &rect, 900, &f);
        // √(40000 / 720) ≈ 7.45 → ×0.95 → 7 → clamped to 10.
        assert_eq!(size, f.general.min);
    }

    #[test]
    fn test_multiline_closed_form() {
        let f = fonts();
        let rect = Rect::new(0.0, 0.0, 500.0, 200.0);
        // √(100000 / (0.8 × 200)) = 25 → ×0.95 = 23.75 → 23
        assert_eq!(estimate(ElementKind::Text, &rect, 200, &f), 23);
    }

    #[test]
    fn test_single_line_uses_height() {
        let f = fonts();
        let rect = Rect::new(0.0, 0.0, 300.0, 40.0);
        // 40 × 0.7 = 28 → ×0.95 = 26.6 → 26
        assert_eq!(estimate(ElementKind::Text, &rect, 10, &f), 26);
    }

    #[test]
    fn test_footer_is_fixed() {
        let f = fonts();
        let rect = Rect::new(0.0, 0.0, 800.0, 200.0);
        assert_eq!(estimate(ElementKind::Footer, &rect, 3, &f), f.footer);
    }

    #[test]
    fn test_empty_text() {
        let f = fonts();
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(estimate(ElementKind::Text, &rect, 0, &f), 14);
        assert_eq!(estimate(ElementKind::Title, &rect, 0, &f), f.title.min);
    }

    #[test]
    fn test_list_capped() {
        let f = fonts();
        let rect = Rect::new(0.0, 0.0, 800.0, 400.0);
        assert_eq!(estimate(ElementKind::List, &rect, 20, &f), f.list.max);
    }

    #[test]
    fn test_degenerate_rect_gets_minimum() {
        let f = fonts();
        let rect = Rect::new(0.0, 0.0, 0.0, 0.0);
        assert_eq!(estimate(ElementKind::Text, &rect, 40, &f), f.general.min);
    }

    #[test]
    fn test_sizes_stay_in_range_and_are_deterministic() {
        let f = fonts();
        for w in [1.0, 12.5, 80.0, 300.0, 1152.0] {
            for h in [1.0, 9.0, 33.3, 200.0, 648.0] {
                for chars in [0, 1, 5, 14, 15, 60, 400, 5000] {
                    let rect = Rect::new(0.0, 0.0, w, h);
                    for kind in [ElementKind::Text, ElementKind::Title, ElementKind::List] {
                        let a = estimate(kind, &rect, chars, &f);
                        let b = estimate(kind, &rect, chars, &f);
                        assert_eq!(a, b);
                        assert!(category_range(kind, &f).contains(a), "{kind} {w}x{h} {chars}: {a}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_table_cells_in_table_range() {
        let f = fonts();
        for h in [0.0, 1.0, 10.0, 20.0, 25.0, 100.0, 1e6, f64::NAN] {
            let s = table_cell_size(h, &f);
            assert!((10..=16).contains(&s), "{h}: {s}");
        }
        // 25 × 0.6 = 15
        assert_eq!(table_cell_size(25.0, &f), 15);
    }

    #[test]
    fn test_short_text_does_not_wrap() {
        let f = fonts();
        assert!(!wraps(6, &f));
        assert!(wraps(7, &f));
    }
}
