//! Text cleanup: LaTeX-style escapes to Unicode, invisible characters out.
//!
//! The parser reports inline math verbatim (`$360^{\circ}$`, `$\pm 5\%$`).
//! Slides cannot render it, so every text payload goes through
//! [`clean_text`] before it reaches a renderer.
//!
//! ## Rule Order
//!
//! Invisible characters go first so they cannot split a command name.
//! Escaped `\$` and `\%` are protected before the substitution table runs;
//! math delimiters and script markers are stripped last, and only when the
//! text actually contained math.

use crate::model::Payload;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

/// Stand-in for an escaped dollar sign while math delimiters are stripped.
const DOLLAR_PLACEHOLDER: char = '\u{E000}';

/// Apply every cleanup rule to one text payload.
///
/// `table` maps LaTeX commands (with their leading backslash) to
/// replacement text and is applied in order.
pub fn clean_text(input: &str, table: &[(String, String)]) -> String {
    let s = remove_invisible_chars(input);
    let s = normalise_line_endings(&s);
    replace_latex(&s, table)
}

/// Visible characters of cleaned text, counted over trimmed non-empty lines.
pub fn display_chars(text: &str) -> usize {
    text.lines().map(|l| l.trim().chars().count()).sum()
}

/// Characters a payload shows once cleaned; drives font estimation.
pub fn payload_chars(payload: &Payload, table: &[(String, String)]) -> usize {
    let count = |t: &str| display_chars(&clean_text(t, table));
    match payload {
        Payload::Text { text } => count(text),
        Payload::List { items } => items.iter().map(|i| count(&i.text)).sum(),
        Payload::Table { text, .. } => text.as_deref().map_or(0, count),
        Payload::Image { .. } => 0,
    }
}

// ── Rule 1: Invisible and control characters ─────────────────────────────────

/// Drop zero-width characters, BOMs, soft hyphens and C0/C1 controls other
/// than newline and tab.
pub fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|&c| {
            !matches!(
                c,
                '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}'
            ) && (!c.is_control() || c == '\n' || c == '\t' || c == '\r')
        })
        .collect()
}

// ── Rule 2: Line endings ─────────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: LaTeX ────────────────────────────────────────────────────────────

static RE_DEGREES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\s*(\d+(?:\.\d+)?)\s*\^\s*(?:\{\s*\\circ\s*\}|\\circ)\s*\$").unwrap());
static RE_BRACED_MATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]+)\}\$").unwrap());
static RE_SUPERSCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\^\{([^}]+)\}").unwrap());
static RE_SUBSCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"_\{([^}]+)\}").unwrap());
static RE_BARE_DEGREE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\^\s*°").unwrap());
static RE_INLINE_MATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([^$]+)\$").unwrap());
static RE_COMMAND: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\[A-Za-z]+").unwrap());
static RE_COMMAND_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\\[A-Za-z]+$").unwrap());

/// Convert LaTeX-style escapes to plain Unicode text.
///
/// Text with no `$` and no backslash is returned unchanged, so literal
/// braces in ordinary prose survive.
pub fn replace_latex(input: &str, table: &[(String, String)]) -> String {
    if !input.contains('$') && !input.contains('\\') {
        return input.to_string();
    }

    let mut s = input
        .replace(r"\$", &DOLLAR_PLACEHOLDER.to_string())
        .replace(r"\%", "%");

    s = RE_DEGREES.replace_all(&s, "${1}°").into_owned();

    s = replace_commands(&s, table);

    s = RE_BRACED_MATH.replace_all(&s, "${1}").into_owned();
    s = RE_SUPERSCRIPT.replace_all(&s, "${1}").into_owned();
    s = RE_SUBSCRIPT.replace_all(&s, "${1}").into_owned();
    s = RE_BARE_DEGREE.replace_all(&s, "°").into_owned();
    s = RE_INLINE_MATH.replace_all(&s, "${1}").into_owned();
    s = s.replace(['$', '{', '}'], "");

    s.replace(DOLLAR_PLACEHOLDER, "$")
}

/// Substitute table entries.
///
/// Command entries (`\name`) match whole command names only, so `\cdot`
/// never rewrites the front of `\cdots`; unknown commands are kept. Other
/// entries are replaced verbatim afterwards. The first entry for a key wins.
fn replace_commands(input: &str, table: &[(String, String)]) -> String {
    let mut commands: HashMap<&str, &str> = HashMap::new();
    let mut literals: Vec<(&str, &str)> = Vec::new();
    for (key, replacement) in table {
        if key.is_empty() {
            continue;
        }
        if RE_COMMAND_NAME.is_match(key) {
            commands.entry(key.as_str()).or_insert(replacement.as_str());
        } else {
            literals.push((key.as_str(), replacement.as_str()));
        }
    }

    let mut s = RE_COMMAND
        .replace_all(input, |caps: &Captures<'_>| {
            let name = &caps[0];
            commands.get(name).copied().unwrap_or(name).to_string()
        })
        .into_owned();
    for (key, replacement) in literals {
        s = s.replace(key, replacement);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_latex_substitutions;
    use crate::model::ListItem;

    fn clean(s: &str) -> String {
        clean_text(s, &default_latex_substitutions())
    }

    #[test]
    fn test_circ_becomes_degree_glyph() {
        assert_eq!(clean(r"rotate by 90\circ"), "rotate by 90°");
        assert_eq!(clean(r"a $360^{\circ}$ turn"), "a 360° turn");
        assert_eq!(clean(r"a $360^\circ$ turn"), "a 360° turn");
    }

    #[test]
    fn test_operators() {
        assert_eq!(clean(r"$3 \times 4$"), "3 × 4");
        assert_eq!(clean(r"$x \leq 5$ and $y \neq 2$"), "x ≤ 5 and y ≠ 2");
        assert_eq!(clean(r"$\pm 5\%$"), "± 5%");
    }

    #[test]
    fn test_scripts_are_flattened() {
        assert_eq!(clean(r"$H_{2}O$"), "H2O");
        assert_eq!(clean(r"$E = mc^{2}$"), "E = mc2");
    }

    #[test]
    fn test_escaped_dollar_survives() {
        assert_eq!(clean(r"costs \$5 per unit"), "costs $5 per unit");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(clean("use {braces} freely"), "use {braces} freely");
        assert_eq!(clean("Chapter 1"), "Chapter 1");
    }

    #[test]
    fn test_invisible_chars_removed() {
        assert_eq!(clean("a\u{200B}b\u{FEFF}c\u{0007}"), "abc");
        assert_eq!(clean("line1\r\nline2"), "line1\nline2");
    }

    #[test]
    fn test_longer_commands_are_not_split() {
        assert_eq!(clean(r"$1, 2, \cdots, n$"), "1, 2, ⋯, n");
        assert_eq!(clean(r"$a \cdot b$"), "a · b");
        assert_eq!(clean(r"$a_1, \ldots, a_n$"), "a_1, …, a_n");
        assert_eq!(clean(r"$a \simeq b$"), r"a \simeq b");
        assert_eq!(clean(r"$x \leqslant y$"), r"x \leqslant y");
        assert_eq!(clean(r"\circledast and \circ"), r"\circledast and °");
    }

    #[test]
    fn test_first_table_entry_wins() {
        let table = vec![
            (r"\pm".to_string(), "±".to_string()),
            (r"\pm".to_string(), "+/-".to_string()),
        ];
        assert_eq!(clean_text(r"5 \pm 1", &table), "5 ± 1");
    }

    #[test]
    fn test_custom_table() {
        let table = vec![(r"\heart".to_string(), "♥".to_string())];
        assert_eq!(clean_text(r"I \heart Rust", &table), "I ♥ Rust");
    }

    #[test]
    fn test_payload_chars_count_cleaned_text() {
        let table = default_latex_substitutions();
        let text = Payload::Text { text: "  $360^{\\circ}$ \u{200B}\n\n".into() };
        assert_eq!(payload_chars(&text, &table), 4);
        let list = Payload::List {
            items: vec![
                ListItem { text: "abc".into(), level: 0, ordered: false },
                ListItem { text: "$\\alpha$".into(), level: 1, ordered: false },
            ],
        };
        assert_eq!(payload_chars(&list, &table), 4);
        let image = Payload::Image { image_ref: "a.png".into() };
        assert_eq!(payload_chars(&image, &table), 0);
    }
}
