//! HTML table markup → cell grid.
//!
//! The parser emits tables as loose HTML (`<table><tr><td>…`), often with
//! unclosed `<br>` tags and HTML entities. The reader is configured to
//! tolerate mismatched end tags; anything it still rejects, or a table that
//! never closes, is reported so the renderer can fall back.

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Why a table could not be turned into a grid.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TableParseError {
    #[error("markup is not well-formed: {0}")]
    Markup(String),

    #[error("no <table> element in markup")]
    NoTable,

    #[error("table is never closed")]
    Unclosed,

    #[error("table has no cells")]
    Empty,
}

/// Rows of cell texts. Rows may have different lengths.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableGrid {
    pub rows: Vec<Vec<String>>,
}

impl TableGrid {
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cell texts joined row by row, tab-separated.
    pub fn to_text(&self) -> String {
        self.rows
            .iter()
            .map(|r| r.join("\t"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Parse the first `<table>` in `markup`.
///
/// `colspan` is honoured by padding with empty cells; `rowspan` is not.
/// Nested tables are flattened into the enclosing cell's text.
pub fn parse_table(markup: &str) -> Result<TableGrid, TableParseError> {
    let mut reader = Reader::from_str(markup);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut grid = TableGrid::default();
    let mut depth = 0usize;
    let mut finished = false;
    let mut row: Option<Vec<String>> = None;
    let mut cell: Option<(String, usize)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = e.name();
                let name = name.as_ref();
                if name.eq_ignore_ascii_case(b"table") {
                    depth += 1;
                } else if depth == 1 && name.eq_ignore_ascii_case(b"tr") {
                    close_row(&mut grid, &mut row, &mut cell);
                    row = Some(Vec::new());
                } else if depth == 1 && is_cell(name) {
                    close_cell(&mut row, &mut cell);
                    row.get_or_insert_with(Vec::new);
                    cell = Some((String::new(), colspan(e)));
                } else if depth >= 1 && name.eq_ignore_ascii_case(b"br") {
                    push_break(&mut cell);
                }
            }
            Ok(Event::Empty(ref e)) => {
                let name = e.name();
                let name = name.as_ref();
                if depth >= 1 && name.eq_ignore_ascii_case(b"br") {
                    push_break(&mut cell);
                } else if depth == 1 && is_cell(name) {
                    close_cell(&mut row, &mut cell);
                    row.get_or_insert_with(Vec::new).push(String::new());
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                let name = name.as_ref();
                if name.eq_ignore_ascii_case(b"table") && depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        close_row(&mut grid, &mut row, &mut cell);
                        finished = true;
                        break;
                    }
                } else if depth == 1 && name.eq_ignore_ascii_case(b"tr") {
                    close_row(&mut grid, &mut row, &mut cell);
                } else if depth == 1 && is_cell(name) {
                    close_cell(&mut row, &mut cell);
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some((text, _)) = cell.as_mut() {
                    let chunk = e
                        .unescape_with(resolve_html_entity)
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&e[..]).into_owned());
                    if !text.is_empty() && !text.ends_with('\n') {
                        text.push(' ');
                    }
                    text.push_str(chunk.trim());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(TableParseError::Markup(e.to_string())),
            _ => {}
        }
    }

    if !finished {
        return Err(if depth == 0 {
            TableParseError::NoTable
        } else {
            TableParseError::Unclosed
        });
    }
    if grid.rows.iter().all(Vec::is_empty) {
        return Err(TableParseError::Empty);
    }
    Ok(grid)
}

fn is_cell(name: &[u8]) -> bool {
    name.eq_ignore_ascii_case(b"td") || name.eq_ignore_ascii_case(b"th")
}

fn colspan(e: &BytesStart<'_>) -> usize {
    e.html_attributes()
        .flatten()
        .find(|a| a.key.as_ref().eq_ignore_ascii_case(b"colspan"))
        .and_then(|a| std::str::from_utf8(&a.value).ok()?.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, 64)
}

fn push_break(cell: &mut Option<(String, usize)>) {
    if let Some((text, _)) = cell.as_mut() {
        text.push('\n');
    }
}

fn close_cell(row: &mut Option<Vec<String>>, cell: &mut Option<(String, usize)>) {
    if let Some((text, span)) = cell.take() {
        let r = row.get_or_insert_with(Vec::new);
        r.push(text.trim().to_string());
        r.extend(std::iter::repeat(String::new()).take(span - 1));
    }
}

fn close_row(
    grid: &mut TableGrid,
    row: &mut Option<Vec<String>>,
    cell: &mut Option<(String, usize)>,
) {
    close_cell(row, cell);
    if let Some(r) = row.take() {
        if !r.is_empty() {
            grid.rows.push(r);
        }
    }
}

fn resolve_html_entity(entity: &str) -> Option<&'static str> {
    resolve_predefined_entity(entity).or(match entity {
        "nbsp" => Some(" "),
        "ndash" => Some("–"),
        "mdash" => Some("—"),
        "deg" => Some("°"),
        "plusmn" => Some("±"),
        "times" => Some("×"),
        "middot" => Some("·"),
        "hellip" => Some("…"),
        _ => None,
    })
}
