//! Price table parser.
//!
//! Finds the first `<table>` element in the page and turns each data row into
//! a [`RawRow`]. Markup inside comments and scripts is not an element. The
//! first `<tr>` is the header and is skipped. Rows with fewer than six `<td>`
//! cells (dividend notes, footnotes) are ignored. A row that cannot be
//! extracted is logged and skipped; only a missing table fails the parse.

use crate::domain::{RawRow, VOLUME_NOT_AVAILABLE};
use crate::html::{
    cell_text, find_close_tag, find_open_tag, mask_raw_text, tag_end, to_lowercase_fast,
};
use crate::log::Logger;
use thiserror::Error;

/// Minimum `<td>` count for a data row.
pub const MIN_CELLS: usize = 6;

/// Cell index holding volume; index 5 (adjusted close) is unused.
const VOLUME_CELL: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no table found in HTML content")]
    NoTable,
}

/// Failure to extract a single row. Never fatal for the parse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("unterminated <{tag}> tag at offset {offset}")]
    UnterminatedTag { tag: &'static str, offset: usize },
}

/// Parse the first table of `markup` into raw rows, in source order.
///
/// An empty result means the table had no usable data rows.
pub fn parse_table(markup: &str, log: &Logger) -> Result<Vec<RawRow>, ParseError> {
    log.info("parse", "Parsing HTML content...");

    let lc = mask_raw_text(&to_lowercase_fast(markup));
    let table_start = find_open_tag(&lc, "table", 0).ok_or(ParseError::NoTable)?;
    let body_start = tag_end(markup, table_start).ok_or(ParseError::NoTable)?;
    let body_end = find_close_tag(&lc, "table", body_start).unwrap_or(markup.len());

    let body = &markup[body_start..body_end];
    let body_lc = &lc[body_start..body_end];

    let mut rows = Vec::new();
    for (index, (start, end)) in row_spans(body_lc).into_iter().enumerate().skip(1) {
        match extract_row(&body[start..end], &body_lc[start..end]) {
            Ok(Some(row)) => rows.push(row),
            Ok(None) => {}
            Err(e) => log.warn("parse", format!("Skipping row {index} due to error: {e}")),
        }
    }

    log.debug("parse", format!("Parsed {} rows", rows.len()));
    Ok(rows)
}

/// Byte spans of each `<tr>` in a table body. A row runs to its `</tr>`, or to
/// the next `<tr>` when the end tag is omitted.
fn row_spans(lc: &str) -> Vec<(usize, usize)> {
    let mut starts = Vec::new();
    let mut pos = 0;
    while let Some(start) = find_open_tag(lc, "tr", pos) {
        starts.push(start);
        pos = start + 3;
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let limit = starts.get(i + 1).copied().unwrap_or(lc.len());
            let end = find_close_tag(&lc[..limit], "tr", start).unwrap_or(limit);
            (start, end)
        })
        .collect()
}

/// Extract one row. `Ok(None)` for rows with too few cells.
fn extract_row(row: &str, row_lc: &str) -> Result<Option<RawRow>, RowError> {
    let cells = extract_cells(row, row_lc)?;
    if cells.len() < MIN_CELLS {
        return Ok(None);
    }

    let volume = cells
        .get(VOLUME_CELL)
        .cloned()
        .unwrap_or_else(|| VOLUME_NOT_AVAILABLE.to_string());

    let mut cells = cells.into_iter();
    let mut next = || cells.next().unwrap_or_default();
    Ok(Some(RawRow {
        date: next(),
        open: next(),
        high: next(),
        low: next(),
        close: next(),
        volume,
    }))
}

/// Text of every `<td>` in a row. `<th>` cells are not data cells.
fn extract_cells(row: &str, row_lc: &str) -> Result<Vec<String>, RowError> {
    let mut cells = Vec::new();
    let mut pos = 0;

    while let Some(start) = find_open_tag(row_lc, "td", pos) {
        let content_start = tag_end(row, start).ok_or(RowError::UnterminatedTag {
            tag: "td",
            offset: start,
        })?;

        // A cell ends at </td>, or at the next cell when the end tag is omitted.
        let content_end = [
            find_close_tag(row_lc, "td", content_start),
            find_open_tag(row_lc, "td", content_start),
            find_open_tag(row_lc, "th", content_start),
        ]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(row.len());

        cells.push(cell_text(&row[content_start..content_end]));
        pos = content_end;
    }

    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{Level, MemorySink};
    use std::sync::Arc;

    const HEADER: &str = "<tr><th>Date</th><th>Open</th><th>High</th><th>Low</th>\
                          <th>Close</th><th>Adj Close</th><th>Volume</th></tr>";

    fn table(rows: &[&str]) -> String {
        format!("<html><body><table>{HEADER}{}</table></body></html>", rows.concat())
    }

    fn quiet() -> Logger {
        Logger::tracing("test")
    }

    #[test]
    fn extracts_full_row() {
        let html = table(&["<tr><td>Jan 5, 2024</td><td> 1,234.50 </td><td>1,240.00</td>\
                            <td>1,220.10</td><td>1,230.00</td><td>1,230.00</td><td>12,345</td></tr>"]);
        let rows = parse_table(&html, &quiet()).unwrap();
        assert_eq!(
            rows,
            vec![RawRow {
                date: "Jan 5, 2024".into(),
                open: "1,234.50".into(),
                high: "1,240.00".into(),
                low: "1,220.10".into(),
                close: "1,230.00".into(),
                volume: "12,345".into(),
            }]
        );
    }

    #[test]
    fn six_cells_gets_volume_sentinel() {
        let html = table(&["<tr><td>Jan 5, 2024</td><td>1</td><td>2</td><td>3</td><td>4</td><td>5</td></tr>"]);
        let rows = parse_table(&html, &quiet()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].volume, VOLUME_NOT_AVAILABLE);
    }

    #[test]
    fn short_rows_are_skipped_silently() {
        let sink = Arc::new(MemorySink::new());
        let log = Logger::new(sink.clone(), "parser");
        let html = table(&[
            "<tr><td>Mar 5, 2024</td><td colspan=\"6\">0.04 Dividend</td></tr>",
            "<tr><td colspan=\"7\">*Close price adjusted for splits.</td></tr>",
        ]);
        let rows = parse_table(&html, &log).unwrap();
        assert!(rows.is_empty());
        assert_eq!(sink.count(Level::Warn), 0);
    }

    #[test]
    fn header_row_is_skipped_even_with_td_cells() {
        let html = "<table><tr><td>Date</td><td>Open</td><td>High</td><td>Low</td>\
                    <td>Close</td><td>Adj</td><td>Volume</td></tr>\
                    <tr><td>Jan 2, 2024</td><td>1</td><td>2</td><td>3</td><td>4</td><td>5</td><td>6</td></tr></table>";
        let rows = parse_table(html, &quiet()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, "Jan 2, 2024");
    }

    #[test]
    fn missing_table_is_fatal() {
        let err = parse_table("<html><body><p>blocked</p></body></html>", &quiet()).unwrap_err();
        assert_eq!(err, ParseError::NoTable);
    }

    #[test]
    fn table_without_rows_is_empty_not_error() {
        let rows = parse_table("<table></table>", &quiet()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn only_first_table_is_read() {
        let first = table(&["<tr><td>Jan 2, 2024</td><td>1</td><td>2</td><td>3</td><td>4</td><td>5</td><td>6</td></tr>"]);
        let second = table(&["<tr><td>Feb 2, 2024</td><td>1</td><td>2</td><td>3</td><td>4</td><td>5</td><td>6</td></tr>"]);
        let rows = parse_table(&format!("{first}{second}"), &quiet()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, "Jan 2, 2024");
    }

    #[test]
    fn omitted_end_tags_still_split_rows_and_cells() {
        let html = "<TABLE><TR><TH>Date<TH>Open\
                    <TR><TD>Jan 2, 2024<TD>1<TD>2<TD>3<TD>4<TD>5<TD>6\
                    <TR><TD>Jan 3, 2024<TD>7<TD>8<TD>9<TD>10<TD>11<TD>12\
                    </TABLE>";
        let rows = parse_table(html, &quiet()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].close, "4");
        assert_eq!(rows[0].volume, "6");
        assert_eq!(rows[1].date, "Jan 3, 2024");
        assert_eq!(rows[1].volume, "12");
    }

    #[test]
    fn broken_row_is_warned_and_skipped() {
        let sink = Arc::new(MemorySink::new());
        let log = Logger::new(sink.clone(), "parser");
        let html = table(&[
            "<tr><td>Jan 2, 2024</td><td>1</td><td>2</td><td>3</td><td>4</td><td>5</td><td>6</td></tr>",
            "<tr><td>Jan 3, 2024</td><td>1</td><td>2</td><td>3</td><td>4</td><td>5</td><td class=\"x\"",
        ]);
        let rows = parse_table(&html, &log).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(sink.contains(Level::Warn, "Skipping row 2 due to error"));
    }

    const DATA_ROW: &str =
        "<tr><td>Jan 2, 2024</td><td>1</td><td>2</td><td>3</td><td>4</td><td>5</td><td>6</td></tr>";

    #[test]
    fn commented_out_table_is_not_the_first_table() {
        let html = format!(
            "<html><!-- old layout: <table></table> --><body><table>{HEADER}{DATA_ROW}</table></body></html>"
        );
        let rows = parse_table(&html, &quiet()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, "Jan 2, 2024");
    }

    #[test]
    fn table_markup_inside_script_is_ignored() {
        let html = format!(
            "<html><head><script>var tpl = \"<table></table>\";</script>\
             <style>table {{ width: 100% }}</style></head>\
             <body><table>{HEADER}{DATA_ROW}</table></body></html>"
        );
        let rows = parse_table(&html, &quiet()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].volume, "6");
    }

    #[test]
    fn page_with_only_commented_table_has_no_table() {
        let html = format!("<html><!-- <table>{HEADER}{DATA_ROW}</table> --></html>");
        assert_eq!(parse_table(&html, &quiet()), Err(ParseError::NoTable));
    }

    #[test]
    fn quoted_angle_bracket_in_cell_attribute_stays_out_of_text() {
        let html = table(&["<tr><td title=\"open > close\">Jan 2, 2024</td><td>1</td><td>2</td>\
                            <td>3</td><td>4</td><td>5</td><td data-v='a>b'>6</td></tr>"]);
        let rows = parse_table(&html, &quiet()).unwrap();
        assert_eq!(rows[0].date, "Jan 2, 2024");
        assert_eq!(rows[0].volume, "6");
    }
}
