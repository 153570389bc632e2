//! Property tests for the parser and cleaner.
//!
//! Uses proptest to verify:
//! 1. Every data row with six or more cells yields exactly one RawRow
//! 2. Rows with fewer than six cells never yield a RawRow
//! 3. Formatted currency values coerce back to the number they render
//! 4. The cleaner never reorders rows and only drops incomplete ones

use chrono::NaiveDate;
use pricehist_core::clean::{clean_rows, coerce_price, VolumePolicy};
use pricehist_core::domain::{Column, RawRow};
use pricehist_core::log::Logger;
use pricehist_core::parse::parse_table;
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Cell text without markup-significant characters, with stray padding.
fn arb_cell() -> impl Strategy<Value = String> {
    ("[A-Za-z0-9,.$ -]{0,12}", " {0,3}", " {0,3}")
        .prop_map(|(body, pre, post)| format!("{pre}{body}{post}"))
}

fn arb_row(min: usize, max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_cell(), min..=max)
}

fn render(rows: &[Vec<String>]) -> String {
    let mut html = String::from("<table><tr><th>Date</th><th>Open</th></tr>");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str("<td>");
            html.push_str(cell);
            html.push_str("</td>");
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");
    html
}

fn arb_cents() -> impl Strategy<Value = u64> {
    0u64..10_000_000_000
}

/// Render cents as `$1,234.56`.
fn currency(cents: u64) -> String {
    let whole = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${grouped}.{:02}", cents % 100)
}

fn arb_raw_row() -> impl Strategy<Value = RawRow> {
    let date = prop_oneof![
        (1u32..=28, 2000i32..2030).prop_map(|(d, y)| format!("Mar {d}, {y}")),
        Just("not a date".to_string()),
    ];
    let price = prop_oneof![
        4 => arb_cents().prop_map(currency),
        1 => Just("N/A".to_string()),
    ];
    let volume = prop_oneof![
        4 => (0u64..1_000_000_000).prop_map(|v| v.to_string()),
        1 => Just("-".to_string()),
    ];
    (date, price.clone(), price.clone(), price.clone(), price, volume).prop_map(
        |(date, open, high, low, close, volume)| RawRow {
            date,
            open,
            high,
            low,
            close,
            volume,
        },
    )
}

// ── 1 & 2. Parser row accounting ─────────────────────────────────────

proptest! {
    /// Rows with six or more cells map one-to-one onto RawRows with trimmed text.
    #[test]
    fn full_rows_map_one_to_one(rows in prop::collection::vec(arb_row(6, 9), 0..20)) {
        let parsed = parse_table(&render(&rows), &Logger::tracing("prop")).unwrap();
        prop_assert_eq!(parsed.len(), rows.len());
        for (raw, cells) in parsed.iter().zip(&rows) {
            prop_assert_eq!(&raw.date, cells[0].trim());
            prop_assert_eq!(&raw.open, cells[1].trim());
            prop_assert_eq!(&raw.high, cells[2].trim());
            prop_assert_eq!(&raw.low, cells[3].trim());
            prop_assert_eq!(&raw.close, cells[4].trim());
            let volume = cells.get(6).map(|c| c.trim()).unwrap_or("N/A");
            prop_assert_eq!(raw.volume.as_str(), volume);
        }
    }

    /// Short rows are invisible to the parser, wherever they appear.
    #[test]
    fn short_rows_never_emit(
        full in prop::collection::vec(arb_row(6, 7), 0..10),
        short in prop::collection::vec(arb_row(0, 5), 0..10),
    ) {
        let mut mixed = Vec::new();
        let mut f = full.iter();
        let mut s = short.iter();
        loop {
            match (s.next(), f.next()) {
                (None, None) => break,
                (a, b) => {
                    mixed.extend(a.cloned());
                    mixed.extend(b.cloned());
                }
            }
        }
        let parsed = parse_table(&render(&mixed), &Logger::tracing("prop")).unwrap();
        prop_assert_eq!(parsed.len(), full.len());
    }
}

// ── 3. Currency coercion ─────────────────────────────────────────────

proptest! {
    #[test]
    fn currency_text_coerces_to_value(cents in arb_cents()) {
        let text = currency(cents);
        let value = coerce_price(Column::Open, &text).unwrap();
        prop_assert!((value - cents as f64 / 100.0).abs() < 1e-6, "{} -> {}", text, value);
    }
}

// ── 4. Cleaner order and drop rule ───────────────────────────────────

proptest! {
    #[test]
    fn cleaner_keeps_complete_rows_in_order(rows in prop::collection::vec(arb_raw_row(), 0..40)) {
        let summary = clean_rows(&rows, VolumePolicy::Required, &Logger::tracing("prop"));

        let expected: Vec<NaiveDate> = rows
            .iter()
            .filter(|r| {
                r.date != "not a date"
                    && [&r.open, &r.high, &r.low, &r.close].iter().all(|p| p.as_str() != "N/A")
                    && r.volume != "-"
            })
            .map(|r| NaiveDate::parse_from_str(&r.date, "%b %d, %Y").unwrap())
            .collect();
        let kept: Vec<NaiveDate> = summary.dataset.rows().iter().map(|r| r.date).collect();

        prop_assert_eq!(kept, expected);
        prop_assert_eq!(summary.dropped, rows.len() - summary.dataset.len());
    }
}
