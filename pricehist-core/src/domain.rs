//! Row types flowing through the collector.
//!
//! `RawRow` is what the parser scrapes; `CleanRow` is what survives coercion.
//! The cleaner is the only place that turns one into the other.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel volume text for rows that have no volume cell.
pub const VOLUME_NOT_AVAILABLE: &str = "N/A";

/// Column names, in persisted order.
pub const COLUMNS: [&str; 6] = ["Date", "Open", "High", "Low", "Close", "Volume"];

/// The six columns of the price table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    Date,
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Column {
    pub fn name(self) -> &'static str {
        match self {
            Column::Date => "Date",
            Column::Open => "Open",
            Column::High => "High",
            Column::Low => "Low",
            Column::Close => "Close",
            Column::Volume => "Volume",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Trimmed cell text from one table row. No validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    pub date: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
}

/// Fully typed row.
///
/// `volume` is only `None` when the cleaner runs with an optional-volume
/// policy; under the default policy such rows never get this far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

/// Ordered rows of one run, in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    rows: Vec<CleanRow>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: CleanRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[CleanRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<CleanRow> {
        self.rows
    }

    /// Earliest and latest date, if any rows exist.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.rows.iter().map(|r| r.date).min()?;
        let max = self.rows.iter().map(|r| r.date).max()?;
        Some((min, max))
    }

    /// Content hash of the rows (hex blake3 over their JSON encoding).
    ///
    /// Two runs that scraped identical data report the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(&self.rows).unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }
}

impl From<Vec<CleanRow>> for Dataset {
    fn from(rows: Vec<CleanRow>) -> Self {
        Self { rows }
    }
}

impl FromIterator<CleanRow> for Dataset {
    fn from_iter<I: IntoIterator<Item = CleanRow>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a CleanRow;
    type IntoIter = std::slice::Iter<'a, CleanRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
