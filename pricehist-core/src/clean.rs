//! Type coercion and row filtering.
//!
//! Each column is coerced on its own and yields a per-field `Result`. A row
//! becomes a [`CleanRow`] only when every required field coerced; otherwise it
//! is dropped and the failures are logged at debug level. Output keeps input
//! order.

use crate::domain::{CleanRow, Column, Dataset, RawRow};
use crate::log::Logger;
use chrono::NaiveDate;
use thiserror::Error;

/// Date layout the source renders, e.g. `Jan 5, 2024`.
pub const DATE_FORMAT: &str = "%b %d, %Y";

/// Volume placeholder meaning "no data".
pub const VOLUME_PLACEHOLDER: &str = "-";

/// A field that did not coerce. The row carrying it is missing a value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{column}: cannot coerce {raw:?}")]
pub struct CoercionError {
    pub column: Column,
    pub raw: String,
}

impl CoercionError {
    fn new(column: Column, raw: &str) -> Self {
        Self {
            column,
            raw: raw.to_string(),
        }
    }
}

/// Whether a missing volume disqualifies a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VolumePolicy {
    #[default]
    Required,
    Optional,
}

impl VolumePolicy {
    pub fn from_required(required: bool) -> Self {
        if required {
            VolumePolicy::Required
        } else {
            VolumePolicy::Optional
        }
    }
}

/// Outcome of a cleaning pass.
#[derive(Debug, Clone, Default)]
pub struct CleanSummary {
    pub dataset: Dataset,
    pub rows_in: usize,
    pub dropped: usize,
}

/// Currency value: `$` prefix and `,` separators removed, then `f64`.
pub fn coerce_price(column: Column, raw: &str) -> Result<f64, CoercionError> {
    let text = raw.trim().trim_start_matches('$').replace(',', "");
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CoercionError::new(column, raw))
}

/// Volume: `-` or unparseable text is missing.
pub fn coerce_volume(raw: &str) -> Result<f64, CoercionError> {
    let trimmed = raw.trim();
    if trimmed == VOLUME_PLACEHOLDER {
        return Err(CoercionError::new(Column::Volume, raw));
    }
    trimmed
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CoercionError::new(Column::Volume, raw))
}

pub fn coerce_date(raw: &str) -> Result<NaiveDate, CoercionError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| CoercionError::new(Column::Date, raw))
}

/// Coerce every field of a row, collecting all failures.
pub fn coerce_row(row: &RawRow, policy: VolumePolicy) -> Result<CleanRow, Vec<CoercionError>> {
    let date = coerce_date(&row.date);
    let open = coerce_price(Column::Open, &row.open);
    let high = coerce_price(Column::High, &row.high);
    let low = coerce_price(Column::Low, &row.low);
    let close = coerce_price(Column::Close, &row.close);
    let volume = match (coerce_volume(&row.volume), policy) {
        (Ok(v), _) => Ok(Some(v)),
        (Err(_), VolumePolicy::Optional) => Ok(None),
        (Err(e), VolumePolicy::Required) => Err(e),
    };

    match (date, open, high, low, close, volume) {
        (Ok(date), Ok(open), Ok(high), Ok(low), Ok(close), Ok(volume)) => Ok(CleanRow {
            date,
            open,
            high,
            low,
            close,
            volume,
        }),
        (date, open, high, low, close, volume) => {
            let errors = [
                date.err(),
                open.err(),
                high.err(),
                low.err(),
                close.err(),
                volume.err(),
            ];
            Err(errors.into_iter().flatten().collect())
        }
    }
}

/// Coerce all rows and drop the incomplete ones.
pub fn clean_rows(rows: &[RawRow], policy: VolumePolicy, log: &Logger) -> CleanSummary {
    log.info("clean", "Cleaning data...");

    let mut dataset = Dataset::new();
    for (index, row) in rows.iter().enumerate() {
        match coerce_row(row, policy) {
            Ok(clean) => dataset.push(clean),
            Err(errors) => {
                let reasons: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                log.debug(
                    "clean",
                    format!("Dropping row {index} ({}): {}", row.date, reasons.join("; ")),
                );
            }
        }
    }

    let dropped = rows.len() - dataset.len();
    log.info("clean", format!("Dropped {dropped} incomplete rows."));

    CleanSummary {
        dataset,
        rows_in: rows.len(),
        dropped,
    }
}
