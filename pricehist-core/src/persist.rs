//! Dataset persistence: a SQLite table and a CSV file.
//!
//! Both targets are snapshots. Every write replaces whatever was stored under
//! the same table name or path, so repeating a run never duplicates rows. The
//! two writes are independent: one failing does not undo or block the other.

use crate::domain::{CleanRow, Dataset, COLUMNS};
use crate::log::Logger;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{Connection, Row};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Date layout for persisted values.
pub const PERSIST_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to start storage runtime: {0}")]
    Runtime(String),

    #[error("invalid table name: {0:?}")]
    TableName(String),

    #[error("malformed persisted row {row}: {reason}")]
    Schema { row: usize, reason: String },
}

impl PersistError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Create the parent directory of `path` if it has one.
fn ensure_parent_dir(path: &Path) -> Result<(), PersistError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| PersistError::io(parent, e))
        }
        _ => Ok(()),
    }
}

fn render_float(v: f64) -> String {
    v.to_string()
}

fn parse_float(row: usize, column: &str, text: &str) -> Result<f64, PersistError> {
    text.parse::<f64>().map_err(|e| PersistError::Schema {
        row,
        reason: format!("{column} {text:?}: {e}"),
    })
}

fn parse_date(row: usize, text: &str) -> Result<NaiveDate, PersistError> {
    NaiveDate::parse_from_str(text, PERSIST_DATE_FORMAT).map_err(|e| PersistError::Schema {
        row,
        reason: format!("Date {text:?}: {e}"),
    })
}

// ── CSV ──────────────────────────────────────────────────────────────

/// Flat-file target.
pub struct CsvStore {
    path: PathBuf,
    log: Logger,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>, log: Logger) -> Self {
        Self {
            path: path.into(),
            log: log.scoped("persister"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file with the dataset. Returns the number of rows written.
    pub fn write(&self, dataset: &Dataset) -> Result<usize, PersistError> {
        ensure_parent_dir(&self.path)?;

        if self.path.exists() {
            self.log.info(
                "save_to_csv",
                format!("Overwriting existing CSV at {}", self.path.display()),
            );
            fs::remove_file(&self.path).map_err(|e| PersistError::io(&self.path, e))?;
        } else {
            self.log.info(
                "save_to_csv",
                format!("Creating new CSV at {}", self.path.display()),
            );
        }

        let mut wtr = csv::Writer::from_path(&self.path)?;
        wtr.write_record(COLUMNS)?;
        for row in dataset {
            wtr.write_record([
                row.date.format(PERSIST_DATE_FORMAT).to_string(),
                render_float(row.open),
                render_float(row.high),
                render_float(row.low),
                render_float(row.close),
                row.volume.map(render_float).unwrap_or_default(),
            ])?;
        }
        wtr.flush().map_err(|e| PersistError::io(&self.path, e))?;

        self.log.info("save_to_csv", "CSV saved successfully.");
        Ok(dataset.len())
    }

    /// Load the file back into a dataset.
    pub fn read(&self) -> Result<Dataset, PersistError> {
        let mut rdr = csv::Reader::from_path(&self.path)?;
        let mut dataset = Dataset::new();

        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            if record.len() != COLUMNS.len() {
                return Err(PersistError::Schema {
                    row: i,
                    reason: format!("expected {} fields, found {}", COLUMNS.len(), record.len()),
                });
            }
            let volume = match &record[5] {
                "" => None,
                text => Some(parse_float(i, "Volume", text)?),
            };
            dataset.push(CleanRow {
                date: parse_date(i, &record[0])?,
                open: parse_float(i, "Open", &record[1])?,
                high: parse_float(i, "High", &record[2])?,
                low: parse_float(i, "Low", &record[3])?,
                close: parse_float(i, "Close", &record[4])?,
                volume,
            });
        }

        Ok(dataset)
    }

    pub fn row_count(&self) -> Result<usize, PersistError> {
        let mut rdr = csv::Reader::from_path(&self.path)?;
        let mut count = 0;
        for record in rdr.records() {
            record?;
            count += 1;
        }
        Ok(count)
    }
}

// ── SQLite ───────────────────────────────────────────────────────────

/// Relational target: one table in a SQLite file.
///
/// The driver is async; each call runs on its own current-thread runtime so
/// callers stay blocking. The connection lives for exactly one call.
pub struct SqliteStore {
    path: PathBuf,
    table: String,
    log: Logger,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>, table: impl Into<String>, log: Logger) -> Self {
        Self {
            path: path.into(),
            table: table.into(),
            log: log.scoped("persister"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Table names are interpolated into SQL, so only identifiers pass.
    fn checked_table(&self) -> Result<&str, PersistError> {
        let valid = !self.table.is_empty()
            && !self.table.starts_with(|c: char| c.is_ascii_digit())
            && self
                .table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(&self.table)
        } else {
            Err(PersistError::TableName(self.table.clone()))
        }
    }

    fn block_on<F, T>(&self, fut: F) -> Result<T, PersistError>
    where
        F: std::future::Future<Output = Result<T, PersistError>>,
    {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PersistError::Runtime(e.to_string()))?
            .block_on(fut)
    }

    async fn connect(&self, create: bool) -> Result<SqliteConnection, PersistError> {
        let opts = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(create);
        Ok(SqliteConnection::connect_with(&opts).await?)
    }

    /// Replace the table with the dataset. Returns the number of rows written.
    pub fn write(&self, dataset: &Dataset) -> Result<usize, PersistError> {
        self.log.info("save_to_db", "Saving data to SQLite database...");
        let table = self.checked_table()?;
        ensure_parent_dir(&self.path)?;

        if self.path.exists() {
            self.log.info(
                "save_to_db",
                format!("Overwriting existing database at {}", self.path.display()),
            );
        } else {
            self.log.info(
                "save_to_db",
                format!("Creating new database at {}", self.path.display()),
            );
        }

        let written = self.block_on(async {
            let mut conn = self.connect(true).await?;
            let result = replace_table(&mut conn, table, dataset).await;
            // Close even when the write failed; the write error wins.
            let closed = conn.close().await;
            let written = result?;
            closed?;
            Ok(written)
        })?;

        self.log.info(
            "save_to_db",
            format!("Wrote {written} rows to table {table}"),
        );
        Ok(written)
    }

    /// Load the table back into a dataset, in insertion order.
    pub fn read(&self) -> Result<Dataset, PersistError> {
        let table = self.checked_table()?;
        self.block_on(async {
            let mut conn = self.connect(false).await?;
            let result = select_all(&mut conn, table).await;
            let closed = conn.close().await;
            let dataset = result?;
            closed?;
            Ok(dataset)
        })
    }

    pub fn row_count(&self) -> Result<usize, PersistError> {
        let table = self.checked_table()?;
        self.block_on(async {
            let mut conn = self.connect(false).await?;
            let result: Result<i64, sqlx::Error> =
                sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{table}\""))
                    .fetch_one(&mut conn)
                    .await;
            let closed = conn.close().await;
            let count = result?;
            closed?;
            Ok(usize::try_from(count).unwrap_or_default())
        })
    }
}

async fn replace_table(
    conn: &mut SqliteConnection,
    table: &str,
    dataset: &Dataset,
) -> Result<usize, PersistError> {
    let mut tx = conn.begin().await?;

    sqlx::query(&format!("DROP TABLE IF EXISTS \"{table}\""))
        .execute(&mut *tx)
        .await?;
    sqlx::query(&format!(
        "CREATE TABLE \"{table}\" (\
            \"Date\" TEXT, \
            \"Open\" REAL, \
            \"High\" REAL, \
            \"Low\" REAL, \
            \"Close\" REAL, \
            \"Volume\" REAL\
        )"
    ))
    .execute(&mut *tx)
    .await?;

    let insert = format!(
        "INSERT INTO \"{table}\" (\"Date\", \"Open\", \"High\", \"Low\", \"Close\", \"Volume\") \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
    );
    for row in dataset {
        sqlx::query(&insert)
            .bind(row.date.format(PERSIST_DATE_FORMAT).to_string())
            .bind(row.open)
            .bind(row.high)
            .bind(row.low)
            .bind(row.close)
            .bind(row.volume)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(dataset.len())
}

async fn select_all(conn: &mut SqliteConnection, table: &str) -> Result<Dataset, PersistError> {
    let rows = sqlx::query(&format!(
        "SELECT \"Date\", \"Open\", \"High\", \"Low\", \"Close\", \"Volume\" \
         FROM \"{table}\" ORDER BY rowid"
    ))
    .fetch_all(&mut *conn)
    .await?;

    let mut dataset = Dataset::new();
    for (i, row) in rows.iter().enumerate() {
        let date: String = row.try_get("Date")?;
        dataset.push(CleanRow {
            date: parse_date(i, &date)?,
            open: row.try_get("Open")?,
            high: row.try_get("High")?,
            low: row.try_get("Low")?,
            close: row.try_get("Close")?,
            volume: row.try_get("Volume")?,
        });
    }
    Ok(dataset)
}

// ── Both targets ─────────────────────────────────────────────────────

/// Result of one target's write, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WriteStatus {
    Written { rows: usize },
    Failed { error: String },
}

impl WriteStatus {
    pub fn is_written(&self) -> bool {
        matches!(self, WriteStatus::Written { .. })
    }
}

impl From<&Result<usize, PersistError>> for WriteStatus {
    fn from(result: &Result<usize, PersistError>) -> Self {
        match result {
            Ok(rows) => WriteStatus::Written { rows: *rows },
            Err(e) => WriteStatus::Failed {
                error: e.to_string(),
            },
        }
    }
}

/// What happened to each target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistReport {
    pub database: WriteStatus,
    pub csv: WriteStatus,
}

impl PersistReport {
    pub fn all_written(&self) -> bool {
        self.database.is_written() && self.csv.is_written()
    }
}

/// Writes a dataset to both targets, database first.
pub struct Persister {
    db: SqliteStore,
    csv: CsvStore,
    log: Logger,
}

impl Persister {
    pub fn new(db: SqliteStore, csv: CsvStore, log: Logger) -> Self {
        Self {
            db,
            csv,
            log: log.scoped("persister"),
        }
    }

    pub fn database(&self) -> &SqliteStore {
        &self.db
    }

    pub fn csv(&self) -> &CsvStore {
        &self.csv
    }

    /// Run both writes. Failures are logged and reported, never raised.
    pub fn persist(&self, dataset: &Dataset) -> PersistReport {
        let db_result = self.db.write(dataset);
        if let Err(e) = &db_result {
            self.log
                .error("save_to_db", format!("Failed to save database: {e}"));
        }

        let csv_result = self.csv.write(dataset);
        if let Err(e) = &csv_result {
            self.log
                .error("save_to_csv", format!("Failed to save CSV: {e}"));
        }

        PersistReport {
            database: WriteStatus::from(&db_result),
            csv: WriteStatus::from(&csv_result),
        }
    }
}
