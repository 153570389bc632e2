//! pricehist core: collect a historical price table from a web page.
//!
//! The collector runs four stages in sequence:
//! - Fetch the page markup (HTTP, or a saved file)
//! - Parse the first `<table>` into raw string rows
//! - Clean: coerce to typed rows, dropping incomplete ones
//! - Persist the dataset to a SQLite table and a CSV file, both full overwrite
//!
//! Logging is injected through [`log::Logger`]; nothing here installs a global
//! subscriber.

pub mod clean;
pub mod config;
pub mod domain;
pub mod fetch;
pub mod html;
pub mod log;
pub mod parse;
pub mod persist;
pub mod pipeline;

pub use clean::{clean_rows, CleanSummary, CoercionError, VolumePolicy};
pub use config::{CollectorConfig, ConfigError};
pub use domain::{CleanRow, Column, Dataset, RawRow};
pub use fetch::{FetchError, FileSource, HttpSource, MarkupSource};
pub use log::{Level, LogSink, Logger, MemorySink, TracingSink};
pub use parse::{parse_table, ParseError};
pub use persist::{CsvStore, PersistError, PersistReport, Persister, SqliteStore, WriteStatus};
pub use pipeline::{Collector, RunOutcome, RunReport};
