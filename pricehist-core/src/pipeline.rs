//! Collector: fetch → parse → clean → persist.
//!
//! Each stage can end the run early. Every early exit is logged with the stage
//! that produced nothing, and `run` never returns an error: the worst outcome
//! of a run is that it did nothing.

use crate::clean::{clean_rows, VolumePolicy};
use crate::config::CollectorConfig;
use crate::domain::Dataset;
use crate::fetch::{FetchError, HttpSource, MarkupSource};
use crate::log::Logger;
use crate::parse::parse_table;
use crate::persist::{CsvStore, PersistReport, Persister, SqliteStore};
use serde::Serialize;

/// How far a run got.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// No markup: transport or read failure.
    FetchFailed { error: String },
    /// Markup had no table.
    NoTable,
    /// Table had no data rows.
    NoRows,
    /// Every row was dropped by the cleaner.
    EmptyDataset { rows_parsed: usize },
    /// Dataset handed to both targets.
    Persisted {
        dataset: Dataset,
        rows_parsed: usize,
        report: PersistReport,
    },
}

impl RunOutcome {
    pub fn stage(&self) -> &'static str {
        match self {
            RunOutcome::FetchFailed { .. } => "fetch",
            RunOutcome::NoTable | RunOutcome::NoRows => "parse",
            RunOutcome::EmptyDataset { .. } => "clean",
            RunOutcome::Persisted { .. } => "persist",
        }
    }

    /// True when both targets hold the new dataset.
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Persisted { report, .. } if report.all_written())
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        match self {
            RunOutcome::Persisted { dataset, .. } => Some(dataset),
            _ => None,
        }
    }
}

/// Machine-readable summary of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub source: String,
    pub stage: &'static str,
    pub success: bool,
    pub rows_parsed: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
    pub fingerprint: Option<String>,
    pub persist: Option<PersistReport>,
    pub error: Option<String>,
}

impl RunReport {
    pub fn new(source: String, outcome: &RunOutcome) -> Self {
        let mut report = Self {
            source,
            stage: outcome.stage(),
            success: outcome.is_success(),
            rows_parsed: 0,
            rows_kept: 0,
            rows_dropped: 0,
            fingerprint: None,
            persist: None,
            error: None,
        };
        match outcome {
            RunOutcome::FetchFailed { error } => report.error = Some(error.clone()),
            RunOutcome::NoTable => report.error = Some("no table found".into()),
            RunOutcome::NoRows => {}
            RunOutcome::EmptyDataset { rows_parsed } => {
                report.rows_parsed = *rows_parsed;
                report.rows_dropped = *rows_parsed;
            }
            RunOutcome::Persisted {
                dataset,
                rows_parsed,
                report: persisted,
            } => {
                report.rows_parsed = *rows_parsed;
                report.rows_kept = dataset.len();
                report.rows_dropped = rows_parsed - dataset.len();
                report.fingerprint = Some(dataset.fingerprint());
                report.persist = Some(persisted.clone());
            }
        }
        report
    }
}

/// One configured collection run.
pub struct Collector {
    source: Box<dyn MarkupSource>,
    persister: Persister,
    policy: VolumePolicy,
    log: Logger,
}

impl Collector {
    pub fn new(
        source: Box<dyn MarkupSource>,
        persister: Persister,
        policy: VolumePolicy,
        log: Logger,
    ) -> Self {
        Self {
            source,
            persister,
            policy,
            log: log.scoped("collector"),
        }
    }

    /// Collector reading over HTTP with targets and policy from `config`.
    pub fn from_config(config: &CollectorConfig, log: Logger) -> Result<Self, FetchError> {
        let source = HttpSource::new(&config.source, log.clone())?;
        Ok(Self::with_source(config, Box::new(source), log))
    }

    /// Collector using `source` for markup and `config` for everything else.
    pub fn with_source(config: &CollectorConfig, source: Box<dyn MarkupSource>, log: Logger) -> Self {
        let persister = Persister::new(
            SqliteStore::new(&config.output.db_path, &config.output.table, log.clone()),
            CsvStore::new(&config.output.csv_path, log.clone()),
            log.clone(),
        );
        Self::new(
            source,
            persister,
            VolumePolicy::from_required(config.cleaning.require_volume),
            log,
        )
    }

    pub fn source(&self) -> &dyn MarkupSource {
        self.source.as_ref()
    }

    pub fn persister(&self) -> &Persister {
        &self.persister
    }

    pub fn run(&self) -> RunOutcome {
        let html = match self.source.fetch() {
            Ok(html) if !html.trim().is_empty() => html,
            Ok(_) => {
                self.log.error("run", "HTML content was empty.");
                return RunOutcome::FetchFailed {
                    error: "empty response body".into(),
                };
            }
            Err(e) => {
                self.log.error("run", format!("HTML content was empty: {e}"));
                return RunOutcome::FetchFailed {
                    error: e.to_string(),
                };
            }
        };

        let rows = match parse_table(&html, &self.log.scoped("parser")) {
            Ok(rows) => rows,
            Err(e) => {
                self.log.error("run", e.to_string());
                return RunOutcome::NoTable;
            }
        };
        if rows.is_empty() {
            self.log.warn("run", "No data parsed from HTML.");
            return RunOutcome::NoRows;
        }

        let summary = clean_rows(&rows, self.policy, &self.log.scoped("cleaner"));
        if summary.dataset.is_empty() {
            self.log
                .warn("run", "Data cleaning resulted in an empty dataset.");
            return RunOutcome::EmptyDataset {
                rows_parsed: summary.rows_in,
            };
        }

        let report = self.persister.persist(&summary.dataset);
        if report.all_written() {
            self.log.info(
                "run",
                format!("Persisted {} rows to both targets.", summary.dataset.len()),
            );
        }

        RunOutcome::Persisted {
            dataset: summary.dataset,
            rows_parsed: summary.rows_in,
            report,
        }
    }
}
