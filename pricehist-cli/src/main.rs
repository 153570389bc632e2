//! pricehist CLI: collect a historical price table and inspect the results.
//!
//! Commands:
//! - `run` (default): fetch, parse, clean and persist one table
//! - `status`: report what the persisted artifacts currently hold

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pricehist_core::log::Logger;
use pricehist_core::persist::{CsvStore, SqliteStore};
use pricehist_core::pipeline::{Collector, RunOutcome, RunReport};
use pricehist_core::{CollectorConfig, Dataset, FileSource, WriteStatus};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "pricehist",
    about = "pricehist: scrape a historical price table into SQLite and CSV"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Args, Default)]
struct OutputArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database path. Defaults to src/static/data/historical.db.
    #[arg(long)]
    db: Option<PathBuf>,

    /// CSV output path. Defaults to src/static/data/historical.csv.
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the page, clean the table and overwrite both outputs.
    Run {
        #[command(flatten)]
        output: OutputArgs,

        /// Page URL. Defaults to the NVDA history page.
        #[arg(long, conflicts_with = "html_file")]
        url: Option<String>,

        /// Read markup from a saved HTML file instead of the network.
        #[arg(long)]
        html_file: Option<PathBuf>,

        /// Keep rows whose volume is missing instead of dropping them.
        #[arg(long, default_value_t = false)]
        keep_missing_volume: bool,

        /// Print the run report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Report row counts and date ranges of the persisted outputs.
    Status {
        #[command(flatten)]
        output: OutputArgs,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run {
        output: OutputArgs::default(),
        url: None,
        html_file: None,
        keep_missing_volume: false,
        json: false,
    });

    let result = match command {
        Commands::Run {
            output,
            url,
            html_file,
            keep_missing_volume,
            json,
        } => run_collect(output, url, html_file, keep_missing_volume, json),
        Commands::Status { output } => run_status(output).map(|()| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(output: &OutputArgs) -> Result<CollectorConfig> {
    let mut config = match &output.config {
        Some(path) => CollectorConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CollectorConfig::default(),
    };
    if let Some(db) = &output.db {
        config.output.db_path = db.clone();
    }
    if let Some(csv) = &output.csv {
        config.output.csv_path = csv.clone();
    }
    Ok(config)
}

fn run_collect(
    output: OutputArgs,
    url: Option<String>,
    html_file: Option<PathBuf>,
    keep_missing_volume: bool,
    json: bool,
) -> Result<ExitCode> {
    let mut config = load_config(&output)?;
    if let Some(url) = url {
        config.source.url = url;
    }
    if keep_missing_volume {
        config.cleaning.require_volume = false;
    }

    let log = Logger::tracing("cli");
    let collector = match html_file {
        Some(path) => {
            Collector::with_source(&config, Box::new(FileSource::new(path, log.clone())), log)
        }
        None => Collector::from_config(&config, log).context("building HTTP client")?,
    };

    let outcome = collector.run();
    let report = RunReport::new(collector.source().describe(), &outcome);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serializing run report")?
        );
    } else {
        print_summary(&outcome, &report);
    }

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_summary(outcome: &RunOutcome, report: &RunReport) {
    println!();
    println!("=== Collection Result ===");
    println!("Source:         {}", report.source);
    println!("Stopped at:     {}", report.stage);
    println!("Rows parsed:    {}", report.rows_parsed);
    println!("Rows kept:      {}", report.rows_kept);
    println!("Rows dropped:   {}", report.rows_dropped);
    if let Some((start, end)) = outcome.dataset().and_then(Dataset::date_range) {
        println!("Date range:     {start} to {end}");
    }
    if let Some(fp) = &report.fingerprint {
        println!("Fingerprint:    {}", &fp[..16.min(fp.len())]);
    }
    if let Some(persist) = &report.persist {
        println!("Database:       {}", describe_write(&persist.database));
        println!("CSV:            {}", describe_write(&persist.csv));
    }
    if let Some(err) = &report.error {
        println!("Error:          {err}");
    }
    println!();
}

fn describe_write(status: &WriteStatus) -> String {
    match status {
        WriteStatus::Written { rows } => format!("{rows} rows written"),
        WriteStatus::Failed { error } => format!("FAILED: {error}"),
    }
}

fn run_status(output: OutputArgs) -> Result<()> {
    let config = load_config(&output)?;
    let log = Logger::tracing("cli");

    let db = SqliteStore::new(&config.output.db_path, &config.output.table, log.clone());
    let csv = CsvStore::new(&config.output.csv_path, log);

    println!(
        "{:<10} {:<40} {:>8} {:<25}",
        "Target", "Path", "Rows", "Date Range"
    );
    println!("{}", "-".repeat(86));

    let db_line = if db.path().exists() {
        describe_dataset(db.read().map_err(anyhow::Error::from))
    } else {
        "(missing)".to_string()
    };
    println!(
        "{:<10} {:<40} {}",
        "sqlite",
        db.path().display(),
        db_line
    );

    let csv_line = if csv.path().exists() {
        describe_dataset(csv.read().map_err(anyhow::Error::from))
    } else {
        "(missing)".to_string()
    };
    println!(
        "{:<10} {:<40} {}",
        "csv",
        csv.path().display(),
        csv_line
    );

    Ok(())
}

fn describe_dataset(result: Result<Dataset>) -> String {
    match result {
        Ok(ds) => {
            let range = ds
                .date_range()
                .map(|(s, e)| format!("{s} to {e}"))
                .unwrap_or_else(|| "(empty)".into());
            format!("{:>8} {:<25}", ds.len(), range)
        }
        Err(e) => format!("(unreadable: {e})"),
    }
}
