//! Markup sources.
//!
//! The collector asks a [`MarkupSource`] for the page once per run. The HTTP
//! source performs a single GET with a browser-like `User-Agent`; there is no
//! retry. The file source serves a saved copy of the page for offline runs.

use crate::config::SourceConfig;
use crate::log::Logger;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("network unreachable: {0}")]
    Network(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Something that can produce the page markup.
pub trait MarkupSource: Send + Sync {
    /// Human-readable description of where markup comes from.
    fn describe(&self) -> String;

    fn fetch(&self) -> Result<String, FetchError>;
}

/// Single-shot HTTP GET.
pub struct HttpSource {
    client: reqwest::blocking::Client,
    url: String,
    log: Logger,
}

impl HttpSource {
    pub fn new(config: &SourceConfig, log: Logger) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout_secs.map(Duration::from_secs))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            log: log.scoped("fetcher"),
        })
    }
}

impl MarkupSource for HttpSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> Result<String, FetchError> {
        self.log.info("fetch", format!("Fetching data from {}", self.url));

        let resp = self.client.get(&self.url).send().map_err(|e| {
            let err = FetchError::Network(e.to_string());
            self.log.error("fetch", format!("Failed to fetch data: {err}"));
            err
        })?;

        let status = resp.status();
        if !status.is_success() {
            let err = FetchError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            };
            self.log.error("fetch", format!("Failed to fetch data: {err}"));
            return Err(err);
        }

        resp.text().map_err(|e| {
            let err = FetchError::Body(e.to_string());
            self.log.error("fetch", format!("Failed to fetch data: {err}"));
            err
        })
    }
}

/// Markup read from a local file.
pub struct FileSource {
    path: PathBuf,
    log: Logger,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, log: Logger) -> Self {
        Self {
            path: path.into(),
            log: log.scoped("fetcher"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MarkupSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<String, FetchError> {
        self.log.info(
            "fetch",
            format!("Reading HTML from {}", self.path.display()),
        );
        std::fs::read_to_string(&self.path).map_err(|source| {
            let err = FetchError::Io {
                path: self.path.clone(),
                source,
            };
            self.log.error("fetch", format!("Failed to read HTML: {err}"));
            err
        })
    }
}
