//! Collector configuration.
//!
//! Every field has a compiled-in default, so running with no config file (or
//! an empty one) collects the default instrument into the default paths.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Page the default run scrapes.
pub const DEFAULT_URL: &str =
    "https://finance.yahoo.com/quote/NVDA/history/?period1=917015400&period2=1746572858";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
pub const DEFAULT_DB_PATH: &str = "src/static/data/historical.db";
pub const DEFAULT_CSV_PATH: &str = "src/static/data/historical.csv";
pub const DEFAULT_TABLE: &str = "historical_data";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Where the markup comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    pub user_agent: String,
    /// Request timeout. Absent means the request may block indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: None,
        }
    }
}

/// Where the dataset lands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub db_path: PathBuf,
    pub csv_path: PathBuf,
    pub table: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

/// Row acceptance rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Drop rows whose volume is missing.
    pub require_volume: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            require_volume: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub cleaning: CleaningConfig,
}

impl CollectorConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = CollectorConfig::from_toml("").unwrap();
        assert_eq!(cfg, CollectorConfig::default());
        assert_eq!(cfg.source.user_agent, "Mozilla/5.0");
        assert_eq!(cfg.output.table, "historical_data");
        assert!(cfg.cleaning.require_volume);
        assert!(cfg.source.timeout_secs.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = CollectorConfig::from_toml(
            r#"
[source]
url = "https://example.com/history"
timeout_secs = 15

[cleaning]
require_volume = false
"#,
        )
        .unwrap();
        assert_eq!(cfg.source.url, "https://example.com/history");
        assert_eq!(cfg.source.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(cfg.source.timeout_secs, Some(15));
        assert_eq!(cfg.output, OutputConfig::default());
        assert!(!cfg.cleaning.require_volume);
    }

    #[test]
    fn toml_roundtrip() {
        let mut cfg = CollectorConfig::default();
        cfg.output.csv_path = PathBuf::from("out/prices.csv");
        let text = cfg.to_toml().unwrap();
        assert_eq!(CollectorConfig::from_toml(&text).unwrap(), cfg);
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = CollectorConfig::from_toml("[source\nurl = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = CollectorConfig::from_file(Path::new("/nonexistent/pricehist.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
