//! Injected logging capability.
//!
//! Components never reach for a global logger. Each one holds a [`Logger`]
//! scoped to its component name and names the operation on every call. The
//! sink behind the logger decides where records go: [`TracingSink`] forwards
//! them to `tracing`, [`MemorySink`] keeps them for assertions.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Destination for log records.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, component: &str, operation: &str, message: &str);
}

/// Forwards records to `tracing` with `component` and `operation` fields.
///
/// Whether anything is printed depends on the subscriber the binary installs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, component: &str, operation: &str, message: &str) {
        match level {
            Level::Debug => tracing::debug!(component, operation, "{message}"),
            Level::Info => tracing::info!(component, operation, "{message}"),
            Level::Warn => tracing::warn!(component, operation, "{message}"),
            Level::Error => tracing::error!(component, operation, "{message}"),
        }
    }
}

/// One captured record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Level,
    pub component: String,
    pub operation: String,
    pub message: String,
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records captured so far, in emission order.
    pub fn records(&self) -> Vec<LogRecord> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// True if some record at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records()
            .iter()
            .any(|r| r.level == level && r.message.contains(needle))
    }

    /// Number of records at `level`.
    pub fn count(&self, level: Level) -> usize {
        self.records().iter().filter(|r| r.level == level).count()
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: Level, component: &str, operation: &str, message: &str) {
        let record = LogRecord {
            level,
            component: component.to_string(),
            operation: operation.to_string(),
            message: message.to_string(),
        };
        match self.records.lock() {
            Ok(mut guard) => guard.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}

/// Component-scoped handle over a shared sink.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
    component: &'static str,
}

impl Logger {
    pub fn new(sink: Arc<dyn LogSink>, component: &'static str) -> Self {
        Self { sink, component }
    }

    /// Logger backed by [`TracingSink`].
    pub fn tracing(component: &'static str) -> Self {
        Self::new(Arc::new(TracingSink), component)
    }

    /// Same sink, different component.
    pub fn scoped(&self, component: &'static str) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            component,
        }
    }

    pub fn log(&self, level: Level, operation: &str, message: &str) {
        self.sink.log(level, self.component, operation, message);
    }

    pub fn debug(&self, operation: &str, message: impl AsRef<str>) {
        self.log(Level::Debug, operation, message.as_ref());
    }

    pub fn info(&self, operation: &str, message: impl AsRef<str>) {
        self.log(Level::Info, operation, message.as_ref());
    }

    pub fn warn(&self, operation: &str, message: impl AsRef<str>) {
        self.log(Level::Warn, operation, message.as_ref());
    }

    pub fn error(&self, operation: &str, message: impl AsRef<str>) {
        self.log(Level::Error, operation, message.as_ref());
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("component", &self.component)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_captures_scope() {
        let sink = Arc::new(MemorySink::new());
        let log = Logger::new(sink.clone(), "parser");

        log.info("parse", "Parsing HTML content...");
        log.scoped("cleaner").warn("clean", "odd row");

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].component, "parser");
        assert_eq!(records[0].operation, "parse");
        assert_eq!(records[1].component, "cleaner");
        assert_eq!(records[1].level, Level::Warn);
    }

    #[test]
    fn contains_filters_by_level() {
        let sink = Arc::new(MemorySink::new());
        let log = Logger::new(sink.clone(), "collector");
        log.error("run", "HTML content was empty");

        assert!(sink.contains(Level::Error, "HTML content"));
        assert!(!sink.contains(Level::Warn, "HTML content"));
        assert_eq!(sink.count(Level::Error), 1);
    }

    #[test]
    fn tracing_sink_without_subscriber_is_silent() {
        // No subscriber installed: events are dropped, nothing panics.
        Logger::tracing("fetcher").info("fetch", "hello");
    }
}
