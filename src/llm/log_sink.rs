//! Pluggable diagnostic output for the Radium client
//!
//! The instrumented transport and the error classifier never write to a
//! global console. They log through a [`DiagnosticSink`], which defaults to
//! `tracing` and can be muted or captured in tests.

use std::sync::{Arc, Mutex};

/// Severity of a diagnostic line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

/// Destination for diagnostic lines
pub trait DiagnosticSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// Forwards diagnostics to `tracing` under the `radium` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => tracing::info!(target: "radium", "{}", message),
            LogLevel::Error => tracing::error!(target: "radium", "{}", message),
        }
    }
}

/// Drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn log(&self, _level: LogLevel, _message: &str) {}
}

/// A single captured diagnostic line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
}

/// Captures diagnostics in memory.
///
/// Clones share the same buffer, so a test can keep one clone and hand the
/// other to the component under test.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    lines: Arc<Mutex<Vec<LogLine>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line captured so far
    pub fn lines(&self) -> Vec<LogLine> {
        self.lines.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Messages logged at error level
    pub fn errors(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|l| l.level == LogLevel::Error)
            .map(|l| l.message)
            .collect()
    }

    /// True if any captured message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.message.contains(needle))
    }

    /// First captured message starting with `prefix`
    pub fn find(&self, prefix: &str) -> Option<String> {
        self.lines()
            .into_iter()
            .find(|l| l.message.starts_with(prefix))
            .map(|l| l.message)
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.lines.lock() {
            guard.clear();
        }
    }
}

impl DiagnosticSink for RecordingSink {
    fn log(&self, level: LogLevel, message: &str) {
        if let Ok(mut guard) = self.lines.lock() {
            guard.push(LogLine {
                level,
                message: message.to_string(),
            });
        }
    }
}

/// Shared handle to a sink
pub type SharedSink = Arc<dyn DiagnosticSink>;

/// Sink used when nothing else is configured
pub fn default_sink() -> SharedSink {
    Arc::new(TracingSink)
}
