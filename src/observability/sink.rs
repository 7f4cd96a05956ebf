//! Leveled log sink.
//!
//! # Responsibilities
//! - Define the severity ladder (Debug → Fatal) used by access logs
//! - Forward formatted lines to `tracing` in production
//! - Capture lines in memory for assertions in tests
//!
//! # Design Decisions
//! - The sink is an injected handle (`SharedSink`), never a global
//! - Fatal is a logging level only; it never terminates the process
//! - Structured fields travel alongside the human-readable line

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::observability::fields::FieldSet;

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        };
        f.write_str(s)
    }
}

/// Destination for request log lines.
///
/// Implementors only need [`LogSink::log`]; the per-severity helpers and the
/// formatted variants are provided.
pub trait LogSink: Send + Sync {
    /// Emit a single line at the given severity.
    fn log(&self, severity: Severity, message: &str);

    /// Emit a line together with the structured record it was rendered from.
    fn log_fields(&self, severity: Severity, message: &str, _fields: &FieldSet) {
        self.log(severity, message);
    }

    /// Formatted variant of [`LogSink::log`].
    fn logf(&self, severity: Severity, args: fmt::Arguments<'_>) {
        match args.as_str() {
            Some(s) => self.log(severity, s),
            None => self.log(severity, &args.to_string()),
        }
    }

    fn debug(&self, message: &str) {
        self.log(Severity::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(Severity::Info, message);
    }

    fn warning(&self, message: &str) {
        self.log(Severity::Warning, message);
    }

    fn error(&self, message: &str) {
        self.log(Severity::Error, message);
    }

    fn fatal(&self, message: &str) {
        self.log(Severity::Fatal, message);
    }

    fn debugf(&self, args: fmt::Arguments<'_>) {
        self.logf(Severity::Debug, args);
    }

    fn infof(&self, args: fmt::Arguments<'_>) {
        self.logf(Severity::Info, args);
    }

    fn warningf(&self, args: fmt::Arguments<'_>) {
        self.logf(Severity::Warning, args);
    }

    fn errorf(&self, args: fmt::Arguments<'_>) {
        self.logf(Severity::Error, args);
    }

    fn fatalf(&self, args: fmt::Arguments<'_>) {
        self.logf(Severity::Fatal, args);
    }
}

/// Shared, injectable sink handle.
pub type SharedSink = Arc<dyn LogSink>;

/// Sink that forwards every line to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Create a shared handle to a tracing sink.
    pub fn shared() -> SharedSink {
        Arc::new(Self)
    }
}

impl LogSink for TracingSink {
    fn log(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => tracing::debug!("{}", message),
            Severity::Info => tracing::info!("{}", message),
            Severity::Warning => tracing::warn!("{}", message),
            Severity::Error => tracing::error!("{}", message),
            Severity::Fatal => tracing::error!(fatal = true, "{}", message),
        }
    }

    fn log_fields(&self, severity: Severity, message: &str, fields: &FieldSet) {
        let req_id = fields.req_id.as_ref().map(|id| id.as_str()).unwrap_or_default();
        let record = match serde_json::to_string(fields) {
            Ok(json) => json,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to serialize log fields");
                String::new()
            }
        };

        match severity {
            Severity::Debug => tracing::debug!(req_id, fields = %record, "{}", message),
            Severity::Info => tracing::info!(req_id, fields = %record, "{}", message),
            Severity::Warning => tracing::warn!(req_id, fields = %record, "{}", message),
            Severity::Error => tracing::error!(req_id, fields = %record, "{}", message),
            Severity::Fatal => {
                tracing::error!(req_id, fatal = true, fields = %record, "{}", message)
            }
        }
    }
}

/// A line captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedLine {
    pub severity: Severity,
    pub message: String,
}

/// Sink that keeps every line in memory.
///
/// Intended for tests; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<CapturedLine>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured lines, oldest first.
    pub fn lines(&self) -> Vec<CapturedLine> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Captured messages at a single severity.
    pub fn messages_at(&self, severity: Severity) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|l| l.severity == severity)
            .map(|l| l.message)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lines().is_empty()
    }
}

impl LogSink for MemorySink {
    fn log(&self, severity: Severity, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(CapturedLine {
                severity,
                message: message.to_string(),
            });
        }
    }
}
