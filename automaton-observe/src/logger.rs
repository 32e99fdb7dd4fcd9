//! Level-filtered structured logger with pluggable sinks.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Log severity, ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Diagnostic chatter.
    Debug,
    /// Normal operation.
    Info,
    /// Something degraded.
    Warn,
    /// Something failed.
    Error,
    /// The process is about to die.
    Fatal,
}

/// Structured error details attached to an entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogError {
    /// Error message.
    pub message: String,
    /// Backtrace or stack text, when available.
    pub stack: Option<String>,
    /// Machine-readable code, when available.
    pub code: Option<String>,
}

/// One structured log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO-8601 emission time.
    pub timestamp: String,
    /// Severity.
    pub level: LogLevel,
    /// Emitting module (`heartbeat`, `turn_loop`, ...).
    pub module: String,
    /// Human-readable message.
    pub message: String,
    /// Free-form context.
    pub context: Option<serde_json::Value>,
    /// Attached error, if any.
    pub error: Option<LogError>,
}

/// Where entries go. Sinks must never panic; the logger swallows
/// nothing else for them.
pub trait LogSink: Send + Sync {
    /// Consume one entry.
    fn write(&self, entry: &LogEntry);
}

/// The default sink: forwards entries as [`tracing`] events, so the
/// embedder's subscriber decides formatting and destination.
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, entry: &LogEntry) {
        let context = entry
            .context
            .as_ref()
            .map(|c| c.to_string())
            .unwrap_or_default();
        let error = entry
            .error
            .as_ref()
            .map(|e| e.message.clone())
            .unwrap_or_default();
        match entry.level {
            LogLevel::Debug => {
                tracing::debug!(module = %entry.module, context = %context, "{}", entry.message);
            }
            LogLevel::Info => {
                tracing::info!(module = %entry.module, context = %context, "{}", entry.message);
            }
            LogLevel::Warn => {
                tracing::warn!(module = %entry.module, context = %context, "{}", entry.message);
            }
            LogLevel::Error | LogLevel::Fatal => {
                tracing::error!(
                    module = %entry.module,
                    context = %context,
                    error = %error,
                    "{}", entry.message
                );
            }
        }
    }
}

/// Capturing sink for tests.
#[derive(Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    /// New empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().expect("memory sink lock").clone()
    }
}

impl LogSink for MemorySink {
    fn write(&self, entry: &LogEntry) {
        self.entries.lock().expect("memory sink lock").push(entry.clone());
    }
}

/// The runtime logger. Cheap to clone; sinks are shared.
#[derive(Clone)]
pub struct Logger {
    level: LogLevel,
    sinks: Vec<Arc<dyn LogSink>>,
}

impl Logger {
    /// Logger with the default tracing sink.
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            sinks: vec![Arc::new(TracingSink)],
        }
    }

    /// Logger writing to the given sinks only.
    pub fn with_sinks(level: LogLevel, sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self { level, sinks }
    }

    /// Emit an entry if `level` passes the filter. Never panics and
    /// never returns an error, whatever the context value holds.
    pub fn log(
        &self,
        level: LogLevel,
        module: &str,
        message: &str,
        context: Option<serde_json::Value>,
        error: Option<LogError>,
    ) {
        if level < self.level {
            return;
        }
        let entry = LogEntry {
            timestamp: automaton_core::id::now_iso(),
            level,
            module: module.to_string(),
            message: message.to_string(),
            context,
            error,
        };
        for sink in &self.sinks {
            sink.write(&entry);
        }
    }

    /// Debug-level entry.
    pub fn debug(&self, module: &str, message: &str) {
        self.log(LogLevel::Debug, module, message, None, None);
    }

    /// Info-level entry.
    pub fn info(&self, module: &str, message: &str) {
        self.log(LogLevel::Info, module, message, None, None);
    }

    /// Warn-level entry.
    pub fn warn(&self, module: &str, message: &str) {
        self.log(LogLevel::Warn, module, message, None, None);
    }

    /// Error-level entry with attached error details.
    pub fn error(&self, module: &str, message: &str, error: Option<LogError>) {
        self.log(LogLevel::Error, module, message, None, error);
    }

    /// Fatal-level entry. The logger does not exit the process.
    pub fn fatal(&self, module: &str, message: &str, error: Option<LogError>) {
        self.log(LogLevel::Fatal, module, message, None, error);
    }
}

impl From<&automaton_core::Error> for LogError {
    fn from(err: &automaton_core::Error) -> Self {
        Self {
            message: err.to_string(),
            stack: None,
            code: match err {
                automaton_core::Error::PolicyDenied { code, .. } => Some(code.clone()),
                _ => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(level: LogLevel) -> (Logger, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::with_sinks(level, vec![sink.clone()]);
        (logger, sink)
    }

    #[test]
    fn level_filter_drops_below_threshold() {
        let (logger, sink) = capture(LogLevel::Warn);
        logger.debug("test", "dropped");
        logger.info("test", "dropped");
        logger.warn("test", "kept");
        logger.error("test", "kept", None);
        assert_eq!(sink.entries().len(), 2);
    }

    #[test]
    fn entries_carry_module_context_error() {
        let (logger, sink) = capture(LogLevel::Debug);
        logger.log(
            LogLevel::Error,
            "heartbeat",
            "task failed",
            Some(serde_json::json!({"task": "check_credits"})),
            Some(LogError {
                message: "timeout".into(),
                stack: None,
                code: Some("transport".into()),
            }),
        );
        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].module, "heartbeat");
        assert_eq!(entries[0].context.as_ref().unwrap()["task"], "check_credits");
        assert_eq!(entries[0].error.as_ref().unwrap().code.as_deref(), Some("transport"));
    }

    #[test]
    fn levels_are_ordered() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Fatal);
    }

    #[test]
    fn policy_denials_surface_their_code() {
        let err = automaton_core::Error::denied("self_harm", "blocked");
        let log_err = LogError::from(&err);
        assert_eq!(log_err.code.as_deref(), Some("self_harm"));
    }
}
