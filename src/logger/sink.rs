use crate::domain::LogLevel;
use parking_lot::Mutex;
use std::sync::Arc;

/// `tracing` target of every record emitted through [`TracingSink`].
pub const SINK_TARGET: &str = "gated_log";

/// Structured-logging backend: one emission path per [`LogLevel`], taking an
/// already formatted message.
pub trait LogSink: Send + Sync {
    fn emit(&self, level: LogLevel, message: &str);
}

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    fn emit(&self, level: LogLevel, message: &str) {
        (**self).emit(level, message);
    }
}

/// Default sink: forwards to the installed `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Fatal => {
                tracing::error!(target: SINK_TARGET, fatal = true, "{message}");
            }
            LogLevel::Error => tracing::error!(target: SINK_TARGET, "{message}"),
            LogLevel::Warn => tracing::warn!(target: SINK_TARGET, "{message}"),
            LogLevel::Info => tracing::info!(target: SINK_TARGET, "{message}"),
            LogLevel::Debug => tracing::debug!(target: SINK_TARGET, "{message}"),
            LogLevel::Trace => tracing::trace!(target: SINK_TARGET, "{message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
}

/// Keeps every emitted record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records.lock().iter().map(|r| r.message.clone()).collect()
    }

    pub fn at_level(&self, level: LogLevel) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.level == level)
            .map(|r| r.message.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn emit(&self, level: LogLevel, message: &str) {
        self.records.lock().push(LogRecord {
            level,
            message: message.to_string(),
        });
    }
}
