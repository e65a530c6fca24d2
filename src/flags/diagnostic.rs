use crate::domain::SdkLogLevel;
use std::fmt;
use std::sync::Arc;

/// `tracing` target used by [`DiagnosticLogger::tracing`].
pub const DIAGNOSTIC_TARGET: &str = "flag_sdk";

pub type DiagnosticDestination = Arc<dyn Fn(SdkLogLevel, &str) + Send + Sync>;

/// The flag client's own logger: a verbosity plus a destination callback.
#[derive(Clone)]
pub struct DiagnosticLogger {
    level: SdkLogLevel,
    destination: DiagnosticDestination,
}

impl DiagnosticLogger {
    pub fn new<F>(level: SdkLogLevel, destination: F) -> Self
    where
        F: Fn(SdkLogLevel, &str) + Send + Sync + 'static,
    {
        Self {
            level,
            destination: Arc::new(destination),
        }
    }

    /// Destination that writes through `tracing`, for clients built without
    /// a facade to forward to.
    pub fn tracing(level: SdkLogLevel) -> Self {
        Self::new(level, |level, message| match level {
            SdkLogLevel::Debug => tracing::debug!(target: DIAGNOSTIC_TARGET, "{message}"),
            SdkLogLevel::Info => tracing::info!(target: DIAGNOSTIC_TARGET, "{message}"),
            SdkLogLevel::Warn => tracing::warn!(target: DIAGNOSTIC_TARGET, "{message}"),
            SdkLogLevel::Error => tracing::error!(target: DIAGNOSTIC_TARGET, "{message}"),
            SdkLogLevel::None => {}
        })
    }

    pub fn level(&self) -> SdkLogLevel {
        self.level
    }

    pub fn log(&self, level: SdkLogLevel, message: &str) {
        if self.level.allows(level) {
            (self.destination)(level, message);
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(SdkLogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(SdkLogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(SdkLogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(SdkLogLevel::Error, message);
    }
}

impl fmt::Debug for DiagnosticLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticLogger")
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}
