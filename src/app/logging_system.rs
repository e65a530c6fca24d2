use super::config::{LogFormat, TracingLevel};
use super::initialization::{InitializationError, LogDirective};
use crate::flags::diagnostic::DIAGNOSTIC_TARGET;
use crate::logger::sink::SINK_TARGET;
use parking_lot::RwLock;
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Builds and installs the process's `tracing` subscriber.
///
/// Gated records (`gated_log`) and flag-client diagnostics (`flag_sdk`) are
/// already filtered upstream, so their targets are let through unless a
/// custom directive narrows them; the configured level applies to the
/// crate's own diagnostics.
pub struct LoggingSystem {
    directives: RwLock<Vec<LogDirective>>,
    format: LogFormat,
}

impl LoggingSystem {
    pub fn new(format: LogFormat) -> Self {
        Self {
            directives: RwLock::new(Vec::new()),
            format,
        }
    }

    /// Invalid directives are reported on stderr and skipped. A directive
    /// replaces any earlier one for the same target.
    pub fn add_directive(&self, directive_str: &str) -> Result<(), InitializationError> {
        match LogDirective::parse(directive_str) {
            Ok(directive) => {
                let mut directives = self.directives.write();
                directives.retain(|existing| existing.target != directive.target);
                directives.push(directive);
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                eprintln!("Warning: {e}, skipping directive");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub fn add_default_directives(&self) {
        let mut directives = self.directives.write();
        directives.push(LogDirective::new(SINK_TARGET, TracingLevel::Trace));
        directives.push(LogDirective::new(DIAGNOSTIC_TARGET, TracingLevel::Trace));
    }

    pub fn build_filter_string(&self, default_level: TracingLevel) -> String {
        let directives = self.directives.read();
        let mut filter_parts = Vec::with_capacity(directives.len() + 1);
        filter_parts.push(default_level.as_str().to_string());
        filter_parts.extend(directives.iter().map(LogDirective::to_filter_string));
        filter_parts.join(",")
    }

    /// `RUST_LOG`, when set, replaces the computed filter.
    pub fn initialize_tracing(&self, default_level: TracingLevel) -> Result<(), InitializationError> {
        let filter_string = self.build_filter_string(default_level);
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&filter_string).map_err(|e| {
                InitializationError::LoggingInitFailed {
                    details: format!("Failed to create EnvFilter with '{filter_string}'"),
                    source: Box::new(e),
                }
            })?,
        };

        let result = match self.format {
            LogFormat::Compact => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(true).with_level(true).compact())
                .try_init(),
            LogFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_target(true).with_current_span(false))
                .try_init(),
        };

        result.map_err(|e| InitializationError::LoggingInitFailed {
            details: "Failed to set global tracing subscriber".to_string(),
            source: Box::new(e),
        })
    }
}

/// Installs tracing once per process; later calls report the first outcome.
///
/// `directives` (`target=level`) are applied after the defaults and replace
/// them per target.
pub fn setup_logging_safe(
    level: TracingLevel,
    format: LogFormat,
    directives: &[String],
) -> Result<(), InitializationError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    let outcome = INIT.get_or_init(|| {
        let logging_system = LoggingSystem::new(format);
        logging_system.add_default_directives();
        for directive in directives {
            logging_system.add_directive(directive).map_err(|e| e.to_string())?;
        }
        logging_system
            .initialize_tracing(level)
            .map_err(|e| e.to_string())
    });

    outcome
        .clone()
        .map_err(|details| InitializationError::LoggingInitFailed {
            details,
            source: Box::new(std::io::Error::other("Logging initialization error")),
        })
}
