//! Domain layer for flag-gated-logger.
//!
//! Contains the canonical types shared across all modules:
//! - `LogLevel`: Application verbosity ladder (Fatal..Trace), gated by flag
//! - `SdkLogLevel`: Diagnostic verbosity of the flag client itself
//! - `EvaluationContext`: Opaque identity blob handed to the flag service
//! - `FlagLoggerError`: Top-level error type

pub mod context;
pub mod error;
pub mod log_level;
pub mod sdk_log_level;

pub use context::EvaluationContext;
pub use error::FlagLoggerError;
pub use log_level::LogLevel;
pub use sdk_log_level::SdkLogLevel;
