use crate::flags::FlagClientError;
use thiserror::Error;

/// Top-level error type for the logging facade.
///
/// Only initialization can fail; leveled logging calls never surface errors.
#[derive(Error, Debug)]
pub enum FlagLoggerError {
    #[error(
        "Configuration error: no log-level flag key in options and no LOG_LEVEL_FLAG_KEY default"
    )]
    MissingLogLevelFlagKey,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Logger is already initialized")]
    AlreadyInitialized,

    #[error("Flag client initialization failed: {0}")]
    ClientInit(#[source] FlagClientError),

    #[error("Flag client close failed: {0}")]
    ClientClose(#[source] FlagClientError),
}

impl FlagLoggerError {
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, FlagLoggerError::MissingLogLevelFlagKey)
    }
}
