use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Diagnostic verbosity of the flag client itself.
///
/// Ordered from most verbose (`Debug`) to most restrictive (`None`). This is a
/// separate namespace from [`crate::LogLevel`] and is never compared to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdkLogLevel {
    Debug,
    Info,
    Warn,
    Error,
    None,
}

impl SdkLogLevel {
    pub const VALID: [&'static str; 5] = ["debug", "info", "warn", "error", "none"];

    /// Verbosity of the throwaway bootstrap client and the fallback value.
    pub const BOOTSTRAP: SdkLogLevel = SdkLogLevel::Error;

    /// Default served to the SDK flag evaluation.
    pub const FLAG_DEFAULT: SdkLogLevel = SdkLogLevel::Info;

    pub fn as_str(self) -> &'static str {
        match self {
            SdkLogLevel::Debug => "debug",
            SdkLogLevel::Info => "info",
            SdkLogLevel::Warn => "warn",
            SdkLogLevel::Error => "error",
            SdkLogLevel::None => "none",
        }
    }

    /// Whether a diagnostic message at `message_level` passes a logger
    /// configured at `self`.
    pub fn allows(self, message_level: SdkLogLevel) -> bool {
        self != SdkLogLevel::None && message_level != SdkLogLevel::None && message_level >= self
    }
}

impl fmt::Display for SdkLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SdkLogLevel {
    type Err = String;

    /// Exact match only: flag values outside the fixed set are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(SdkLogLevel::Debug),
            "info" => Ok(SdkLogLevel::Info),
            "warn" => Ok(SdkLogLevel::Warn),
            "error" => Ok(SdkLogLevel::Error),
            "none" => Ok(SdkLogLevel::None),
            other => Err(format!(
                "Invalid SDK log level '{other}'. Valid levels: {:?}",
                Self::VALID
            )),
        }
    }
}
