use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Application log level, ordered by ascending verbosity.
///
/// The discriminant is the value the log-level flag is compared against: a
/// level is active iff its ordinal is less than or equal to the threshold
/// currently served by the flag.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LogLevel {
    Fatal = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Fatal,
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    /// Threshold used whenever the flag cannot be consulted.
    pub const DEFAULT_THRESHOLD: LogLevel = LogLevel::Error;

    pub const fn ordinal(self) -> i64 {
        self as i64
    }

    pub fn from_ordinal(value: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.ordinal() == value)
    }

    /// Whether a message at this level passes the given threshold.
    pub fn is_active(self, threshold: i64) -> bool {
        self.ordinal() <= threshold
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Fatal => "fatal",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Visual marker prepended to every emitted message.
    pub fn marker(self) -> &'static str {
        match self {
            LogLevel::Fatal => "💀",
            LogLevel::Error => "🚨",
            LogLevel::Warn => "⚠️",
            LogLevel::Info => "ℹ️",
            LogLevel::Debug => "🐛",
            LogLevel::Trace => "🔍",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fatal" => Ok(LogLevel::Fatal),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("Invalid log level: {other}")),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Fatal | LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals_are_fixed() {
        let ordinals: Vec<i64> = LogLevel::ALL.iter().map(|l| l.ordinal()).collect();
        assert_eq!(ordinals, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_ordering_matches_ordinals() {
        for pair in LogLevel::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].ordinal() < pair[1].ordinal());
        }
    }

    #[test]
    fn test_threshold_property_holds_for_all_pairs() {
        for low in LogLevel::ALL {
            for high in LogLevel::ALL.into_iter().filter(|h| *h >= low) {
                assert!(low.is_active(high.ordinal()));
                assert!(high.is_active(high.ordinal()));
                if high > low {
                    assert!(!high.is_active(low.ordinal()));
                }
            }
        }
    }

    #[test]
    fn test_from_ordinal() {
        assert_eq!(LogLevel::from_ordinal(3), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_ordinal(6), None);
        assert_eq!(LogLevel::from_ordinal(-1), None);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("Warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_fatal_maps_to_tracing_error() {
        assert_eq!(tracing::Level::from(LogLevel::Fatal), tracing::Level::ERROR);
        assert_eq!(tracing::Level::from(LogLevel::Trace), tracing::Level::TRACE);
    }
}
