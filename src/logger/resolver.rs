use super::options::DEFAULT_EVALUATION_TIMEOUT;
use crate::domain::{EvaluationContext, LogLevel};
use crate::flags::{FlagClient, evaluate_within};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

/// Answers "should a message at this level be emitted right now?".
///
/// The threshold is fetched from the flag service on every call so that a
/// flag change applies to the very next log call.
pub struct LevelResolver<'a> {
    target: Option<Target<'a>>,
    timeout: Duration,
}

struct Target<'a> {
    client: &'a dyn FlagClient,
    flag_key: &'a str,
    context: &'a EvaluationContext,
}

impl<'a> LevelResolver<'a> {
    /// Resolver with no client: always answers with the default threshold.
    pub fn unbound() -> Self {
        Self {
            target: None,
            timeout: DEFAULT_EVALUATION_TIMEOUT,
        }
    }

    pub fn bound(client: &'a dyn FlagClient, flag_key: &'a str, context: &'a EvaluationContext) -> Self {
        Self {
            target: Some(Target {
                client,
                flag_key,
                context,
            }),
            timeout: DEFAULT_EVALUATION_TIMEOUT,
        }
    }

    /// Bound on a single evaluation; a slower answer counts as a failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn resolve_threshold(&self) -> i64 {
        let default = LogLevel::DEFAULT_THRESHOLD.ordinal();
        let Some(target) = &self.target else {
            return default;
        };

        let evaluation = evaluate_within(
            target.client,
            target.flag_key,
            target.context,
            json!(default),
            self.timeout,
        )
        .await;

        match evaluation {
            Ok(value) => threshold_from_value(&value).unwrap_or_else(|| {
                debug!(flag_key = target.flag_key, %value, "Non-numeric log level flag, using default");
                default
            }),
            Err(e) => {
                debug!(flag_key = target.flag_key, error = %e, "Log level flag evaluation failed, using default");
                default
            }
        }
    }

    pub async fn should_emit(&self, level: LogLevel) -> bool {
        level.is_active(self.resolve_threshold().await)
    }
}

/// Any number is a threshold, including values outside the level range.
/// Fractions are floored: ordinals are integers, so `ordinal <= t` holds
/// exactly when `ordinal <= floor(t)`.
fn threshold_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().map(|f| f.floor() as i64)),
        _ => None,
    }
}
