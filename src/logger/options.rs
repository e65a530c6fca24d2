use crate::flags::ClientOptions;
use std::time::Duration;

pub const LOG_LEVEL_FLAG_KEY_ENV: &str = "LOG_LEVEL_FLAG_KEY";
pub const SDK_LOG_LEVEL_FLAG_KEY_ENV: &str = "SDK_LOG_LEVEL_FLAG_KEY";

pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_EVALUATION_TIMEOUT: Duration = Duration::from_secs(1);

/// Process-wide flag-key defaults, consulted when per-call options leave a
/// key unset. Held by the facade instance rather than in global state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagKeyDefaults {
    pub log_level_flag_key: Option<String>,
    pub sdk_log_level_flag_key: Option<String>,
}

impl FlagKeyDefaults {
    pub fn from_env() -> Self {
        Self {
            log_level_flag_key: non_empty_env(LOG_LEVEL_FLAG_KEY_ENV),
            sdk_log_level_flag_key: non_empty_env(SDK_LOG_LEVEL_FLAG_KEY_ENV),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Per-initialization options.
#[derive(Debug, Clone)]
pub struct LoggerOptions {
    pub log_level_flag_key: Option<String>,
    pub sdk_log_level_flag_key: Option<String>,
    /// Bound on waiting for the real client to become ready.
    pub init_timeout: Duration,
    /// Bound on the throwaway bootstrap client, both for readiness and for
    /// its single evaluation.
    pub bootstrap_timeout: Duration,
    /// Bound on each log-level evaluation made by a leveled call.
    pub evaluation_timeout: Duration,
    /// Passed to the real client when no SDK log-level flag is configured.
    pub client_options: ClientOptions,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            log_level_flag_key: None,
            sdk_log_level_flag_key: None,
            init_timeout: DEFAULT_INIT_TIMEOUT,
            bootstrap_timeout: DEFAULT_BOOTSTRAP_TIMEOUT,
            evaluation_timeout: DEFAULT_EVALUATION_TIMEOUT,
            client_options: ClientOptions::default(),
        }
    }
}

impl LoggerOptions {
    pub fn with_log_level_flag_key(mut self, key: impl Into<String>) -> Self {
        self.log_level_flag_key = Some(key.into());
        self
    }

    pub fn with_sdk_log_level_flag_key(mut self, key: impl Into<String>) -> Self {
        self.sdk_log_level_flag_key = Some(key.into());
        self
    }

    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    pub fn with_bootstrap_timeout(mut self, timeout: Duration) -> Self {
        self.bootstrap_timeout = timeout;
        self
    }

    pub fn with_evaluation_timeout(mut self, timeout: Duration) -> Self {
        self.evaluation_timeout = timeout;
        self
    }

    pub fn with_client_options(mut self, client_options: ClientOptions) -> Self {
        self.client_options = client_options;
        self
    }

    /// Options override defaults; blank keys count as unset.
    pub(crate) fn resolve_keys(&self, defaults: &FlagKeyDefaults) -> (Option<String>, Option<String>) {
        let pick = |own: &Option<String>, fallback: &Option<String>| {
            own.as_ref()
                .filter(|k| !k.trim().is_empty())
                .or(fallback.as_ref().filter(|k| !k.trim().is_empty()))
                .cloned()
        };
        (
            pick(&self.log_level_flag_key, &defaults.log_level_flag_key),
            pick(&self.sdk_log_level_flag_key, &defaults.sdk_log_level_flag_key),
        )
    }
}
