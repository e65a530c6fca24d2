use super::format::render;
use super::sink::LogSink;
use crate::domain::{EvaluationContext, LogLevel, SdkLogLevel};
use crate::flags::{
    ClientOptions, DiagnosticLogger, FlagClientError, FlagClientFactory, await_ready, evaluate_within,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const SDK_PREFIX: &str = "[flag-sdk]";

/// Progress of the SDK log-level bootstrap, reported in debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStage {
    TempClientUp,
    FlagEvaluated,
    TempClientClosed,
}

impl BootstrapStage {
    pub fn as_str(self) -> &'static str {
        match self {
            BootstrapStage::TempClientUp => "temp_client_up",
            BootstrapStage::FlagEvaluated => "flag_evaluated",
            BootstrapStage::TempClientClosed => "temp_client_closed",
        }
    }
}

/// Resolves the flag client's own diagnostic verbosity before the real client
/// exists, using a throwaway client that is always closed before returning.
pub struct SdkLogLevelBootstrapper<'a> {
    factory: &'a dyn FlagClientFactory,
    sink: Arc<dyn LogSink>,
    timeout: Duration,
}

impl<'a> SdkLogLevelBootstrapper<'a> {
    pub fn new(factory: &'a dyn FlagClientFactory, sink: Arc<dyn LogSink>, timeout: Duration) -> Self {
        Self {
            factory,
            sink,
            timeout,
        }
    }

    /// Never fails: every problem degrades to [`SdkLogLevel::BOOTSTRAP`].
    pub async fn resolve(
        &self,
        credential: &str,
        flag_key: &str,
        context: &EvaluationContext,
    ) -> SdkLogLevel {
        let options = ClientOptions::default()
            .with_diagnostic_logger(forwarding_logger(SdkLogLevel::BOOTSTRAP, Arc::clone(&self.sink)));

        let temp_client = match self.factory.init(credential, options).await {
            Ok(client) => client,
            Err(e) => {
                self.warn_fallback(&format!(
                    "Could not start bootstrap flag client ({e}); using SDK log level '{}'",
                    SdkLogLevel::BOOTSTRAP
                ));
                return SdkLogLevel::BOOTSTRAP;
            }
        };
        debug!(stage = BootstrapStage::TempClientUp.as_str(), flag_key, "SDK log level bootstrap");

        if let Err(e) = await_ready(temp_client.as_ref(), self.timeout).await {
            warn!(error = %e, "Bootstrap flag client not ready, evaluating anyway");
        }

        let synthetic = context.sdk_bootstrap_context();
        let evaluation = evaluate_within(
            temp_client.as_ref(),
            flag_key,
            &synthetic,
            json!(SdkLogLevel::FLAG_DEFAULT.as_str()),
            self.timeout,
        )
        .await;
        debug!(stage = BootstrapStage::FlagEvaluated.as_str(), flag_key, "SDK log level bootstrap");

        if let Err(e) = temp_client.close().await {
            warn!(error = %e, "Failed to close bootstrap flag client");
        }
        drop(temp_client);
        debug!(stage = BootstrapStage::TempClientClosed.as_str(), flag_key, "SDK log level bootstrap");

        self.interpret(flag_key, evaluation)
    }

    fn interpret(&self, flag_key: &str, evaluation: Result<Value, FlagClientError>) -> SdkLogLevel {
        let value = match evaluation {
            Ok(value) => value,
            Err(e) => {
                self.warn_fallback(&format!(
                    "Evaluation of SDK log level flag '{flag_key}' failed ({e}); using '{}'",
                    SdkLogLevel::BOOTSTRAP
                ));
                return SdkLogLevel::BOOTSTRAP;
            }
        };

        let parsed = value.as_str().map(str::parse::<SdkLogLevel>);
        match parsed {
            Some(Ok(level)) => level,
            _ => {
                let shown = value.as_str().map_or_else(|| value.to_string(), str::to_string);
                self.warn_fallback(&format!(
                    "Invalid SDK log level '{shown}' from flag '{flag_key}'. Valid levels: {:?}. Using '{}'",
                    SdkLogLevel::VALID,
                    SdkLogLevel::BOOTSTRAP
                ));
                SdkLogLevel::BOOTSTRAP
            }
        }
    }

    fn warn_fallback(&self, message: &str) {
        self.sink.emit(LogLevel::Warn, &render(LogLevel::Warn, message));
    }
}

/// Diagnostic logger whose messages go straight to `sink` at the matching
/// level. These messages bypass flag gating.
pub fn forwarding_logger(level: SdkLogLevel, sink: Arc<dyn LogSink>) -> DiagnosticLogger {
    DiagnosticLogger::new(level, move |sdk_level, message| {
        let level = match sdk_level {
            SdkLogLevel::Debug => LogLevel::Debug,
            SdkLogLevel::Info => LogLevel::Info,
            SdkLogLevel::Warn => LogLevel::Warn,
            SdkLogLevel::Error => LogLevel::Error,
            SdkLogLevel::None => return,
        };
        sink.emit(level, &render(level, &format!("{SDK_PREFIX} {message}")));
    })
}
