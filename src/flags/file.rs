use super::{ClientOptions, DiagnosticLogger, FlagClient, FlagClientError, FlagClientFactory};
use crate::domain::{EvaluationContext, SdkLogLevel};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Flag client backed by a flat TOML or JSON file of `flag-key = value` pairs.
///
/// The file is re-read on every evaluation, so edits apply to the next call.
#[derive(Debug)]
pub struct FileFlagClient {
    path: PathBuf,
    diagnostic_logger: Option<DiagnosticLogger>,
    closed: AtomicBool,
}

impl FileFlagClient {
    pub fn new(path: impl Into<PathBuf>, options: ClientOptions) -> Self {
        Self {
            path: path.into(),
            diagnostic_logger: options.diagnostic_logger,
            closed: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_flags(&self) -> Result<Map<String, Value>, FlagClientError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let flags = parse_flags(&self.path, &content);
        if let Err(e) = &flags {
            self.diagnostic(SdkLogLevel::Error, &format!("{}: {e}", self.path.display()));
        }
        flags
    }

    fn diagnostic(&self, level: SdkLogLevel, message: &str) {
        if let Some(logger) = &self.diagnostic_logger {
            logger.log(level, message);
        }
    }
}

fn parse_flags(path: &Path, content: &str) -> Result<Map<String, Value>, FlagClientError> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let value = if is_json {
        serde_json::from_str::<Value>(content).map_err(|e| FlagClientError::Parse(e.to_string()))?
    } else {
        let table: toml::Table =
            toml::from_str(content).map_err(|e| FlagClientError::Parse(e.to_string()))?;
        serde_json::to_value(table).map_err(|e| FlagClientError::Parse(e.to_string()))?
    };

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(FlagClientError::Parse(
            "flag file must contain a table of flag values".to_string(),
        )),
    }
}

#[async_trait]
impl FlagClient for FileFlagClient {
    async fn wait_for_initialization(&self, timeout: Duration) -> Result<(), FlagClientError> {
        let flags = tokio::time::timeout(timeout, self.load_flags())
            .await
            .map_err(|_| FlagClientError::Timeout(timeout))??;
        self.diagnostic(
            SdkLogLevel::Info,
            &format!("loaded {} flags from {}", flags.len(), self.path.display()),
        );
        Ok(())
    }

    async fn variation(
        &self,
        flag_key: &str,
        _context: &EvaluationContext,
        default: Value,
    ) -> Result<Value, FlagClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(FlagClientError::Closed);
        }

        let flags = self.load_flags().await?;
        match flags.get(flag_key) {
            Some(value) => {
                self.diagnostic(SdkLogLevel::Debug, &format!("evaluated '{flag_key}' = {value}"));
                Ok(value.clone())
            }
            None => {
                self.diagnostic(
                    SdkLogLevel::Warn,
                    &format!("unknown flag '{flag_key}', serving default {default}"),
                );
                Ok(default)
            }
        }
    }

    async fn close(&self) -> Result<(), FlagClientError> {
        self.closed.store(true, Ordering::SeqCst);
        self.diagnostic(SdkLogLevel::Debug, "file flag client closed");
        Ok(())
    }
}

/// Interprets the credential as the path of the flag file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFlagClientFactory;

#[async_trait]
impl FlagClientFactory for FileFlagClientFactory {
    async fn init(
        &self,
        credential: &str,
        options: ClientOptions,
    ) -> Result<Arc<dyn FlagClient>, FlagClientError> {
        if credential.trim().is_empty() {
            return Err(FlagClientError::InvalidCredential(
                "flag file path is empty".to_string(),
            ));
        }
        Ok(Arc::new(FileFlagClient::new(credential, options)))
    }
}
