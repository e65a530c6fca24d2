//! Flag-service client seam.
//!
//! The remote flag service is an external collaborator; the logger only
//! depends on the [`FlagClient`] and [`FlagClientFactory`] traits. Two
//! implementations ship with the crate: an in-memory store for embedding and
//! tests, and a file-backed client used by the CLI.

pub mod diagnostic;
pub mod file;
pub mod memory;

pub use diagnostic::DiagnosticLogger;
pub use file::{FileFlagClient, FileFlagClientFactory};
pub use memory::{FlagStore, InMemoryFlagClient, InMemoryFlagClientFactory};

use crate::domain::EvaluationContext;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

#[derive(Error, Debug)]
pub enum FlagClientError {
    #[error("Flag client not ready: {0}")]
    NotReady(String),
    #[error("Flag client did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Flag client is closed")]
    Closed,
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),
    #[error("Evaluation failed: {0}")]
    Evaluation(String),
    #[error("Flag source parse error: {0}")]
    Parse(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Construction parameters for a flag client.
///
/// The diagnostic logger is fixed at construction time; a client cannot
/// change its own verbosity afterwards.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub diagnostic_logger: Option<DiagnosticLogger>,
}

impl ClientOptions {
    pub fn with_diagnostic_logger(mut self, logger: DiagnosticLogger) -> Self {
        self.diagnostic_logger = Some(logger);
        self
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait FlagClient: Send + Sync {
    /// Resolves once the client has its flag data, or fails after `timeout`.
    async fn wait_for_initialization(&self, timeout: Duration) -> Result<(), FlagClientError>;

    /// Evaluates `flag_key` for `context`. `default` is what the service
    /// serves when the flag is unknown.
    async fn variation(
        &self,
        flag_key: &str,
        context: &EvaluationContext,
        default: Value,
    ) -> Result<Value, FlagClientError>;

    async fn close(&self) -> Result<(), FlagClientError>;
}

#[async_trait]
pub trait FlagClientFactory: Send + Sync {
    async fn init(
        &self,
        credential: &str,
        options: ClientOptions,
    ) -> Result<Arc<dyn FlagClient>, FlagClientError>;
}

/// Waits for client readiness, bounded by `timeout` even if the client
/// ignores its own timeout argument.
pub async fn await_ready(client: &dyn FlagClient, timeout: Duration) -> Result<(), FlagClientError> {
    match tokio::time::timeout(timeout, client.wait_for_initialization(timeout)).await {
        Ok(result) => result,
        Err(_) => Err(FlagClientError::Timeout(timeout)),
    }
}

/// Evaluates a flag, bounded by `timeout`. An evaluation that outlives the
/// bound fails with [`FlagClientError::Timeout`].
pub async fn evaluate_within(
    client: &dyn FlagClient,
    flag_key: &str,
    context: &EvaluationContext,
    default: Value,
    timeout: Duration,
) -> Result<Value, FlagClientError> {
    match tokio::time::timeout(timeout, client.variation(flag_key, context, default)).await {
        Ok(result) => result,
        Err(_) => Err(FlagClientError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_await_ready_passes_through_success() {
        let mut client = MockFlagClient::new();
        client
            .expect_wait_for_initialization()
            .times(1)
            .returning(|_| Ok(()));

        assert!(await_ready(&client, Duration::from_millis(50)).await.is_ok());
    }

    struct Hanging;

    #[async_trait]
    impl FlagClient for Hanging {
        async fn wait_for_initialization(&self, _: Duration) -> Result<(), FlagClientError> {
            std::future::pending().await
        }
        async fn variation(
            &self,
            _: &str,
            _: &EvaluationContext,
            _: Value,
        ) -> Result<Value, FlagClientError> {
            std::future::pending().await
        }
        async fn close(&self) -> Result<(), FlagClientError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_await_ready_bounds_a_hanging_client() {
        let result = await_ready(&Hanging, Duration::from_millis(20)).await;
        assert!(matches!(result, Err(FlagClientError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_evaluate_within_passes_through_value() {
        let mut client = MockFlagClient::new();
        client
            .expect_variation()
            .times(1)
            .returning(|_, _, _| Ok(serde_json::json!(4)));

        let value = evaluate_within(
            &client,
            "level",
            &EvaluationContext::new(),
            serde_json::json!(1),
            Duration::from_millis(50),
        )
        .await
        .unwrap();
        assert_eq!(value, serde_json::json!(4));
    }

    #[tokio::test]
    async fn test_evaluate_within_bounds_a_stalled_evaluation() {
        let timeout = Duration::from_millis(20);
        let result = evaluate_within(&Hanging, "level", &EvaluationContext::new(), Value::Null, timeout).await;
        assert!(matches!(result, Err(FlagClientError::Timeout(t)) if t == timeout));
    }
}
