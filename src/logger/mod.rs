//! The flag-gated logging facade.
//!
//! [`FlagGatedLogger`] owns a sink and, once initialized, a handle to a flag
//! client. Every leveled call asks the client for the current threshold and
//! either emits to the sink or drops the message.

pub mod bootstrap;
pub mod format;
pub mod options;
pub mod resolver;
pub mod sink;

pub use bootstrap::{SdkLogLevelBootstrapper, forwarding_logger};
pub use options::{FlagKeyDefaults, LoggerOptions};
pub use resolver::LevelResolver;
pub use sink::{LogRecord, LogSink, MemorySink, TracingSink};

use crate::domain::{EvaluationContext, FlagLoggerError, LogLevel};
use crate::flags::{FlagClient, FlagClientFactory, await_ready};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Who is responsible for closing the bound client.
enum ClientHandle {
    /// Created by the facade; closed by [`FlagGatedLogger::close`].
    Owned(Arc<dyn FlagClient>),
    /// Supplied by the caller; never closed by the facade.
    Borrowed(Arc<dyn FlagClient>),
}

impl ClientHandle {
    fn client(&self) -> &dyn FlagClient {
        match self {
            ClientHandle::Owned(client) | ClientHandle::Borrowed(client) => client.as_ref(),
        }
    }
}

struct LoggerState {
    client: ClientHandle,
    context: EvaluationContext,
    log_level_flag_key: String,
    sdk_log_level_flag_key: Option<String>,
    evaluation_timeout: Duration,
}

pub struct FlagGatedLogger {
    sink: Arc<dyn LogSink>,
    defaults: FlagKeyDefaults,
    state: Option<LoggerState>,
}

impl FlagGatedLogger {
    /// Uninitialized logger. Until initialization, only `fatal` and `error`
    /// are emitted.
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            defaults: FlagKeyDefaults::default(),
            state: None,
        }
    }

    pub fn with_defaults(mut self, defaults: FlagKeyDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Creates a logger and initializes it with a client it will own.
    pub async fn from_credential(
        sink: Arc<dyn LogSink>,
        defaults: FlagKeyDefaults,
        factory: &dyn FlagClientFactory,
        credential: &str,
        context: EvaluationContext,
        options: LoggerOptions,
    ) -> Result<Self, FlagLoggerError> {
        let mut logger = Self::new(sink).with_defaults(defaults);
        logger
            .initialize_from_credential(factory, credential, context, options)
            .await?;
        Ok(logger)
    }

    /// Creates a logger around a caller-owned client.
    pub async fn from_existing_client(
        sink: Arc<dyn LogSink>,
        defaults: FlagKeyDefaults,
        client: Arc<dyn FlagClient>,
        context: EvaluationContext,
        options: LoggerOptions,
    ) -> Result<Self, FlagLoggerError> {
        let mut logger = Self::new(sink).with_defaults(defaults);
        logger.initialize_from_client(client, context, options).await?;
        Ok(logger)
    }

    pub async fn initialize_from_credential(
        &mut self,
        factory: &dyn FlagClientFactory,
        credential: &str,
        context: EvaluationContext,
        options: LoggerOptions,
    ) -> Result<(), FlagLoggerError> {
        let (log_level_flag_key, sdk_log_level_flag_key) = self.prepare(&options)?;
        if credential.trim().is_empty() {
            return Err(FlagLoggerError::InvalidArgument(
                "a credential or an existing flag client is required".to_string(),
            ));
        }

        let client_options = match &sdk_log_level_flag_key {
            Some(sdk_flag_key) => {
                let bootstrapper = SdkLogLevelBootstrapper::new(
                    factory,
                    Arc::clone(&self.sink),
                    options.bootstrap_timeout,
                );
                let sdk_level = bootstrapper.resolve(credential, sdk_flag_key, &context).await;
                debug!(sdk_level = %sdk_level, "Resolved flag client log level");
                options
                    .client_options
                    .clone()
                    .with_diagnostic_logger(forwarding_logger(sdk_level, Arc::clone(&self.sink)))
            }
            None => options.client_options.clone(),
        };

        let client = factory
            .init(credential, client_options)
            .await
            .map_err(FlagLoggerError::ClientInit)?;

        self.bind(
            ClientHandle::Owned(client),
            context,
            log_level_flag_key,
            sdk_log_level_flag_key,
            &options,
        )
        .await;
        Ok(())
    }

    pub async fn initialize_from_client(
        &mut self,
        client: Arc<dyn FlagClient>,
        context: EvaluationContext,
        options: LoggerOptions,
    ) -> Result<(), FlagLoggerError> {
        let (log_level_flag_key, sdk_log_level_flag_key) = self.prepare(&options)?;
        self.bind(
            ClientHandle::Borrowed(client),
            context,
            log_level_flag_key,
            sdk_log_level_flag_key,
            &options,
        )
        .await;
        Ok(())
    }

    fn prepare(&self, options: &LoggerOptions) -> Result<(String, Option<String>), FlagLoggerError> {
        if self.state.is_some() {
            return Err(FlagLoggerError::AlreadyInitialized);
        }
        let (log_level_flag_key, sdk_log_level_flag_key) = options.resolve_keys(&self.defaults);
        let log_level_flag_key = log_level_flag_key.ok_or(FlagLoggerError::MissingLogLevelFlagKey)?;
        Ok((log_level_flag_key, sdk_log_level_flag_key))
    }

    async fn bind(
        &mut self,
        client: ClientHandle,
        context: EvaluationContext,
        log_level_flag_key: String,
        sdk_log_level_flag_key: Option<String>,
        options: &LoggerOptions,
    ) {
        if let Err(e) = await_ready(client.client(), options.init_timeout).await {
            warn!(error = %e, "Flag client not ready, continuing with defaults until it is");
        }

        info!(
            log_level_flag_key = %log_level_flag_key,
            sdk_log_level_flag_key = ?sdk_log_level_flag_key,
            owned = matches!(client, ClientHandle::Owned(_)),
            "Flag-gated logger initialized"
        );

        self.state = Some(LoggerState {
            client,
            context,
            log_level_flag_key,
            sdk_log_level_flag_key,
            evaluation_timeout: options.evaluation_timeout,
        });
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Whether `close` will close the bound client.
    pub fn owns_client(&self) -> bool {
        matches!(
            self.state.as_ref().map(|s| &s.client),
            Some(ClientHandle::Owned(_))
        )
    }

    pub fn context(&self) -> Option<&EvaluationContext> {
        self.state.as_ref().map(|s| &s.context)
    }

    pub fn log_level_flag_key(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.log_level_flag_key.as_str())
    }

    pub fn sdk_log_level_flag_key(&self) -> Option<&str> {
        self.state.as_ref().and_then(|s| s.sdk_log_level_flag_key.as_deref())
    }

    pub fn resolver(&self) -> LevelResolver<'_> {
        match &self.state {
            Some(state) => {
                LevelResolver::bound(state.client.client(), &state.log_level_flag_key, &state.context)
                    .with_timeout(state.evaluation_timeout)
            }
            None => LevelResolver::unbound(),
        }
    }

    pub async fn resolve_threshold(&self) -> i64 {
        self.resolver().resolve_threshold().await
    }

    pub async fn should_emit(&self, level: LogLevel) -> bool {
        self.resolver().should_emit(level).await
    }

    /// Gates, formats and emits. Returns whether the message was emitted.
    pub async fn log(&self, level: LogLevel, message: &str, fields: &[Value]) -> bool {
        if !self.should_emit(level).await {
            return false;
        }
        let body = format::format_message(message, fields);
        self.sink.emit(level, &format::render(level, &body));
        true
    }

    pub async fn fatal(&self, message: &str, fields: &[Value]) -> bool {
        self.log(LogLevel::Fatal, message, fields).await
    }

    pub async fn error(&self, message: &str, fields: &[Value]) -> bool {
        self.log(LogLevel::Error, message, fields).await
    }

    pub async fn warn(&self, message: &str, fields: &[Value]) -> bool {
        self.log(LogLevel::Warn, message, fields).await
    }

    pub async fn info(&self, message: &str, fields: &[Value]) -> bool {
        self.log(LogLevel::Info, message, fields).await
    }

    pub async fn debug(&self, message: &str, fields: &[Value]) -> bool {
        self.log(LogLevel::Debug, message, fields).await
    }

    pub async fn trace(&self, message: &str, fields: &[Value]) -> bool {
        self.log(LogLevel::Trace, message, fields).await
    }

    /// Releases the bound client. Owned clients are closed; borrowed ones are
    /// only let go. The logger returns to its uninitialized state.
    pub async fn close(&mut self) -> Result<(), FlagLoggerError> {
        let Some(state) = self.state.take() else {
            return Ok(());
        };

        match state.client {
            ClientHandle::Owned(client) => {
                debug!("Closing owned flag client");
                client.close().await.map_err(FlagLoggerError::ClientClose)
            }
            ClientHandle::Borrowed(_) => {
                debug!("Releasing borrowed flag client without closing it");
                Ok(())
            }
        }
    }
}
