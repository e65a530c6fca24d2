pub mod config;
pub mod initialization;
pub mod logging_system;

pub use config::{Config, ConfigError, LogFormat, TracingLevel};
pub use initialization::InitializationError;
pub use logging_system::{LoggingSystem, setup_logging_safe};

use crate::flags::{FileFlagClientFactory, FlagClientFactory};
use crate::logger::{FlagGatedLogger, FlagKeyDefaults, LogSink, TracingSink};
use anyhow::Context;
use std::process;
use std::sync::Arc;
use tracing::{debug, error};

/// One CLI invocation: initialize from a flag file, emit one message, close.
pub struct App {
    config: Config,
    factory: Box<dyn FlagClientFactory>,
    sink: Arc<dyn LogSink>,
}

impl App {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_config(Config::from_args(args)?))
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            factory: Box::new(FileFlagClientFactory),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_factory(mut self, factory: Box<dyn FlagClientFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns whether the message passed the flag gate.
    pub async fn run(self) -> anyhow::Result<bool> {
        let credential = self.config.credential()?;
        let context = self.config.evaluation_context()?;

        let mut logger = FlagGatedLogger::from_credential(
            Arc::clone(&self.sink),
            FlagKeyDefaults::from_env(),
            self.factory.as_ref(),
            &credential,
            context,
            self.config.logger_options(),
        )
        .await
        .context("failed to initialize flag-gated logger")?;

        let fields = self.config.parsed_fields();
        let emitted = logger.log(self.config.level, &self.config.message, &fields).await;
        debug!(level = %self.config.level, emitted, "Message processed");

        logger.close().await.context("failed to close flag client")?;
        Ok(emitted)
    }
}

// Main entry point for the application
pub async fn main() -> anyhow::Result<()> {
    let app = match App::from_args(std::env::args()) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(2);
        }
    };

    let config = app.config();
    setup_logging_safe(config.tracing_level(), config.log_format(), &config.log_directives)?;

    if let Err(e) = app.run().await {
        error!("{e:#}");
        process::exit(1);
    }

    Ok(())
}
