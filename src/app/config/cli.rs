use super::{ConfigError, LogFormat, TracingLevel};
use crate::domain::{EvaluationContext, LogLevel, SdkLogLevel};
use crate::flags::{ClientOptions, DiagnosticLogger};
use crate::logger::LoggerOptions;
use crate::logger::options::{DEFAULT_BOOTSTRAP_TIMEOUT, DEFAULT_INIT_TIMEOUT};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Flag file (TOML or JSON) serving as the flag client credential
    #[arg(long, env = "FLAGS_FILE")]
    pub flags_file: Option<PathBuf>,

    /// Flag holding the numeric log level threshold (0=fatal .. 5=trace)
    #[arg(long, env = "LOG_LEVEL_FLAG_KEY")]
    pub log_level_flag_key: Option<String>,

    /// Flag holding the flag client's own log level (debug, info, warn, error, none)
    #[arg(long, env = "SDK_LOG_LEVEL_FLAG_KEY")]
    pub sdk_log_level_flag_key: Option<String>,

    /// Fixed flag client log level, used when no SDK log level flag is set
    #[arg(long, env = "SDK_LOG_LEVEL")]
    pub sdk_log_level: Option<SdkLogLevel>,

    /// Evaluation context as a JSON object
    #[arg(long, env = "EVALUATION_CONTEXT")]
    pub context: Option<String>,

    /// Service name added to the evaluation context (defaults to the hostname)
    #[arg(long, env = "SERVICE_NAME")]
    pub service_name: Option<String>,

    /// Deployment environment added to the evaluation context
    #[arg(long, env = "SERVICE_ENVIRONMENT")]
    pub service_environment: Option<String>,

    /// Readiness timeout for the flag client in milliseconds [default: 5000]
    #[arg(long, env = "FLAG_INIT_TIMEOUT_MS")]
    pub init_timeout_ms: Option<u64>,

    /// Timeout for the SDK log level bootstrap client in milliseconds [default: 2000]
    #[arg(long, env = "FLAG_BOOTSTRAP_TIMEOUT_MS")]
    pub bootstrap_timeout_ms: Option<u64>,

    /// Level of this tool's own diagnostics [default: warn]
    #[arg(long, env = "TRACING_LEVEL")]
    pub tracing_level: Option<TracingLevel>,

    /// Output format [default: compact]
    #[arg(long, env = "LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Extra `target=level` tracing directives; invalid entries are skipped
    #[arg(long = "log-directive", env = "LOG_DIRECTIVES", value_delimiter = ',')]
    pub log_directives: Vec<String>,

    /// Configuration file path (optional)
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Level of the message to emit
    #[arg(long, default_value = "info")]
    pub level: LogLevel,

    /// Extra fields appended to the message; JSON values are pretty-printed
    #[arg(long = "field")]
    pub fields: Vec<String>,

    /// Message to emit
    #[serde(skip)]
    #[arg(default_value = "")]
    pub message: String,

    /// Derived fields (not CLI arguments)
    #[serde(skip)]
    #[arg(skip)]
    pub init_timeout: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub bootstrap_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flags_file: None,
            log_level_flag_key: None,
            sdk_log_level_flag_key: None,
            sdk_log_level: None,
            context: None,
            service_name: None,
            service_environment: None,
            init_timeout_ms: None,
            bootstrap_timeout_ms: None,
            tracing_level: None,
            log_format: None,
            log_directives: Vec::new(),
            config_file: None,
            level: LogLevel::Info,
            fields: Vec::new(),
            message: String::new(),
            init_timeout: DEFAULT_INIT_TIMEOUT,
            bootstrap_timeout: DEFAULT_BOOTSTRAP_TIMEOUT,
        }
    }
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = Config::parse_from(args);
        if let Some(config_file) = config.config_file.clone() {
            config = Self::from_file(&config_file)?.merged_with(config);
        }
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.post_process()?;
        Ok(config)
    }

    /// File settings overlaid with every setting the command line (or its
    /// environment fallback) provided, plus the invocation's message, level
    /// and fields.
    fn merged_with(mut self, cli: Config) -> Self {
        self.flags_file = cli.flags_file.or(self.flags_file);
        self.log_level_flag_key = cli.log_level_flag_key.or(self.log_level_flag_key);
        self.sdk_log_level_flag_key = cli.sdk_log_level_flag_key.or(self.sdk_log_level_flag_key);
        self.sdk_log_level = cli.sdk_log_level.or(self.sdk_log_level);
        self.context = cli.context.or(self.context);
        self.service_name = cli.service_name.or(self.service_name);
        self.service_environment = cli.service_environment.or(self.service_environment);
        self.init_timeout_ms = cli.init_timeout_ms.or(self.init_timeout_ms);
        self.bootstrap_timeout_ms = cli.bootstrap_timeout_ms.or(self.bootstrap_timeout_ms);
        self.tracing_level = cli.tracing_level.or(self.tracing_level);
        self.log_format = cli.log_format.or(self.log_format);
        if !cli.log_directives.is_empty() {
            self.log_directives = cli.log_directives;
        }
        self.config_file = cli.config_file;
        self.level = cli.level;
        self.fields = cli.fields;
        self.message = cli.message;
        self
    }

    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        self.init_timeout = self
            .init_timeout_ms
            .map_or(DEFAULT_INIT_TIMEOUT, Duration::from_millis);
        self.bootstrap_timeout = self
            .bootstrap_timeout_ms
            .map_or(DEFAULT_BOOTSTRAP_TIMEOUT, Duration::from_millis);
        Ok(())
    }

    pub fn tracing_level(&self) -> TracingLevel {
        self.tracing_level.unwrap_or(TracingLevel::Warn)
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_default()
    }

    pub fn credential(&self) -> Result<String, ConfigError> {
        self.flags_file
            .as_ref()
            .map(|p| p.display().to_string())
            .ok_or_else(|| ConfigError::InvalidConfig("Flags file not configured".to_string()))
    }

    /// Parsed `--context`, with a `service` object filled in from the service
    /// name (or hostname) and environment when the context lacks one.
    pub fn evaluation_context(&self) -> Result<EvaluationContext, ConfigError> {
        let mut context = match &self.context {
            Some(raw) => {
                let value: Value = serde_json::from_str(raw)
                    .map_err(|e| ConfigError::InvalidContext(e.to_string()))?;
                EvaluationContext::from_value(value).map_err(ConfigError::InvalidContext)?
            }
            None => EvaluationContext::new(),
        };

        if context.get("service").is_none() {
            let name = self
                .service_name
                .clone()
                .or_else(|| hostname::get().ok().and_then(|h| h.into_string().ok()));
            if let Some(name) = name {
                let mut service = json!({ "key": name, "name": name });
                if let Some(environment) = &self.service_environment {
                    service["environment"] = json!(environment);
                }
                context = context.with("service", service);
            }
        }

        if context.get("key").is_none() {
            let key = context.service_identity().key;
            context = context.with("key", key);
        }

        Ok(context)
    }

    pub fn logger_options(&self) -> LoggerOptions {
        let mut options = LoggerOptions::default()
            .with_init_timeout(self.init_timeout)
            .with_bootstrap_timeout(self.bootstrap_timeout);
        if let Some(key) = &self.log_level_flag_key {
            options = options.with_log_level_flag_key(key.clone());
        }
        if let Some(key) = &self.sdk_log_level_flag_key {
            options = options.with_sdk_log_level_flag_key(key.clone());
        }
        if let Some(level) = self.sdk_log_level {
            options = options.with_client_options(
                ClientOptions::default().with_diagnostic_logger(DiagnosticLogger::tracing(level)),
            );
        }
        options
    }

    /// `--field` values: valid JSON is kept structured, anything else is a
    /// plain string.
    pub fn parsed_fields(&self) -> Vec<Value> {
        self.fields
            .iter()
            .map(|raw| serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone())))
            .collect()
    }
}
