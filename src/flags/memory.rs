use super::{ClientOptions, DiagnosticLogger, FlagClient, FlagClientError, FlagClientFactory};
use crate::domain::{EvaluationContext, SdkLogLevel};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Shared, mutable flag values. Changes are visible to every client reading
/// the store on their next evaluation.
#[derive(Debug, Default)]
pub struct FlagStore {
    flags: RwLock<HashMap<String, Value>>,
    unavailable: AtomicBool,
}

impl FlagStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, flag_key: impl Into<String>, value: impl Into<Value>) {
        self.flags.write().insert(flag_key.into(), value.into());
    }

    pub fn remove(&self, flag_key: &str) -> Option<Value> {
        self.flags.write().remove(flag_key)
    }

    pub fn get(&self, flag_key: &str) -> Option<Value> {
        self.flags.read().get(flag_key).cloned()
    }

    /// Simulates a flag-service outage: readiness and evaluations fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn is_unavailable(&self) -> bool {
        self.unavailable.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct InMemoryFlagClient {
    store: Arc<FlagStore>,
    diagnostic_logger: Option<DiagnosticLogger>,
    closed: AtomicBool,
    close_calls: AtomicUsize,
    evaluations: AtomicUsize,
}

impl InMemoryFlagClient {
    pub fn new() -> Self {
        Self::with_store(FlagStore::new(), ClientOptions::default())
    }

    pub fn with_store(store: Arc<FlagStore>, options: ClientOptions) -> Self {
        Self {
            store,
            diagnostic_logger: options.diagnostic_logger,
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            evaluations: AtomicUsize::new(0),
        }
    }

    pub fn with_flag(self, flag_key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.store.set(flag_key, value);
        self
    }

    pub fn store(&self) -> &Arc<FlagStore> {
        &self.store
    }

    pub fn set_flag(&self, flag_key: impl Into<String>, value: impl Into<Value>) {
        self.store.set(flag_key, value);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    /// Verbosity this client's diagnostic logger was constructed with.
    pub fn diagnostic_level(&self) -> Option<SdkLogLevel> {
        self.diagnostic_logger.as_ref().map(DiagnosticLogger::level)
    }

    fn diagnostic(&self, level: SdkLogLevel, message: &str) {
        if let Some(logger) = &self.diagnostic_logger {
            logger.log(level, message);
        }
    }
}

impl Default for InMemoryFlagClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FlagClient for InMemoryFlagClient {
    async fn wait_for_initialization(&self, _timeout: Duration) -> Result<(), FlagClientError> {
        if self.store.is_unavailable() {
            self.diagnostic(SdkLogLevel::Error, "flag store unavailable during initialization");
            return Err(FlagClientError::NotReady("flag store unavailable".to_string()));
        }
        self.diagnostic(SdkLogLevel::Info, "in-memory flag client ready");
        Ok(())
    }

    async fn variation(
        &self,
        flag_key: &str,
        _context: &EvaluationContext,
        default: Value,
    ) -> Result<Value, FlagClientError> {
        if self.is_closed() {
            return Err(FlagClientError::Closed);
        }
        self.evaluations.fetch_add(1, Ordering::SeqCst);

        if self.store.is_unavailable() {
            self.diagnostic(SdkLogLevel::Error, &format!("evaluation of '{flag_key}' failed"));
            return Err(FlagClientError::Evaluation(format!(
                "flag store unavailable while evaluating '{flag_key}'"
            )));
        }

        match self.store.get(flag_key) {
            Some(value) => {
                self.diagnostic(SdkLogLevel::Debug, &format!("evaluated '{flag_key}' = {value}"));
                Ok(value)
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
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        self.diagnostic(SdkLogLevel::Info, "in-memory flag client closed");
        Ok(())
    }
}

/// Builds [`InMemoryFlagClient`]s over one shared store and keeps every client
/// it created for inspection.
#[derive(Debug, Default)]
pub struct InMemoryFlagClientFactory {
    store: Arc<FlagStore>,
    created: Mutex<Vec<Arc<InMemoryFlagClient>>>,
}

impl InMemoryFlagClientFactory {
    pub fn new(store: Arc<FlagStore>) -> Self {
        Self {
            store,
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &Arc<FlagStore> {
        &self.store
    }

    pub fn created(&self) -> Vec<Arc<InMemoryFlagClient>> {
        self.created.lock().clone()
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }
}

#[async_trait]
impl FlagClientFactory for InMemoryFlagClientFactory {
    async fn init(
        &self,
        credential: &str,
        options: ClientOptions,
    ) -> Result<Arc<dyn FlagClient>, FlagClientError> {
        if credential.trim().is_empty() {
            return Err(FlagClientError::InvalidCredential("empty credential".to_string()));
        }

        let client = Arc::new(InMemoryFlagClient::with_store(Arc::clone(&self.store), options));
        self.created.lock().push(Arc::clone(&client));
        Ok(client)
    }
}
