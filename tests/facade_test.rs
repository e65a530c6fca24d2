use async_trait::async_trait;
use flag_gated_logger::flags::{FlagStore, InMemoryFlagClient, InMemoryFlagClientFactory};
use flag_gated_logger::{
    ClientOptions, EvaluationContext, FlagClient, FlagClientError, FlagClientFactory, FlagGatedLogger,
    FlagKeyDefaults, FlagLoggerError, LogLevel, LoggerOptions, MemorySink, SdkLogLevel,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

const LEVEL_FLAG: &str = "app-log-level";
const SDK_FLAG: &str = "sdk-log-level";

fn options() -> LoggerOptions {
    LoggerOptions::default()
        .with_log_level_flag_key(LEVEL_FLAG)
        .with_init_timeout(Duration::from_millis(200))
        .with_bootstrap_timeout(Duration::from_millis(200))
}

fn context() -> EvaluationContext {
    EvaluationContext::new()
        .with("key", "request-42")
        .with("service", json!({"key": "checkout", "name": "Checkout"}))
}

async fn logger_with_threshold(threshold: i64) -> (FlagGatedLogger, Arc<MemorySink>, Arc<FlagStore>) {
    let store = FlagStore::new();
    store.set(LEVEL_FLAG, threshold);
    let factory = InMemoryFlagClientFactory::new(Arc::clone(&store));
    let sink = MemorySink::new();

    let logger = FlagGatedLogger::from_credential(
        sink.clone(),
        FlagKeyDefaults::default(),
        &factory,
        "sdk-key",
        context(),
        options(),
    )
    .await
    .unwrap();

    (logger, sink, store)
}

fn bodies(sink: &MemorySink) -> Vec<String> {
    sink.records()
        .into_iter()
        .map(|r| {
            r.message
                .strip_prefix(r.level.marker())
                .unwrap_or(&r.message)
                .trim_start()
                .to_string()
        })
        .collect()
}

#[tokio::test]
async fn test_info_threshold_scenario() {
    let (logger, sink, _store) = logger_with_threshold(3).await;

    assert!(logger.fatal("a", &[]).await);
    assert!(logger.error("b", &[]).await);
    assert!(logger.warn("c", &[]).await);
    assert!(logger.info("d", &[]).await);
    assert!(!logger.debug("e", &[]).await);
    assert!(!logger.trace("f", &[]).await);

    assert_eq!(bodies(&sink), vec!["a", "b", "c", "d"]);
    let levels: Vec<LogLevel> = sink.records().iter().map(|r| r.level).collect();
    assert_eq!(
        levels,
        vec![LogLevel::Fatal, LogLevel::Error, LogLevel::Warn, LogLevel::Info]
    );
}

#[tokio::test]
async fn test_markers_are_prepended() {
    let (logger, sink, _store) = logger_with_threshold(5).await;
    logger.debug("details", &[]).await;

    let record = &sink.records()[0];
    assert_eq!(record.message, format!("{} details", LogLevel::Debug.marker()));
}

#[tokio::test]
async fn test_flag_change_applies_to_next_call() {
    let (logger, sink, store) = logger_with_threshold(1).await;

    assert!(!logger.debug("hidden", &[]).await);
    store.set(LEVEL_FLAG, 4);
    assert!(logger.debug("shown", &[]).await);
    store.set(LEVEL_FLAG, 0);
    assert!(!logger.error("hidden again", &[]).await);

    assert_eq!(bodies(&sink), vec!["shown"]);
}

#[tokio::test]
async fn test_object_fields_are_pretty_printed() {
    let (logger, sink, _store) = logger_with_threshold(3).await;

    logger.info("payload", &[json!({"x": 1}), json!("done")]).await;

    assert_eq!(bodies(&sink), vec!["payload {\n  \"x\": 1\n} done"]);
}

#[tokio::test]
async fn test_flag_outage_falls_back_to_error_threshold() {
    let (logger, sink, store) = logger_with_threshold(5).await;
    store.set_unavailable(true);

    assert!(logger.error("still visible", &[]).await);
    assert!(!logger.warn("suppressed", &[]).await);
    assert_eq!(bodies(&sink), vec!["still visible"]);
}

#[tokio::test]
async fn test_fractional_threshold_compares_numerically() {
    let (logger, sink, store) = logger_with_threshold(1).await;

    store.set(LEVEL_FLAG, 3.0);
    assert!(logger.warn("w", &[]).await);
    assert!(logger.info("i", &[]).await);
    assert!(!logger.debug("d", &[]).await);

    store.set(LEVEL_FLAG, 2.5);
    assert!(logger.warn("w2", &[]).await);
    assert!(!logger.info("i2", &[]).await);

    assert_eq!(bodies(&sink), vec!["w", "i", "w2"]);
}

/// Client whose evaluations never complete.
#[derive(Default)]
struct StalledClient {
    closes: Mutex<usize>,
}

#[async_trait]
impl FlagClient for StalledClient {
    async fn wait_for_initialization(&self, _: Duration) -> Result<(), FlagClientError> {
        Ok(())
    }

    async fn variation(&self, _: &str, _: &EvaluationContext, _: Value) -> Result<Value, FlagClientError> {
        std::future::pending().await
    }

    async fn close(&self) -> Result<(), FlagClientError> {
        *self.closes.lock() += 1;
        Ok(())
    }
}

#[derive(Default)]
struct StalledFactory {
    created: Mutex<Vec<Arc<StalledClient>>>,
}

#[async_trait]
impl FlagClientFactory for StalledFactory {
    async fn init(&self, _: &str, _: ClientOptions) -> Result<Arc<dyn FlagClient>, FlagClientError> {
        let client = Arc::new(StalledClient::default());
        self.created.lock().push(Arc::clone(&client));
        Ok(client as Arc<dyn FlagClient>)
    }
}

#[tokio::test]
async fn test_stalled_flag_service_never_blocks_initialization_or_logging() {
    let factory = StalledFactory::default();
    let sink = MemorySink::new();
    let options = LoggerOptions::default()
        .with_log_level_flag_key(LEVEL_FLAG)
        .with_sdk_log_level_flag_key(SDK_FLAG)
        .with_init_timeout(Duration::from_millis(100))
        .with_bootstrap_timeout(Duration::from_millis(100))
        .with_evaluation_timeout(Duration::from_millis(50));

    let mut logger = tokio::time::timeout(
        Duration::from_secs(3),
        FlagGatedLogger::from_credential(
            sink.clone(),
            FlagKeyDefaults::default(),
            &factory,
            "sdk-key",
            context(),
            options,
        ),
    )
    .await
    .expect("initialization is bounded")
    .unwrap();

    {
        let created = factory.created.lock();
        assert_eq!(created.len(), 2);
        assert_eq!(*created[0].closes.lock(), 1);
    }
    assert_eq!(sink.at_level(LogLevel::Warn).len(), 1);

    let (error_emitted, info_emitted) = tokio::time::timeout(Duration::from_secs(3), async {
        (logger.error("still visible", &[]).await, logger.info("dropped", &[]).await)
    })
    .await
    .expect("leveled calls are bounded");
    assert!(error_emitted);
    assert!(!info_emitted);

    logger.close().await.unwrap();
    assert_eq!(*factory.created.lock()[1].closes.lock(), 1);
}

#[tokio::test]
async fn test_without_sdk_flag_only_the_real_client_is_built() {
    let store = FlagStore::new();
    let factory = InMemoryFlagClientFactory::new(Arc::clone(&store));

    let mut logger = FlagGatedLogger::new(MemorySink::new());
    logger
        .initialize_from_credential(&factory, "sdk-key", context(), options())
        .await
        .unwrap();

    let created = factory.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].diagnostic_level(), None);
    assert!(logger.owns_client());
    assert_eq!(logger.sdk_log_level_flag_key(), None);
}

#[tokio::test]
async fn test_sdk_flag_bootstraps_through_temporary_client() {
    let store = FlagStore::new();
    store.set(SDK_FLAG, "debug");
    let factory = InMemoryFlagClientFactory::new(Arc::clone(&store));

    let logger = FlagGatedLogger::from_credential(
        MemorySink::new(),
        FlagKeyDefaults::default(),
        &factory,
        "sdk-key",
        context(),
        options().with_sdk_log_level_flag_key(SDK_FLAG),
    )
    .await
    .unwrap();

    let created = factory.created();
    assert_eq!(created.len(), 2);

    let temp = &created[0];
    assert_eq!(temp.diagnostic_level(), Some(SdkLogLevel::Error));
    assert_eq!(temp.close_calls(), 1);

    let real = &created[1];
    assert_eq!(real.diagnostic_level(), Some(SdkLogLevel::Debug));
    assert!(!real.is_closed());
    assert_eq!(logger.sdk_log_level_flag_key(), Some(SDK_FLAG));
}

#[tokio::test]
async fn test_invalid_sdk_level_warns_once_and_uses_error() {
    let store = FlagStore::new();
    store.set(SDK_FLAG, "invalid-level");
    let factory = InMemoryFlagClientFactory::new(Arc::clone(&store));
    let sink = MemorySink::new();

    let _logger = FlagGatedLogger::from_credential(
        sink.clone(),
        FlagKeyDefaults::default(),
        &factory,
        "sdk-key",
        context(),
        options().with_sdk_log_level_flag_key(SDK_FLAG),
    )
    .await
    .unwrap();

    let warnings: Vec<String> = sink
        .at_level(LogLevel::Warn)
        .into_iter()
        .filter(|w| w.contains("invalid-level"))
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(factory.created()[1].diagnostic_level(), Some(SdkLogLevel::Error));
}

#[tokio::test]
async fn test_temporary_client_closed_when_evaluation_fails() {
    let store = FlagStore::new();
    store.set_unavailable(true);
    let factory = InMemoryFlagClientFactory::new(Arc::clone(&store));

    let logger = FlagGatedLogger::from_credential(
        MemorySink::new(),
        FlagKeyDefaults::default(),
        &factory,
        "sdk-key",
        context(),
        options().with_sdk_log_level_flag_key(SDK_FLAG),
    )
    .await
    .unwrap();

    let created = factory.created();
    assert_eq!(created[0].close_calls(), 1);
    assert_eq!(created[1].diagnostic_level(), Some(SdkLogLevel::Error));
    assert!(logger.is_initialized());
}

#[tokio::test]
async fn test_sdk_diagnostics_bypass_flag_gating() {
    let store = FlagStore::new();
    store.set(LEVEL_FLAG, 0);
    store.set(SDK_FLAG, "debug");
    let factory = InMemoryFlagClientFactory::new(Arc::clone(&store));
    let sink = MemorySink::new();

    let logger = FlagGatedLogger::from_credential(
        sink.clone(),
        FlagKeyDefaults::default(),
        &factory,
        "sdk-key",
        context(),
        options().with_sdk_log_level_flag_key(SDK_FLAG),
    )
    .await
    .unwrap();
    sink.clear();

    assert!(!logger.info("gated out", &[]).await);

    let debug_records = sink.at_level(LogLevel::Debug);
    assert!(!debug_records.is_empty());
    assert!(debug_records.iter().all(|m| m.contains("[flag-sdk]")));
    assert!(sink.messages().iter().all(|m| !m.contains("gated out")));
}

#[tokio::test]
async fn test_blank_credential_is_invalid_argument() {
    let factory = InMemoryFlagClientFactory::new(FlagStore::new());
    let mut logger = FlagGatedLogger::new(MemorySink::new());

    let err = logger
        .initialize_from_credential(&factory, "", context(), options().with_sdk_log_level_flag_key(SDK_FLAG))
        .await
        .unwrap_err();

    assert!(matches!(err, FlagLoggerError::InvalidArgument(_)));
    assert_eq!(factory.created_count(), 0);
    assert!(!logger.is_initialized());
}

#[tokio::test]
async fn test_missing_flag_key_is_configuration_error() {
    let factory = InMemoryFlagClientFactory::new(FlagStore::new());
    let mut logger = FlagGatedLogger::new(MemorySink::new());

    let err = logger
        .initialize_from_credential(&factory, "sdk-key", context(), LoggerOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, FlagLoggerError::MissingLogLevelFlagKey));
    assert_eq!(factory.created_count(), 0);
}

#[tokio::test]
async fn test_close_closes_owned_client_exactly_once() {
    let store = FlagStore::new();
    let factory = InMemoryFlagClientFactory::new(Arc::clone(&store));
    let mut logger = FlagGatedLogger::from_credential(
        MemorySink::new(),
        FlagKeyDefaults::default(),
        &factory,
        "sdk-key",
        context(),
        options(),
    )
    .await
    .unwrap();

    logger.close().await.unwrap();
    logger.close().await.unwrap();

    assert_eq!(factory.created()[0].close_calls(), 1);
    assert!(!logger.is_initialized());
    assert_eq!(logger.resolve_threshold().await, 1);
}

#[tokio::test]
async fn test_existing_client_is_borrowed_not_closed() {
    let client = Arc::new(InMemoryFlagClient::new().with_flag(LEVEL_FLAG, 2));
    let sink = MemorySink::new();

    let mut logger = FlagGatedLogger::from_existing_client(
        sink.clone(),
        FlagKeyDefaults::default(),
        Arc::clone(&client) as Arc<dyn FlagClient>,
        context(),
        options().with_sdk_log_level_flag_key(SDK_FLAG),
    )
    .await
    .unwrap();

    assert!(logger.warn("borrowed", &[]).await);
    logger.close().await.unwrap();

    assert_eq!(client.close_calls(), 0);
    assert!(!client.is_closed());
    // Bootstrap is skipped for caller-owned clients
    assert_eq!(client.diagnostic_level(), None);
}

#[tokio::test]
async fn test_context_is_passed_through_unchanged() {
    let (logger, _sink, _store) = logger_with_threshold(3).await;
    assert_eq!(logger.context(), Some(&context()));
    assert_eq!(logger.log_level_flag_key(), Some(LEVEL_FLAG));
}
