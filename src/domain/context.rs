use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const SERVICE_FIELD: &str = "service";
const PLACEHOLDER_KEY: &str = "flag-gated-logger";
const PLACEHOLDER_NAME: &str = "unknown-service";
const PLACEHOLDER_ENVIRONMENT: &str = "unknown";

/// Identity/attribute bundle presented to the flag service.
///
/// The logger never interprets it, with one exception: the SDK log-level
/// bootstrap reads the optional `service` object to target its own lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationContext(Map<String, Value>);

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(format!("Evaluation context must be a JSON object, got: {other}")),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Service identity carried by this context, with placeholders for any
    /// missing field.
    pub fn service_identity(&self) -> ServiceIdentity {
        let service = self.0.get(SERVICE_FIELD).and_then(Value::as_object);
        let field = |name: &str, placeholder: &str| {
            service
                .and_then(|s| s.get(name))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or(placeholder)
                .to_string()
        };

        ServiceIdentity {
            key: field("key", PLACEHOLDER_KEY),
            name: field("name", PLACEHOLDER_NAME),
            environment: field("environment", PLACEHOLDER_ENVIRONMENT),
        }
    }

    /// Synthetic context used only for the SDK log-level lookup, so that
    /// SDK verbosity targeting stays independent of application targeting.
    pub fn sdk_bootstrap_context(&self) -> EvaluationContext {
        let identity = self.service_identity();
        EvaluationContext::new()
            .with("kind", "service")
            .with("key", identity.key)
            .with("name", identity.name)
            .with("environment", identity.environment)
    }
}

impl From<Map<String, Value>> for EvaluationContext {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub key: String,
    pub name: String,
    pub environment: String,
}
