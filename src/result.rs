//! Uniform call result
//!
//! Every procedure call, introspection and middleware outcome is reported as a
//! `CallResult`. Server payload fields live next to `success`/`code`/`message`
//! when serialized, the way remote procedures return them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallResult {
    /// Indicates success or failure
    pub success: bool,

    /// Machine-readable outcome code
    #[serde(default)]
    pub code: String,

    /// Human-readable message
    #[serde(default)]
    pub message: String,

    /// Additional fields returned by the procedure
    #[serde(flatten)]
    pub payload: Map<String, Value>,

    /// Underlying error retained on failure paths
    #[serde(skip)]
    pub error: Option<Arc<anyhow::Error>>,
}

impl CallResult {
    /// Create a success result
    pub fn ok(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: code.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    /// Create a failure result
    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code: code.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_error(mut self, error: anyhow::Error) -> Self {
        self.error = Some(Arc::new(error));
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// Payload field lookup
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    /// Decode a JSON object into a result. Non-objects are rejected.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl PartialEq for CallResult {
    /// Retained errors are not comparable; only the visible shape is.
    fn eq(&self, other: &Self) -> bool {
        self.success == other.success
            && self.code == other.code
            && self.message == other.message
            && self.payload == other.payload
    }
}
