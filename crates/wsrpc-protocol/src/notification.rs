use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A one-way message (no id, no reply expected)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEnvelope {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl NotificationEnvelope {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Create a new notification with no parameters
    pub fn new_no_params(method: impl Into<String>) -> Self {
        Self::new(method, Value::Null)
    }

    /// Get a parameter by name (if params are an object)
    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.params.as_object()?.get(name)
    }
}
