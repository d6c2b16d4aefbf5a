use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::RequestId;

/// A successful reply correlated by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub id: RequestId,
    #[serde(default)]
    pub result: Value,
}

impl ResponseEnvelope {
    pub fn new(id: RequestId, result: Value) -> Self {
        Self { id, result }
    }

    /// Reply with a `null` result (for void methods)
    pub fn null(id: RequestId) -> Self {
        Self::new(id, Value::Null)
    }

    /// Deserialize the result into a concrete type
    pub fn result_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.result.clone())
    }
}

impl<T> From<(RequestId, T)> for ResponseEnvelope
where
    T: Into<Value>,
{
    fn from((id, result): (RequestId, T)) -> Self {
        Self::new(id, result.into())
    }
}
