use canopy_traits::{FetchError, FetchedResponse};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// What a component's formulas see under `Apis.<name>`, and what the
/// client receives in the hydration cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatus {
    pub data: Value,
    pub is_loading: bool,
    pub error: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseInfo {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
}

impl ApiStatus {
    /// Status of an API that was not called during the server render.
    pub fn idle(is_loading: bool) -> Self {
        Self {
            data: Value::Null,
            is_loading,
            error: Value::Null,
            response: None,
        }
    }

    pub fn success(response: FetchedResponse) -> Self {
        Self {
            data: response.body,
            is_loading: false,
            error: Value::Null,
            response: Some(ResponseInfo {
                status: response.status,
                headers: response.headers,
            }),
        }
    }

    /// Moves the payload into `error`. A response without a body still
    /// reports an error value.
    pub fn into_error(self) -> Self {
        let status = self.response.as_ref().map(|r| r.status);
        let error = match self.data {
            Value::Null => json!({ "status": status }),
            body => body,
        };
        Self {
            data: Value::Null,
            error,
            ..self
        }
    }

    pub fn failed(err: &FetchError) -> Self {
        let status = err.status_code();
        Self {
            data: Value::Null,
            is_loading: false,
            error: json!({ "message": err.to_string(), "status": status }),
            response: Some(ResponseInfo {
                status,
                headers: BTreeMap::new(),
            }),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
