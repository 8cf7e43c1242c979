//! The outgoing-request boundary used by API resolution.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;
use thiserror::Error;

/// A fully resolved outgoing request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OutgoingRequest {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl OutgoingRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }
}

/// A completed HTTP exchange, whatever its status.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// Decoded JSON when the body is JSON, otherwise the body text.
    pub body: Value,
}

impl FetchedResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// A request that did not produce a response.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Request failed: {0}")]
    Network(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    /// The HTTP status the failure is reported as.
    pub fn status_code(&self) -> u16 {
        match self {
            FetchError::Timeout(_) => 504,
            FetchError::Network(_) | FetchError::InvalidRequest(_) => 500,
        }
    }
}

/// Performs outgoing requests on behalf of API declarations.
#[async_trait]
pub trait Fetcher: Send + Sync + Debug {
    async fn fetch(&self, request: &OutgoingRequest) -> Result<FetchedResponse, FetchError>;

    /// Returns a human-readable name for this fetcher (for logging/debugging).
    fn name(&self) -> &'static str;
}
