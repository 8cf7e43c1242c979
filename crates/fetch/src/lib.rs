//! A [`Fetcher`] backed by `reqwest`.

use async_trait::async_trait;
use canopy_traits::{FetchError, FetchedResponse, Fetcher, OutgoingRequest};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        Self::with_user_agent(timeout, None)
    }

    pub fn with_user_agent(timeout: Duration, user_agent: Option<&str>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(agent) = user_agent {
            builder = builder.user_agent(agent.to_string());
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout.as_millis() as u64)
        } else if err.is_builder() {
            FetchError::InvalidRequest(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// JSON when declared or when the text parses as JSON, otherwise the text.
fn decode_body(text: String, declared_json: bool) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(value) => value,
        Err(e) => {
            if declared_json {
                log::debug!("Response declared JSON but did not parse: {}", e);
            }
            Value::String(text)
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &OutgoingRequest) -> Result<FetchedResponse, FetchError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        log::debug!("Fetching {} {}", request.method, request.url);
        let response = builder.send().await.map_err(|e| self.classify(e))?;

        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let declared_json = headers
            .get("content-type")
            .is_some_and(|ct| ct.contains("json"));

        let text = response.text().await.map_err(|e| self.classify(e))?;
        Ok(FetchedResponse {
            status,
            headers,
            body: decode_body(text, declared_json),
        })
    }

    fn name(&self) -> &'static str {
        "HttpFetcher"
    }
}
