pub mod fixtures;

use async_trait::async_trait;
use canopy::{CanopyConfig, PageRenderer, RenderOutcome, RenderedPage};
use canopy_traits::{FetchError, FetchedResponse, Fetcher, OutgoingRequest};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A fetcher that answers from a URL table and remembers what it was asked.
#[derive(Debug, Default)]
pub struct RecordingFetcher {
    responses: HashMap<String, FetchedResponse>,
    calls: Mutex<Vec<OutgoingRequest>>,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, url: &str, status: u16, body: Value) -> Self {
        self.responses
            .insert(url.to_string(), FetchedResponse::new(status, body));
        self
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|request| request.url.clone())
            .collect()
    }
}

#[async_trait]
impl Fetcher for RecordingFetcher {
    async fn fetch(&self, request: &OutgoingRequest) -> Result<FetchedResponse, FetchError> {
        self.calls.lock().unwrap().push(request.clone());
        self.responses
            .get(&request.url)
            .cloned()
            .ok_or_else(|| FetchError::Network(format!("no route to {}", request.url)))
    }

    fn name(&self) -> &'static str {
        "RecordingFetcher"
    }
}

/// Writes `project` to a temporary file and builds a renderer over it.
pub fn renderer_for(
    project: &Value,
    fetcher: Arc<RecordingFetcher>,
) -> Result<(PageRenderer, tempfile::TempDir), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("project.json");
    std::fs::write(&path, serde_json::to_string_pretty(project)?)?;
    let renderer = PageRenderer::builder()
        .with_config(CanopyConfig::default())
        .with_project_file(&path)?
        .with_fetcher(fetcher)
        .build()?;
    Ok((renderer, dir))
}

pub fn expect_page(outcome: RenderOutcome) -> Result<RenderedPage, Box<dyn std::error::Error>> {
    match outcome {
        RenderOutcome::Page(page) => Ok(page),
        RenderOutcome::Redirect(redirect) => {
            Err(format!("expected a page, got a redirect to {}", redirect.location).into())
        }
    }
}
