//! Fixtures shared by the unit tests.
use crate::page::{RenderEngine, RenderOptions, RenderOutcome, RenderedPage};
use async_trait::async_trait;
use canopy_formula::FormulaEngine;
use canopy_model::Component;
use canopy_traits::{
    ComponentStore, FetchError, FetchedResponse, Fetcher, InMemoryComponentStore, OutgoingRequest,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) const PAGE_URL: &str = "https://app.test/";

/// Formula shorthand for fixtures.
pub(crate) fn expr(source: &str) -> Value {
    json!({ "type": "expr", "source": source })
}

/// Answers by URL and records every request it sees, plus a
/// `start:<url>` / `end:<url>` log of when each call ran.
#[derive(Debug, Default)]
pub(crate) struct MockFetcher {
    responses: HashMap<String, FetchedResponse>,
    delay: Option<Duration>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<OutgoingRequest>>,
    events: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(mut self, url: &str, status: u16, body: Value) -> Self {
        self.responses
            .insert(url.to_string(), FetchedResponse::new(status, body));
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delays only the calls to `url`; overrides [`MockFetcher::with_delay`].
    pub(crate) fn delay_for(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> Vec<OutgoingRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &OutgoingRequest) -> Result<FetchedResponse, FetchError> {
        self.calls.lock().unwrap().push(request.clone());
        self.events.lock().unwrap().push(format!("start:{}", request.url));
        if let Some(delay) = self.delays.get(&request.url).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }
        self.events.lock().unwrap().push(format!("end:{}", request.url));
        self.responses
            .get(&request.url)
            .cloned()
            .ok_or_else(|| FetchError::Network(format!("connection refused: {}", request.url)))
    }

    fn name(&self) -> &'static str {
        "MockFetcher"
    }
}

/// `components` maps names to component JSON.
pub(crate) fn store(components: Value) -> Arc<InMemoryComponentStore> {
    let store = InMemoryComponentStore::new();
    for (name, definition) in components.as_object().cloned().unwrap_or_default() {
        let mut component: Component = serde_json::from_value(definition).unwrap();
        component.name = name;
        store.add(component).unwrap();
    }
    Arc::new(store)
}

pub(crate) fn engine(components: Value, fetcher: Arc<MockFetcher>) -> RenderEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    RenderEngine::new(store(components), Arc::new(FormulaEngine::default()), fetcher)
}

pub(crate) fn engine_with(
    components: Value,
    fetcher: Arc<MockFetcher>,
    options: RenderOptions,
) -> RenderEngine {
    engine(components, fetcher).with_options(options)
}

pub(crate) async fn render(engine: &RenderEngine, page: &str) -> RenderOutcome {
    render_at(engine, page, PAGE_URL).await
}

pub(crate) async fn render_at(engine: &RenderEngine, page: &str, url: &str) -> RenderOutcome {
    let page = engine.store().load(None, page).unwrap();
    engine.render_page(page, url).await.unwrap()
}

pub(crate) async fn render_html(engine: &RenderEngine, page: &str) -> RenderedPage {
    match render(engine, page).await {
        RenderOutcome::Page(rendered) => rendered,
        RenderOutcome::Redirect(redirect) => panic!("unexpected redirect: {:?}", redirect),
    }
}
