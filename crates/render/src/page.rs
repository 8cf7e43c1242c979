//! Drives one page render from request URL to outcome.
use crate::context::location_value;
use crate::error::{Diagnostic, RenderError};
use crate::redirect::Redirect;
use crate::session::RenderSession;
use canopy_formula::FormulaEvaluator;
use canopy_model::Component;
use canopy_traits::{ComponentStore, Fetcher};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_MAX_COMPONENT_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Applied to every outgoing API call.
    pub request_timeout: Duration,
    /// Deeper component references render nothing and leave a diagnostic.
    pub max_component_depth: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_component_depth: DEFAULT_MAX_COMPONENT_DEPTH,
        }
    }
}

/// Everything a finished render hands to the document layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPage {
    pub html: String,
    /// Request key to API status, for client hydration.
    pub api_cache: Value,
    pub style_variables: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub enum RenderOutcome {
    Page(RenderedPage),
    Redirect(Redirect),
}

impl RenderOutcome {
    pub fn is_redirect(&self) -> bool {
        matches!(self, RenderOutcome::Redirect(_))
    }
}

/// Renders pages against a component store, a formula evaluator and a
/// fetcher. Holds no per-request state; each call gets its own session.
pub struct RenderEngine {
    store: Arc<dyn ComponentStore>,
    evaluator: Arc<dyn FormulaEvaluator>,
    fetcher: Arc<dyn Fetcher>,
    options: RenderOptions,
}

impl RenderEngine {
    pub fn new(
        store: Arc<dyn ComponentStore>,
        evaluator: Arc<dyn FormulaEvaluator>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            store,
            evaluator,
            fetcher,
            options: RenderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &dyn ComponentStore {
        self.store.as_ref()
    }

    pub fn evaluator(&self) -> &dyn FormulaEvaluator {
        self.evaluator.as_ref()
    }

    pub fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Renders `page` for the absolute request `url`.
    ///
    /// A matching redirect rule anywhere in the tree abandons the render and
    /// yields [`RenderOutcome::Redirect`]; no partial markup escapes.
    pub async fn render_page(
        &self,
        page: Arc<Component>,
        url: &str,
    ) -> Result<RenderOutcome, RenderError> {
        let request_url = Url::parse(url).map_err(|e| RenderError::InvalidRequestUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let location = location_value(&request_url, page.route.as_ref());
        log::debug!("Rendering page '{}' for {}", page.name, request_url);

        let session = RenderSession::new(self, request_url, location);
        match session.render_root(page).await {
            Ok(html) => Ok(RenderOutcome::Page(session.finish(html))),
            Err(redirect) => Ok(RenderOutcome::Redirect(redirect)),
        }
    }
}
