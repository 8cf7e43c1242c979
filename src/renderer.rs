use crate::builder::PageRendererBuilder;
use crate::config::CanopyConfig;
use crate::error::CanopyError;
use crate::response::RenderResponse;
use canopy_render::{RenderEngine, RenderOutcome};
use canopy_traits::StoreError;

/// Renders pages of one project. Cheap to share between requests: every
/// render gets its own cache and accumulators.
pub struct PageRenderer {
    engine: RenderEngine,
    config: CanopyConfig,
}

impl PageRenderer {
    pub(crate) fn new(engine: RenderEngine, config: CanopyConfig) -> Self {
        Self { engine, config }
    }

    pub fn builder() -> PageRendererBuilder {
        PageRendererBuilder::new()
    }

    pub fn config(&self) -> &CanopyConfig {
        &self.config
    }

    pub fn engine(&self) -> &RenderEngine {
        &self.engine
    }

    /// Renders the page component `page` for the absolute request `url`.
    pub async fn render(&self, page: &str, url: &str) -> Result<RenderOutcome, CanopyError> {
        let component = self.engine.store().load(None, page).map_err(|e| match e {
            StoreError::NotFound(_) => CanopyError::PageNotFound(page.to_string()),
            other => CanopyError::Store(other),
        })?;
        if !component.is_page() {
            log::warn!("Component '{}' has no route; rendering it as a page", page);
        }
        let outcome = self.engine.render_page(component, url).await?;
        if let RenderOutcome::Page(rendered) = &outcome {
            log::debug!(
                "Rendered '{}': {} bytes, {} cached API responses, {} diagnostics",
                page,
                rendered.html.len(),
                rendered.api_cache.as_object().map_or(0, |cache| cache.len()),
                rendered.diagnostics.len()
            );
        }
        Ok(outcome)
    }

    /// Like [`PageRenderer::render`], mapped onto a response. Failures
    /// become error responses rather than errors.
    pub async fn respond(&self, page: &str, url: &str) -> RenderResponse {
        match self.render(page, url).await {
            Ok(outcome) => RenderResponse::from_outcome(outcome, &self.config.document),
            Err(err) => {
                log::error!("Rendering '{}' for {} failed: {}", page, url, err);
                RenderResponse::from_error(&err)
            }
        }
    }
}
