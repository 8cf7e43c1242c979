use crate::config::CanopyConfig;
use crate::error::CanopyError;
use crate::renderer::PageRenderer;
use canopy_fetch::HttpFetcher;
use canopy_formula::{FormulaEngine, FormulaEvaluator};
use canopy_render::RenderEngine;
use canopy_store::{FilesystemComponentStore, ProjectFile};
use canopy_traits::{ComponentStore, Fetcher};
use std::path::Path;
use std::sync::Arc;

/// A builder for creating a [`PageRenderer`].
#[derive(Default)]
pub struct PageRendererBuilder {
    store: Option<Arc<dyn ComponentStore>>,
    fetcher: Option<Arc<dyn Fetcher>>,
    evaluator: Option<Arc<dyn FormulaEvaluator>>,
    config: CanopyConfig,
}

impl PageRendererBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: CanopyConfig) -> Self {
        self.config = config;
        self
    }

    /// Loads every component of a project file into memory.
    pub fn with_project_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, CanopyError> {
        let path = path.as_ref();
        log::info!("Loading project from {}", path.display());
        let store = ProjectFile::from_path(path)?.into_store()?;
        self.store = Some(Arc::new(store));
        Ok(self)
    }

    /// Reads components lazily from `components/` and
    /// `packages/<package>/components/` below `dir`.
    pub fn with_component_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.store = Some(Arc::new(FilesystemComponentStore::new(dir)));
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ComponentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn FormulaEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Without an explicit fetcher an HTTP client is built from the config;
    /// without an evaluator the default formula engine is used.
    pub fn build(self) -> Result<PageRenderer, CanopyError> {
        let store = self.store.ok_or_else(|| {
            CanopyError::Setup(
                "No component store configured. Use `with_project_file` or `with_component_dir`."
                    .to_string(),
            )
        })?;
        let fetcher: Arc<dyn Fetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::with_user_agent(
                self.config.render.request_timeout(),
                Some(self.config.fetch.user_agent.as_str()),
            )?),
        };
        let evaluator: Arc<dyn FormulaEvaluator> = match self.evaluator {
            Some(evaluator) => evaluator,
            None => Arc::new(FormulaEngine::default()),
        };

        log::debug!(
            "Building renderer with store '{}' and fetcher '{}'",
            store.name(),
            fetcher.name()
        );
        let engine = RenderEngine::new(store, evaluator, fetcher)
            .with_options(self.config.render.to_options());
        Ok(PageRenderer::new(engine, self.config))
    }
}
