use canopy_render::RenderError;
use canopy_traits::{FetchError, StoreError};
use thiserror::Error;

/// Errors surfaced by the top-level renderer and CLI.
#[derive(Error, Debug)]
pub enum CanopyError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Renderer is not set up: {0}")]
    Setup(String),

    #[error("Page '{0}' not found")]
    PageNotFound(String),

    #[error("Component store error: {0}")]
    Store(#[from] StoreError),

    #[error("HTTP client setup failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CanopyError {
    /// HTTP status a host should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            CanopyError::PageNotFound(_) => 404,
            CanopyError::Render(RenderError::InvalidRequestUrl { .. }) => 400,
            _ => 500,
        }
    }
}
