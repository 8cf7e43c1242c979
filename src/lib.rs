//! canopy renders JSON component trees to HTML on the server.
//!
//! A [`PageRenderer`] is built from a component store (a project file or
//! a component directory), an optional fetcher and formula evaluator, and
//! a [`CanopyConfig`]. Rendering a page yields either a full HTML
//! document with the data the client needs to hydrate, or a redirect.

pub mod builder;
pub mod config;
pub mod document;
pub mod error;
pub mod renderer;
pub mod response;

pub use builder::PageRendererBuilder;
pub use config::{CanopyConfig, DocumentSettings, FetchSettings, RenderSettings};
pub use document::render_document;
pub use error::CanopyError;
pub use renderer::PageRenderer;
pub use response::RenderResponse;

pub use canopy_render::{Diagnostic, Redirect, RenderOutcome, RenderedPage};
