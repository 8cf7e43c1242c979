//! Server-side rendering of canopy component trees.
//!
//! [`RenderEngine::render_page`] walks a page's node tree, instantiating
//! referenced components, resolving their APIs and collecting custom
//! property rules. The result is either markup plus the data the client
//! needs to hydrate, or a redirect raised by one of the APIs.

pub mod api;
pub mod context;
mod engine;
pub mod error;
pub mod html;
pub mod page;
pub mod redirect;
mod session;
pub mod style_vars;

pub use api::{ApiCache, ApiStatus};
pub use context::{ComponentData, location_value};
pub use error::{Diagnostic, DiagnosticLevel, RenderError, Rendered};
pub use page::{RenderEngine, RenderOptions, RenderOutcome, RenderedPage};
pub use redirect::Redirect;
pub use style_vars::{RuleOptions, StyleVariables};

#[cfg(test)]
mod test_support;
