use crate::redirect::Redirect;
use serde::Serialize;
use thiserror::Error;

/// Faults that abort a render. Everything recoverable is reported as a
/// [`Diagnostic`] or an error-shaped API status instead.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid request URL '{url}': {message}")]
    InvalidRequestUrl { url: String, message: String },
}

/// Result of any render step that may redirect. A matched redirect rule
/// is the only thing that stops a render once it has started.
pub type Rendered<T = String> = Result<T, Redirect>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Info,
    Warn,
}

/// A non-fatal problem found while rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub component: String,
    pub node: Option<String>,
}
