//! Maps render outcomes onto HTTP-shaped responses.
use crate::config::DocumentSettings;
use crate::document::render_document;
use crate::error::CanopyError;
use canopy_render::RenderOutcome;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl RenderResponse {
    fn with_content_type(status: u16, content_type: &str, body: String) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), content_type.to_string());
        Self {
            status,
            headers,
            body,
        }
    }

    /// A page becomes a 200 document; a redirect becomes an empty response
    /// with its status and `location`.
    pub fn from_outcome(outcome: RenderOutcome, settings: &DocumentSettings) -> Self {
        match outcome {
            RenderOutcome::Page(page) => Self::with_content_type(
                200,
                "text/html; charset=utf-8",
                render_document(&page, settings),
            ),
            RenderOutcome::Redirect(redirect) => Self {
                status: redirect.status_code,
                headers: redirect.response_headers(),
                body: String::new(),
            },
        }
    }

    pub fn from_error(err: &CanopyError) -> Self {
        let status = err.status_code();
        let body = match status {
            404 => "Not Found",
            400 => "Bad Request",
            _ => "Internal Server Error",
        };
        Self::with_content_type(status, "text/plain; charset=utf-8", body.to_string())
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}
