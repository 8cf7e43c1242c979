use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_REDIRECT_STATUS: u16 = 302;

/// Raised by the API resolver when a redirect rule matches. It travels up
/// the render as the error side of [`crate::Rendered`] and is turned into a
/// response by the page driver only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Redirect {
    pub location: String,
    pub status_code: u16,
    pub api_name: String,
    pub component_name: String,
    pub headers: BTreeMap<String, String>,
}

impl Redirect {
    pub fn new(
        location: impl Into<String>,
        status_code: Option<u16>,
        api_name: impl Into<String>,
        component_name: impl Into<String>,
    ) -> Self {
        let api_name = api_name.into();
        let component_name = component_name.into();
        let mut headers = BTreeMap::new();
        headers.insert("x-canopy-redirect-api".to_string(), api_name.clone());
        headers.insert(
            "x-canopy-redirect-component".to_string(),
            component_name.clone(),
        );
        Self {
            location: location.into(),
            status_code: status_code
                .filter(|code| (300..400).contains(code))
                .unwrap_or(DEFAULT_REDIRECT_STATUS),
            api_name,
            component_name,
            headers,
        }
    }

    /// Headers for the redirect response, `location` included.
    pub fn response_headers(&self) -> BTreeMap<String, String> {
        let mut headers = self.headers.clone();
        headers.insert("location".to_string(), self.location.clone());
        headers
    }
}
