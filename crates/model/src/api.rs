//! API declarations: remote calls a component makes while it renders.
use crate::formula::Formula;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiDeclaration {
    pub url: Option<Formula>,
    pub path: BTreeMap<String, ApiPathSegment>,
    pub query_params: IndexMap<String, ApiParameter>,
    pub headers: IndexMap<String, ApiParameter>,
    pub method: ApiMethod,
    pub body: Option<Formula>,
    /// Exposed to this API's own formulas as `ApiInputs`.
    pub inputs: BTreeMap<String, ApiInput>,
    pub auto_fetch: Option<Formula>,
    pub server: ApiServerSettings,
    pub redirect_rules: BTreeMap<String, RedirectRule>,
    /// Classifies a completed response as an error.
    pub is_error: Option<Formula>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPathSegment {
    pub formula: Formula,
    #[serde(default)]
    pub index: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiParameter {
    pub formula: Formula,
    /// The parameter is sent only when this is truthy; absent means always.
    #[serde(default)]
    pub enabled: Option<Formula>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiInput {
    pub formula: Formula,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiServerSettings {
    pub ssr: Option<SsrSettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SsrSettings {
    pub enabled: Option<Formula>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectRule {
    /// Yields the redirect destination; empty or null means no redirect.
    pub formula: Formula,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub status_code: Option<u16>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApiMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl ApiMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiMethod::Get => "GET",
            ApiMethod::Post => "POST",
            ApiMethod::Put => "PUT",
            ApiMethod::Patch => "PATCH",
            ApiMethod::Delete => "DELETE",
            ApiMethod::Head => "HEAD",
            ApiMethod::Options => "OPTIONS",
        }
    }

    pub fn allows_body(&self) -> bool {
        !matches!(self, ApiMethod::Get | ApiMethod::Head)
    }
}

impl ApiDeclaration {
    pub fn ssr_enabled(&self) -> Option<&Formula> {
        self.server.ssr.as_ref().and_then(|ssr| ssr.enabled.as_ref())
    }

    /// Path segments in their declared `index` order.
    pub fn ordered_path(&self) -> Vec<&ApiPathSegment> {
        let mut segments: Vec<_> = self.path.values().collect();
        segments.sort_by_key(|s| s.index);
        segments
    }

    /// Redirect rules in their declared `index` order.
    pub fn ordered_redirect_rules(&self) -> Vec<(&String, &RedirectRule)> {
        let mut rules: Vec<_> = self.redirect_rules.iter().collect();
        rules.sort_by_key(|(_, rule)| rule.index);
        rules
    }

    /// Formulas that take part in deciding whether and how the request is made.
    fn request_formulas(&self) -> impl Iterator<Item = &Formula> {
        self.url
            .iter()
            .chain(self.path.values().map(|s| &s.formula))
            .chain(
                self.query_params
                    .values()
                    .chain(self.headers.values())
                    .flat_map(|p| std::iter::once(&p.formula).chain(p.enabled.iter())),
            )
            .chain(self.body.iter())
            .chain(self.inputs.values().map(|i| &i.formula))
            .chain(self.auto_fetch.iter())
            .chain(self.ssr_enabled())
    }

    /// Names of sibling APIs whose results this API's request formulas read.
    ///
    /// `own_name` and names outside `siblings` are never included.
    pub fn api_references(&self, own_name: &str, siblings: &BTreeSet<&str>) -> BTreeSet<String> {
        self.request_formulas()
            .flat_map(Formula::api_references)
            .filter(|name| name != own_name && siblings.contains(name.as_str()))
            .collect()
    }
}
