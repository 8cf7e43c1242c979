//! Component definitions.
use crate::api::ApiDeclaration;
use crate::formula::Formula;
use crate::node::Node;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Node id of every component's root node.
pub const ROOT_NODE_ID: &str = "root";

/// Name of the slot a slot node without a name fills.
pub const DEFAULT_SLOT: &str = "default";

/// A named, immutable definition of a node tree plus its formulas,
/// variables and APIs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    /// Filled from the map key when loaded from a project file.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nodes: HashMap<String, Node>,
    #[serde(default)]
    pub formulas: BTreeMap<String, ComponentFormula>,
    #[serde(default)]
    pub apis: BTreeMap<String, ApiDeclaration>,
    #[serde(default)]
    pub variables: BTreeMap<String, ComponentVariable>,
    /// Present when the component is a page.
    #[serde(default)]
    pub route: Option<PageRoute>,
    /// Set by the store for components that come from an installed package.
    #[serde(default)]
    pub package: Option<String>,
}

impl Component {
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn is_page(&self) -> bool {
        self.route.is_some()
    }

    /// `package/name` for package components, the bare name otherwise.
    pub fn qualified_name(&self) -> String {
        match &self.package {
            Some(package) => format!("{}/{}", package, self.name),
            None => self.name.clone(),
        }
    }

    /// Formulas this component publishes to its descendants through `Contexts`.
    pub fn exposed_formulas(&self) -> impl Iterator<Item = (&String, &Formula)> {
        self.formulas
            .iter()
            .filter(|(_, f)| f.expose_in_context)
            .map(|(name, f)| (name, &f.formula))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentFormula {
    pub formula: Formula,
    #[serde(default)]
    pub expose_in_context: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentVariable {
    pub initial_value: Formula,
}

/// Route metadata of a page component.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PageRoute {
    pub path: Vec<RouteSegment>,
    pub query: BTreeMap<String, RouteQueryParam>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteSegment {
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Static,
    Param,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteQueryParam {
    /// Used when the request URL does not carry the parameter.
    pub default_value: Option<Value>,
}

impl PageRoute {
    /// Matches the request path segments positionally against the route.
    ///
    /// Returns `None` when a static segment differs or the segment counts
    /// disagree; otherwise the extracted path parameters.
    pub fn match_path<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Option<BTreeMap<String, String>> {
        let segments: Vec<&str> = segments.into_iter().filter(|s| !s.is_empty()).collect();
        if segments.len() != self.path.len() {
            return None;
        }
        let mut params = BTreeMap::new();
        for (declared, actual) in self.path.iter().zip(segments) {
            match declared.kind {
                SegmentKind::Static if declared.name != actual => return None,
                SegmentKind::Static => {}
                SegmentKind::Param => {
                    params.insert(declared.name.clone(), actual.to_string());
                }
            }
        }
        Some(params)
    }
}
