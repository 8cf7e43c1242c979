//! In-memory model of a canopy project.
//!
//! Components are deserialized from the project's JSON files and stay
//! read-only for the duration of a render. Formulas are kept as an AST;
//! evaluating them is the job of `canopy-formula`.

pub mod api;
pub mod component;
pub mod error;
pub mod formula;
pub mod node;
mod parser;

pub use api::{
    ApiDeclaration, ApiInput, ApiMethod, ApiParameter, ApiPathSegment, ApiServerSettings,
    RedirectRule, SsrSettings,
};
pub use component::{
    Component, ComponentFormula, ComponentVariable, DEFAULT_SLOT, PageRoute, ROOT_NODE_ID,
    RouteQueryParam, RouteSegment, SegmentKind,
};
pub use error::FormulaParseError;
pub use formula::{Formula, SwitchCase};
pub use node::{
    ComponentNode, CustomProperty, ElementNode, EventHandler, InvalidNode, MediaQuery, Node,
    SlotNode, StyleVariant, TextNode,
};
pub use parser::parse_formula;
