//! Nodes of a component tree.
use crate::formula::Formula;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// One node of a component's tree, keyed by node id within the component.
///
/// A node that does not match any known shape loads as [`Node::Invalid`]
/// and renders nothing; the rest of its component is unaffected.
#[derive(Debug, Clone)]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
    Slot(SlotNode),
    Component(ComponentNode),
    Invalid(InvalidNode),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum NodeRepr {
    Element(ElementNode),
    Text(TextNode),
    Slot(SlotNode),
    Component(ComponentNode),
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match serde_json::from_value(value) {
            Ok(NodeRepr::Element(n)) => Node::Element(n),
            Ok(NodeRepr::Text(n)) => Node::Text(n),
            Ok(NodeRepr::Slot(n)) => Node::Slot(n),
            Ok(NodeRepr::Component(n)) => Node::Component(n),
            Err(err) => Node::Invalid(InvalidNode {
                reason: err.to_string(),
            }),
        })
    }
}

#[derive(Debug, Clone)]
pub struct InvalidNode {
    pub reason: String,
}

impl Node {
    /// The list the node repeats over, if any.
    pub fn repeat(&self) -> Option<&Formula> {
        match self {
            Node::Element(n) => n.repeat.as_ref(),
            Node::Text(n) => n.repeat.as_ref(),
            Node::Slot(n) => n.repeat.as_ref(),
            Node::Component(n) => n.repeat.as_ref(),
            Node::Invalid(_) => None,
        }
    }

    pub fn condition(&self) -> Option<&Formula> {
        match self {
            Node::Element(n) => n.condition.as_ref(),
            Node::Text(n) => n.condition.as_ref(),
            Node::Slot(n) => n.condition.as_ref(),
            Node::Component(n) => n.condition.as_ref(),
            Node::Invalid(_) => None,
        }
    }

    pub fn children(&self) -> &[String] {
        match self {
            Node::Element(n) => &n.children,
            Node::Text(_) => &[],
            Node::Slot(n) => &n.children,
            Node::Component(n) => &n.children,
            Node::Invalid(_) => &[],
        }
    }

    /// The parent's slot this node fills when projected; slots themselves
    /// always pass through to the default slot.
    pub fn slot_target(&self) -> &str {
        let slot = match self {
            Node::Element(n) => n.slot.as_deref(),
            Node::Text(n) => n.slot.as_deref(),
            Node::Component(n) => n.slot.as_deref(),
            Node::Slot(_) | Node::Invalid(_) => None,
        };
        slot.unwrap_or(crate::component::DEFAULT_SLOT)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    pub tag: String,
    #[serde(default)]
    pub attrs: IndexMap<String, Formula>,
    /// Class names added when their formula is truthy.
    #[serde(default)]
    pub classes: IndexMap<String, Formula>,
    #[serde(default)]
    pub style: BTreeMap<String, String>,
    #[serde(default)]
    pub variants: Vec<StyleVariant>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub events: IndexMap<String, EventHandler>,
    #[serde(default)]
    pub custom_properties: IndexMap<String, CustomProperty>,
    /// Slot of the parent component this node is projected into.
    #[serde(default)]
    pub slot: Option<String>,
    #[serde(default)]
    pub repeat: Option<Formula>,
    #[serde(default)]
    pub condition: Option<Formula>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub value: Formula,
    /// Slot of the parent component this node is projected into.
    #[serde(default)]
    pub slot: Option<String>,
    #[serde(default)]
    pub repeat: Option<Formula>,
    #[serde(default)]
    pub condition: Option<Formula>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotNode {
    /// `None` is the default slot.
    #[serde(default)]
    pub name: Option<String>,
    /// Fallback content, rendered when nothing is projected.
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub repeat: Option<Formula>,
    #[serde(default)]
    pub condition: Option<Formula>,
}

impl SlotNode {
    pub fn slot_name(&self) -> &str {
        self.name.as_deref().unwrap_or(crate::component::DEFAULT_SLOT)
    }
}

/// An instantiation of another component.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentNode {
    pub name: String,
    #[serde(default)]
    pub package: Option<String>,
    /// Evaluated in the referrer's context and handed to the child as `Attributes`.
    #[serde(default)]
    pub attrs: IndexMap<String, Formula>,
    /// Content projected into the child's slots.
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub style: BTreeMap<String, String>,
    #[serde(default)]
    pub variants: Vec<StyleVariant>,
    #[serde(default)]
    pub events: IndexMap<String, EventHandler>,
    #[serde(default)]
    pub custom_properties: IndexMap<String, CustomProperty>,
    /// Slot of the parent component this node is projected into.
    #[serde(default)]
    pub slot: Option<String>,
    #[serde(default)]
    pub repeat: Option<Formula>,
    #[serde(default)]
    pub condition: Option<Formula>,
}

/// Client-side actions; carried through untouched by the server render.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventHandler {
    #[serde(default)]
    pub actions: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomProperty {
    pub formula: Formula,
}

/// A conditional style block: applies under a media query and/or pseudo state.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleVariant {
    pub style: BTreeMap<String, String>,
    pub media_query: Option<MediaQuery>,
    pub class_name: Option<String>,
    pub hover: bool,
    pub focus: bool,
    pub focus_within: bool,
    pub active: bool,
    pub disabled: bool,
    pub first_child: bool,
    pub last_child: bool,
    pub even_child: bool,
    pub empty: bool,
    pub pseudo_element: Option<String>,
    pub starting_style: bool,
    pub custom_properties: IndexMap<String, CustomProperty>,
}

impl StyleVariant {
    /// The selector suffix for the variant's state predicates, e.g. `:hover::before`.
    pub fn selector_suffix(&self) -> String {
        let mut suffix = String::new();
        if let Some(class_name) = &self.class_name {
            suffix.push('.');
            suffix.push_str(class_name);
        }
        let states = [
            (self.hover, ":hover"),
            (self.focus, ":focus"),
            (self.focus_within, ":focus-within"),
            (self.active, ":active"),
            (self.disabled, ":disabled"),
            (self.first_child, ":first-child"),
            (self.last_child, ":last-child"),
            (self.even_child, ":nth-child(even)"),
            (self.empty, ":empty"),
        ];
        for (enabled, pseudo) in states {
            if enabled {
                suffix.push_str(pseudo);
            }
        }
        if let Some(element) = &self.pseudo_element {
            suffix.push_str("::");
            suffix.push_str(element);
        }
        suffix
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MediaQuery {
    pub min_width: Option<String>,
    pub max_width: Option<String>,
    pub min_height: Option<String>,
    pub max_height: Option<String>,
}

impl MediaQuery {
    /// The `@media` condition, or `None` when no bound is set.
    pub fn condition(&self) -> Option<String> {
        let parts: Vec<String> = [
            ("min-width", &self.min_width),
            ("max-width", &self.max_width),
            ("min-height", &self.min_height),
            ("max-height", &self.max_height),
        ]
        .into_iter()
        .filter_map(|(feature, bound)| bound.as_ref().map(|b| format!("({}: {})", feature, b)))
        .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" and "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_each_node_kind() {
        let nodes: Vec<Node> = serde_json::from_value(json!([
            { "type": "element", "tag": "div", "children": ["a"] },
            { "type": "text", "value": { "type": "value", "value": "hi" } },
            { "type": "slot", "name": "footer" },
            { "type": "component", "name": "Card", "package": "ui" }
        ]))
        .unwrap();

        assert!(matches!(nodes[0], Node::Element(_)));
        assert!(matches!(nodes[1], Node::Text(_)));
        assert!(matches!(nodes[3], Node::Component(_)));
        assert_eq!(nodes[0].children(), &["a".to_string()]);
        match &nodes[2] {
            Node::Slot(slot) => assert_eq!(slot.slot_name(), "footer"),
            other => panic!("expected slot, got {:?}", other),
        }
    }

    #[test]
    fn unknown_or_incomplete_nodes_load_as_invalid() {
        let nodes: Vec<Node> = serde_json::from_value(json!([
            { "type": "video-embed", "src": "x" },
            { "type": "element", "children": ["a"] },
            { "type": "text", "value": { "type": "nope" } }
        ]))
        .unwrap();

        match &nodes[0] {
            Node::Invalid(invalid) => assert!(invalid.reason.contains("video-embed")),
            other => panic!("expected invalid node, got {:?}", other),
        }
        assert!(matches!(nodes[1], Node::Invalid(_)));
        assert!(nodes[1].children().is_empty());
        // A bad formula keeps the node; only the formula is invalid.
        match &nodes[2] {
            Node::Text(text) => assert!(text.value.invalid_reason().is_some()),
            other => panic!("expected text node, got {:?}", other),
        }
    }

    #[test]
    fn attribute_order_is_preserved() {
        let node: ElementNode = serde_json::from_value(json!({
            "tag": "a",
            "attrs": {
                "href": { "type": "value", "value": "/" },
                "class": { "type": "value", "value": "x" },
                "aria-label": { "type": "value", "value": "home" }
            }
        }))
        .unwrap();
        let names: Vec<_> = node.attrs.keys().cloned().collect();
        assert_eq!(names, vec!["href", "class", "aria-label"]);
    }

    #[test]
    fn variant_selector_suffix() {
        let variant = StyleVariant {
            hover: true,
            even_child: true,
            pseudo_element: Some("after".to_string()),
            ..Default::default()
        };
        assert_eq!(variant.selector_suffix(), ":hover:nth-child(even)::after");
    }

    #[test]
    fn media_query_condition() {
        let query: MediaQuery =
            serde_json::from_value(json!({ "min-width": "600px", "max-height": "900px" })).unwrap();
        assert_eq!(
            query.condition().as_deref(),
            Some("(min-width: 600px) and (max-height: 900px)")
        );
        assert_eq!(MediaQuery::default().condition(), None);
    }
}
