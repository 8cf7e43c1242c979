//! Markup helpers: escaping, attribute serialization and class names.
use canopy_formula::{is_truthy, to_text};
use canopy_model::StyleVariant;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Elements that never carry children or a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub fn is_void(tag: &str) -> bool {
    VOID_TAGS.iter().any(|void| void.eq_ignore_ascii_case(tag))
}

/// The markup namespace a node renders in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Namespace {
    #[default]
    Html,
    Svg,
    MathMl,
}

impl Namespace {
    /// Namespace of an element with `tag` placed in `self`.
    pub fn for_element(self, tag: &str) -> Namespace {
        match tag {
            "svg" => Namespace::Svg,
            "math" => Namespace::MathMl,
            _ => self,
        }
    }

    /// Namespace of the children of an element with `tag` placed in `self`.
    pub fn for_children(self, tag: &str) -> Namespace {
        match self.for_element(tag) {
            Namespace::Svg if tag == "foreignObject" => Namespace::Html,
            namespace => namespace,
        }
    }

    pub fn is_foreign(self) -> bool {
        self != Namespace::Html
    }
}

pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn escape_attr(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Tag and attribute names we are willing to emit verbatim.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

/// Serializes one attribute, leading space included. Falsy values drop the
/// attribute, `true` renders it bare.
pub fn attribute(name: &str, value: &Value) -> Option<String> {
    if !is_truthy(value) {
        return None;
    }
    match value {
        Value::Bool(true) => Some(format!(" {}", name)),
        other => Some(format!(" {}=\"{}\"", name, escape_attr(&to_text(other)))),
    }
}

/// Class shared by every element with the same static style and variants.
///
/// Named after a SHA-256 of the canonical JSON of the style, so the name is
/// the same in every build and matches stylesheets compiled elsewhere.
pub fn style_class(style: &BTreeMap<String, String>, variants: &[StyleVariant]) -> Option<String> {
    if style.is_empty() && variants.is_empty() {
        return None;
    }
    let variants: Vec<Value> = variants
        .iter()
        .map(|variant| {
            json!([
                variant.style,
                variant.selector_suffix(),
                variant.media_query.as_ref().and_then(|mq| mq.condition()),
                variant.starting_style
            ])
        })
        .collect();
    let canonical = json!([style, variants]).to_string();

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    Some(format!("c{}", &digest[..8]))
}

/// A custom-property value that is safe inside a `<style>` block, or `None`.
///
/// Values that could end the declaration or the rule, or open markup,
/// are refused rather than escaped.
pub fn css_value(value: &str) -> Option<&str> {
    const FORBIDDEN: &[char] = &['<', '>', '{', '}', ';'];
    let value = value.trim();
    if value.is_empty() || value.contains(FORBIDDEN) {
        None
    } else {
        Some(value)
    }
}

/// Class naming one step of a component instance chain.
pub fn instance_class(component: &str, node_id: &str) -> String {
    let raw = format!("{}_{}", component, node_id);
    let mut class: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    if class.starts_with(|c: char| c.is_ascii_digit()) {
        class.insert(0, '_');
    }
    class
}
