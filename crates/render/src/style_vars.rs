//! Collects custom-property declarations into CSS rules.
use indexmap::{IndexMap, IndexSet};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RuleKey {
    selector: String,
    media_query: Option<String>,
    starting_style: bool,
}

/// Where a declaration applies beyond its selector.
#[derive(Debug, Clone, Default)]
pub struct RuleOptions {
    pub media_query: Option<String>,
    pub starting_style: bool,
}

/// Declarations grouped per (selector, media query, starting-style) in
/// registration order. Registering the same declaration twice is a no-op.
#[derive(Debug, Default)]
pub struct StyleVariables {
    rules: IndexMap<RuleKey, IndexSet<String>>,
}

impl StyleVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, selector: &str, declaration: String, options: &RuleOptions) {
        let key = RuleKey {
            selector: selector.to_string(),
            media_query: options.media_query.clone(),
            starting_style: options.starting_style,
        };
        self.rules.entry(key).or_default().insert(declaration);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// One CSS rule per group, most recently registered group first.
    pub fn to_css_rules(&self) -> Vec<String> {
        let mut css: Vec<String> = self
            .rules
            .iter()
            .map(|(key, declarations)| {
                let body: String = declarations
                    .iter()
                    .map(|declaration| format!(" {};", declaration))
                    .collect();
                let mut rule = format!("{} {{{} }}", key.selector, body);
                if key.starting_style {
                    rule = format!("@starting-style {{ {} }}", rule);
                }
                if let Some(media) = &key.media_query {
                    rule = format!("@media {} {{ {} }}", media, rule);
                }
                rule
            })
            .collect();
        css.reverse();
        css
    }
}
