//! The data a component instance's formulas read.
use canopy_formula::DataScope;
use canopy_model::PageRoute;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use url::Url;

/// Evaluation context of one component instance.
///
/// Every namespace is shared behind an `Arc` and never mutated once a
/// formula has seen it: each `with_*` call yields a new context.
#[derive(Debug, Clone)]
pub struct ComponentData {
    attributes: Arc<Value>,
    variables: Arc<Value>,
    contexts: Arc<Value>,
    apis: Arc<Value>,
    location: Arc<Value>,
    list_item: Option<Arc<Value>>,
    api_inputs: Option<Arc<Value>>,
}

fn empty_object() -> Arc<Value> {
    Arc::new(Value::Object(Map::new()))
}

impl ComponentData {
    pub fn new(attributes: Value, location: Arc<Value>) -> Self {
        Self {
            attributes: Arc::new(attributes),
            variables: empty_object(),
            contexts: empty_object(),
            apis: empty_object(),
            location,
            list_item: None,
            api_inputs: None,
        }
    }

    pub fn attributes(&self) -> &Value {
        &self.attributes
    }

    pub fn variables(&self) -> &Value {
        &self.variables
    }

    pub fn apis(&self) -> &Value {
        &self.apis
    }

    pub fn contexts(&self) -> &Arc<Value> {
        &self.contexts
    }

    pub fn with_variables(&self, variables: Value) -> Self {
        Self {
            variables: Arc::new(variables),
            ..self.clone()
        }
    }

    pub fn with_contexts(&self, contexts: Arc<Value>) -> Self {
        Self {
            contexts,
            ..self.clone()
        }
    }

    pub fn with_apis(&self, apis: Value) -> Self {
        Self {
            apis: Arc::new(apis),
            ..self.clone()
        }
    }

    pub fn with_api_inputs(&self, inputs: Arc<Value>) -> Self {
        Self {
            api_inputs: Some(inputs),
            ..self.clone()
        }
    }

    /// Context for one item of a repeated node. The enclosing item, if any,
    /// stays reachable as `ListItem.Parent`.
    pub fn with_list_item(&self, item: Value, index: usize) -> Self {
        let parent = self
            .list_item
            .as_deref()
            .cloned()
            .unwrap_or(Value::Null);
        Self {
            list_item: Some(Arc::new(json!({
                "Item": item,
                "Index": index,
                "Parent": parent,
            }))),
            ..self.clone()
        }
    }

    /// Context with `contexts[producer]` set to `published`.
    pub fn publish_context(&self, producer: &str, published: Value) -> Self {
        let mut contexts = match self.contexts.as_ref() {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        contexts.insert(producer.to_string(), published);
        self.with_contexts(Arc::new(Value::Object(contexts)))
    }
}

impl DataScope for ComponentData {
    fn lookup(&self, namespace: &str) -> Option<&Value> {
        match namespace {
            "Attributes" => Some(&self.attributes),
            "Variables" => Some(&self.variables),
            "Contexts" => Some(&self.contexts),
            "Apis" => Some(&self.apis),
            "Location" | "Page" => Some(&self.location),
            "ListItem" => self.list_item.as_deref(),
            "ApiInputs" => self.api_inputs.as_deref(),
            _ => None,
        }
    }
}

/// Builds the `Location` namespace: path, route params, query and hash.
///
/// Declared query parameters missing from the URL fall back to their
/// default value, or `null`.
pub fn location_value(url: &Url, route: Option<&PageRoute>) -> Value {
    let mut query: Map<String, Value> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect();
    let mut params = Map::new();

    if let Some(route) = route {
        for (name, declared) in &route.query {
            if !query.contains_key(name) {
                query.insert(
                    name.clone(),
                    declared.default_value.clone().unwrap_or(Value::Null),
                );
            }
        }
        let segments = url.path_segments().into_iter().flatten();
        if let Some(matched) = route.match_path(segments) {
            params.extend(matched.into_iter().map(|(k, v)| (k, Value::String(v))));
        } else {
            log::debug!("Request path '{}' does not match the page route", url.path());
        }
    }

    json!({
        "path": url.path(),
        "params": params,
        "query": query,
        "hash": url.fragment().unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_formula::{FormulaEngine, FormulaEvaluator};
    use canopy_model::Formula;

    fn data() -> ComponentData {
        ComponentData::new(json!({ "title": "Hi" }), Arc::new(json!({ "path": "/" })))
    }

    #[test]
    fn namespaces_resolve() {
        let engine = FormulaEngine::default();
        let data = data().with_variables(json!({ "count": 2 }));
        assert_eq!(
            engine.evaluate(&Formula::path(&["Attributes", "title"]), &data),
            json!("Hi")
        );
        assert_eq!(
            engine.evaluate(&Formula::path(&["Variables", "count"]), &data),
            json!(2)
        );
        assert_eq!(engine.evaluate(&Formula::path(&["ListItem", "Item"]), &data), Value::Null);
    }

    #[test]
    fn page_is_an_alias_of_location() {
        let engine = FormulaEngine::default();
        let data = data();
        assert_eq!(engine.evaluate(&Formula::path(&["Page", "path"]), &data), json!("/"));
        assert_eq!(
            engine.evaluate(&Formula::path(&["Page", "path"]), &data),
            engine.evaluate(&Formula::path(&["Location", "path"]), &data)
        );
    }

    #[test]
    fn nested_list_items_keep_parent() {
        let engine = FormulaEngine::default();
        let outer = data().with_list_item(json!("a"), 0);
        let inner = outer.with_list_item(json!("b"), 3);
        assert_eq!(
            engine.evaluate(&Formula::path(&["ListItem", "Parent", "Item"]), &inner),
            json!("a")
        );
        assert_eq!(
            engine.evaluate(&Formula::path(&["ListItem", "Index"]), &inner),
            json!(3)
        );
    }

    #[test]
    fn publishing_leaves_the_original_untouched() {
        let base = data();
        let published = base.publish_context("Card", json!({ "accent": "red" }));
        assert_eq!(base.contexts().as_ref(), &json!({}));
        assert_eq!(published.contexts().as_ref(), &json!({ "Card": { "accent": "red" } }));
    }

    #[test]
    fn location_applies_route_and_query_defaults() {
        let route: PageRoute = serde_json::from_value(json!({
            "path": [
                { "type": "static", "name": "products" },
                { "type": "param", "name": "id" }
            ],
            "query": {
                "tab": { "defaultValue": "details" },
                "sort": {}
            }
        }))
        .unwrap();
        let url = Url::parse("https://shop.test/products/42?ref=mail#reviews").unwrap();
        let location = location_value(&url, Some(&route));

        assert_eq!(location["path"], "/products/42");
        assert_eq!(location["params"]["id"], "42");
        assert_eq!(location["query"]["ref"], "mail");
        assert_eq!(location["query"]["tab"], "details");
        assert_eq!(location["query"]["sort"], Value::Null);
        assert_eq!(location["hash"], "reviews");
    }
}
