use serde_json::{Value, json};

pub const ORIGIN: &str = "https://shop.test";

pub fn expr(source: &str) -> Value {
    json!({ "type": "expr", "source": source })
}

pub fn value(value: Value) -> Value {
    json!({ "type": "value", "value": value })
}

/// A product page: a session API, a dependent product API, a repeated
/// list of tags and a card that publishes its accent to a nested badge.
pub fn shop_project() -> Value {
    json!({
        "components": {
            "ProductPage": {
                "route": {
                    "path": [
                        { "type": "static", "name": "products" },
                        { "type": "param", "name": "id" }
                    ],
                    "query": { "tab": { "defaultValue": "details" } }
                },
                "apis": {
                    "session": {
                        "url": value(json!("/api/session")),
                        "autoFetch": value(json!(true)),
                        "redirectRules": {
                            "login": {
                                "formula": expr("Apis.session.error.login"),
                                "index": 0
                            }
                        }
                    },
                    "product": {
                        "url": value(json!("/api/products")),
                        "path": {
                            "id": { "formula": expr("Location.params.id"), "index": 0 }
                        },
                        "headers": {
                            "x-user": { "formula": expr("Apis.session.data.user") }
                        },
                        "autoFetch": expr("Apis.session.data")
                    },
                    "recommendations": {
                        "url": value(json!("/api/recommendations")),
                        "server": { "ssr": { "enabled": value(json!(false)) } },
                        "autoFetch": value(json!(true))
                    }
                },
                "nodes": {
                    "root": { "type": "element", "tag": "main", "children": ["title", "tab", "tags", "card"] },
                    "title": { "type": "element", "tag": "h1", "children": ["title-text"] },
                    "title-text": { "type": "text", "value": expr("Apis.product.data.name") },
                    "tab": { "type": "text", "value": expr("Location.query.tab") },
                    "tags": { "type": "element", "tag": "ul", "children": ["tag"] },
                    "tag": {
                        "type": "element", "tag": "li",
                        "repeat": expr("Apis.product.data.tags"),
                        "children": ["tag-text"]
                    },
                    "tag-text": { "type": "text", "value": expr("ListItem.Item") },
                    "card": {
                        "type": "component", "name": "Card",
                        "attrs": { "accent": expr("Apis.product.data.color") },
                        "children": ["card-body"]
                    },
                    "card-body": { "type": "text", "value": value(json!("In stock")) }
                }
            },
            "Card": {
                "formulas": {
                    "accent": { "formula": expr("Attributes.accent"), "exposeInContext": true }
                },
                "nodes": {
                    "root": {
                        "type": "element", "tag": "section",
                        "customProperties": {
                            "--accent": { "formula": expr("Attributes.accent") }
                        },
                        "children": ["badge", "content"]
                    },
                    "badge": { "type": "component", "name": "Badge" },
                    "content": { "type": "slot" }
                }
            },
            "Badge": {
                "nodes": {
                    "root": { "type": "element", "tag": "span", "children": ["badge-text"] },
                    "badge-text": { "type": "text", "value": expr("Contexts.Card.accent") }
                }
            }
        }
    })
}
