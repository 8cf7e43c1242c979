//! Walks component trees and produces markup.
use crate::api::ApiResolver;
use crate::context::ComponentData;
use crate::error::{DiagnosticLevel, Rendered};
use crate::html::{self, Namespace};
use crate::session::RenderSession;
use crate::style_vars::RuleOptions;
use canopy_formula::{is_truthy, to_text};
use canopy_model::{
    Component, ComponentNode, CustomProperty, DEFAULT_SLOT, ElementNode, Node, ROOT_NODE_ID,
    StyleVariant, TextNode,
};
use canopy_traits::StoreError;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Attributes the renderer writes itself.
const RESERVED_ATTRIBUTES: &[&str] = &["data-id", "data-node-id", "data-component"];

/// The (component, node) references an instance was reached through.
/// Grows only while each reference is the root node of its component.
#[derive(Debug, Clone, Default)]
pub(crate) struct InstancePath(Vec<(String, String)>);

impl InstancePath {
    fn single(component: &str, node_id: &str) -> Self {
        Self(vec![(component.to_string(), node_id.to_string())])
    }

    fn extended(&self, component: &str, node_id: &str) -> Self {
        let mut path = self.clone();
        path.0.push((component.to_string(), node_id.to_string()));
        path
    }

    fn classes(&self) -> impl Iterator<Item = String> + '_ {
        self.0
            .iter()
            .map(|(component, node_id)| html::instance_class(component, node_id))
    }
}

pub(crate) struct ComponentInstance {
    component: Arc<Component>,
    data: ComponentData,
    /// Markup projected by the referrer, per slot name.
    slots: BTreeMap<String, String>,
    instance_path: InstancePath,
    depth: usize,
}

fn custom_property_name(name: &str) -> String {
    if name.starts_with("--") {
        name.to_string()
    } else {
        format!("--{}", name)
    }
}

impl<'e> RenderSession<'e> {
    pub(crate) async fn render_root(&self, page: Arc<Component>) -> Rendered {
        let contexts = Arc::new(Value::Object(Map::new()));
        let data = self
            .instantiate(&page, Value::Object(Map::new()), &contexts)
            .await?;
        let instance = ComponentInstance {
            component: page,
            data,
            slots: BTreeMap::new(),
            instance_path: InstancePath::default(),
            depth: 0,
        };
        self.render_node(&instance, ROOT_NODE_ID, &instance.data, "0".to_string(), Namespace::Html)
            .await
    }

    /// Builds a fresh instance context: variables, then APIs, then the
    /// formulas the component publishes to its descendants.
    async fn instantiate(
        &self,
        component: &Component,
        attributes: Value,
        contexts: &Arc<Value>,
    ) -> Rendered<ComponentData> {
        let data = ComponentData::new(attributes, self.location.clone()).with_contexts(contexts.clone());

        let variables: Map<String, Value> = component
            .variables
            .iter()
            .map(|(name, variable)| (name.clone(), self.evaluate(&variable.initial_value, &data)))
            .collect();
        let data = data.with_variables(Value::Object(variables));

        let apis = ApiResolver::new(self, component).resolve(&data).await?;
        let data = data.with_apis(apis);

        let exposed: Map<String, Value> = component
            .exposed_formulas()
            .map(|(name, formula)| (name.clone(), self.evaluate(formula, &data)))
            .collect();
        if exposed.is_empty() {
            Ok(data)
        } else {
            Ok(data.publish_context(&component.name, Value::Object(exposed)))
        }
    }

    fn render_node<'a>(
        &'a self,
        instance: &'a ComponentInstance,
        node_id: &'a str,
        data: &'a ComponentData,
        path: String,
        namespace: Namespace,
    ) -> BoxFuture<'a, Rendered> {
        Box::pin(async move {
            let Some(node) = instance.component.node(node_id) else {
                self.diagnose(
                    DiagnosticLevel::Warn,
                    format!("Node '{}' does not exist", node_id),
                    &instance.component.name,
                    Some(node_id),
                );
                return Ok(String::new());
            };
            let Some(repeat) = node.repeat() else {
                return self
                    .render_single(instance, node_id, node, data, path, namespace)
                    .await;
            };

            let items = match self.evaluate(repeat, data) {
                Value::Array(items) => items,
                _ => Vec::new(),
            };
            let mut markup = String::new();
            for (index, item) in items.into_iter().enumerate() {
                let item_data = data.with_list_item(item, index);
                let item_path = if index == 0 {
                    path.clone()
                } else {
                    format!("{}({})", path, index)
                };
                markup.push_str(
                    &self
                        .render_single(instance, node_id, node, &item_data, item_path, namespace)
                        .await?,
                );
            }
            Ok(markup)
        })
    }

    async fn render_single(
        &self,
        instance: &ComponentInstance,
        node_id: &str,
        node: &Node,
        data: &ComponentData,
        path: String,
        namespace: Namespace,
    ) -> Rendered {
        if let Some(condition) = node.condition()
            && !is_truthy(&self.evaluate(condition, data))
        {
            return Ok(String::new());
        }
        match node {
            Node::Text(text) => Ok(self.render_text(text, node_id, data, &path, namespace)),
            Node::Slot(slot) => match instance.slots.get(slot.slot_name()) {
                Some(projected) => Ok(projected.clone()),
                None => {
                    self.render_children(instance, &slot.children, data, &path, namespace)
                        .await
                }
            },
            Node::Element(element) => {
                self.render_element(instance, node_id, element, data, path, namespace)
                    .await
            }
            Node::Component(reference) => {
                self.render_component(instance, node_id, reference, data, path, namespace)
                    .await
            }
            Node::Invalid(invalid) => {
                self.diagnose(
                    DiagnosticLevel::Warn,
                    format!("Node '{}' is invalid: {}", node_id, invalid.reason),
                    &instance.component.name,
                    Some(node_id),
                );
                Ok(String::new())
            }
        }
    }

    async fn render_children(
        &self,
        instance: &ComponentInstance,
        children: &[String],
        data: &ComponentData,
        path: &str,
        namespace: Namespace,
    ) -> Rendered {
        let mut markup = String::new();
        for (index, child) in children.iter().enumerate() {
            let child_path = format!("{}.{}", path, index);
            markup.push_str(&self.render_node(instance, child, data, child_path, namespace).await?);
        }
        Ok(markup)
    }

    fn render_text(
        &self,
        text: &TextNode,
        node_id: &str,
        data: &ComponentData,
        path: &str,
        namespace: Namespace,
    ) -> String {
        let content = html::escape_text(&to_text(&self.evaluate(&text.value, data)));
        if namespace.is_foreign() {
            return content;
        }
        format!(
            "<span data-node-type=\"text\" data-id=\"{}\" data-node-id=\"{}\">{}</span>",
            html::escape_attr(path),
            html::escape_attr(node_id),
            content
        )
    }

    async fn render_element(
        &self,
        instance: &ComponentInstance,
        node_id: &str,
        element: &ElementNode,
        data: &ComponentData,
        path: String,
        namespace: Namespace,
    ) -> Rendered {
        let tag = element.tag.as_str();
        // Scripts only run on the client.
        if tag.eq_ignore_ascii_case("script") {
            return Ok(String::new());
        }
        let component_name = instance.component.name.as_str();
        if !html::is_valid_name(tag) {
            self.diagnose(
                DiagnosticLevel::Warn,
                format!("Invalid tag name '{}'", tag),
                component_name,
                Some(node_id),
            );
            return Ok(String::new());
        }

        let mut markup = format!(
            "<{} data-id=\"{}\" data-node-id=\"{}\"",
            tag,
            html::escape_attr(&path),
            html::escape_attr(node_id)
        );
        let is_component_root = node_id == ROOT_NODE_ID;
        if is_component_root {
            markup.push_str(&format!(
                " data-component=\"{}\"",
                html::escape_attr(&instance.component.qualified_name())
            ));
        }

        let mut classes: Vec<String> = html::style_class(&element.style, &element.variants)
            .into_iter()
            .collect();
        for (class_name, formula) in &element.classes {
            if is_truthy(&self.evaluate(formula, data)) {
                classes.push(class_name.clone());
            }
        }
        if is_component_root {
            classes.extend(instance.instance_path.classes());
        }

        for (name, formula) in &element.attrs {
            let value = self.evaluate(formula, data);
            if name == "class" {
                if is_truthy(&value) {
                    classes.push(to_text(&value));
                }
                continue;
            }
            if RESERVED_ATTRIBUTES.contains(&name.as_str()) {
                continue;
            }
            if !html::is_valid_name(name) {
                self.diagnose(
                    DiagnosticLevel::Warn,
                    format!("Invalid attribute name '{}' on <{}>", name, tag),
                    component_name,
                    Some(node_id),
                );
                continue;
            }
            if let Some(attribute) = html::attribute(name, &value) {
                markup.push_str(&attribute);
            }
        }
        classes.retain(|class| !class.trim().is_empty());
        if !classes.is_empty() {
            markup.push_str(&format!(" class=\"{}\"", html::escape_attr(&classes.join(" "))));
        }

        self.register_custom_properties(
            instance,
            node_id,
            &element.custom_properties,
            &element.variants,
            data,
            &path,
        );

        markup.push('>');
        let own_namespace = namespace.for_element(tag);
        if !own_namespace.is_foreign() && html::is_void(tag) {
            return Ok(markup);
        }
        let children = self
            .render_children(instance, &element.children, data, &path, namespace.for_children(tag))
            .await?;
        markup.push_str(&children);
        markup.push_str(&format!("</{}>", tag));
        Ok(markup)
    }

    fn register_custom_properties(
        &self,
        instance: &ComponentInstance,
        node_id: &str,
        properties: &IndexMap<String, CustomProperty>,
        variants: &[StyleVariant],
        data: &ComponentData,
        path: &str,
    ) {
        let selector = format!("[data-id=\"{}\"]", path);
        let owner = (instance.component.name.as_str(), node_id);
        self.register_declarations(owner, properties, &selector, &RuleOptions::default(), data);
        for variant in variants {
            if variant.custom_properties.is_empty() {
                continue;
            }
            let options = RuleOptions {
                media_query: variant.media_query.as_ref().and_then(|mq| mq.condition()),
                starting_style: variant.starting_style,
            };
            let variant_selector = format!("{}{}", selector, variant.selector_suffix());
            self.register_declarations(
                owner,
                &variant.custom_properties,
                &variant_selector,
                &options,
                data,
            );
        }
    }

    fn register_declarations(
        &self,
        (component, node_id): (&str, &str),
        properties: &IndexMap<String, CustomProperty>,
        selector: &str,
        options: &RuleOptions,
        data: &ComponentData,
    ) {
        for (name, property) in properties {
            let value = self.evaluate(&property.formula, data);
            if value.is_null() {
                continue;
            }
            let name = custom_property_name(name);
            let text = to_text(&value);
            if text.trim().is_empty() {
                continue;
            }
            let (Some(value), true) = (html::css_value(&text), html::is_valid_name(&name)) else {
                self.diagnose(
                    DiagnosticLevel::Warn,
                    format!("Dropped custom property '{}' with an unsafe name or value", name),
                    component,
                    Some(node_id),
                );
                continue;
            };
            self.register_style(selector, format!("{}: {}", name, value), options);
        }
    }

    /// Package components resolve unqualified references inside their own
    /// package first.
    fn lookup_component(
        &self,
        instance: &ComponentInstance,
        reference: &ComponentNode,
    ) -> Result<Arc<Component>, StoreError> {
        let store = self.engine.store();
        let package = reference
            .package
            .as_deref()
            .or(instance.component.package.as_deref());
        if let Some(package) = package {
            match store.load(Some(package), &reference.name) {
                Ok(component) => return Ok(component),
                Err(err) => log::debug!("{}; trying the project", err),
            }
        }
        store.load(None, &reference.name)
    }

    async fn render_component(
        &self,
        instance: &ComponentInstance,
        node_id: &str,
        reference: &ComponentNode,
        data: &ComponentData,
        path: String,
        namespace: Namespace,
    ) -> Rendered {
        let referrer = instance.component.name.as_str();
        let max_depth = self.engine.options().max_component_depth;
        if instance.depth >= max_depth {
            self.diagnose(
                DiagnosticLevel::Warn,
                format!(
                    "Component '{}' exceeds the maximum nesting depth of {}",
                    reference.name, max_depth
                ),
                referrer,
                Some(node_id),
            );
            return Ok(String::new());
        }
        let target = match self.lookup_component(instance, reference) {
            Ok(target) => target,
            Err(err) => {
                self.diagnose(
                    DiagnosticLevel::Warn,
                    format!("Component '{}' could not be loaded: {}", reference.name, err),
                    referrer,
                    Some(node_id),
                );
                return Ok(String::new());
            }
        };

        let attributes: Map<String, Value> = reference
            .attrs
            .iter()
            .map(|(name, formula)| (name.clone(), self.evaluate(formula, data)))
            .collect();
        let child_data = self
            .instantiate(&target, Value::Object(attributes), data.contexts())
            .await?;

        self.register_custom_properties(
            instance,
            node_id,
            &reference.custom_properties,
            &reference.variants,
            data,
            &path,
        );
        let slots = self
            .render_slots(instance, &reference.children, data, &path, namespace)
            .await?;

        let qualified = instance.component.qualified_name();
        let instance_path = if node_id == ROOT_NODE_ID {
            instance.instance_path.extended(&qualified, node_id)
        } else {
            InstancePath::single(&qualified, node_id)
        };
        let child = ComponentInstance {
            component: target,
            data: child_data,
            slots,
            instance_path,
            depth: instance.depth + 1,
        };
        self.render_node(&child, ROOT_NODE_ID, &child.data, path, namespace)
            .await
    }

    /// Renders a reference's children in the referrer's context, grouped
    /// by the slot each one targets.
    async fn render_slots(
        &self,
        instance: &ComponentInstance,
        children: &[String],
        data: &ComponentData,
        path: &str,
        namespace: Namespace,
    ) -> Rendered<BTreeMap<String, String>> {
        let mut slots: BTreeMap<String, String> = BTreeMap::new();
        for (index, child_id) in children.iter().enumerate() {
            let target = instance
                .component
                .node(child_id)
                .map(Node::slot_target)
                .unwrap_or(DEFAULT_SLOT)
                .to_string();
            let markup = self
                .render_node(instance, child_id, data, format!("{}:{}", path, index), namespace)
                .await?;
            slots.entry(target).or_default().push_str(&markup);
        }
        Ok(slots)
    }
}
