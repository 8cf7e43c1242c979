//! State shared by every step of one page render.
use crate::api::ApiCache;
use crate::error::{Diagnostic, DiagnosticLevel};
use crate::page::{RenderEngine, RenderedPage};
use crate::style_vars::{RuleOptions, StyleVariables};
use canopy_formula::DataScope;
use canopy_model::Formula;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use url::Url;

/// One render's accumulators. Locks are only taken inside synchronous
/// helpers so no guard lives across an await point.
pub(crate) struct RenderSession<'e> {
    pub(crate) engine: &'e RenderEngine,
    pub(crate) request_url: Url,
    pub(crate) location: Arc<Value>,
    pub(crate) api_cache: ApiCache,
    style_variables: Mutex<StyleVariables>,
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl<'e> RenderSession<'e> {
    pub(crate) fn new(engine: &'e RenderEngine, request_url: Url, location: Value) -> Self {
        Self {
            engine,
            request_url,
            location: Arc::new(location),
            api_cache: ApiCache::default(),
            style_variables: Mutex::new(StyleVariables::new()),
            diagnostics: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn evaluate(&self, formula: &Formula, scope: &dyn DataScope) -> Value {
        self.engine.evaluator().evaluate(formula, scope)
    }

    pub(crate) fn register_style(&self, selector: &str, declaration: String, options: &RuleOptions) {
        self.style_variables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .register(selector, declaration, options);
    }

    pub(crate) fn diagnose(
        &self,
        level: DiagnosticLevel,
        message: String,
        component: &str,
        node: Option<&str>,
    ) {
        match level {
            DiagnosticLevel::Info => log::info!("[{}] {}", component, message),
            DiagnosticLevel::Warn => log::warn!("[{}] {}", component, message),
        }
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Diagnostic {
                level,
                message,
                component: component.to_string(),
                node: node.map(str::to_string),
            });
    }

    pub(crate) fn finish(self, html: String) -> RenderedPage {
        let style_variables = self
            .style_variables
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .to_css_rules();
        let diagnostics = self
            .diagnostics
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        RenderedPage {
            html,
            api_cache: self.api_cache.to_value(),
            style_variables,
            diagnostics,
        }
    }
}
