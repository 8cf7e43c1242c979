//! API resolution: calls a component's APIs during the server render,
//! folds the results into its context and fires redirect rules.
mod cache;
mod request;
mod status;

pub use cache::ApiCache;
pub use request::{build_request, cache_key};
pub use status::{ApiStatus, ResponseInfo};

use crate::context::ComponentData;
use crate::error::{DiagnosticLevel, Rendered};
use crate::redirect::Redirect;
use crate::session::RenderSession;
use canopy_formula::is_truthy;
use canopy_model::{ApiDeclaration, Component};
use canopy_traits::{FetchError, FetchedResponse, OutgoingRequest};
use futures::future::join_all;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// How an API is settled before any network traffic.
enum Step {
    /// Not called on the server; no redirect rules apply.
    Skip(ApiStatus),
    /// Settled from the cache or by a request that could not be built.
    Ready(ApiStatus),
    Fetch {
        key: String,
        request: OutgoingRequest,
    },
}

struct Planned<'c> {
    name: &'c str,
    api: &'c ApiDeclaration,
    inputs: Arc<Value>,
    step: Step,
}

pub(crate) struct ApiResolver<'s, 'e> {
    session: &'s RenderSession<'e>,
    component: &'s Component,
}

impl<'s, 'e> ApiResolver<'s, 'e> {
    pub(crate) fn new(session: &'s RenderSession<'e>, component: &'s Component) -> Self {
        Self { session, component }
    }

    /// Resolves every API of the component and returns the `Apis` object.
    ///
    /// APIs whose request formulas read no sibling are fetched concurrently
    /// and installed together; the rest follow one at a time in dependency
    /// order, each seeing every status resolved before it.
    pub(crate) async fn resolve(&self, data: &ComponentData) -> Rendered<Value> {
        let apis_decl = &self.component.apis;
        if apis_decl.is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        let siblings: BTreeSet<&str> = apis_decl.keys().map(String::as_str).collect();
        let mut independent = Vec::new();
        let mut dependent = BTreeMap::new();
        for (name, api) in apis_decl {
            let references = api.api_references(name, &siblings);
            if references.is_empty() {
                independent.push((name.as_str(), api));
            } else {
                dependent.insert(name.as_str(), (api, references));
            }
        }

        let mut apis = Map::new();
        let scope = data.with_apis(Value::Object(Map::new()));

        let planned: Vec<Planned> = independent
            .into_iter()
            .map(|(name, api)| self.plan(name, api, &scope))
            .collect();

        let mut pending: Vec<(&str, &OutgoingRequest)> = Vec::new();
        for entry in &planned {
            if let Step::Fetch { key, request } = &entry.step
                && !pending.iter().any(|(k, _)| *k == key.as_str())
            {
                pending.push((key.as_str(), request));
            }
        }
        let fetched: HashMap<String, Result<FetchedResponse, FetchError>> = join_all(
            pending
                .into_iter()
                .map(|(key, request)| async move { (key.to_string(), self.fetch(request).await) }),
        )
        .await
        .into_iter()
        .collect();

        let mut settled = Vec::with_capacity(planned.len());
        for entry in planned {
            let status = match &entry.step {
                Step::Skip(status) | Step::Ready(status) => status.clone(),
                Step::Fetch { key, .. } => match fetched.get(key) {
                    Some(outcome) => self.settle(&entry, key, outcome.clone(), &scope),
                    None => ApiStatus::idle(false),
                },
            };
            apis.insert(entry.name.to_string(), status.to_value());
            settled.push(entry);
        }

        let mut current = data.with_apis(Value::Object(apis.clone()));
        for entry in &settled {
            self.check_redirects(entry, &current)?;
        }

        for name in dependency_order(&dependent) {
            let Some((api, _)) = dependent.get(name) else {
                continue;
            };
            let entry = self.plan(name, api, &current);
            let status = match &entry.step {
                Step::Skip(status) | Step::Ready(status) => status.clone(),
                Step::Fetch { key, request } => {
                    let outcome = self.fetch(request).await;
                    self.settle(&entry, key, outcome, &current)
                }
            };
            apis.insert(name.to_string(), status.to_value());
            current = data.with_apis(Value::Object(apis.clone()));
            self.check_redirects(&entry, &current)?;
        }

        Ok(Value::Object(apis))
    }

    fn plan<'c>(&self, name: &'c str, api: &'c ApiDeclaration, data: &ComponentData) -> Planned<'c> {
        let inputs: Map<String, Value> = api
            .inputs
            .iter()
            .map(|(key, input)| (key.clone(), self.session.evaluate(&input.formula, data)))
            .collect();
        let inputs = Arc::new(Value::Object(inputs));
        let scope = data.with_api_inputs(inputs.clone());

        let auto_fetch = api
            .auto_fetch
            .as_ref()
            .is_some_and(|f| is_truthy(&self.session.evaluate(f, &scope)));
        let ssr = api
            .ssr_enabled()
            .is_none_or(|f| is_truthy(&self.session.evaluate(f, &scope)));

        let step = if !ssr || !auto_fetch {
            Step::Skip(ApiStatus::idle(auto_fetch))
        } else {
            match build_request(
                api,
                &scope,
                self.session.engine.evaluator(),
                &self.session.request_url,
            ) {
                Ok(request) => {
                    let key = cache_key(&request);
                    match self.session.api_cache.get(&key) {
                        Some(status) => {
                            log::debug!("API '{}' served from cache", name);
                            Step::Ready(status)
                        }
                        None => Step::Fetch { key, request },
                    }
                }
                Err(err) => {
                    self.session.diagnose(
                        DiagnosticLevel::Warn,
                        format!("API '{}' could not be requested: {}", name, err),
                        &self.component.name,
                        None,
                    );
                    Step::Ready(ApiStatus::failed(&err))
                }
            }
        };

        Planned {
            name,
            api,
            inputs,
            step,
        }
    }

    async fn fetch(&self, request: &OutgoingRequest) -> Result<FetchedResponse, FetchError> {
        let timeout = self.session.engine.options().request_timeout;
        log::debug!("{} {}", request.method, request.url);
        match tokio::time::timeout(timeout, self.session.engine.fetcher().fetch(request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(FetchError::Timeout(timeout.as_millis() as u64)),
        }
    }

    /// Classifies a finished call and records it in the page cache.
    fn settle(
        &self,
        entry: &Planned,
        key: &str,
        outcome: Result<FetchedResponse, FetchError>,
        data: &ComponentData,
    ) -> ApiStatus {
        if let Some(cached) = self.session.api_cache.get(key) {
            return cached;
        }
        let status = match outcome {
            Ok(response) => {
                let success = response.is_success();
                let status = ApiStatus::success(response);
                let is_error = match &entry.api.is_error {
                    Some(formula) => {
                        let mut apis = match data.apis() {
                            Value::Object(map) => map.clone(),
                            _ => Map::new(),
                        };
                        apis.insert(entry.name.to_string(), status.to_value());
                        let scope = data
                            .with_apis(Value::Object(apis))
                            .with_api_inputs(entry.inputs.clone());
                        is_truthy(&self.session.evaluate(formula, &scope))
                    }
                    None => !success,
                };
                if is_error { status.into_error() } else { status }
            }
            Err(err) => {
                self.session.diagnose(
                    DiagnosticLevel::Warn,
                    format!("API '{}' failed: {}", entry.name, err),
                    &self.component.name,
                    None,
                );
                ApiStatus::failed(&err)
            }
        };
        self.session.api_cache.insert(key.to_string(), status)
    }

    /// Evaluates the API's redirect rules in index order; the first that
    /// yields a usable URL other than the current one wins.
    fn check_redirects(&self, entry: &Planned, data: &ComponentData) -> Rendered<()> {
        if matches!(entry.step, Step::Skip(_)) {
            return Ok(());
        }
        let scope = data.with_api_inputs(entry.inputs.clone());
        for (rule_name, rule) in entry.api.ordered_redirect_rules() {
            let target = match self.session.evaluate(&rule.formula, &scope) {
                Value::String(target) if !target.trim().is_empty() => target,
                _ => continue,
            };
            let location = match self.session.request_url.join(target.trim()) {
                Ok(location) => location,
                Err(err) => {
                    self.session.diagnose(
                        DiagnosticLevel::Warn,
                        format!("Redirect rule '{}' produced an invalid URL: {}", rule_name, err),
                        &self.component.name,
                        None,
                    );
                    continue;
                }
            };
            if location == self.session.request_url {
                self.session.diagnose(
                    DiagnosticLevel::Info,
                    format!(
                        "Redirect rule '{}' of API '{}' points at the current URL; ignored",
                        rule_name, entry.name
                    ),
                    &self.component.name,
                    None,
                );
                continue;
            }
            log::info!(
                "API '{}' of '{}' redirects to {}",
                entry.name,
                self.component.name,
                location
            );
            return Err(Redirect::new(
                location.to_string(),
                rule.status_code,
                entry.name,
                self.component.name.as_str(),
            ));
        }
        Ok(())
    }
}

/// Topological order of dependent APIs. Among APIs that are ready at the
/// same time, and for cycles, names decide.
fn dependency_order<'c>(
    dependent: &BTreeMap<&'c str, (&ApiDeclaration, BTreeSet<String>)>,
) -> Vec<&'c str> {
    let mut remaining: BTreeMap<&str, BTreeSet<&str>> = dependent
        .iter()
        .map(|(name, (_, refs))| {
            let waits_on = refs
                .iter()
                .map(String::as_str)
                .filter(|r| dependent.contains_key(r))
                .collect();
            (*name, waits_on)
        })
        .collect();

    let mut order = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let next = remaining
            .iter()
            .find(|(_, waits_on)| waits_on.is_empty())
            .map(|(name, _)| *name)
            .or_else(|| {
                let cyclic = remaining.keys().next().copied();
                if let Some(name) = cyclic {
                    log::warn!("API '{}' is part of a dependency cycle", name);
                }
                cyclic
            });
        let Some(name) = next else { break };
        remaining.remove(name);
        for waits_on in remaining.values_mut() {
            waits_on.remove(name);
        }
        if let Some((key, _)) = dependent.get_key_value(name) {
            order.push(*key);
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{RenderOptions, RenderOutcome};
    use crate::test_support::{
        MockFetcher, engine, engine_with, expr, render, render_at, render_html,
    };
    use serde_json::json;
    use std::time::Duration;

    fn decl() -> ApiDeclaration {
        ApiDeclaration::default()
    }

    #[test]
    fn dependency_order_follows_references_then_names() {
        let (a, b, c) = (decl(), decl(), decl());
        let mut dependent = BTreeMap::new();
        // c waits on a, a waits on b; b only reads an independent API.
        dependent.insert("c", (&c, ["a".to_string()].into_iter().collect()));
        dependent.insert("a", (&a, ["b".to_string()].into_iter().collect()));
        dependent.insert("b", (&b, ["session".to_string()].into_iter().collect()));
        assert_eq!(dependency_order(&dependent), vec!["b", "a", "c"]);
    }

    #[test]
    fn cycles_resolve_by_name() {
        let (x, y) = (decl(), decl());
        let mut dependent = BTreeMap::new();
        dependent.insert("y", (&x, ["x".to_string()].into_iter().collect()));
        dependent.insert("x", (&y, ["y".to_string()].into_iter().collect()));
        assert_eq!(dependency_order(&dependent), vec!["x", "y"]);
    }

    fn page_with_apis(apis: Value, text: &str) -> Value {
        json!({
            "Home": {
                "apis": apis,
                "nodes": {
                    "root": { "type": "element", "tag": "div", "children": ["t"] },
                    "t": { "type": "text", "value": expr(text) }
                }
            }
        })
    }

    fn get(url: &str) -> Value {
        json!({ "url": { "type": "value", "value": url }, "autoFetch": { "type": "value", "value": true } })
    }

    #[tokio::test]
    async fn fetched_data_is_visible_and_cached() {
        let fetcher = Arc::new(
            MockFetcher::new().respond("https://app.test/api/user", 200, json!({ "name": "Ada" })),
        );
        let engine = engine(
            page_with_apis(json!({ "user": get("/api/user") }), "Apis.user.data.name"),
            fetcher.clone(),
        );

        let page = render_html(&engine, "Home").await;
        assert!(page.html.contains(">Ada</span>"));
        assert_eq!(fetcher.urls(), vec!["https://app.test/api/user".to_string()]);

        let cache = page.api_cache.as_object().unwrap();
        assert_eq!(cache.len(), 1);
        let status = cache.values().next().unwrap();
        assert_eq!(status["data"], json!({ "name": "Ada" }));
        assert_eq!(status["isLoading"], json!(false));
        assert_eq!(status["response"]["status"], json!(200));
    }

    #[tokio::test]
    async fn identical_requests_are_fetched_once() {
        let fetcher =
            Arc::new(MockFetcher::new().respond("https://app.test/api/menu", 200, json!(["home"])));
        let engine = engine(
            json!({
                "Home": {
                    "apis": { "a": get("/api/menu"), "b": get("/api/menu") },
                    "nodes": {
                        "root": { "type": "element", "tag": "div", "children": ["t", "nav", "nav2"] },
                        "t": { "type": "text", "value": expr("concat(Apis.a.data, Apis.b.data)") },
                        "nav": { "type": "component", "name": "Nav" },
                        "nav2": { "type": "component", "name": "Nav" }
                    }
                },
                "Nav": {
                    "apis": { "menu": get("https://app.test/api/menu") },
                    "nodes": {
                        "root": { "type": "element", "tag": "nav", "children": ["t"] },
                        "t": { "type": "text", "value": expr("Apis.menu.data[0]") }
                    }
                }
            }),
            fetcher.clone(),
        );

        let page = render_html(&engine, "Home").await;
        assert_eq!(fetcher.calls().len(), 1);
        assert_eq!(page.api_cache.as_object().unwrap().len(), 1);
        assert!(page.html.contains(r#"["home","home"]"#));
        assert_eq!(page.html.matches(">home</span>").count(), 2);
    }

    #[tokio::test]
    async fn server_disabled_and_manual_apis_are_not_called() {
        let fetcher = Arc::new(MockFetcher::new());
        let mut client_only = get("/api/feed");
        client_only["server"] = json!({ "ssr": { "enabled": { "type": "value", "value": false } } });
        let manual = json!({ "url": { "type": "value", "value": "/api/manual" } });
        let engine = engine(
            page_with_apis(
                json!({ "feed": client_only, "manual": manual }),
                "concat(Apis.feed.isLoading, '/', Apis.manual.isLoading)",
            ),
            fetcher.clone(),
        );

        let page = render_html(&engine, "Home").await;
        assert!(fetcher.calls().is_empty());
        assert!(page.html.contains(">true/false</span>"));
        assert!(page.api_cache.as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dependent_apis_see_earlier_results() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .respond("https://app.test/api/session", 200, json!({ "id": 7 }))
                .respond("https://app.test/api/users/7", 200, json!({ "name": "Ada" }))
                .respond("https://app.test/api/users/7/orders", 200, json!([1, 2])),
        );
        let orders = json!({
            "url": expr("concat('/api/users/', Apis.session.data.id, '/orders')"),
            "autoFetch": expr("Apis.profile.data")
        });
        let profile = json!({
            "url": expr("concat('/api/users/', Apis.session.data.id)"),
            "autoFetch": { "type": "value", "value": true }
        });
        let engine = engine(
            page_with_apis(
                json!({ "orders": orders, "profile": profile, "session": get("/api/session") }),
                "concat(Apis.profile.data.name, ':', size(Apis.orders.data))",
            ),
            fetcher.clone(),
        );

        let page = render_html(&engine, "Home").await;
        assert_eq!(
            fetcher.urls(),
            vec![
                "https://app.test/api/session".to_string(),
                "https://app.test/api/users/7".to_string(),
                "https://app.test/api/users/7/orders".to_string(),
            ]
        );
        assert!(page.html.contains(">Ada:2</span>"));
    }

    #[tokio::test(start_paused = true)]
    async fn dependents_wait_for_the_whole_independent_batch() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .respond("https://app.test/api/x", 200, json!({ "id": 3 }))
                .respond("https://app.test/api/y", 200, json!("slow"))
                .respond("https://app.test/api/z/3", 200, json!("z"))
                .delay_for("https://app.test/api/x", Duration::from_millis(10))
                .delay_for("https://app.test/api/y", Duration::from_millis(100)),
        );
        let z = json!({
            "url": expr("concat('/api/z/', Apis.x.data.id)"),
            "autoFetch": { "type": "value", "value": true }
        });
        let engine = engine(
            page_with_apis(
                json!({ "x": get("/api/x"), "y": get("/api/y"), "z": z }),
                "concat(Apis.y.data, ':', Apis.z.data)",
            ),
            fetcher.clone(),
        );

        let page = render_html(&engine, "Home").await;
        assert!(page.html.contains(">slow:z</span>"));
        assert_eq!(
            fetcher.events(),
            vec![
                "start:https://app.test/api/x".to_string(),
                "start:https://app.test/api/y".to_string(),
                "end:https://app.test/api/x".to_string(),
                "end:https://app.test/api/y".to_string(),
                "start:https://app.test/api/z/3".to_string(),
                "end:https://app.test/api/z/3".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out_as_gateway_errors() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .respond("https://app.test/api/slow", 200, json!("late"))
                .with_delay(Duration::from_secs(30)),
        );
        let options = RenderOptions {
            request_timeout: Duration::from_millis(100),
            ..RenderOptions::default()
        };
        let engine = engine_with(
            page_with_apis(json!({ "slow": get("/api/slow") }), "Apis.slow.error.status"),
            fetcher,
            options,
        );

        let page = render_html(&engine, "Home").await;
        assert!(page.html.contains(">504</span>"));
        assert_eq!(page.diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn network_failures_become_error_statuses() {
        let engine = engine(
            page_with_apis(
                json!({ "down": get("/api/down") }),
                "concat(Apis.down.error.status, ' ', Apis.down.data)",
            ),
            Arc::new(MockFetcher::new()),
        );

        let page = render_html(&engine, "Home").await;
        assert!(page.html.contains(">500 </span>"));
        let status = page.api_cache.as_object().unwrap().values().next().unwrap().clone();
        assert_eq!(status["response"]["status"], json!(500));
    }

    #[tokio::test]
    async fn error_classification() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .respond("https://app.test/api/check", 200, json!({ "ok": false }))
                .respond("https://app.test/api/missing", 404, json!({ "reason": "gone" })),
        );
        let mut check = get("/api/check");
        check["isError"] = expr("not(Apis.check.data.ok)");
        let engine = engine(
            page_with_apis(
                json!({ "check": check, "missing": get("/api/missing") }),
                "concat(Apis.check.error.ok, '|', Apis.check.data, '|', Apis.missing.error.reason)",
            ),
            fetcher,
        );

        let page = render_html(&engine, "Home").await;
        assert!(page.html.contains(">false||gone</span>"));
    }

    fn redirecting_project(rule: Value) -> Value {
        json!({
            "Home": {
                "nodes": {
                    "root": { "type": "element", "tag": "div", "children": ["before", "guard"] },
                    "before": { "type": "text", "value": { "type": "value", "value": "partial" } },
                    "guard": { "type": "component", "name": "Guard" }
                }
            },
            "Guard": {
                "apis": {
                    "session": {
                        "url": { "type": "value", "value": "/api/session" },
                        "autoFetch": { "type": "value", "value": true },
                        "redirectRules": { "login": rule }
                    },
                    "profile": {
                        "url": expr("concat('/api/users/', Apis.session.data.id)"),
                        "autoFetch": { "type": "value", "value": true }
                    }
                },
                "nodes": {
                    "root": { "type": "element", "tag": "p" }
                }
            }
        })
    }

    #[tokio::test]
    async fn redirect_rules_abandon_the_render() {
        let fetcher = Arc::new(MockFetcher::new().respond(
            "https://app.test/api/session",
            401,
            json!({ "goto": "/login?next=home" }),
        ));
        let engine = engine(
            redirecting_project(json!({
                "formula": expr("Apis.session.error.goto"),
                "index": 0,
                "statusCode": 307
            })),
            fetcher.clone(),
        );

        let RenderOutcome::Redirect(redirect) = render(&engine, "Home").await else {
            panic!("expected a redirect");
        };
        assert_eq!(redirect.location, "https://app.test/login?next=home");
        assert_eq!(redirect.status_code, 307);
        assert_eq!(redirect.api_name, "session");
        assert_eq!(redirect.component_name, "Guard");
        // The dependent API is never reached.
        assert_eq!(fetcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn redirects_to_the_current_url_are_ignored() {
        let fetcher = Arc::new(
            MockFetcher::new().respond("https://app.test/api/session", 200, json!({ "id": 1 })),
        );
        let engine = engine(
            redirecting_project(json!({ "formula": { "type": "value", "value": "/account" } })),
            fetcher,
        );

        let outcome = render_at(&engine, "Home", "https://app.test/account").await;
        let RenderOutcome::Page(page) = outcome else {
            panic!("expected the page to render");
        };
        assert_eq!(page.diagnostics.len(), 1);
        assert_eq!(page.diagnostics[0].level, DiagnosticLevel::Info);
        assert!(page.diagnostics[0].message.contains("current URL"));
    }

    #[tokio::test]
    async fn empty_redirect_targets_do_not_redirect() {
        let fetcher = Arc::new(
            MockFetcher::new().respond("https://app.test/api/session", 200, json!({ "id": 1 })),
        );
        let engine = engine(
            redirecting_project(json!({ "formula": { "type": "value", "value": "" } })),
            fetcher,
        );

        let RenderOutcome::Page(page) = render(&engine, "Home").await else {
            panic!("expected a page");
        };
        assert!(page.html.contains("partial"));
        assert_eq!(page.api_cache.as_object().unwrap().len(), 2);
    }
}
