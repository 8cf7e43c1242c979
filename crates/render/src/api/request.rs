//! Turns an API declaration into an [`OutgoingRequest`].
use crate::context::ComponentData;
use canopy_formula::{FormulaEvaluator, is_truthy, to_text};
use canopy_model::{ApiDeclaration, ApiParameter};
use canopy_traits::{FetchError, OutgoingRequest};
use serde_json::Value;
use url::Url;

fn enabled(param: &ApiParameter, data: &ComponentData, evaluator: &dyn FormulaEvaluator) -> bool {
    param
        .enabled
        .as_ref()
        .is_none_or(|formula| is_truthy(&evaluator.evaluate(formula, data)))
}

/// Resolves URL, path segments, query, headers and body. Relative URLs
/// resolve against `origin`.
pub fn build_request(
    api: &ApiDeclaration,
    data: &ComponentData,
    evaluator: &dyn FormulaEvaluator,
    origin: &Url,
) -> Result<OutgoingRequest, FetchError> {
    let base = api
        .url
        .as_ref()
        .map(|formula| to_text(&evaluator.evaluate(formula, data)))
        .unwrap_or_default();

    let segments: Vec<String> = api
        .ordered_path()
        .into_iter()
        .map(|segment| to_text(&evaluator.evaluate(&segment.formula, data)))
        .map(|segment| segment.trim_matches('/').to_string())
        .filter(|segment| !segment.is_empty())
        .collect();

    let raw = if segments.is_empty() {
        base
    } else {
        format!("{}/{}", base.trim_end_matches('/'), segments.join("/"))
    };
    if raw.trim().is_empty() {
        return Err(FetchError::InvalidRequest("API has no URL".to_string()));
    }

    let mut url = match Url::parse(&raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => origin
            .join(&raw)
            .map_err(|e| FetchError::InvalidRequest(format!("{}: {}", raw, e)))?,
        Err(e) => return Err(FetchError::InvalidRequest(format!("{}: {}", raw, e))),
    };

    {
        let mut pairs = Vec::new();
        for (name, param) in &api.query_params {
            if !enabled(param, data, evaluator) {
                continue;
            }
            match evaluator.evaluate(&param.formula, data) {
                Value::Null => {}
                Value::Array(items) => {
                    pairs.extend(items.iter().map(|item| (name.clone(), to_text(item))));
                }
                value => pairs.push((name.clone(), to_text(&value))),
            }
        }
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
    }

    let mut headers = std::collections::BTreeMap::new();
    for (name, param) in &api.headers {
        if !enabled(param, data, evaluator) {
            continue;
        }
        let value = evaluator.evaluate(&param.formula, data);
        if !value.is_null() {
            headers.insert(name.to_ascii_lowercase(), to_text(&value));
        }
    }

    let body = match (&api.body, api.method.allows_body()) {
        (Some(formula), true) => match evaluator.evaluate(formula, data) {
            Value::Null => None,
            Value::String(text) => Some(text),
            value => {
                headers
                    .entry("content-type".to_string())
                    .or_insert_with(|| "application/json".to_string());
                Some(value.to_string())
            }
        },
        _ => None,
    };

    Ok(OutgoingRequest {
        method: api.method.as_str().to_string(),
        url: url.to_string(),
        headers,
        body,
    })
}

/// Cache key of a resolved request: its canonical JSON form. Identical
/// requests always share one key.
pub fn cache_key(request: &OutgoingRequest) -> String {
    serde_json::to_string(request).unwrap_or_else(|_| format!("{} {}", request.method, request.url))
}
