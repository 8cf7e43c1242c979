//! The function registry and the built-in functions.
use crate::value::{is_truthy, to_text};
use serde_json::{Value, json};
use std::collections::HashMap;

/// The signature of a formula function. Arguments arrive evaluated.
pub type FormulaFunction = fn(args: &[Value]) -> Value;

/// Holds all functions available to the evaluator, keyed case-insensitively.
pub struct FunctionRegistry {
    functions: HashMap<String, FormulaFunction>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, function: FormulaFunction) {
        self.functions.insert(name.to_lowercase(), function);
    }

    pub fn get(&self, name: &str) -> Option<&FormulaFunction> {
        self.functions.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_lowercase())
    }
}

fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&Value::Null)
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Keeps integral results integral so `1 + 1` renders as `2`, not `2.0`.
fn from_f64(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        json!(n as i64)
    } else {
        serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn arithmetic(args: &[Value], op: fn(f64, f64) -> f64) -> Value {
    match (number(arg(args, 0)), number(arg(args, 1))) {
        (Some(a), Some(b)) => from_f64(op(a, b)),
        _ => Value::Null,
    }
}

fn compare(args: &[Value], op: fn(f64, f64) -> bool) -> Value {
    match (arg(args, 0), arg(args, 1)) {
        (Value::String(a), Value::String(b)) => {
            json!(op(a.cmp(b) as i8 as f64, 0.0))
        }
        (a, b) => match (number(a), number(b)) {
            (Some(a), Some(b)) => json!(op(a, b)),
            _ => json!(false),
        },
    }
}

fn loose_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

// --- Built-in Function Implementations ---

fn upper(args: &[Value]) -> Value {
    arg(args, 0).as_str().map(|s| s.to_uppercase().into()).unwrap_or(Value::Null)
}

fn lower(args: &[Value]) -> Value {
    arg(args, 0).as_str().map(|s| s.to_lowercase().into()).unwrap_or(Value::Null)
}

fn trim(args: &[Value]) -> Value {
    arg(args, 0).as_str().map(|s| s.trim().into()).unwrap_or(Value::Null)
}

fn concat(args: &[Value]) -> Value {
    if !args.is_empty() && args.iter().all(Value::is_array) {
        return Value::Array(args.iter().filter_map(Value::as_array).flatten().cloned().collect());
    }
    args.iter().map(to_text).collect::<String>().into()
}

fn contains(args: &[Value]) -> Value {
    match (arg(args, 0), arg(args, 1)) {
        (Value::String(haystack), needle) => json!(haystack.contains(&to_text(needle))),
        (Value::Array(items), needle) => json!(items.iter().any(|i| loose_equals(i, needle))),
        (Value::Object(map), Value::String(key)) => json!(map.contains_key(key)),
        _ => json!(false),
    }
}

fn size(args: &[Value]) -> Value {
    match arg(args, 0) {
        Value::Array(items) => json!(items.len()),
        Value::Object(map) => json!(map.len()),
        Value::String(s) => json!(s.chars().count()),
        _ => json!(0),
    }
}

fn equals(args: &[Value]) -> Value {
    json!(loose_equals(arg(args, 0), arg(args, 1)))
}

fn not_equals(args: &[Value]) -> Value {
    json!(!loose_equals(arg(args, 0), arg(args, 1)))
}

fn not(args: &[Value]) -> Value {
    json!(!is_truthy(arg(args, 0)))
}

fn boolean(args: &[Value]) -> Value {
    json!(is_truthy(arg(args, 0)))
}

fn string(args: &[Value]) -> Value {
    to_text(arg(args, 0)).into()
}

fn to_number(args: &[Value]) -> Value {
    number(arg(args, 0)).map(from_f64).unwrap_or(Value::Null)
}

fn add(args: &[Value]) -> Value {
    arithmetic(args, |a, b| a + b)
}

fn subtract(args: &[Value]) -> Value {
    arithmetic(args, |a, b| a - b)
}

fn multiply(args: &[Value]) -> Value {
    arithmetic(args, |a, b| a * b)
}

fn divide(args: &[Value]) -> Value {
    match number(arg(args, 1)) {
        Some(d) if d != 0.0 => arithmetic(args, |a, b| a / b),
        _ => Value::Null,
    }
}

fn modulo(args: &[Value]) -> Value {
    match number(arg(args, 1)) {
        Some(d) if d != 0.0 => arithmetic(args, |a, b| a % b),
        _ => Value::Null,
    }
}

fn greater_than(args: &[Value]) -> Value {
    compare(args, |a, b| a > b)
}

fn greater_or_equal(args: &[Value]) -> Value {
    compare(args, |a, b| a >= b)
}

fn less_than(args: &[Value]) -> Value {
    compare(args, |a, b| a < b)
}

fn less_or_equal(args: &[Value]) -> Value {
    compare(args, |a, b| a <= b)
}

fn join(args: &[Value]) -> Value {
    let separator = to_text(arg(args, 1));
    arg(args, 0)
        .as_array()
        .map(|items| items.iter().map(to_text).collect::<Vec<_>>().join(&separator).into())
        .unwrap_or(Value::Null)
}

fn split(args: &[Value]) -> Value {
    match (arg(args, 0).as_str(), to_text(arg(args, 1))) {
        (Some(text), separator) if !separator.is_empty() => {
            json!(text.split(separator.as_str()).collect::<Vec<_>>())
        }
        _ => Value::Null,
    }
}

fn replace_all(args: &[Value]) -> Value {
    match (arg(args, 0).as_str(), arg(args, 1).as_str()) {
        (Some(text), Some(pattern)) if !pattern.is_empty() => {
            text.replace(pattern, &to_text(arg(args, 2))).into()
        }
        _ => arg(args, 0).clone(),
    }
}

fn get(args: &[Value]) -> Value {
    let key = arg(args, 1);
    match (arg(args, 0), key) {
        (Value::Object(map), _) => map.get(&to_text(key)).cloned().unwrap_or(Value::Null),
        (Value::Array(items), _) => number(key)
            .and_then(|i| items.get(i as usize))
            .cloned()
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// The first argument that is not `null`.
fn default_value(args: &[Value]) -> Value {
    args.iter().find(|v| !v.is_null()).cloned().unwrap_or(Value::Null)
}

fn first(args: &[Value]) -> Value {
    arg(args, 0)
        .as_array()
        .and_then(|items| items.first())
        .cloned()
        .unwrap_or(Value::Null)
}

fn last(args: &[Value]) -> Value {
    arg(args, 0)
        .as_array()
        .and_then(|items| items.last())
        .cloned()
        .unwrap_or(Value::Null)
}

fn is_empty(args: &[Value]) -> Value {
    json!(match arg(args, 0) {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    })
}

fn json_stringify(args: &[Value]) -> Value {
    arg(args, 0).to_string().into()
}

fn url_encode(args: &[Value]) -> Value {
    let text = to_text(arg(args, 0));
    let mut encoded = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded.into()
}

// Impure: results differ between calls.

fn random(_args: &[Value]) -> Value {
    json!(rand::random::<f64>())
}

fn now(_args: &[Value]) -> Value {
    chrono::Utc::now().to_rfc3339().into()
}

impl Default for FunctionRegistry {
    /// Creates a registry populated with the built-in functions.
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register("upper", upper);
        registry.register("lower", lower);
        registry.register("trim", trim);
        registry.register("concat", concat);
        registry.register("contains", contains);
        registry.register("size", size);
        registry.register("count", size);
        registry.register("equals", equals);
        registry.register("notEquals", not_equals);
        registry.register("not", not);
        registry.register("boolean", boolean);
        registry.register("string", string);
        registry.register("number", to_number);
        registry.register("add", add);
        registry.register("subtract", subtract);
        registry.register("multiply", multiply);
        registry.register("divide", divide);
        registry.register("modulo", modulo);
        registry.register("greaterThan", greater_than);
        registry.register("greaterOrEqual", greater_or_equal);
        registry.register("lessThan", less_than);
        registry.register("lessOrEqual", less_or_equal);
        registry.register("join", join);
        registry.register("split", split);
        registry.register("replaceAll", replace_all);
        registry.register("get", get);
        registry.register("default", default_value);
        registry.register("first", first);
        registry.register("last", last);
        registry.register("isEmpty", is_empty);
        registry.register("json", json_stringify);
        registry.register("encodeUriComponent", url_encode);
        registry.register("random", random);
        registry.register("now", now);
        registry
    }
}
