//! The default formula evaluator.
use crate::functions::FunctionRegistry;
use crate::value::{is_truthy, select};
use canopy_model::Formula;
use serde_json::{Map, Value};

/// Read access to the named namespaces a formula can address
/// (`Attributes`, `Variables`, `Apis`, `ListItem`, ...).
pub trait DataScope {
    fn lookup(&self, namespace: &str) -> Option<&Value>;
}

impl DataScope for Value {
    fn lookup(&self, namespace: &str) -> Option<&Value> {
        self.get(namespace)
    }
}

impl DataScope for Map<String, Value> {
    fn lookup(&self, namespace: &str) -> Option<&Value> {
        self.get(namespace)
    }
}

/// Evaluates a formula against a scope. Evaluation never fails: anything
/// that cannot be resolved yields `null`.
pub trait FormulaEvaluator: Send + Sync {
    fn evaluate(&self, formula: &Formula, scope: &dyn DataScope) -> Value;
}

pub struct FormulaEngine {
    functions: FunctionRegistry,
}

impl Default for FormulaEngine {
    fn default() -> Self {
        Self::new(FunctionRegistry::default())
    }
}

impl FormulaEngine {
    pub fn new(functions: FunctionRegistry) -> Self {
        Self { functions }
    }

    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }
}

impl FormulaEvaluator for FormulaEngine {
    fn evaluate(&self, formula: &Formula, scope: &dyn DataScope) -> Value {
        match formula {
            Formula::Value(value) => value.clone(),
            Formula::Path(path) => match path.split_first() {
                Some((namespace, rest)) => scope
                    .lookup(namespace)
                    .and_then(|root| select(root, rest))
                    .cloned()
                    .unwrap_or(Value::Null),
                None => Value::Null,
            },
            Formula::Function { name, arguments } => match self.functions.get(name) {
                Some(function) => {
                    let args: Vec<Value> = arguments
                        .iter()
                        .map(|argument| self.evaluate(argument, scope))
                        .collect();
                    function(&args)
                }
                None => {
                    log::warn!("Unknown formula function '{}'", name);
                    Value::Null
                }
            },
            Formula::And(arguments) => Value::Bool(
                arguments
                    .iter()
                    .all(|argument| is_truthy(&self.evaluate(argument, scope))),
            ),
            Formula::Or(arguments) => Value::Bool(
                arguments
                    .iter()
                    .any(|argument| is_truthy(&self.evaluate(argument, scope))),
            ),
            Formula::Switch { cases, default } => cases
                .iter()
                .find(|case| is_truthy(&self.evaluate(&case.condition, scope)))
                .map(|case| self.evaluate(&case.formula, scope))
                .unwrap_or_else(|| self.evaluate(default, scope)),
            Formula::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.evaluate(item, scope))
                    .collect(),
            ),
            Formula::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, formula)| (key.clone(), self.evaluate(formula, scope)))
                    .collect(),
            ),
            Formula::Invalid(reason) => {
                log::warn!("Skipping invalid formula: {}", reason);
                Value::Null
            }
        }
    }
}
