//! The formula AST.
//!
//! On disk a formula is a tagged JSON object (`{"type": "path", ...}`).
//! The `expr` tag is a textual shorthand that is parsed into the same AST
//! while the project is loaded.
//!
//! Loading never fails on a bad formula: it becomes [`Formula::Invalid`],
//! which evaluates to `null`, so one broken expression cannot reject the
//! rest of the project.
use crate::error::FormulaParseError;
use crate::parser::parse_formula;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeSet;

/// A value-producing expression evaluated against a scoping context.
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    /// A literal JSON value.
    Value(Value),
    /// A lookup such as `Attributes.title` or `ListItem.Item.0`.
    Path(Vec<String>),
    /// A call into the evaluator's function registry.
    Function { name: String, arguments: Vec<Formula> },
    /// Short-circuiting conjunction; yields a boolean.
    And(Vec<Formula>),
    /// Short-circuiting disjunction; yields a boolean.
    Or(Vec<Formula>),
    /// First case whose condition is truthy wins, otherwise `default`.
    Switch {
        cases: Vec<SwitchCase>,
        default: Box<Formula>,
    },
    Array(Vec<Formula>),
    Object(Vec<(String, Formula)>),
    /// A formula that could not be loaded, with the reason.
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub condition: Formula,
    pub formula: Formula,
}

impl Formula {
    pub fn value(value: impl Into<Value>) -> Self {
        Formula::Value(value.into())
    }

    pub fn path<S: AsRef<str>>(segments: &[S]) -> Self {
        Formula::Path(segments.iter().map(|s| s.as_ref().to_string()).collect())
    }

    pub fn function(name: impl Into<String>, arguments: Vec<Formula>) -> Self {
        Formula::Function {
            name: name.into(),
            arguments,
        }
    }

    /// Parses the textual shorthand, e.g. `concat('Hi ', Attributes.name)`.
    pub fn parse(source: &str) -> Result<Self, FormulaParseError> {
        parse_formula(source)
    }

    /// Strict conversion from the on-disk JSON form.
    pub fn try_from_value(value: Value) -> Result<Self, FormulaParseError> {
        let repr: FormulaRepr = serde_json::from_value(value)
            .map_err(|e| FormulaParseError::Malformed(e.to_string()))?;
        Formula::try_from(repr)
    }

    /// The load error when this formula or any nested one is invalid.
    pub fn invalid_reason(&self) -> Option<&str> {
        let mut reason = None;
        self.visit(&mut |formula| {
            if let Formula::Invalid(message) = formula
                && reason.is_none()
            {
                reason = Some(message.as_str());
            }
        });
        reason
    }

    /// Calls `visitor` on this formula and every nested formula, depth first.
    pub fn visit<'a>(&'a self, visitor: &mut impl FnMut(&'a Formula)) {
        visitor(self);
        match self {
            Formula::Value(_) | Formula::Path(_) | Formula::Invalid(_) => {}
            Formula::Function { arguments, .. }
            | Formula::And(arguments)
            | Formula::Or(arguments)
            | Formula::Array(arguments) => {
                for argument in arguments {
                    argument.visit(visitor);
                }
            }
            Formula::Switch { cases, default } => {
                for case in cases {
                    case.condition.visit(visitor);
                    case.formula.visit(visitor);
                }
                default.visit(visitor);
            }
            Formula::Object(entries) => {
                for (_, formula) in entries {
                    formula.visit(visitor);
                }
            }
        }
    }

    /// Names of APIs this formula reads through `Apis.<name>`.
    pub fn api_references(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.visit(&mut |formula| {
            if let Formula::Path(path) = formula
                && path.len() > 1
                && path[0] == "Apis"
            {
                names.insert(path[1].clone());
            }
        });
        names
    }
}

impl<'de> Deserialize<'de> for Formula {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Formula::try_from_value(value).unwrap_or_else(|err| Formula::Invalid(err.to_string())))
    }
}

// --- On-disk representation ---

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum FormulaRepr {
    Value {
        #[serde(default)]
        value: Value,
    },
    Path {
        path: Vec<PathKey>,
    },
    Function {
        name: String,
        #[serde(default)]
        arguments: Vec<Argument>,
    },
    And {
        #[serde(default)]
        arguments: Vec<Argument>,
    },
    Or {
        #[serde(default)]
        arguments: Vec<Argument>,
    },
    Switch {
        #[serde(default)]
        cases: Vec<CaseRepr>,
        default: Formula,
    },
    Array {
        #[serde(default)]
        arguments: Vec<Argument>,
    },
    Object {
        #[serde(default)]
        arguments: Vec<Argument>,
    },
    Expr {
        source: String,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PathKey {
    Key(String),
    Index(u64),
}

#[derive(Deserialize)]
struct Argument {
    #[serde(default)]
    name: Option<String>,
    formula: Formula,
}

#[derive(Deserialize)]
struct CaseRepr {
    condition: Formula,
    formula: Formula,
}

fn positional(arguments: Vec<Argument>) -> Vec<Formula> {
    arguments.into_iter().map(|a| a.formula).collect()
}

impl TryFrom<FormulaRepr> for Formula {
    type Error = FormulaParseError;

    fn try_from(repr: FormulaRepr) -> Result<Self, Self::Error> {
        Ok(match repr {
            FormulaRepr::Value { value } => Formula::Value(value),
            FormulaRepr::Path { path } => Formula::Path(
                path.into_iter()
                    .map(|key| match key {
                        PathKey::Key(key) => key,
                        PathKey::Index(index) => index.to_string(),
                    })
                    .collect(),
            ),
            FormulaRepr::Function { name, arguments } => Formula::Function {
                name,
                arguments: positional(arguments),
            },
            FormulaRepr::And { arguments } => Formula::And(positional(arguments)),
            FormulaRepr::Or { arguments } => Formula::Or(positional(arguments)),
            FormulaRepr::Switch { cases, default } => Formula::Switch {
                cases: cases
                    .into_iter()
                    .map(|c| SwitchCase {
                        condition: c.condition,
                        formula: c.formula,
                    })
                    .collect(),
                default: Box::new(default),
            },
            FormulaRepr::Array { arguments } => Formula::Array(positional(arguments)),
            FormulaRepr::Object { arguments } => Formula::Object(
                arguments
                    .into_iter()
                    .map(|a| {
                        a.name
                            .map(|name| (name, a.formula))
                            .ok_or(FormulaParseError::UnnamedObjectArgument)
                    })
                    .collect::<Result<_, _>>()?,
            ),
            FormulaRepr::Expr { source } => parse_formula(&source)?,
        })
    }
}
