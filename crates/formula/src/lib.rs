//! Formula evaluation.
//!
//! The render engine talks to formulas only through [`FormulaEvaluator`], so
//! a host can swap in its own evaluator. [`FormulaEngine`] is the default:
//! paths resolve against a [`DataScope`], functions come from a
//! case-insensitive [`FunctionRegistry`].

pub mod engine;
pub mod functions;
pub mod value;

pub use engine::{DataScope, FormulaEngine, FormulaEvaluator};
pub use functions::{FormulaFunction, FunctionRegistry};
pub use value::{is_truthy, select, to_text};
