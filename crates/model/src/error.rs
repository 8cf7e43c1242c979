use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaParseError {
    #[error("formula parse error in '{input}': {message}")]
    Syntax { input: String, message: String },

    #[error("malformed formula: {0}")]
    Malformed(String),

    #[error("object formula argument is missing a name")]
    UnnamedObjectArgument,
}
