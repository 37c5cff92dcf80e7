//! Evaluation outcomes and configuration faults

use std::fmt;
use thiserror::Error;

/// A constraint declaration that cannot be evaluated.
///
/// Faults describe broken rules, never broken data. They are kept apart from
/// [`EvaluationResult::Invalid`] so a caller can tell the two apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintFault {
    #[error("no engine registered for {0}")]
    UnknownLanguage(String),

    #[error("expression language identifier must not be empty")]
    EmptyLanguage,

    #[error("bean alias must not be empty")]
    EmptyBeanAlias,

    #[error("syntax error in expression `{expression}`: {message}")]
    Syntax { expression: String, message: String },

    #[error("evaluation of `{expression}` failed: {message}")]
    Evaluation { expression: String, message: String },

    #[error("expression `{expression}` returned {found}, expected a boolean")]
    NonBoolean { expression: String, found: String },

    #[error("size bounds are inverted: min {min} > max {max}")]
    InvertedBounds { min: usize, max: usize },

    #[error("decimal bound `{0}` is not a decimal number")]
    InvalidDecimalBound(String),

    #[error("invalid URI allow-list entry: {0}")]
    InvalidAllowList(String),

    #[error("{constraint} cannot be applied to a value of type {found}")]
    UnsupportedType {
        constraint: &'static str,
        found: String,
    },
}

/// Tri-state outcome of evaluating one constraint against one value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationResult {
    /// The value satisfies the constraint
    Valid,
    /// The value violates the constraint
    Invalid,
    /// The constraint itself is unusable
    ConfigurationFault(ConstraintFault),
}

impl EvaluationResult {
    /// Map a boolean check onto Valid/Invalid
    pub fn from_bool(valid: bool) -> Self {
        if valid {
            EvaluationResult::Valid
        } else {
            EvaluationResult::Invalid
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, EvaluationResult::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, EvaluationResult::Invalid)
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, EvaluationResult::ConfigurationFault(_))
    }

    /// The fault, if this outcome is one
    pub fn fault(&self) -> Option<&ConstraintFault> {
        match self {
            EvaluationResult::ConfigurationFault(fault) => Some(fault),
            _ => None,
        }
    }
}

impl From<ConstraintFault> for EvaluationResult {
    fn from(fault: ConstraintFault) -> Self {
        EvaluationResult::ConfigurationFault(fault)
    }
}

impl From<Result<bool, ConstraintFault>> for EvaluationResult {
    fn from(result: Result<bool, ConstraintFault>) -> Self {
        match result {
            Ok(valid) => EvaluationResult::from_bool(valid),
            Err(fault) => EvaluationResult::ConfigurationFault(fault),
        }
    }
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationResult::Valid => write!(f, "valid"),
            EvaluationResult::Invalid => write!(f, "invalid"),
            EvaluationResult::ConfigurationFault(fault) => {
                write!(f, "configuration fault: {}", fault)
            }
        }
    }
}

/// Name of a JSON value's type, used in fault messages
pub(crate) fn type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
