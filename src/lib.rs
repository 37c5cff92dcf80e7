//! beanrule - Constraint evaluation engine for structured data
//!
//! Validates "beans" (any `serde_json::Value`) against declarative
//! constraints: class-level boolean expressions in pluggable expression
//! languages, required values with bounded size, required decimals with a
//! lower bound, and structured URI restrictions.
//!
//! # Architecture
//!
//! ```text
//! CLI/API -> Validator -> evaluator (expression | size | decimal | uri) -> EvaluationResult
//!                              |
//!                              +-> ExpressionResolver -> ScriptEngine
//! ```
//!
//! Every evaluation returns one of three outcomes: the value is valid, the
//! value is invalid, or the declaration itself is broken (a configuration
//! fault). Faults are never folded into invalid.
//!
//! # Declaration files
//!
//! ```yaml
//! constraints:
//!   - id: period-ordered
//!     kind: expression-for-class
//!     expression: "${bean.start < bean.end}"
//!   - field: homepage
//!     kind: uri
//!     schemes: [https, null]
//!     requires_path: true
//! ```

pub mod bindings;
pub mod config;
pub mod constraint;
pub mod descriptor;
pub mod expression;
pub mod outcome;
pub mod output;
pub mod report;
pub mod uri;
pub mod validator;

// Re-export main types
pub use bindings::Bindings;
pub use config::Config;
pub use descriptor::{
    ConstraintDecl, ConstraintDescriptor, ConstraintFile, ExpressionForClass, NotNullDecimalMin,
    NotNullSize, UriConstraint,
};
pub use expression::{
    ExpressionHandle, ExpressionResolver, ScriptEngine, ScriptError, UNIFIED_EXPRESSION_LANGUAGE,
};
pub use outcome::{ConstraintFault, EvaluationResult};
pub use output::{JsonFormatter, OutputFormatter, TextFormatter};
pub use report::{Fault, ValidationReport, Violation};
pub use uri::DecomposedUri;
pub use validator::{SourcedBean, Validator};
