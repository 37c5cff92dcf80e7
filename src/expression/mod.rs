//! Expression resolution
//!
//! Expressions are evaluated by pluggable backends registered under a
//! language name. The resolver is populated once and read-only afterwards:
//!
//! ```text
//! ExpressionResolver --resolve(language)--> ExpressionHandle --evaluate(text, bindings)--> bool
//! ```
//!
//! Two backends ship with the crate: the unified expression language
//! ([`el::UnifiedElEngine`], always available under
//! [`UNIFIED_EXPRESSION_LANGUAGE`]) and the rule condition language
//! ([`condition::ConditionEngine`], registered as `condition`). Hosts add
//! their own by implementing [`ScriptEngine`].

pub mod condition;
pub mod el;

use crate::bindings::Bindings;
use crate::outcome::{type_name, ConstraintFault};
use log::{debug, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Reserved identifier of the unified expression language
pub const UNIFIED_EXPRESSION_LANGUAGE: &str = "unified-expression-language";

/// Failure reported by a scripting engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("{0}")]
    Syntax(String),

    #[error("{0}")]
    Evaluation(String),
}

/// A scripting backend identified by a unique language name
pub trait ScriptEngine: Send + Sync {
    /// Language name the engine is registered under
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str {
        ""
    }

    /// Evaluate expression text against the bindings
    fn evaluate(&self, expression: &str, bindings: &Bindings) -> Result<Value, ScriptError>;
}

/// A resolved language, ready to evaluate boolean expressions
#[derive(Clone)]
pub struct ExpressionHandle {
    engine: Arc<dyn ScriptEngine>,
}

impl ExpressionHandle {
    pub fn language(&self) -> &str {
        self.engine.name()
    }

    /// Evaluate `expression` and require a boolean result.
    ///
    /// Syntax errors, evaluation errors and non-boolean results all surface as
    /// [`ConstraintFault`]s.
    pub fn evaluate(&self, expression: &str, bindings: &Bindings) -> Result<bool, ConstraintFault> {
        match self.engine.evaluate(expression, bindings) {
            Ok(Value::Bool(result)) => Ok(result),
            Ok(other) => Err(ConstraintFault::NonBoolean {
                expression: expression.to_string(),
                found: describe(&other),
            }),
            Err(ScriptError::Syntax(message)) => Err(ConstraintFault::Syntax {
                expression: expression.to_string(),
                message,
            }),
            Err(ScriptError::Evaluation(message)) => Err(ConstraintFault::Evaluation {
                expression: expression.to_string(),
                message,
            }),
        }
    }
}

impl fmt::Debug for ExpressionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionHandle")
            .field("language", &self.language())
            .finish()
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("string \"{}\"", s),
        Value::Number(n) => format!("number {}", n),
        other => type_name(other).to_string(),
    }
}

/// Read-only registry of expression languages
#[derive(Clone)]
pub struct ExpressionResolver {
    engines: HashMap<String, Arc<dyn ScriptEngine>>,
}

impl Default for ExpressionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionResolver {
    /// Resolver with the built-in languages registered
    pub fn new() -> Self {
        Self::builder().with_builtin().build()
    }

    pub fn builder() -> ExpressionResolverBuilder {
        ExpressionResolverBuilder::default()
    }

    /// Resolve a language identifier to an evaluation handle
    pub fn resolve(&self, language: &str) -> Result<ExpressionHandle, ConstraintFault> {
        if language.trim().is_empty() {
            return Err(ConstraintFault::EmptyLanguage);
        }

        self.engines
            .get(language)
            .map(|engine| ExpressionHandle {
                engine: Arc::clone(engine),
            })
            .ok_or_else(|| ConstraintFault::UnknownLanguage(language.to_string()))
    }

    pub fn is_registered(&self, language: &str) -> bool {
        self.engines.contains_key(language)
    }

    /// Registered language names, sorted
    pub fn languages(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.engines.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Description of a registered language
    pub fn description(&self, language: &str) -> Option<&str> {
        self.engines.get(language).map(|e| e.description())
    }
}

impl fmt::Debug for ExpressionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionResolver")
            .field("languages", &self.languages())
            .finish()
    }
}

/// Collects engines before the registry is frozen
#[derive(Default)]
pub struct ExpressionResolverBuilder {
    engines: HashMap<String, Arc<dyn ScriptEngine>>,
}

impl ExpressionResolverBuilder {
    /// Register the unified expression language and the condition language
    pub fn with_builtin(self) -> Self {
        self.register(Arc::new(el::UnifiedElEngine::new()))
            .register(Arc::new(condition::ConditionEngine::new()))
    }

    /// Register an engine under its own name. A later registration of the
    /// same name replaces the earlier one.
    pub fn register(mut self, engine: Arc<dyn ScriptEngine>) -> Self {
        let name = engine.name().to_string();
        if self.engines.contains_key(&name) {
            warn!("Replacing expression engine '{}'", name);
        }
        debug!("Registered expression engine '{}'", name);
        self.engines.insert(name, engine);
        self
    }

    /// Drop a previously registered engine
    pub fn without(mut self, name: &str) -> Self {
        if self.engines.remove(name).is_some() {
            debug!("Removed expression engine '{}'", name);
        }
        self
    }

    pub fn build(self) -> ExpressionResolver {
        ExpressionResolver {
            engines: self.engines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedEngine {
        result: Result<Value, ScriptError>,
    }

    impl ScriptEngine for FixedEngine {
        fn name(&self) -> &str {
            "fixed"
        }

        fn evaluate(&self, _expression: &str, _bindings: &Bindings) -> Result<Value, ScriptError> {
            self.result.clone()
        }
    }

    fn resolver_with(result: Result<Value, ScriptError>) -> ExpressionResolver {
        ExpressionResolver::builder()
            .register(Arc::new(FixedEngine { result }))
            .build()
    }

    #[test]
    fn test_builtin_languages() {
        let resolver = ExpressionResolver::new();
        assert_eq!(
            resolver.languages(),
            vec!["condition", UNIFIED_EXPRESSION_LANGUAGE]
        );
        assert!(resolver.resolve(UNIFIED_EXPRESSION_LANGUAGE).is_ok());
    }

    #[test]
    fn test_unknown_language_is_fault() {
        let resolver = ExpressionResolver::new();
        let err = resolver.resolve("cobol-script").unwrap_err();
        assert_eq!(err, ConstraintFault::UnknownLanguage("cobol-script".to_string()));
        assert_eq!(err.to_string(), "no engine registered for cobol-script");
    }

    #[test]
    fn test_empty_language_is_fault() {
        let resolver = ExpressionResolver::new();
        assert_eq!(resolver.resolve("  ").unwrap_err(), ConstraintFault::EmptyLanguage);
    }

    #[test]
    fn test_without_removes_engine() {
        let resolver = ExpressionResolver::builder()
            .with_builtin()
            .without("condition")
            .build();
        assert!(!resolver.is_registered("condition"));
        assert!(resolver.resolve("condition").is_err());
    }

    #[test]
    fn test_handle_boolean_result() {
        let handle = resolver_with(Ok(json!(true))).resolve("fixed").unwrap();
        assert_eq!(handle.language(), "fixed");
        assert_eq!(handle.evaluate("x", &Bindings::new()), Ok(true));
    }

    #[test]
    fn test_handle_non_boolean_result() {
        let handle = resolver_with(Ok(json!("yes"))).resolve("fixed").unwrap();
        let err = handle.evaluate("x", &Bindings::new()).unwrap_err();
        assert_eq!(
            err,
            ConstraintFault::NonBoolean {
                expression: "x".to_string(),
                found: "string \"yes\"".to_string(),
            }
        );
    }

    #[test]
    fn test_handle_maps_engine_errors() {
        let handle = resolver_with(Err(ScriptError::Syntax("bad token".to_string())))
            .resolve("fixed")
            .unwrap();
        assert!(matches!(
            handle.evaluate("x", &Bindings::new()),
            Err(ConstraintFault::Syntax { .. })
        ));

        let handle = resolver_with(Err(ScriptError::Evaluation("boom".to_string())))
            .resolve("fixed")
            .unwrap();
        assert!(matches!(
            handle.evaluate("x", &Bindings::new()),
            Err(ConstraintFault::Evaluation { .. })
        ));
    }
}
