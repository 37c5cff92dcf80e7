//! Unified expression language backend
//!
//! Accepts `${...}` and `#{...}` eval expressions with property and index
//! access, arithmetic, relational, logical, `empty` and conditional operators.
//! Text that mixes literal characters with eval expressions is a composite
//! expression and always evaluates to a string.

mod eval;
mod lexer;
mod parser;

use super::{ScriptEngine, ScriptError, UNIFIED_EXPRESSION_LANGUAGE};
use crate::bindings::Bindings;
use eval::Evaluator;
use parser::{Expr, Parser};
use serde_json::Value;
use thiserror::Error;

/// Unified expression language failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElError {
    #[error("syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("{0}")]
    Evaluation(String),
}

impl From<ElError> for ScriptError {
    fn from(err: ElError) -> Self {
        match err {
            ElError::Syntax { .. } => ScriptError::Syntax(err.to_string()),
            ElError::Evaluation(message) => ScriptError::Evaluation(message),
        }
    }
}

/// One piece of an expression template
#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Eval(Expr),
}

/// Engine registered under [`UNIFIED_EXPRESSION_LANGUAGE`]
#[derive(Debug, Default)]
pub struct UnifiedElEngine;

impl UnifiedElEngine {
    pub fn new() -> Self {
        Self
    }
}

impl ScriptEngine for UnifiedElEngine {
    fn name(&self) -> &str {
        UNIFIED_EXPRESSION_LANGUAGE
    }

    fn description(&self) -> &str {
        "Unified expression language (${...} / #{...})"
    }

    fn evaluate(&self, expression: &str, bindings: &Bindings) -> Result<Value, ScriptError> {
        Ok(evaluate(expression, bindings)?)
    }
}

/// Parse and evaluate expression text
pub fn evaluate(expression: &str, bindings: &Bindings) -> Result<Value, ElError> {
    let segments = parse_template(expression.trim())?;
    let evaluator = Evaluator::new(bindings);

    // A lone eval expression keeps the type of its result
    if let [Segment::Eval(expr)] = segments.as_slice() {
        return evaluator.eval(expr);
    }

    let mut text = String::new();
    for segment in &segments {
        match segment {
            Segment::Text(literal) => text.push_str(literal),
            Segment::Eval(expr) => match evaluator.eval(expr)? {
                Value::Null => {}
                Value::String(s) => text.push_str(&s),
                other => text.push_str(&other.to_string()),
            },
        }
    }
    Ok(Value::String(text))
}

/// Split text into literal runs and `${...}`/`#{...}` eval expressions
fn parse_template(input: &str) -> Result<Vec<Segment>, ElError> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut rest = input;
    let mut offset = 0;

    while !rest.is_empty() {
        if let Some(escaped) = rest.strip_prefix("\\${").or_else(|| rest.strip_prefix("\\#{")) {
            text.push_str(&rest[1..3]);
            offset += 3;
            rest = escaped;
            continue;
        }

        if rest.starts_with("${") || rest.starts_with("#{") {
            let body_start = offset + 2;
            let end = find_closing_brace(&rest[2..]).ok_or_else(|| ElError::Syntax {
                position: offset,
                message: "unterminated eval expression".to_string(),
            })?;
            let body = &rest[2..2 + end];

            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            let tokens = lexer::tokenize(body).map_err(|e| shift(e, body_start))?;
            let expr = Parser::new(tokens).parse().map_err(|e| shift(e, body_start))?;
            segments.push(Segment::Eval(expr));

            offset += end + 3;
            rest = &rest[end + 3..];
            continue;
        }

        let c = rest.chars().next().unwrap_or_default();
        text.push(c);
        offset += c.len_utf8();
        rest = &rest[c.len_utf8()..];
    }

    if !text.is_empty() || segments.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

/// Byte offset of the `}` closing an eval body, skipping quoted strings
fn find_closing_brace(body: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in body.char_indices() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                '}' => return Some(i),
                _ => {}
            },
        }
    }
    None
}

fn shift(err: ElError, by: usize) -> ElError {
    match err {
        ElError::Syntax { position, message } => ElError::Syntax {
            position: position + by,
            message,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bean(value: Value) -> Bindings {
        Bindings::single("bean", value)
    }

    #[test]
    fn test_single_expression_keeps_type() {
        let bindings = bean(json!({"start": 1, "end": 2}));
        assert_eq!(evaluate("${bean.start < bean.end}", &bindings), Ok(json!(true)));
        assert_eq!(evaluate("  #{bean.end}  ", &bindings), Ok(json!(2)));
    }

    #[test]
    fn test_composite_expression_is_string() {
        let bindings = bean(json!({"name": "widget"}));
        assert_eq!(
            evaluate("name=${bean.name}!", &bindings),
            Ok(json!("name=widget!"))
        );
        assert_eq!(evaluate("plain text", &bindings), Ok(json!("plain text")));
        assert_eq!(evaluate("", &bindings), Ok(json!("")));
        assert_eq!(evaluate(r"\${bean.name}", &bindings), Ok(json!("${bean.name}")));
    }

    #[test]
    fn test_brace_inside_string_literal() {
        let bindings = bean(json!({"s": "}"}));
        assert_eq!(evaluate("${bean.s == '}'}", &bindings), Ok(json!(true)));
    }

    #[test]
    fn test_syntax_error_positions() {
        let bindings = Bindings::new();
        assert_eq!(
            evaluate("${1 +}", &bindings),
            Err(ElError::Syntax {
                position: 5,
                message: "expected a value, found end of expression".to_string(),
            })
        );
        assert!(matches!(
            evaluate("${bean.start", &bindings),
            Err(ElError::Syntax { position: 0, .. })
        ));
    }

    #[test]
    fn test_deep_nesting_is_a_syntax_error() {
        let deep = format!("${{{}true{}}}", "(".repeat(2000), ")".repeat(2000));
        assert!(matches!(
            evaluate(&deep, &Bindings::new()),
            Err(ElError::Syntax { .. })
        ));
        assert!(matches!(
            UnifiedElEngine::new().evaluate(&deep, &Bindings::new()),
            Err(ScriptError::Syntax(_))
        ));

        let nested = format!("${{{}true{}}}", "(".repeat(30), ")".repeat(30));
        assert_eq!(evaluate(&nested, &Bindings::new()), Ok(json!(true)));
    }

    #[test]
    fn test_engine_maps_errors() {
        let engine = UnifiedElEngine::new();
        assert_eq!(engine.name(), UNIFIED_EXPRESSION_LANGUAGE);
        assert!(matches!(
            engine.evaluate("${a <}", &Bindings::new()),
            Err(ScriptError::Syntax(_))
        ));
        assert!(matches!(
            engine.evaluate("${a}", &Bindings::new()),
            Err(ScriptError::Evaluation(_))
        ));
    }
}
