//! Rule condition language
//!
//! A compact language for constraint manifests:
//!
//! ```text
//! bean.status == 'active' && !isEmpty(bean.owner)
//! bean.email =~ /@example\.com$/i || size(bean.tags) >= 2
//! ```

use super::{ScriptEngine, ScriptError};
use crate::bindings::{lookup_path, Bindings};
use regex::RegexBuilder;
use serde_json::Value;
use std::cmp::Ordering;

/// Engine registered as `condition`
#[derive(Debug, Default)]
pub struct ConditionEngine;

impl ConditionEngine {
    pub const NAME: &'static str = "condition";

    pub fn new() -> Self {
        Self
    }
}

impl ScriptEngine for ConditionEngine {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Rule conditions (paths, comparisons, =~ regex, isEmpty/exists/size)"
    }

    fn evaluate(&self, expression: &str, bindings: &Bindings) -> Result<Value, ScriptError> {
        if expression.trim().is_empty() {
            return Err(ScriptError::Syntax("empty condition".to_string()));
        }
        evaluate_condition(expression, bindings).map(Value::Bool)
    }
}

const COMPARISONS: [(&str, Comparison); 7] = [
    ("=~", Comparison::Matches),
    ("==", Comparison::Eq),
    ("!=", Comparison::NotEq),
    ("<=", Comparison::LtEq),
    (">=", Comparison::GtEq),
    ("<", Comparison::Lt),
    (">", Comparison::Gt),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Matches,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

/// Deepest nesting of sub-conditions and function calls accepted
const MAX_DEPTH: usize = 100;

fn evaluate_condition(condition: &str, bindings: &Bindings) -> Result<bool, ScriptError> {
    evaluate_nested(condition, bindings, 0)
}

fn too_deep() -> ScriptError {
    ScriptError::Syntax(format!("condition nested deeper than {} levels", MAX_DEPTH))
}

fn evaluate_nested(
    condition: &str,
    bindings: &Bindings,
    depth: usize,
) -> Result<bool, ScriptError> {
    if depth > MAX_DEPTH {
        return Err(too_deep());
    }
    let nested = |sub: &str| evaluate_nested(sub, bindings, depth + 1);

    let condition = condition.trim();
    if condition.is_empty() {
        return Err(ScriptError::Syntax("missing operand".to_string()));
    }

    if let Some(idx) = find_operator(condition, "||") {
        return Ok(nested(&condition[..idx])? || nested(&condition[idx + 2..])?);
    }

    if let Some(idx) = find_operator(condition, "&&") {
        return Ok(nested(&condition[..idx])? && nested(&condition[idx + 2..])?);
    }

    if let Some(rest) = condition.strip_prefix('!') {
        if !rest.starts_with('=') {
            return Ok(!nested(rest)?);
        }
    }

    if condition.starts_with('(') && closing_paren(condition) == Some(condition.len() - 1) {
        return nested(&condition[1..condition.len() - 1]);
    }

    for (op, comparison) in COMPARISONS {
        if let Some(idx) = find_operator(condition, op) {
            let left = condition[..idx].trim();
            let right = condition[idx + op.len()..].trim();
            return compare(left, comparison, right, bindings, depth);
        }
    }

    if let Some(arg) = function_arg(condition, "isEmpty") {
        return Ok(match resolve_operand(arg, bindings, depth)? {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            _ => false,
        });
    }

    if let Some(arg) = function_arg(condition, "exists") {
        return Ok(!resolve_operand(arg, bindings, depth)?.is_null());
    }

    // Simple truthiness
    Ok(match resolve_operand(condition, bindings, depth)? {
        Value::Null | Value::Bool(false) => false,
        _ => true,
    })
}

fn compare(
    left: &str,
    comparison: Comparison,
    right: &str,
    bindings: &Bindings,
    depth: usize,
) -> Result<bool, ScriptError> {
    let lhs = resolve_operand(left, bindings, depth)?;

    if comparison == Comparison::Matches {
        let (pattern, flags) = parse_regex_literal(right)?;
        let re = RegexBuilder::new(pattern)
            .case_insensitive(flags.contains('i'))
            .build()
            .map_err(|e| ScriptError::Syntax(format!("invalid regex /{}/: {}", pattern, e)))?;
        return Ok(match lhs {
            Value::String(s) => re.is_match(&s),
            Value::Null => false,
            other => re.is_match(&other.to_string()),
        });
    }

    let rhs = resolve_operand(right, bindings, depth)?;

    match comparison {
        Comparison::Eq => Ok(loose_eq(&lhs, &rhs)),
        Comparison::NotEq => Ok(!loose_eq(&lhs, &rhs)),
        _ => {
            let ordering = match (&lhs, &rhs) {
                (Value::Null, _) | (_, Value::Null) => return Ok(false),
                (Value::Number(a), Value::Number(b)) => {
                    match (a.as_f64(), b.as_f64()) {
                        (Some(a), Some(b)) => a.partial_cmp(&b),
                        _ => None,
                    }
                }
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => {
                    return Err(ScriptError::Evaluation(format!(
                        "cannot order {} and {}",
                        left, right
                    )))
                }
            };
            Ok(match (ordering, comparison) {
                (Some(o), Comparison::Lt) => o == Ordering::Less,
                (Some(o), Comparison::Gt) => o == Ordering::Greater,
                (Some(o), Comparison::LtEq) => o != Ordering::Greater,
                (Some(o), Comparison::GtEq) => o != Ordering::Less,
                _ => false,
            })
        }
    }
}

fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
            s.trim().parse::<f64>().ok() == n.as_f64()
        }
        _ => lhs == rhs,
    }
}

/// Resolve a literal, a function call or a binding path to a value
fn resolve_operand(
    operand: &str,
    bindings: &Bindings,
    depth: usize,
) -> Result<Value, ScriptError> {
    if depth > MAX_DEPTH {
        return Err(too_deep());
    }
    let operand = operand.trim();

    if operand.is_empty() {
        return Err(ScriptError::Syntax("missing operand".to_string()));
    }

    if let Some(literal) = parse_literal(operand) {
        return Ok(literal);
    }

    if let Some(arg) = function_arg(operand, "size") {
        let size = match resolve_operand(arg, bindings, depth + 1)? {
            Value::String(s) => s.chars().count(),
            Value::Array(items) => items.len(),
            Value::Object(map) => map.len(),
            Value::Null => 0,
            other => {
                return Err(ScriptError::Evaluation(format!(
                    "size() is not defined for {}",
                    other
                )))
            }
        };
        return Ok(Value::from(size));
    }

    let (root, path) = match operand.split_once('.') {
        Some((root, path)) => (root, path),
        None => (operand, ""),
    };

    if root.is_empty()
        || !operand
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '.')
    {
        return Err(ScriptError::Syntax(format!("unexpected token '{}'", operand)));
    }

    let value = bindings
        .get(root)
        .ok_or_else(|| ScriptError::Evaluation(bindings.unbound(root)))?;
    Ok(lookup_path(value, path).cloned().unwrap_or(Value::Null))
}

fn parse_literal(s: &str) -> Option<Value> {
    match s {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        "null" => return Some(Value::Null),
        _ => {}
    }

    for quote in ['\'', '"'] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return Some(Value::String(s[1..s.len() - 1].to_string()));
        }
    }

    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    s.parse::<f64>().ok().filter(|f| f.is_finite()).map(Value::from)
}

/// `/pattern/flags` or a bare pattern
fn parse_regex_literal(s: &str) -> Result<(&str, &str), ScriptError> {
    if let Some(body) = s.strip_prefix('/') {
        let end = body
            .rfind('/')
            .ok_or_else(|| ScriptError::Syntax(format!("unterminated regex {}", s)))?;
        return Ok((&body[..end], &body[end + 1..]));
    }
    Ok((s.trim_matches('"').trim_matches('\''), ""))
}

fn function_arg<'a>(condition: &'a str, name: &str) -> Option<&'a str> {
    condition
        .strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

/// Index of the parenthesis closing the one at position 0
fn closing_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Find an operator outside parentheses, quotes and regex literals
fn find_operator(s: &str, op: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut in_regex = false;
    let mut prev: Option<char> = None;

    for (i, c) in s.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            prev = Some(c);
            continue;
        }
        if in_regex {
            if c == '/' && prev != Some('\\') {
                in_regex = false;
            }
            prev = Some(c);
            continue;
        }

        match c {
            '\'' | '"' => quote = Some(c),
            '(' => depth += 1,
            ')' => depth -= 1,
            '/' if s[..i].trim_end().ends_with("=~") => in_regex = true,
            _ => {}
        }

        if depth == 0 && quote.is_none() && !in_regex && s[i..].starts_with(op) {
            // `<` must not match the first half of `<=`, `!` of `!=`
            let single = op.len() == 1;
            let next = s[i + op.len()..].chars().next();
            if !(single && next == Some('=')) {
                return Some(i);
            }
        }
        prev = Some(c);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(condition: &str, bean: Value) -> Result<bool, ScriptError> {
        evaluate_condition(condition, &Bindings::single("bean", bean))
    }

    #[test]
    fn test_comparisons() {
        let bean = json!({"status": "active", "age": 30, "score": 4.5});
        assert_eq!(eval("bean.status == 'active'", bean.clone()), Ok(true));
        assert_eq!(eval("bean.status != \"active\"", bean.clone()), Ok(false));
        assert_eq!(eval("bean.age >= 18", bean.clone()), Ok(true));
        assert_eq!(eval("bean.age < 18", bean.clone()), Ok(false));
        assert_eq!(eval("bean.score <= bean.age", bean.clone()), Ok(true));
        assert_eq!(eval("bean.age == '30'", bean), Ok(true));
    }

    #[test]
    fn test_logical_operators() {
        let bean = json!({"a": true, "b": false, "n": 2});
        assert_eq!(eval("bean.a && !bean.b", bean.clone()), Ok(true));
        assert_eq!(eval("bean.b || (bean.n > 1 && bean.a)", bean.clone()), Ok(true));
        assert_eq!(eval("(bean.b || bean.b) && bean.a", bean.clone()), Ok(false));
        assert_eq!(eval("!(bean.n > 1)", bean), Ok(false));
    }

    #[test]
    fn test_regex_match() {
        let bean = json!({"email": "Alice@Example.com"});
        assert_eq!(eval("bean.email =~ /@example\\.com$/i", bean.clone()), Ok(true));
        assert_eq!(eval("bean.email =~ /@example\\.com$/", bean.clone()), Ok(false));
        assert_eq!(eval("bean.email =~ /a||b/", bean.clone()), Ok(true));
        assert!(matches!(
            eval("bean.email =~ /[unclosed/", bean),
            Err(ScriptError::Syntax(_))
        ));
    }

    #[test]
    fn test_functions() {
        let bean = json!({"tags": ["x", "y"], "owner": "", "nested": {"k": 1}});
        assert_eq!(eval("size(bean.tags) == 2", bean.clone()), Ok(true));
        assert_eq!(eval("isEmpty(bean.owner)", bean.clone()), Ok(true));
        assert_eq!(eval("isEmpty(bean.missing)", bean.clone()), Ok(true));
        assert_eq!(eval("exists(bean.nested.k)", bean.clone()), Ok(true));
        assert_eq!(eval("exists(bean.nested.z)", bean), Ok(false));
    }

    #[test]
    fn test_truthiness() {
        let bean = json!({"flag": false, "name": "x"});
        assert_eq!(eval("bean.flag", bean.clone()), Ok(false));
        assert_eq!(eval("bean.name", bean.clone()), Ok(true));
        assert_eq!(eval("bean.missing", bean), Ok(false));
    }

    #[test]
    fn test_errors() {
        let bean = json!({"a": [1], "b": {"c": 1}});
        assert!(matches!(eval("other.a", bean.clone()), Err(ScriptError::Evaluation(_))));
        assert!(matches!(eval("bean.a < bean.b", bean.clone()), Err(ScriptError::Evaluation(_))));
        assert!(matches!(eval("bean.a ==", bean.clone()), Err(ScriptError::Syntax(_))));
        assert!(matches!(eval("bean.a +- 2", bean), Err(ScriptError::Syntax(_))));
    }

    #[test]
    fn test_nesting_limit() {
        let bean = json!({"a": true});
        assert_eq!(eval(&format!("{}bean.a", "!".repeat(20)), bean.clone()), Ok(true));
        assert_eq!(
            eval(&format!("{}bean.a{}", "(".repeat(20), ")".repeat(20)), bean.clone()),
            Ok(true)
        );

        let too_deep = |result: Result<bool, ScriptError>| {
            matches!(result, Err(ScriptError::Syntax(message)) if message.contains("nested deeper"))
        };
        assert!(too_deep(eval(&format!("{}bean.a", "!".repeat(200_000)), bean.clone())));
        assert!(too_deep(eval(
            &format!("{}bean.a{}", "(".repeat(2000), ")".repeat(2000)),
            bean.clone()
        )));
        assert!(too_deep(eval(&vec!["bean.a"; 500].join(" && "), bean.clone())));
        assert!(too_deep(eval(
            &format!("{}bean.a{} > 0", "size(".repeat(500), ")".repeat(500)),
            bean
        )));
    }

    #[test]
    fn test_find_operator() {
        assert_eq!(find_operator("a && b", "&&"), Some(2));
        assert_eq!(find_operator("(a || b) && c", "&&"), Some(9));
        assert_eq!(find_operator("(a || b)", "||"), None);
        assert_eq!(find_operator("a == '&&'", "&&"), None);
        assert_eq!(find_operator("a <= 1", "<"), None);
        assert_eq!(find_operator("a <= 1", "<="), Some(2));
    }

    #[test]
    fn test_engine_non_empty() {
        let engine = ConditionEngine::new();
        assert_eq!(engine.name(), "condition");
        assert!(matches!(
            engine.evaluate("  ", &Bindings::new()),
            Err(ScriptError::Syntax(_))
        ));
        assert_eq!(
            engine.evaluate("bean.x == 1", &Bindings::single("bean", json!({"x": 1}))),
            Ok(json!(true))
        );
    }
}
