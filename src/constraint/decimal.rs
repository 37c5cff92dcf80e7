//! Bounded decimal with required presence

use crate::descriptor::NotNullDecimalMin;
use crate::outcome::{type_name, ConstraintFault, EvaluationResult};
use bigdecimal::BigDecimal;
use log::debug;
use serde_json::Value;
use std::str::FromStr;

const CONSTRAINT: &str = "not-null-decimal-min";

/// Parse a decimal bound, in plain or scientific notation, at any precision
pub fn parse_bound(bound: &str) -> Result<BigDecimal, ConstraintFault> {
    parse_decimal(bound).ok_or_else(|| ConstraintFault::InvalidDecimalBound(bound.to_string()))
}

/// Parse decimal text; `None` when it is not a number
pub fn parse_decimal(text: &str) -> Option<BigDecimal> {
    let text = text.trim();
    let text = text.strip_prefix('+').unwrap_or(text);
    if text.is_empty() {
        return None;
    }

    BigDecimal::from_str(text).ok()
}

/// Null is invalid; otherwise `value >= bound` (`>` when exclusive)
pub fn evaluate(bound: &str, inclusive: bool, value: &Value) -> EvaluationResult {
    let bound = match parse_bound(bound) {
        Ok(bound) => bound,
        Err(fault) => return fault.into(),
    };

    let above = match value {
        Value::Null => return EvaluationResult::Invalid,
        // JSON numbers are compared through their text form
        Value::Number(n) => compare(&n.to_string(), &bound, inclusive),
        Value::String(s) => compare(s, &bound, inclusive),
        other => {
            return ConstraintFault::UnsupportedType {
                constraint: CONSTRAINT,
                found: type_name(other).to_string(),
            }
            .into()
        }
    };

    EvaluationResult::from_bool(above.unwrap_or(false))
}

pub fn evaluate_descriptor(descriptor: &NotNullDecimalMin, value: &Value) -> EvaluationResult {
    evaluate(&descriptor.value, descriptor.inclusive, value)
}

fn compare(text: &str, bound: &BigDecimal, inclusive: bool) -> Option<bool> {
    match parse_decimal(text) {
        Some(d) => Some(if inclusive { &d >= bound } else { &d > bound }),
        None => {
            debug!("'{}' is not a decimal number", text);
            None
        }
    }
}
