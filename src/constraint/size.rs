//! Bounded size with required presence

use crate::descriptor::NotNullSize;
use crate::outcome::{type_name, ConstraintFault, EvaluationResult};
use serde_json::Value;

const CONSTRAINT: &str = "not-null-size";

/// Null is invalid; otherwise the size must lie within `min..=max`
pub fn evaluate(min: usize, max: usize, value: &Value) -> EvaluationResult {
    if min > max {
        return ConstraintFault::InvertedBounds { min, max }.into();
    }

    match size_of(value) {
        Ok(None) => EvaluationResult::Invalid,
        Ok(Some(size)) => EvaluationResult::from_bool((min..=max).contains(&size)),
        Err(fault) => fault.into(),
    }
}

pub fn evaluate_descriptor(descriptor: &NotNullSize, value: &Value) -> EvaluationResult {
    evaluate(descriptor.min, descriptor.max, value)
}

/// Characters of a string, elements of an array, entries of an object
fn size_of(value: &Value) -> Result<Option<usize>, ConstraintFault> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.chars().count())),
        Value::Array(items) => Ok(Some(items.len())),
        Value::Object(entries) => Ok(Some(entries.len())),
        other => Err(ConstraintFault::UnsupportedType {
            constraint: CONSTRAINT,
            found: type_name(other).to_string(),
        }),
    }
}
