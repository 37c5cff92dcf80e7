//! Class-level expression constraints

use crate::bindings::Bindings;
use crate::descriptor::ExpressionForClass;
use crate::expression::ExpressionResolver;
use crate::outcome::{ConstraintFault, EvaluationResult};
use log::trace;
use serde_json::Value;

/// Evaluate a boolean expression with the bean bound under its alias.
///
/// A null bean is valid; presence is left to other constraints.
pub fn evaluate(
    resolver: &ExpressionResolver,
    descriptor: &ExpressionForClass,
    bean: &Value,
) -> EvaluationResult {
    if bean.is_null() {
        return EvaluationResult::Valid;
    }
    check(resolver, descriptor, bean).into()
}

fn check(
    resolver: &ExpressionResolver,
    descriptor: &ExpressionForClass,
    bean: &Value,
) -> Result<bool, ConstraintFault> {
    if descriptor.bean_alias.trim().is_empty() {
        return Err(ConstraintFault::EmptyBeanAlias);
    }

    let handle = resolver.resolve(&descriptor.language)?;
    let bindings = Bindings::single(&descriptor.bean_alias, bean.clone());

    trace!(
        "Evaluating `{}` in {} as '{}'",
        descriptor.expression,
        handle.language(),
        descriptor.bean_alias
    );
    handle.evaluate(&descriptor.expression, &bindings)
}
