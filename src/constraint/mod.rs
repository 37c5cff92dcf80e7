//! Constraint evaluators
//!
//! Each evaluator is a plain function taking a descriptor by reference and a
//! runtime value, returning an [`EvaluationResult`](crate::EvaluationResult).
//! None of them hold state between calls.
//!
//! | Module         | Null is   | Non-null check                       |
//! |----------------|-----------|--------------------------------------|
//! | `expression`   | Valid     | boolean expression over the bean     |
//! | `size`         | Invalid   | `min <= size <= max`                 |
//! | `decimal`      | Invalid   | `value >= bound` (or `>`)            |
//! | `uri`          | Valid     | scheme/ssp/port allow-lists, parts   |

pub mod decimal;
pub mod expression;
pub mod size;
pub mod uri;
