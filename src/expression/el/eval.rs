//! Expression evaluation.

use super::parser::{BinaryOp, Expr, UnaryOp};
use super::ElError;
use crate::bindings::Bindings;
use crate::outcome::type_name;
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Stateless evaluator over a binding set
pub struct Evaluator<'b> {
    bindings: &'b Bindings,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

impl<'b> Evaluator<'b> {
    pub fn new(bindings: &'b Bindings) -> Self {
        Self { bindings }
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value, ElError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ident(name) => self
                .bindings
                .get(name)
                .cloned()
                .ok_or_else(|| ElError::Evaluation(self.bindings.unbound(name))),
            Expr::Property(base, name) => {
                let base = self.eval(base)?;
                read_property(&base, &Value::String(name.clone()))
            }
            Expr::Index(base, index) => {
                let base = self.eval(base)?;
                let index = self.eval(index)?;
                read_property(&base, &index)
            }
            Expr::Unary(op, operand) => self.eval_unary(*op, operand),
            Expr::Binary(op, left, right) => self.eval_binary(*op, left, right),
            Expr::Conditional(condition, then, otherwise) => {
                if to_bool(&self.eval(condition)?)? {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
        }
    }

    fn eval_unary(&self, op: UnaryOp, operand: &Expr) -> Result<Value, ElError> {
        let value = self.eval(operand)?;
        match op {
            UnaryOp::Not => Ok(Value::Bool(!to_bool(&value)?)),
            UnaryOp::Empty => Ok(Value::Bool(is_empty(&value))),
            UnaryOp::Neg => match to_num(&value)? {
                Num::Int(i) => i
                    .checked_neg()
                    .map(Value::from)
                    .ok_or_else(|| ElError::Evaluation("integer overflow".to_string())),
                Num::Float(f) => from_f64(-f),
            },
        }
    }

    fn eval_binary(&self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Value, ElError> {
        // Logical operators short-circuit
        match op {
            BinaryOp::And => {
                let result = to_bool(&self.eval(left)?)? && to_bool(&self.eval(right)?)?;
                return Ok(Value::Bool(result));
            }
            BinaryOp::Or => {
                let result = to_bool(&self.eval(left)?)? || to_bool(&self.eval(right)?)?;
                return Ok(Value::Bool(result));
            }
            _ => {}
        }

        let lhs = self.eval(left)?;
        let rhs = self.eval(right)?;

        match op {
            BinaryOp::Eq => Ok(Value::Bool(equals(&lhs, &rhs)?)),
            BinaryOp::NotEq => Ok(Value::Bool(!equals(&lhs, &rhs)?)),
            BinaryOp::Lt => compare(&lhs, &rhs, Ordering::is_lt),
            BinaryOp::Gt => compare(&lhs, &rhs, Ordering::is_gt),
            BinaryOp::LtEq => compare(&lhs, &rhs, Ordering::is_le),
            BinaryOp::GtEq => compare(&lhs, &rhs, Ordering::is_ge),
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                arithmetic(op, &lhs, &rhs)
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }
}

fn read_property(base: &Value, key: &Value) -> Result<Value, ElError> {
    match base {
        Value::Null => Ok(Value::Null),
        Value::Object(map) => {
            let key = match key {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => return Ok(Value::Null),
                other => {
                    return Err(ElError::Evaluation(format!(
                        "cannot use {} as a property name",
                        type_name(other)
                    )))
                }
            };
            Ok(map.get(&key).cloned().unwrap_or(Value::Null))
        }
        Value::Array(items) => {
            if key.is_null() {
                return Ok(Value::Null);
            }
            let index = match to_num(key)? {
                Num::Int(i) => i,
                Num::Float(_) => {
                    return Err(ElError::Evaluation(
                        "array index must be an integer".to_string(),
                    ))
                }
            };
            Ok(usize::try_from(index)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .unwrap_or(Value::Null))
        }
        other => Err(ElError::Evaluation(format!(
            "cannot read property {} of {}",
            key,
            type_name(other)
        ))),
    }
}

fn to_bool(value: &Value) -> Result<bool, ElError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        // only "true", in any case, reads as true
        Value::String(s) => Ok(s.eq_ignore_ascii_case("true")),
        other => Err(ElError::Evaluation(format!(
            "cannot coerce {} to boolean",
            type_name(other)
        ))),
    }
}

fn to_num(value: &Value) -> Result<Num, ElError> {
    match value {
        Value::Null => Ok(Num::Int(0)),
        Value::Number(n) => number_to_num(n),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(Num::Int(0));
            }
            if let Ok(i) = s.parse::<i64>() {
                return Ok(Num::Int(i));
            }
            s.parse::<f64>()
                .map(Num::Float)
                .map_err(|_| ElError::Evaluation(format!("cannot coerce '{}' to a number", s)))
        }
        other => Err(ElError::Evaluation(format!(
            "cannot coerce {} to a number",
            type_name(other)
        ))),
    }
}

fn number_to_num(n: &Number) -> Result<Num, ElError> {
    if let Some(i) = n.as_i64() {
        Ok(Num::Int(i))
    } else if let Some(f) = n.as_f64() {
        Ok(Num::Float(f))
    } else {
        Err(ElError::Evaluation(format!("number {} is out of range", n)))
    }
}

fn from_f64(f: f64) -> Result<Value, ElError> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| ElError::Evaluation("arithmetic result is not a finite number".to_string()))
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn equals(lhs: &Value, rhs: &Value) -> Result<bool, ElError> {
    match (lhs, rhs) {
        (Value::Null, Value::Null) => Ok(true),
        (Value::Null, _) | (_, Value::Null) => Ok(false),
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            let (a, b) = (to_num(lhs)?, to_num(rhs)?);
            Ok(match (a, b) {
                (Num::Int(x), Num::Int(y)) => x == y,
                _ => a.as_f64() == b.as_f64(),
            })
        }
        (Value::Bool(_), _) | (_, Value::Bool(_)) => Ok(to_bool(lhs)? == to_bool(rhs)?),
        _ => Ok(lhs == rhs),
    }
}

fn compare(lhs: &Value, rhs: &Value, accept: fn(Ordering) -> bool) -> Result<Value, ElError> {
    let ordering = match (lhs, rhs) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) | (_, Value::Null) => return Ok(Value::Bool(false)),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            match (to_num(lhs)?, to_num(rhs)?) {
                (Num::Int(x), Num::Int(y)) => x.cmp(&y),
                (a, b) => match a.as_f64().partial_cmp(&b.as_f64()) {
                    Some(ordering) => ordering,
                    None => return Ok(Value::Bool(false)),
                },
            }
        }
        _ => {
            return Err(ElError::Evaluation(format!(
                "cannot compare {} with {}",
                type_name(lhs),
                type_name(rhs)
            )))
        }
    };
    Ok(Value::Bool(accept(ordering)))
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, ElError> {
    let (a, b) = (to_num(lhs)?, to_num(rhs)?);

    if let (Num::Int(x), Num::Int(y)) = (a, b) {
        let exact = match op {
            BinaryOp::Add => x.checked_add(y),
            BinaryOp::Sub => x.checked_sub(y),
            BinaryOp::Mul => x.checked_mul(y),
            BinaryOp::Mod if y == 0 => {
                return Err(ElError::Evaluation("division by zero".to_string()))
            }
            BinaryOp::Mod => x.checked_rem(y),
            _ => None,
        };
        if let Some(result) = exact {
            return Ok(Value::from(result));
        }
    }

    let (x, y) = (a.as_f64(), b.as_f64());
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div | BinaryOp::Mod if y == 0.0 => {
            return Err(ElError::Evaluation("division by zero".to_string()))
        }
        BinaryOp::Div => x / y,
        BinaryOp::Mod => x % y,
        _ => unreachable!("not an arithmetic operator"),
    };
    from_f64(result)
}
