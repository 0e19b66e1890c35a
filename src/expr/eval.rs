//! Evaluator for the filter expression AST.
//!
//! Evaluating against a record does not allocate new records:
//! intermediate results are `EvalValue`s (either a `Value` or the absent
//! marker), not re-serialized records.

use std::cmp::Ordering;

use super::ast::{BinOp, Expr, UnaryOp};
use crate::path::{get_path_in_record, Path};
use crate::value::{Record, Value};

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum EvalError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("unknown function {0:?}")]
    UnknownFunction(String),
    #[error("{func} expects {expected} argument(s), got {got}")]
    Arity { func: String, expected: &'static str, got: usize },
    #[error("type mismatch evaluating {op}: {detail}")]
    TypeMismatch { op: String, detail: String },
    #[error("path {path} is required but absent")]
    RequiredAbsent { path: String },
}

/// A value flowing through expression evaluation: present, or the
/// distinguished absent marker.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    Present(Value),
    Absent,
}

impl EvalValue {
    fn is_truthy(&self) -> bool {
        match self {
            Self::Present(v) => v.is_truthy(),
            Self::Absent => false,
        }
    }

    const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Present(v) => Some(v),
            Self::Absent => None,
        }
    }
}

/// Evaluate a compiled expression against a record. Strict-mode callers
/// (`select` with no `--lenient`) propagate `EvalError` as pipeline-fatal;
/// lenient callers drop the row and count it.
pub fn eval(expr: &Expr, record: &Record) -> Result<EvalValue, EvalError> {
    match expr {
        Expr::Null => Ok(EvalValue::Present(Value::Null)),
        Expr::Bool(b) => Ok(EvalValue::Present(Value::Bool(*b))),
        Expr::Int(n) => Ok(EvalValue::Present(Value::Int(*n))),
        Expr::Float(f) => Ok(EvalValue::Present(Value::Float(*f))),
        Expr::Str(s) => Ok(EvalValue::Present(Value::String(s.clone()))),
        Expr::Path(path) => Ok(resolve(path, record)),
        Expr::Unary(op, inner) => eval_unary(*op, eval(inner, record)?),
        Expr::Binary(op, lhs, rhs) => eval_binary(*op, lhs, rhs, record),
        Expr::Call(name, args) => eval_call(name, args, record),
    }
}

fn resolve(path: &Path, record: &Record) -> EvalValue {
    match get_path_in_record(record, path).value() {
        Some(v) => EvalValue::Present(v.clone()),
        None => EvalValue::Absent,
    }
}

fn eval_unary(op: UnaryOp, value: EvalValue) -> Result<EvalValue, EvalError> {
    match op {
        UnaryOp::Not => Ok(EvalValue::Present(Value::Bool(!value.is_truthy()))),
        UnaryOp::Neg => match value.as_value() {
            Some(Value::Int(n)) => Ok(EvalValue::Present(Value::Int(-n))),
            Some(Value::Float(f)) => Ok(EvalValue::Present(Value::Float(-f))),
            other => Err(EvalError::TypeMismatch {
                op: "unary -".to_string(),
                detail: format!("expected number, got {other:?}"),
            }),
        },
    }
}

fn eval_binary(op: BinOp, lhs: &Expr, rhs: &Expr, record: &Record) -> Result<EvalValue, EvalError> {
    // `and`/`or` short-circuit.
    match op {
        BinOp::And => {
            let l = eval(lhs, record)?;
            if !l.is_truthy() {
                return Ok(EvalValue::Present(Value::Bool(false)));
            }
            let r = eval(rhs, record)?;
            return Ok(EvalValue::Present(Value::Bool(r.is_truthy())));
        }
        BinOp::Or => {
            let l = eval(lhs, record)?;
            if l.is_truthy() {
                return Ok(EvalValue::Present(Value::Bool(true)));
            }
            let r = eval(rhs, record)?;
            return Ok(EvalValue::Present(Value::Bool(r.is_truthy())));
        }
        _ => {}
    }

    let l = eval(lhs, record)?;
    let r = eval(rhs, record)?;

    match op {
        BinOp::Eq => Ok(EvalValue::Present(Value::Bool(compare_eq(&l, &r)))),
        BinOp::Ne => Ok(EvalValue::Present(Value::Bool(!compare_eq(&l, &r)))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => eval_ordering(op, &l, &r),
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => eval_arith(op, &l, &r),
        BinOp::And | BinOp::Or => unreachable!("handled above"),
    }
}

/// `absent == null` is true; any other comparison with absent is false.
fn compare_eq(l: &EvalValue, r: &EvalValue) -> bool {
    match (l, r) {
        (EvalValue::Absent, EvalValue::Absent) => true,
        (EvalValue::Absent, EvalValue::Present(v)) | (EvalValue::Present(v), EvalValue::Absent) => v.is_null(),
        (EvalValue::Present(a), EvalValue::Present(b)) => a.value_eq(b),
    }
}

fn eval_ordering(op: BinOp, l: &EvalValue, r: &EvalValue) -> Result<EvalValue, EvalError> {
    let (Some(a), Some(b)) = (l.as_value(), r.as_value()) else {
        // Per spec: any comparison with absent other than equality is false.
        return Ok(EvalValue::Present(Value::Bool(false)));
    };
    let ord = a.value_cmp(b);
    let result = match op {
        BinOp::Lt => ord == Ordering::Less,
        BinOp::Le => ord != Ordering::Greater,
        BinOp::Gt => ord == Ordering::Greater,
        BinOp::Ge => ord != Ordering::Less,
        _ => unreachable!(),
    };
    Ok(EvalValue::Present(Value::Bool(result)))
}

fn eval_arith(op: BinOp, l: &EvalValue, r: &EvalValue) -> Result<EvalValue, EvalError> {
    let a = numeric(l, &op)?;
    let b = numeric(r, &op)?;
    if matches!(op, BinOp::Div | BinOp::Mod) && b == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    // Integer arithmetic stays integer unless either operand was a float.
    if let (Some(Value::Int(x)), Some(Value::Int(y))) = (l.as_value(), r.as_value()) {
        let result = match op {
            BinOp::Add => x.checked_add(*y).map(Value::Int),
            BinOp::Sub => x.checked_sub(*y).map(Value::Int),
            BinOp::Mul => x.checked_mul(*y).map(Value::Int),
            BinOp::Div => Some(Value::Float(a / b)),
            BinOp::Mod => Some(Value::Int(x % y)),
            _ => None,
        };
        if let Some(v) = result {
            return Ok(EvalValue::Present(v));
        }
    }
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        BinOp::Mod => a % b,
        _ => unreachable!(),
    };
    Ok(EvalValue::Present(Value::Float(result)))
}

fn numeric(v: &EvalValue, op: &BinOp) -> Result<f64, EvalError> {
    v.as_value().and_then(Value::as_f64).ok_or_else(|| EvalError::TypeMismatch {
        op: format!("{op:?}"),
        detail: "expected a number".to_string(),
    })
}

fn eval_call(name: &str, args: &[Expr], record: &Record) -> Result<EvalValue, EvalError> {
    let values: Vec<EvalValue> = args.iter().map(|a| eval(a, record)).collect::<Result<_, _>>()?;

    match name {
        "lower" => string_fn(name, &values, str::to_lowercase),
        "upper" => string_fn(name, &values, str::to_uppercase),
        "length" => {
            require_arity(name, &values, 1)?;
            let len = match values[0].as_value() {
                Some(Value::String(s)) => s.chars().count(),
                Some(Value::Array(items)) => items.len(),
                Some(Value::Object(map)) => map.len(),
                None => 0,
                other => {
                    return Err(EvalError::TypeMismatch {
                        op: name.to_string(),
                        detail: format!("expected string/array/object, got {other:?}"),
                    })
                }
            };
            Ok(EvalValue::Present(Value::Int(i64::try_from(len).unwrap_or(i64::MAX))))
        }
        "startswith" => binary_str_pred(name, &values, str::starts_with),
        "endswith" => binary_str_pred(name, &values, str::ends_with),
        "contains" => binary_str_pred(name, &values, str::contains),
        "coalesce" => {
            for v in &values {
                if let EvalValue::Present(inner) = v {
                    if !inner.is_null() {
                        return Ok(EvalValue::Present(inner.clone()));
                    }
                }
            }
            Ok(EvalValue::Present(Value::Null))
        }
        "abs" => {
            require_arity(name, &values, 1)?;
            match values[0].as_value() {
                Some(Value::Int(n)) => Ok(EvalValue::Present(Value::Int(n.abs()))),
                Some(Value::Float(f)) => Ok(EvalValue::Present(Value::Float(f.abs()))),
                other => Err(EvalError::TypeMismatch { op: name.to_string(), detail: format!("expected number, got {other:?}") }),
            }
        }
        "round" => {
            require_arity(name, &values, 1)?;
            match values[0].as_value() {
                Some(Value::Int(n)) => Ok(EvalValue::Present(Value::Int(*n))),
                Some(Value::Float(f)) => Ok(EvalValue::Present(Value::Int(f.round() as i64))),
                other => Err(EvalError::TypeMismatch { op: name.to_string(), detail: format!("expected number, got {other:?}") }),
            }
        }
        other => Err(EvalError::UnknownFunction(other.to_string())),
    }
}

fn require_arity(func: &str, values: &[EvalValue], expected: usize) -> Result<(), EvalError> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(EvalError::Arity {
            func: func.to_string(),
            expected: if expected == 1 { "1" } else { "2" },
            got: values.len(),
        })
    }
}

fn string_fn(name: &str, values: &[EvalValue], f: fn(&str) -> String) -> Result<EvalValue, EvalError> {
    require_arity(name, values, 1)?;
    match values[0].as_value() {
        Some(Value::String(s)) => Ok(EvalValue::Present(Value::String(f(s)))),
        other => Err(EvalError::TypeMismatch { op: name.to_string(), detail: format!("expected string, got {other:?}") }),
    }
}

fn binary_str_pred(name: &str, values: &[EvalValue], f: fn(&str, &str) -> bool) -> Result<EvalValue, EvalError> {
    require_arity(name, values, 2)?;
    match (values[0].as_value(), values[1].as_value()) {
        (Some(Value::String(a)), Some(Value::String(b))) => Ok(EvalValue::Present(Value::Bool(f(a, b)))),
        _ => Err(EvalError::TypeMismatch { op: name.to_string(), detail: "expected two strings".to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::parse;

    fn record(pairs: Vec<(&str, Value)>) -> Record {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn eval_str(src: &str, record: &Record) -> EvalValue {
        eval(&parse(src).unwrap(), record).unwrap()
    }

    #[test]
    fn comparison_filters_records() {
        let r = record(vec![("a", Value::Int(2))]);
        assert_eq!(eval_str("a > 1", &r), EvalValue::Present(Value::Bool(true)));
    }

    #[test]
    fn absent_equals_null() {
        let r = record(vec![]);
        assert_eq!(eval_str("missing == null", &r), EvalValue::Present(Value::Bool(true)));
    }

    #[test]
    fn absent_other_comparisons_false() {
        let r = record(vec![]);
        assert_eq!(eval_str("missing > 1", &r), EvalValue::Present(Value::Bool(false)));
    }

    #[test]
    fn division_by_zero_errors() {
        let r = record(vec![("x", Value::Int(0))]);
        let err = eval(&parse("10 / x").unwrap(), &r).unwrap_err();
        assert_eq!(err, EvalError::DivisionByZero);
    }

    #[test]
    fn and_short_circuits() {
        let r = record(vec![("x", Value::Int(0))]);
        // If short-circuit didn't happen, `10 / x` would error.
        assert_eq!(eval_str("false and (10 / x > 1)", &r), EvalValue::Present(Value::Bool(false)));
    }

    #[test]
    fn builtin_functions() {
        let r = record(vec![("name", Value::String("Ada".into()))]);
        assert_eq!(eval_str("lower(name)", &r), EvalValue::Present(Value::String("ada".into())));
        assert_eq!(eval_str("startswith(name, \"A\")", &r), EvalValue::Present(Value::Bool(true)));
    }

    #[test]
    fn coalesce_skips_null_and_absent() {
        let r = record(vec![("a", Value::Null)]);
        assert_eq!(eval_str("coalesce(a, missing, 5)", &r), EvalValue::Present(Value::Int(5)));
    }
}
