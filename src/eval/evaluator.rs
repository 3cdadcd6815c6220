/*!
 * Expression Evaluation
 * The seam through which PRINT, breakpoint conditions and trace displays
 * are evaluated against a stopped thread's context chain
 */

use super::parser::{parse, BinaryOp, Expr, UnaryOp};
use super::value::Value;
use crate::context::{ContextArena, ContextId};
use crate::core::errors::{EvalResult, EvaluationError};

/// Evaluates debugger expressions in a thread's context
///
/// Implementations must not block and must not call back into the
/// scheduler; they run while the calling thread holds its own contexts.
pub trait ExpressionEvaluator: Send + Sync {
    /// Validate an expression without evaluating it
    fn check_syntax(&self, text: &str) -> EvalResult<()>;

    /// Evaluate `text` with names resolved along the outer-chain of `at`
    fn evaluate(&self, text: &str, contexts: &ContextArena, at: ContextId) -> EvalResult<Value>;
}

/// Built-in evaluator for the debugger's expression language
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleEvaluator;

impl SimpleEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl ExpressionEvaluator for SimpleEvaluator {
    fn check_syntax(&self, text: &str) -> EvalResult<()> {
        parse(text).map(|_| ())
    }

    fn evaluate(&self, text: &str, contexts: &ContextArena, at: ContextId) -> EvalResult<Value> {
        if !contexts.contains(at) {
            return Err(EvaluationError::StaleContext);
        }
        let expr = parse(text)?;
        eval(&expr, contexts, at)
    }
}

fn eval(expr: &Expr, contexts: &ContextArena, at: ContextId) -> EvalResult<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => contexts
            .lookup(at, name)
            .cloned()
            .ok_or_else(|| EvaluationError::UnknownName(name.clone())),
        Expr::SeqEnum(items) => items
            .iter()
            .map(|item| eval(item, contexts, at))
            .collect::<EvalResult<Vec<_>>>()
            .map(Value::Seq),
        Expr::Apply(target, index) => {
            let target = eval(target, contexts, at)?;
            let index = eval(index, contexts, at)?;
            apply(&target, &index)
        }
        Expr::Unary(op, operand) => {
            let value = eval(operand, contexts, at)?;
            unary(*op, &value)
        }
        Expr::Binary(BinaryOp::And, lhs, rhs) => {
            if !expect_bool(&eval(lhs, contexts, at)?, "and")? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(expect_bool(&eval(rhs, contexts, at)?, "and")?))
        }
        Expr::Binary(BinaryOp::Or, lhs, rhs) => {
            if expect_bool(&eval(lhs, contexts, at)?, "or")? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(expect_bool(&eval(rhs, contexts, at)?, "or")?))
        }
        Expr::Binary(op, lhs, rhs) => {
            let lhs = eval(lhs, contexts, at)?;
            let rhs = eval(rhs, contexts, at)?;
            binary(*op, &lhs, &rhs)
        }
    }
}

fn expect_bool(value: &Value, op: &str) -> EvalResult<bool> {
    value.as_bool().ok_or_else(|| {
        EvaluationError::Type(format!("'{}' expects bool, got {}", op, value.type_name()))
    })
}

fn expect_ints(lhs: &Value, rhs: &Value, op: &str) -> EvalResult<(i64, i64)> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Ok((*a, *b)),
        _ => Err(EvaluationError::Type(format!(
            "'{}' expects int operands, got {} and {}",
            op,
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn overflow(op: &str) -> EvaluationError {
    EvaluationError::Type(format!("integer overflow in '{}'", op))
}

fn unary(op: UnaryOp, value: &Value) -> EvalResult<Value> {
    match op {
        UnaryOp::Neg => match value {
            Value::Int(i) => i.checked_neg().map(Value::Int).ok_or_else(|| overflow("-")),
            _ => Err(EvaluationError::Type(format!(
                "'-' expects int, got {}",
                value.type_name()
            ))),
        },
        UnaryOp::Not => Ok(Value::Bool(!expect_bool(value, "not")?)),
        UnaryOp::Len => match value {
            Value::Seq(items) => Ok(Value::Int(items.len() as i64)),
            Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
            _ => Err(EvaluationError::Type(format!(
                "'len' expects a sequence, got {}",
                value.type_name()
            ))),
        },
    }
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> EvalResult<Value> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
        BinaryOp::Ne => Ok(Value::Bool(lhs != rhs)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (lhs, rhs) {
                (Value::Int(a), Value::Int(b)) => a.cmp(b),
                (Value::Str(a), Value::Str(b)) => a.cmp(b),
                _ => {
                    return Err(EvaluationError::Type(format!(
                        "cannot order {} and {}",
                        lhs.type_name(),
                        rhs.type_name()
                    )))
                }
            };
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinaryOp::Add => {
            let (a, b) = expect_ints(lhs, rhs, "+")?;
            a.checked_add(b).map(Value::Int).ok_or_else(|| overflow("+"))
        }
        BinaryOp::Sub => {
            let (a, b) = expect_ints(lhs, rhs, "-")?;
            a.checked_sub(b).map(Value::Int).ok_or_else(|| overflow("-"))
        }
        BinaryOp::Mul => {
            let (a, b) = expect_ints(lhs, rhs, "*")?;
            a.checked_mul(b).map(Value::Int).ok_or_else(|| overflow("*"))
        }
        BinaryOp::Div => {
            let (a, b) = expect_ints(lhs, rhs, "div")?;
            if b == 0 {
                return Err(EvaluationError::DivideByZero);
            }
            a.checked_div(b).map(Value::Int).ok_or_else(|| overflow("div"))
        }
        BinaryOp::Mod => {
            let (a, b) = expect_ints(lhs, rhs, "mod")?;
            if b == 0 {
                return Err(EvaluationError::DivideByZero);
            }
            a.checked_rem_euclid(b).map(Value::Int).ok_or_else(|| overflow("mod"))
        }
        BinaryOp::Rem => {
            let (a, b) = expect_ints(lhs, rhs, "rem")?;
            if b == 0 {
                return Err(EvaluationError::DivideByZero);
            }
            a.checked_rem(b).map(Value::Int).ok_or_else(|| overflow("rem"))
        }
        BinaryOp::Concat => match (lhs, rhs) {
            (Value::Seq(a), Value::Seq(b)) => {
                Ok(Value::Seq(a.iter().chain(b.iter()).cloned().collect()))
            }
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
            _ => Err(EvaluationError::Type(format!(
                "'^' expects two sequences, got {} and {}",
                lhs.type_name(),
                rhs.type_name()
            ))),
        },
        BinaryOp::And | BinaryOp::Or => Err(EvaluationError::Type(
            "logical operators are evaluated lazily".to_string(),
        )),
    }
}

fn apply(target: &Value, index: &Value) -> EvalResult<Value> {
    let i = index.as_int().ok_or_else(|| {
        EvaluationError::Type(format!("index must be int, got {}", index.type_name()))
    })?;
    let out_of_range = || EvaluationError::Type(format!("index {} out of range", i));
    if i < 1 {
        return Err(out_of_range());
    }
    let pos = (i - 1) as usize;
    match target {
        Value::Seq(items) => items.get(pos).cloned().ok_or_else(out_of_range),
        Value::Str(s) => s
            .chars()
            .nth(pos)
            .map(|c| Value::Str(c.to_string()))
            .ok_or_else(out_of_range),
        _ => Err(EvaluationError::Type(format!(
            "cannot index {}",
            target.type_name()
        ))),
    }
}
