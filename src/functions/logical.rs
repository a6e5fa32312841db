use super::{FunctionContext, arg, flatten};
use crate::evaluator::EvalError;
use crate::value::Value;

/// IF(condition, then, else=null)
pub(super) fn if_fn(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    if args.len() < 2 {
        return Err(EvalError::InvalidArgument(format!(
            "IF() expects at least 2 arguments, got {}",
            args.len()
        )));
    }
    let branch = if arg(args, 0).is_truthy() { 1 } else { 2 };
    Ok(arg(args, branch).clone())
}

pub(super) fn and(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    Ok(Value::Boolean(flatten(args).into_iter().all(Value::is_truthy)))
}

pub(super) fn or(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    Ok(Value::Boolean(flatten(args).into_iter().any(Value::is_truthy)))
}

pub(super) fn not(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    Ok(Value::Boolean(!arg(args, 0).is_truthy()))
}

/// SWITCH(subject, candidate1, result1, ..., default?)
pub(super) fn switch(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    let Some((subject, rest)) = args.split_first() else {
        return Ok(Value::Null);
    };

    let mut pairs = rest.chunks_exact(2);
    for pair in pairs.by_ref() {
        if subject.loose_eq(&pair[0]) {
            return Ok(pair[1].clone());
        }
    }
    Ok(pairs.remainder().first().cloned().unwrap_or(Value::Null))
}
