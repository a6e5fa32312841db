use super::{FunctionContext, arg, flatten, int_arg};
use crate::evaluator::EvalError;
use crate::value::Value;

/// CONCATENATE(a, b, ...) - joins every argument's text, arrays included
pub(super) fn concatenate(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    let joined: String = flatten(args).into_iter().map(Value::to_text).collect();
    Ok(Value::String(joined))
}

fn count_arg(args: &[Value], function: &str) -> Result<usize, EvalError> {
    let n = int_arg(args, 1, 1, function)?;
    usize::try_from(n).map_err(|_| {
        EvalError::InvalidArgument(format!("{}() count must not be negative", function))
    })
}

/// LEFT(text, count=1)
pub(super) fn left(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    let n = count_arg(args, "LEFT")?;
    Ok(Value::String(arg(args, 0).to_text().chars().take(n).collect()))
}

/// RIGHT(text, count=1)
pub(super) fn right(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    let n = count_arg(args, "RIGHT")?;
    let chars: Vec<char> = arg(args, 0).to_text().chars().collect();
    let start = chars.len().saturating_sub(n);
    Ok(Value::String(chars[start..].iter().collect()))
}

/// MID(text, start, count) - `start` is 1-based
pub(super) fn mid(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    let start = int_arg(args, 1, 1, "MID")?.max(1) as usize;
    let count = int_arg(args, 2, i64::MAX, "MID")?;
    let count = usize::try_from(count).map_err(|_| {
        EvalError::InvalidArgument("MID() count must not be negative".to_string())
    })?;
    Ok(Value::String(
        arg(args, 0).to_text().chars().skip(start - 1).take(count).collect(),
    ))
}

/// LEN(text) - character count; arrays report their length
pub(super) fn len(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    let n = match arg(args, 0) {
        Value::Array(items) => items.len(),
        other => other.to_text().chars().count(),
    };
    Ok(Value::Integer(n as i64))
}

pub(super) fn lower(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    Ok(Value::String(arg(args, 0).to_text().to_lowercase()))
}

pub(super) fn upper(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    Ok(Value::String(arg(args, 0).to_text().to_uppercase()))
}

pub(super) fn trim(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    Ok(Value::String(arg(args, 0).to_text().trim().to_string()))
}
