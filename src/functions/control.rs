use super::{FunctionContext, arg};
use crate::evaluator::EvalError;
use crate::value::Value;

/// COALESCE(a, b, ...) - first non-empty argument
pub(super) fn coalesce(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    Ok(args
        .iter()
        .find(|v| !v.is_empty())
        .cloned()
        .unwrap_or(Value::Null))
}

pub(super) fn blank(_: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    Ok(Value::Null)
}

/// ERROR(message) - always fails
pub(super) fn error(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    let message = match arg(args, 0) {
        Value::Null => "ERROR() called".to_string(),
        v => v.to_text(),
    };
    Err(EvalError::Function(message))
}

/// RECORD_ID(record?) - id of the argument, else of the current record
pub(super) fn record_id(args: &[Value], ctx: &FunctionContext) -> Result<Value, EvalError> {
    let id = match arg(args, 0) {
        Value::Record(record) => record.id.clone(),
        Value::Object(obj) => obj.get("id").map(Value::to_text),
        _ => ctx.record.and_then(|r| r.id.clone()),
    };
    Ok(id.map(Value::String).unwrap_or(Value::Null))
}
