use super::{FunctionContext, arg, flatten};
use crate::evaluator::EvalError;
use crate::value::Value;

/// ARRAYUNIQUE(arr) - first occurrence of each value, in order
pub(super) fn unique(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    let mut out: Vec<Value> = Vec::new();
    for value in flatten(args) {
        if !out.contains(value) {
            out.push(value.clone());
        }
    }
    Ok(Value::Array(out))
}

/// ARRAYCOMPACT(arr) - drops nulls and empty strings
pub(super) fn compact(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    Ok(Value::Array(
        flatten(args)
            .into_iter()
            .filter(|v| !v.is_empty())
            .cloned()
            .collect(),
    ))
}

/// ARRAYJOIN(arr, separator=", ")
pub(super) fn join(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    let separator = match arg(args, 1) {
        Value::Null => ", ".to_string(),
        v => v.to_text(),
    };
    let parts: Vec<String> = flatten(&args[..args.len().min(1)])
        .into_iter()
        .filter(|v| !v.is_null())
        .map(Value::to_text)
        .collect();
    Ok(Value::String(parts.join(&separator)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn call(f: super::super::Builtin, args: Vec<Value>) -> Result<Value, EvalError> {
        let ctx = FunctionContext {
            record: None,
            now: Utc::now(),
        };
        f(&args, &ctx)
    }

    fn arr(items: Vec<Value>) -> Value {
        Value::Array(items)
    }

    #[test]
    fn unique_keeps_first_occurrence() {
        let input = arr(vec!["b".into(), "a".into(), "b".into()]);
        assert_eq!(
            call(unique, vec![input]).unwrap(),
            arr(vec!["b".into(), "a".into()])
        );
    }

    #[test]
    fn compact_drops_blanks() {
        let input = arr(vec![Value::Null, "".into(), 0i64.into(), "x".into()]);
        assert_eq!(
            call(compact, vec![input]).unwrap(),
            arr(vec![0i64.into(), "x".into()])
        );
    }

    #[test]
    fn join_uses_separator() {
        let input = arr(vec!["a".into(), Value::Null, "c".into()]);
        assert_eq!(call(join, vec![input.clone()]).unwrap(), Value::from("a, c"));
        assert_eq!(call(join, vec![input, " / ".into()]).unwrap(), Value::from("a / c"));
    }
}
