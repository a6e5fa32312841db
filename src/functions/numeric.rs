use rust_decimal::{Decimal, RoundingStrategy, prelude::FromPrimitive};

use super::{FunctionContext, arg, flatten, int_arg, number_arg};
use crate::evaluator::EvalError;
use crate::value::Value;

// ========================================
// Reductions (shared with SYNTHESIZE)
// ========================================

/// Numeric-coercible entries only; everything else is dropped.
pub(crate) fn numeric_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> Vec<Value> {
    values
        .into_iter()
        .filter_map(Value::to_numeric_value)
        .collect()
}

/// Exact decimal sum, falling back to floats on overflow. Empty input sums to 0.
pub(crate) fn sum(nums: &[Value]) -> Value {
    let mut total = Decimal::ZERO;
    for n in nums {
        match n.to_decimal().and_then(|d| total.checked_add(d)) {
            Some(t) => total = t,
            None => return Value::from_f64_lossy(nums.iter().filter_map(Value::as_float).sum()),
        }
    }
    Value::from_decimal(total).unwrap_or(Value::Integer(0))
}

/// Mean of the entries; 0 for empty input, never NaN.
pub(crate) fn average(nums: &[Value]) -> Value {
    if nums.is_empty() {
        return Value::Integer(0);
    }
    let count = nums.len();
    let exact = sum(nums)
        .to_decimal()
        .zip(Decimal::from_usize(count))
        .and_then(|(total, n)| total.checked_div(n))
        .and_then(Value::from_decimal);
    exact.unwrap_or_else(|| {
        let total: f64 = nums.iter().filter_map(Value::as_float).sum();
        Value::from_f64_lossy(total / count as f64)
    })
}

fn extreme(nums: &[Value], pick_greater: bool) -> Value {
    let mut best: Option<&Value> = None;
    for n in nums {
        let (Some(candidate), Some(current)) = (n.as_float(), best.and_then(Value::as_float)) else {
            best = best.or(Some(n));
            continue;
        };
        if (pick_greater && candidate > current) || (!pick_greater && candidate < current) {
            best = Some(n);
        }
    }
    best.cloned().unwrap_or(Value::Null)
}

/// Smallest entry; null for empty input.
pub(crate) fn min(nums: &[Value]) -> Value {
    extreme(nums, false)
}

/// Largest entry; null for empty input.
pub(crate) fn max(nums: &[Value]) -> Value {
    extreme(nums, true)
}

/// `base ^ exponent`, staying in integers when both are integers.
pub(crate) fn power(base: &Value, exponent: &Value) -> Result<Value, EvalError> {
    if let (Value::Integer(b), Value::Integer(e)) = (base, exponent)
        && let Ok(e) = u32::try_from(*e)
        && let Some(r) = b.checked_pow(e)
    {
        return Ok(Value::Integer(r));
    }

    let (Some(b), Some(e)) = (base.to_number(), exponent.to_number()) else {
        return Err(EvalError::TypeError(format!(
            "Cannot raise {} to the power of {}",
            base.type_name(),
            exponent.type_name()
        )));
    };
    let result = b.powf(e);
    if result.is_finite() {
        Ok(Value::Float(result))
    } else {
        Err(EvalError::InvalidArgument(format!(
            "{} ^ {} is not a finite number",
            b, e
        )))
    }
}

// ========================================
// Catalog entries
// ========================================

pub(super) fn sum_fn(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    Ok(sum(&numeric_values(flatten(args))))
}

pub(super) fn average_fn(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    Ok(average(&numeric_values(flatten(args))))
}

pub(super) fn max_fn(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    Ok(max(&numeric_values(flatten(args))))
}

pub(super) fn min_fn(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    Ok(min(&numeric_values(flatten(args))))
}

/// COUNT(...) - number of numeric entries
pub(super) fn count_fn(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    Ok(Value::Integer(numeric_values(flatten(args)).len() as i64))
}

pub(super) fn abs(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    match arg(args, 0).to_numeric_value() {
        Some(Value::Integer(n)) => Ok(n
            .checked_abs()
            .map(Value::Integer)
            .unwrap_or(Value::Float((n as f64).abs()))),
        Some(Value::Float(n)) => Ok(Value::Float(n.abs())),
        _ => Ok(Value::from_f64_lossy(number_arg(args, 0, "ABS")?.abs())),
    }
}

/// ROUND(value, digits=0) - halves round away from zero; negative digits
/// round to tens, hundreds, ...
pub(super) fn round(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    let x = number_arg(args, 0, "ROUND")?;
    let digits = int_arg(args, 1, 0, "ROUND")?;

    if digits >= 0
        && let Some(d) = Decimal::from_f64(x)
    {
        let rounded = d.round_dp_with_strategy(digits as u32, RoundingStrategy::MidpointAwayFromZero);
        if let Some(v) = Value::from_decimal(rounded) {
            return Ok(v);
        }
    }

    let factor = 10f64.powi(digits.clamp(-300, 300) as i32);
    Ok(Value::from_f64_lossy((x * factor).round() / factor))
}

pub(super) fn floor(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    Ok(Value::from_f64_lossy(number_arg(args, 0, "FLOOR")?.floor()))
}

pub(super) fn ceil(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    Ok(Value::from_f64_lossy(number_arg(args, 0, "CEILING")?.ceil()))
}

pub(super) fn sqrt(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    let x = number_arg(args, 0, "SQRT")?;
    if x < 0.0 {
        return Err(EvalError::InvalidArgument(
            "SQRT() of a negative number".to_string(),
        ));
    }
    Ok(Value::from_f64_lossy(x.sqrt()))
}

pub(super) fn power_fn(args: &[Value], _: &FunctionContext) -> Result<Value, EvalError> {
    let base = arg(args, 0)
        .to_numeric_value()
        .unwrap_or(Value::Float(number_arg(args, 0, "POWER")?));
    let exponent = arg(args, 1)
        .to_numeric_value()
        .unwrap_or(Value::Float(number_arg(args, 1, "POWER")?));
    power(&base, &exponent)
}
