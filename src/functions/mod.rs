//! Builtin function catalog and the host's custom-function registry.
//!
//! Functions are pure: they receive already-evaluated arguments and a
//! read-only [`FunctionContext`], never sub-pipelines. Lookup is
//! case-insensitive. Custom functions registered by the host shadow builtins
//! of the same name.

mod array;
mod control;
mod logical;
pub(crate) mod numeric;
mod temporal;
mod text;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::evaluator::EvalError;
use crate::value::{Record, Value};

/// What a function may observe besides its arguments.
#[derive(Debug, Clone, Copy)]
pub struct FunctionContext<'a> {
    /// Record the formula is being evaluated for
    pub record: Option<&'a Record>,
    /// Clock reading shared by every call in one evaluation
    pub now: DateTime<Utc>,
}

/// Signature of a builtin.
pub type Builtin = fn(&[Value], &FunctionContext) -> Result<Value, EvalError>;

/// Signature of a host-supplied function.
pub type CustomFunction = dyn Fn(&[Value], &FunctionContext) -> Result<Value, EvalError> + Send + Sync;

const CATALOG: &[(&str, Builtin)] = &[
    // Text
    ("CONCATENATE", text::concatenate),
    ("CONCAT", text::concatenate),
    ("LEFT", text::left),
    ("RIGHT", text::right),
    ("MID", text::mid),
    ("LEN", text::len),
    ("LOWER", text::lower),
    ("UPPER", text::upper),
    ("TRIM", text::trim),
    // Numeric
    ("SUM", numeric::sum_fn),
    ("AVERAGE", numeric::average_fn),
    ("AVG", numeric::average_fn),
    ("MAX", numeric::max_fn),
    ("MIN", numeric::min_fn),
    ("COUNT", numeric::count_fn),
    ("ABS", numeric::abs),
    ("ROUND", numeric::round),
    ("FLOOR", numeric::floor),
    ("CEIL", numeric::ceil),
    ("CEILING", numeric::ceil),
    ("SQRT", numeric::sqrt),
    ("POWER", numeric::power_fn),
    // Logical
    ("IF", logical::if_fn),
    ("AND", logical::and),
    ("OR", logical::or),
    ("NOT", logical::not),
    ("SWITCH", logical::switch),
    // Temporal
    ("NOW", temporal::now),
    ("TODAY", temporal::today),
    ("YEAR", temporal::year),
    ("MONTH", temporal::month),
    ("DAY", temporal::day),
    ("DATETIME_FORMAT", temporal::format),
    ("DATETIME_PARSE", temporal::parse),
    // Array
    ("ARRAYUNIQUE", array::unique),
    ("ARRAYCOMPACT", array::compact),
    ("ARRAYJOIN", array::join),
    // Control
    ("COALESCE", control::coalesce),
    ("BLANK", control::blank),
    ("ERROR", control::error),
    ("RECORD_ID", control::record_id),
];

/// Find a builtin by name, ignoring case.
pub fn builtin(name: &str) -> Option<Builtin> {
    CATALOG
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, f)| *f)
}

/// Every builtin name, in catalog order.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|(n, _)| *n)
}

/// Host-supplied functions, keyed case-insensitively.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<CustomFunction>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&[Value], &FunctionContext) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.functions
            .insert(name.to_ascii_uppercase(), Arc::new(function));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<CustomFunction>> {
        self.functions.get(&name.to_ascii_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry").field("functions", &names).finish()
    }
}

// ========================================
// Argument helpers
// ========================================

static NULL: Value = Value::Null;

/// Positional argument, null when absent.
pub(crate) fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&NULL)
}

/// Arguments with nested arrays expanded in place.
pub(crate) fn flatten(args: &[Value]) -> Vec<&Value> {
    let mut out = Vec::with_capacity(args.len());
    for value in args {
        match value {
            Value::Array(items) => out.extend(flatten(items)),
            other => out.push(other),
        }
    }
    out
}

/// Numeric argument; blanks count as zero.
pub(crate) fn number_arg(args: &[Value], index: usize, function: &str) -> Result<f64, EvalError> {
    match arg(args, index) {
        Value::Null => Ok(0.0),
        v => v.to_number().ok_or_else(|| {
            EvalError::InvalidArgument(format!(
                "{}() expects a number, got {}",
                function,
                v.type_name()
            ))
        }),
    }
}

/// Optional integer argument with a default.
pub(crate) fn int_arg(args: &[Value], index: usize, default: i64, function: &str) -> Result<i64, EvalError> {
    match arg(args, index) {
        Value::Null => Ok(default),
        v => v
            .to_number()
            .map(|n| n.trunc() as i64)
            .ok_or_else(|| {
                EvalError::InvalidArgument(format!(
                    "{}() expects an integer, got {}",
                    function,
                    v.type_name()
                ))
            }),
    }
}
