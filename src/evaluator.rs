use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, trace, warn};
use serde::Serialize;
use thiserror::Error;

use crate::{
    ast::{AggregationMode, BinOp, Condition, ConditionOp},
    functions::{self, FunctionContext, FunctionRegistry, numeric},
    graph::DependencyGraph,
    parser::ParseError,
    pipeline::{Alter, Pipeline, Step},
    source::{DataSource, RecordSet},
    value::{Record, Value},
};

/// Per-call evaluation context.
///
/// `current_value` seeds every pipeline's running value. `current_record`
/// is what unqualified field references (`{Amount}`) read from, and
/// `current_set` supplies the declared fields used to map between field
/// names and field ids.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    pub current_value: Value,
    pub current_record: Option<Record>,
    pub current_set: Option<RecordSet>,
    /// Clock reading for NOW()/TODAY(); taken at evaluation start when unset
    pub now: Option<DateTime<Utc>>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for evaluating a formula against one record.
    pub fn for_record(record: Record) -> Self {
        EvalContext {
            current_record: Some(record),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.current_value = value;
        self
    }

    pub fn with_record(mut self, record: Record) -> Self {
        self.current_record = Some(record);
        self
    }

    pub fn with_set(mut self, set: RecordSet) -> Self {
        self.current_set = Some(set);
        self
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }
}

/// Errors that can occur while evaluating a pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The formula text did not parse
    #[error("Syntax error: {0}")]
    Syntax(#[from] ParseError),

    /// A field or set name that nothing could resolve
    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    #[error("Division by zero")]
    DivisionByZero,

    /// Operand of the wrong type for an operator
    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid date: {0:?}")]
    InvalidDate(String),

    /// Raised by ERROR() or by a host function
    #[error("{0}")]
    Function(String),

    #[error("Malformed step: {0}")]
    MalformedStep(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Cyclic dependency: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    #[error("Node nesting exceeds the maximum depth of {0}")]
    DepthExceeded(usize),
}

/// Coarse error categories reported to hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    SyntaxError,
    UnresolvedReference,
    DomainError,
    NodeNotFound,
    CyclicDependency,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::UnresolvedReference => "UnresolvedReference",
            ErrorKind::DomainError => "DomainError",
            ErrorKind::NodeNotFound => "NodeNotFound",
            ErrorKind::CyclicDependency => "CyclicDependency",
        };
        f.write_str(s)
    }
}

impl EvalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::Syntax(_) => ErrorKind::SyntaxError,
            EvalError::UnresolvedReference(_) => ErrorKind::UnresolvedReference,
            EvalError::NodeNotFound(_) => ErrorKind::NodeNotFound,
            EvalError::CyclicDependency(_) => ErrorKind::CyclicDependency,
            EvalError::DivisionByZero
            | EvalError::TypeError(_)
            | EvalError::UnknownFunction(_)
            | EvalError::InvalidArgument(_)
            | EvalError::InvalidDate(_)
            | EvalError::Function(_)
            | EvalError::MalformedStep(_)
            | EvalError::DepthExceeded(_) => ErrorKind::DomainError,
        }
    }
}

/// One executed step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepTrace {
    pub operator: String,
    pub input: Value,
    pub output: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Result of evaluating a pipeline or node. Never a panic, never a bare
/// `Err`: failures are carried in `error` with `value` set to null.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Evaluation {
    pub value: Value,
    pub error: Option<EvalError>,
    pub steps: Vec<StepTrace>,
    pub warnings: Vec<String>,
    pub from_cache: bool,
}

impl Evaluation {
    pub(crate) fn failed(error: EvalError) -> Self {
        Evaluation {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Value, EvalError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.value),
        }
    }
}

const DEFAULT_SEPARATOR: &str = ", ";
const DEFAULT_MAX_DEPTH: usize = 64;

/// Everything an [`Evaluator`] needs besides the graph and the call context.
#[derive(Clone)]
pub struct EvaluatorConfig {
    /// Host functions; checked before the builtin catalog
    pub functions: FunctionRegistry,
    /// Resolver for relational sets and linked records
    pub data_source: Option<Arc<dyn DataSource>>,
    /// CONCAT separator when a SYNTHESIZE step names none
    pub default_separator: String,
    /// Deepest allowed chain of nested node evaluations
    pub max_depth: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        EvaluatorConfig {
            functions: FunctionRegistry::new(),
            data_source: None,
            default_separator: DEFAULT_SEPARATOR.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl fmt::Debug for EvaluatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorConfig")
            .field("functions", &self.functions)
            .field("data_source", &self.data_source.is_some())
            .field("default_separator", &self.default_separator)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl EvaluatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function<F>(mut self, name: &str, function: F) -> Self
    where
        F: Fn(&[Value], &FunctionContext) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.functions.register(name, function);
        self
    }

    pub fn with_data_source(mut self, source: impl DataSource + 'static) -> Self {
        self.data_source = Some(Arc::new(source));
        self
    }

    pub fn with_shared_source(mut self, source: Arc<dyn DataSource>) -> Self {
        self.data_source = Some(source);
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.default_separator = separator.into();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Executes pipelines against a context and a dependency graph.
///
/// The evaluator itself is immutable; node caches live in the
/// [`DependencyGraph`] handed to each call.
///
/// # Examples
///
/// ```
/// use pipeform::{DependencyGraph, EvalContext, Evaluator, Record, Value, parse_formula};
///
/// let compiled = parse_formula("{Price} * {Qty}");
/// let record = Record::new("r1").with_field("Price", 10i64).with_field("Qty", 3i64);
///
/// let evaluator = Evaluator::default();
/// let mut graph = DependencyGraph::new();
/// let result = evaluator.evaluate_pipeline(&mut graph, &compiled.pipeline, &EvalContext::for_record(record));
/// assert_eq!(result.value, Value::Integer(30));
/// ```
#[derive(Debug, Default)]
pub struct Evaluator {
    config: EvaluatorConfig,
}

impl Evaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Evaluator { config }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut EvaluatorConfig {
        &mut self.config
    }

    /// Run `pipeline` from `ctx.current_value`, tracing every top-level step.
    /// Node references are resolved (and cached) through `graph`.
    pub fn evaluate_pipeline(
        &self,
        graph: &mut DependencyGraph,
        pipeline: &Pipeline,
        ctx: &EvalContext,
    ) -> Evaluation {
        Run::new(self, graph, ctx).traced(pipeline, ctx)
    }

    /// Value of node `id`, from cache when clean.
    pub fn evaluate_node(&self, graph: &mut DependencyGraph, id: &str, ctx: &EvalContext) -> Evaluation {
        Run::new(self, graph, ctx).node(id, ctx)
    }
}

/// State of one top-level evaluation call.
struct Run<'a> {
    config: &'a EvaluatorConfig,
    graph: &'a mut DependencyGraph,
    now: DateTime<Utc>,
    /// Nodes currently being evaluated, outermost first
    stack: Vec<String>,
    /// Outcome of every node evaluated so far in this run
    evaluated: HashMap<String, Result<Value, EvalError>>,
    warnings: Vec<String>,
}

impl<'a> Run<'a> {
    fn new(evaluator: &'a Evaluator, graph: &'a mut DependencyGraph, ctx: &EvalContext) -> Self {
        Run {
            config: &evaluator.config,
            graph,
            now: ctx.now.unwrap_or_else(Utc::now),
            stack: Vec::new(),
            evaluated: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    fn node(&mut self, id: &str, ctx: &EvalContext) -> Evaluation {
        let Some(node) = self.graph.get(id) else {
            return Evaluation::failed(EvalError::NodeNotFound(id.to_string()));
        };

        if !node.dirty && !node.cached_value.is_null() {
            debug!("Node {} served from cache", id);
            return Evaluation {
                value: node.cached_value.clone(),
                from_cache: true,
                ..Evaluation::default()
            };
        }

        if let Some(outcome) = self.evaluated.get(id) {
            trace!("Node {} already evaluated in this run", id);
            return match outcome.clone() {
                Ok(value) => Evaluation {
                    value,
                    ..Evaluation::default()
                },
                Err(e) => Evaluation::failed(e),
            };
        }

        if self.stack.iter().any(|s| s == id) {
            let mut path = self.stack.clone();
            path.push(id.to_string());
            return Evaluation::failed(EvalError::CyclicDependency(path));
        }
        if self.stack.len() >= self.config.max_depth {
            return Evaluation::failed(EvalError::DepthExceeded(self.config.max_depth));
        }

        let pipeline = node.pipeline.clone();
        let dependencies = node.dependencies.clone();

        debug!("Evaluating node {}", id);
        let first_warning = self.warnings.len();
        self.stack.push(id.to_string());
        for dep in &dependencies {
            if self.graph.get(dep).is_some_and(|n| n.dirty) && !self.evaluated.contains_key(dep) {
                let result = self.node(dep, ctx);
                if let Some(e) = result.error {
                    debug!("Dependency {} of {} failed: {}", dep, id, e);
                }
            }
        }
        let mut result = self.traced(&pipeline, ctx);
        self.stack.pop();

        // Include warnings raised while bringing dependencies up to date
        result.warnings = self.warnings[first_warning..].to_vec();

        let outcome = match &result.error {
            Some(e) => Err(e.clone()),
            None => Ok(result.value.clone()),
        };
        self.evaluated.insert(id.to_string(), outcome);
        self.graph
            .store_result(id, result.value.clone(), result.error.clone(), Utc::now());
        result
    }

    /// A node's value as a step result.
    fn node_value(&mut self, id: &str, ctx: &EvalContext) -> Result<Value, EvalError> {
        self.node(id, ctx).into_result()
    }

    fn traced(&mut self, pipeline: &Pipeline, ctx: &EvalContext) -> Evaluation {
        let first_warning = self.warnings.len();
        let mut steps = Vec::with_capacity(pipeline.len());
        let mut current = ctx.current_value.clone();

        for step in pipeline {
            let before = self.warnings.len();
            let result = self.apply(step, &current, ctx);
            let warning = self.warnings.get(before).cloned();

            match result {
                Ok(output) => {
                    trace!("{} {} -> {}", step.operator(), current.as_string(), output.as_string());
                    steps.push(StepTrace {
                        operator: step.operator().to_string(),
                        input: current,
                        output: output.clone(),
                        error: None,
                        warning,
                    });
                    current = output;
                }
                Err(e) => {
                    debug!("{} failed: {}", step.operator(), e);
                    steps.push(StepTrace {
                        operator: step.operator().to_string(),
                        input: current,
                        output: Value::Null,
                        error: Some(e.to_string()),
                        warning,
                    });
                    return Evaluation {
                        value: Value::Null,
                        error: Some(e),
                        steps,
                        warnings: self.warnings[first_warning..].to_vec(),
                        from_cache: false,
                    };
                }
            }
        }

        Evaluation {
            value: current,
            error: None,
            steps,
            warnings: self.warnings[first_warning..].to_vec(),
            from_cache: false,
        }
    }

    /// Nested operand or argument pipeline, untraced.
    fn nested(&mut self, pipeline: &Pipeline, ctx: &EvalContext) -> Result<Value, EvalError> {
        let mut current = ctx.current_value.clone();
        for step in pipeline {
            current = self.apply(step, &current, ctx)?;
        }
        Ok(current)
    }

    fn apply(&mut self, step: &Step, input: &Value, ctx: &EvalContext) -> Result<Value, EvalError> {
        match step {
            Step::Connect { source } => self.connect(source, ctx),
            Step::Segment { condition } => Ok(segment(condition, input)),
            Step::Designate { property } => designate(property, input, ctx),
            Step::Synthesize {
                mode,
                property,
                separator,
            } => {
                let separator = separator.as_deref().unwrap_or(self.config.default_separator.as_str());
                Ok(synthesize(*mode, property.as_deref(), separator, input))
            }
            Step::Alter(Alter::Literal { value, .. }) => Ok(value.clone()),
            Step::Alter(Alter::Arithmetic { op, left, right }) => {
                let left = self.nested(left, ctx)?;
                let right = self.nested(right, ctx)?;
                apply_binop(*op, &left, &right)
            }
            Step::Alter(Alter::Function { name, args }) => {
                let args = args
                    .iter()
                    .map(|arg| self.nested(arg, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(name, &args, ctx)
            }
            Step::Null { default } => Ok(if input.is_empty() {
                default.clone()
            } else {
                input.clone()
            }),
            Step::Malformed { reason, .. } => {
                warn!("Evaluating malformed step: {}", reason);
                Err(EvalError::MalformedStep(reason.clone()))
            }
        }
    }

    // ========================================
    // CONNECT
    // ========================================

    fn connect(&mut self, source: &str, ctx: &EvalContext) -> Result<Value, EvalError> {
        if let Some(id) = source.strip_prefix('#') {
            return self.node_value(id, ctx);
        }
        if self.graph.contains(source) {
            return self.node_value(source, ctx);
        }

        if let Some(data) = &self.config.data_source {
            if let Some(set) = data.get_set(source) {
                debug!("CONNECT {} resolved to a set of {} record(s)", source, set.records.len());
                return Ok(set.to_value());
            }
            if let Some(record) = &ctx.current_record
                && let Some(linked) = data.linked_records(record, source)
            {
                debug!("CONNECT {} resolved to {} linked record(s)", source, linked.len());
                return Ok(Value::Array(linked.into_iter().map(Value::Record).collect()));
            }
        }

        if self.graph.was_removed(source) {
            return Err(EvalError::NodeNotFound(source.to_string()));
        }

        let warning = EvalError::UnresolvedReference(source.to_string()).to_string();
        warn!("CONNECT {}: {}, continuing with no records", source, warning);
        self.warnings.push(warning);
        Ok(Value::Array(vec![]))
    }

    // ========================================
    // ALTER/function
    // ========================================

    fn call(&self, name: &str, args: &[Value], ctx: &EvalContext) -> Result<Value, EvalError> {
        let fctx = FunctionContext {
            record: ctx.current_record.as_ref(),
            now: self.now,
        };
        if let Some(custom) = self.config.functions.get(name) {
            trace!("Calling custom function {}", name);
            return custom(args, &fctx);
        }
        match functions::builtin(name) {
            Some(builtin) => builtin(args, &fctx),
            None => Err(EvalError::UnknownFunction(name.to_string())),
        }
    }
}

// ========================================
// SEGMENT
// ========================================

fn segment(condition: &Condition, input: &Value) -> Value {
    match input {
        Value::Null => Value::Null,
        Value::Array(items) => Value::Array(
            items
                .iter()
                .filter(|item| condition_holds(condition, subject(condition, item)))
                .cloned()
                .collect(),
        ),
        other if condition_holds(condition, subject(condition, other)) => other.clone(),
        _ => Value::Null,
    }
}

/// What a condition tests: the named field of a record, or a scalar itself.
fn subject<'v>(condition: &Condition, item: &'v Value) -> &'v Value {
    static NULL: Value = Value::Null;
    if item.is_record_like() {
        item.field(&condition.field).unwrap_or(&NULL)
    } else {
        item
    }
}

pub(crate) fn condition_holds(condition: &Condition, subject: &Value) -> bool {
    let expected = &condition.value;
    match condition.op {
        ConditionOp::Eq => subject.loose_eq(expected),
        ConditionOp::Ne => !subject.loose_eq(expected),
        ConditionOp::Gt | ConditionOp::Ge | ConditionOp::Lt | ConditionOp::Le => {
            let (Some(a), Some(b)) = (subject.to_number(), expected.to_number()) else {
                return false;
            };
            match condition.op {
                ConditionOp::Gt => a > b,
                ConditionOp::Ge => a >= b,
                ConditionOp::Lt => a < b,
                _ => a <= b,
            }
        }
        ConditionOp::Contains => match subject {
            Value::Array(items) => items.iter().any(|item| item.loose_eq(expected)),
            other => other.to_text().contains(&expected.to_text()),
        },
        ConditionOp::StartsWith => subject.to_text().starts_with(&expected.to_text()),
        ConditionOp::EndsWith => subject.to_text().ends_with(&expected.to_text()),
        ConditionOp::IsEmpty => subject.is_empty(),
        ConditionOp::IsNotEmpty => !subject.is_empty(),
    }
}

// ========================================
// DESIGNATE
// ========================================

fn designate(property: &str, input: &Value, ctx: &EvalContext) -> Result<Value, EvalError> {
    match input {
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|item| item.field(property).cloned().unwrap_or(Value::Null))
                .collect(),
        )),
        other if other.is_record_like() => Ok(other.field(property).cloned().unwrap_or(Value::Null)),
        _ => read_current_record(property, ctx),
    }
}

/// Stored key first, then the current set's declared field in either
/// direction (name to id, id to name).
fn read_current_record(property: &str, ctx: &EvalContext) -> Result<Value, EvalError> {
    let Some(record) = &ctx.current_record else {
        return Err(EvalError::UnresolvedReference(format!(
            "{} (no current record)",
            property
        )));
    };

    if let Some(value) = record.get(property) {
        return Ok(value.clone());
    }

    if let Some(set) = &ctx.current_set {
        if let Some(def) = set.field_by_name(property)
            && let Some(value) = record.get(&def.id)
        {
            return Ok(value.clone());
        }
        if let Some(def) = set.field_by_id(property)
            && let Some(value) = record.get(&def.name)
        {
            return Ok(value.clone());
        }
    }

    Err(EvalError::UnresolvedReference(property.to_string()))
}

// ========================================
// SYNTHESIZE
// ========================================

fn synthesize(mode: AggregationMode, property: Option<&str>, separator: &str, input: &Value) -> Value {
    let mut items = match input {
        Value::Array(items) => items.clone(),
        Value::Null => vec![],
        other => vec![other.clone()],
    };
    if let Some(property) = property {
        items = items
            .iter()
            .map(|item| item.field(property).cloned().unwrap_or(Value::Null))
            .collect();
    }

    match mode {
        AggregationMode::Sum => numeric::sum(&numeric::numeric_values(&items)),
        AggregationMode::Avg => numeric::average(&numeric::numeric_values(&items)),
        AggregationMode::Min => numeric::min(&numeric::numeric_values(&items)),
        AggregationMode::Max => numeric::max(&numeric::numeric_values(&items)),
        AggregationMode::Count => Value::Integer(items.len() as i64),
        AggregationMode::First => items.into_iter().next().unwrap_or(Value::Null),
        AggregationMode::Last => items.pop().unwrap_or(Value::Null),
        AggregationMode::Concat => Value::String(
            items
                .iter()
                .filter(|v| !v.is_null())
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(separator),
        ),
        AggregationMode::Collect => Value::Array(items),
    }
}

// ========================================
// ALTER/arithmetic
// ========================================

fn apply_binop(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if op.is_comparison() {
        return Ok(Value::Boolean(compare(op, left, right)));
    }

    if op == BinOp::Add && (is_plain_text(left) || is_plain_text(right)) {
        return Ok(Value::String(format!("{}{}", left.to_text(), right.to_text())));
    }

    let a = numeric_operand(op, left)?;
    let b = numeric_operand(op, right)?;

    if matches!(op, BinOp::Divide | BinOp::Modulo) && b.as_float() == Some(0.0) {
        return Err(EvalError::DivisionByZero);
    }
    if op == BinOp::Power {
        return numeric::power(&a, &b);
    }

    if let (Value::Integer(x), Value::Integer(y)) = (&a, &b) {
        let exact = match op {
            BinOp::Add => x.checked_add(*y),
            BinOp::Subtract => x.checked_sub(*y),
            BinOp::Multiply => x.checked_mul(*y),
            BinOp::Divide if x.checked_rem(*y) == Some(0) => x.checked_div(*y),
            BinOp::Modulo => x.checked_rem(*y),
            _ => None,
        };
        if let Some(r) = exact {
            return Ok(Value::Integer(r));
        }
    }

    if let (Some(x), Some(y)) = (a.to_decimal(), b.to_decimal()) {
        let exact = match op {
            BinOp::Add => x.checked_add(y),
            BinOp::Subtract => x.checked_sub(y),
            BinOp::Multiply => x.checked_mul(y),
            BinOp::Divide => x.checked_div(y),
            BinOp::Modulo => x.checked_rem(y),
            _ => None,
        };
        if let Some(r) = exact.and_then(Value::from_decimal) {
            return Ok(r);
        }
    }

    let (x, y) = (a.as_float().unwrap_or(0.0), b.as_float().unwrap_or(0.0));
    let result = match op {
        BinOp::Add => x + y,
        BinOp::Subtract => x - y,
        BinOp::Multiply => x * y,
        BinOp::Divide => x / y,
        BinOp::Modulo => x % y,
        other => {
            return Err(EvalError::TypeError(format!(
                "'{}' is not an arithmetic operator",
                other
            )));
        }
    };
    if result.is_finite() {
        Ok(Value::Float(result))
    } else {
        Err(EvalError::InvalidArgument(format!(
            "{} {} {} is out of range",
            x,
            op.symbol(),
            y
        )))
    }
}

fn is_plain_text(v: &Value) -> bool {
    matches!(v, Value::String(_)) && v.to_numeric_value().is_none()
}

/// Nulls count as zero; numeric strings are coerced.
fn numeric_operand(op: BinOp, v: &Value) -> Result<Value, EvalError> {
    match v {
        Value::Null => Ok(Value::Integer(0)),
        other => other.to_numeric_value().ok_or_else(|| {
            EvalError::TypeError(format!("Cannot apply '{}' to {}", op.symbol(), other.type_name()))
        }),
    }
}

fn compare(op: BinOp, left: &Value, right: &Value) -> bool {
    let ordering = match (left.to_number(), right.to_number()) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => match (left, right) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        },
    };

    match op {
        BinOp::Equal => left.loose_eq(right),
        BinOp::NotEqual => !left.loose_eq(right),
        BinOp::LessThan => ordering.is_some_and(|o| o.is_lt()),
        BinOp::GreaterThan => ordering.is_some_and(|o| o.is_gt()),
        BinOp::LessEqual => ordering.is_some_and(|o| o.is_le()),
        BinOp::GreaterEqual => ordering.is_some_and(|o| o.is_ge()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Value {
        Value::Integer(n)
    }

    #[test]
    fn integer_arithmetic_stays_integral() {
        assert_eq!(apply_binop(BinOp::Add, &int(2), &int(3)).unwrap(), int(5));
        assert_eq!(apply_binop(BinOp::Divide, &int(6), &int(3)).unwrap(), int(2));
        assert_eq!(apply_binop(BinOp::Divide, &int(7), &int(2)).unwrap(), Value::Float(3.5));
        assert_eq!(apply_binop(BinOp::Modulo, &int(7), &int(4)).unwrap(), int(3));
    }

    #[test]
    fn mixed_arithmetic_avoids_float_drift() {
        assert_eq!(
            apply_binop(BinOp::Add, &Value::Float(0.1), &Value::Float(0.2)).unwrap(),
            Value::Float(0.3)
        );
        assert_eq!(apply_binop(BinOp::Multiply, &Value::Float(2.5), &int(2)).unwrap(), int(5));
    }

    #[test]
    fn division_and_mod_by_zero_fail() {
        assert_eq!(apply_binop(BinOp::Divide, &int(1), &int(0)), Err(EvalError::DivisionByZero));
        assert_eq!(apply_binop(BinOp::Modulo, &int(1), &Value::Float(0.0)), Err(EvalError::DivisionByZero));
        assert_eq!(EvalError::DivisionByZero.to_string(), "Division by zero");
    }

    #[test]
    fn plus_concatenates_text() {
        assert_eq!(
            apply_binop(BinOp::Add, &Value::from("Order #"), &int(7)).unwrap(),
            Value::from("Order #7")
        );
        assert_eq!(apply_binop(BinOp::Add, &Value::from("4"), &int(1)).unwrap(), int(5));
    }

    #[test]
    fn null_operands_count_as_zero() {
        assert_eq!(apply_binop(BinOp::Add, &Value::Null, &int(4)).unwrap(), int(4));
        assert!(matches!(
            apply_binop(BinOp::Multiply, &Value::from("abc"), &int(2)),
            Err(EvalError::TypeError(_))
        ));
    }

    #[test]
    fn comparisons_are_numeric_then_textual() {
        assert!(compare(BinOp::GreaterThan, &int(80), &int(50)));
        assert!(compare(BinOp::Equal, &Value::from("5"), &Value::Float(5.0)));
        assert!(compare(BinOp::LessThan, &Value::from("2024-01-01"), &Value::from("2024-02-01")));
        assert!(!compare(BinOp::LessThan, &Value::Null, &int(1)));
    }

    #[test]
    fn segment_filters_arrays_and_passes_single_records() {
        let condition = Condition::new("Status", ConditionOp::Eq, "open");
        let open = Value::Record(Record::anonymous().with_field("Status", "open"));
        let closed = Value::Record(Record::anonymous().with_field("Status", "closed"));

        let kept = segment(&condition, &Value::Array(vec![open.clone(), closed.clone()]));
        assert_eq!(kept, Value::Array(vec![open.clone()]));
        assert_eq!(segment(&condition, &open), open);
        assert_eq!(segment(&condition, &closed), Value::Null);
        assert_eq!(segment(&condition, &Value::Null), Value::Null);
    }

    #[test]
    fn numeric_conditions_reject_non_numbers() {
        let condition = Condition::new("Qty", ConditionOp::Gt, 2i64);
        assert!(condition_holds(&condition, &int(3)));
        assert!(!condition_holds(&condition, &Value::from("many")));
        assert!(!condition_holds(&condition, &Value::Null));
    }

    #[test]
    fn synthesize_empty_results() {
        let empty = Value::Array(vec![]);
        assert_eq!(synthesize(AggregationMode::Sum, None, ", ", &empty), int(0));
        assert_eq!(synthesize(AggregationMode::Avg, None, ", ", &empty), int(0));
        assert_eq!(synthesize(AggregationMode::Count, None, ", ", &empty), int(0));
        assert_eq!(synthesize(AggregationMode::Min, None, ", ", &empty), Value::Null);
        assert_eq!(synthesize(AggregationMode::Last, None, ", ", &Value::Null), Value::Null);
        assert_eq!(synthesize(AggregationMode::Concat, None, ", ", &empty), Value::from(""));
    }

    #[test]
    fn synthesize_wraps_scalars_and_projects() {
        assert_eq!(synthesize(AggregationMode::Count, None, ", ", &int(9)), int(1));

        let rows = Value::Array(vec![
            Value::Record(Record::anonymous().with_field("Tag", "a")),
            Value::Record(Record::anonymous()),
            Value::Record(Record::anonymous().with_field("Tag", "b")),
        ]);
        assert_eq!(
            synthesize(AggregationMode::Concat, Some("Tag"), " | ", &rows),
            Value::from("a | b")
        );
    }

    #[test]
    fn designate_uses_declared_field_ids() {
        use crate::source::FieldDef;

        let record = Record::new("r1").with_field("fld9", 12i64);
        let set = RecordSet::new("Orders", vec![]).with_fields(vec![FieldDef {
            id: "fld9".to_string(),
            name: "Total".to_string(),
        }]);
        let ctx = EvalContext::for_record(record).with_set(set);

        assert_eq!(designate("Total", &Value::Null, &ctx).unwrap(), int(12));
        assert!(matches!(
            designate("Missing", &Value::Null, &ctx),
            Err(EvalError::UnresolvedReference(_))
        ));
        assert!(matches!(
            designate("Total", &Value::Null, &EvalContext::new()),
            Err(EvalError::UnresolvedReference(_))
        ));
    }

    #[test]
    fn error_kinds() {
        assert_eq!(EvalError::DivisionByZero.kind(), ErrorKind::DomainError);
        assert_eq!(EvalError::NodeNotFound("x".into()).kind(), ErrorKind::NodeNotFound);
        assert_eq!(
            EvalError::CyclicDependency(vec!["a".into(), "a".into()]).to_string(),
            "Cyclic dependency: a -> a"
        );
    }
}
