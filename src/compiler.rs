//! Lowers a parsed formula to a [`Pipeline`].
//!
//! | AST node | Pipeline shape |
//! |---|---|
//! | literal | `ALTER literal` |
//! | field | optional `SEGMENT`, then `DESIGNATE` |
//! | node reference | `CONNECT`, then optional `SEGMENT` |
//! | property | source pipeline + `DESIGNATE` |
//! | aggregation | source pipeline + `SYNTHESIZE` |
//! | binary / unary minus | one `ALTER arithmetic` with nested operand pipelines |
//! | function call | one `ALTER function` with a nested pipeline per argument |
//!
//! The public entry point [`parse_formula`] never fails: grammar errors come
//! back inside the [`CompiledFormula`].

use std::collections::BTreeSet;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    ast::{AggregationMode, BinOp, Expr, UnaryOp},
    lexer::{Lexer, Position},
    parser::{ParseError, Parser},
    pipeline::{Alter, Pipeline, Step},
    value::Value,
};

/// Advisory result type of a pipeline, read from its final step only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    Number,
    Text,
    Boolean,
    Array,
    #[default]
    Unknown,
    Error,
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReturnType::Number => "number",
            ReturnType::Text => "text",
            ReturnType::Boolean => "boolean",
            ReturnType::Array => "array",
            ReturnType::Unknown => "unknown",
            ReturnType::Error => "error",
        };
        f.write_str(s)
    }
}

/// Output of [`parse_formula`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledFormula {
    pub pipeline: Pipeline,
    pub dependencies: Vec<String>,
    #[serde(rename = "returnType")]
    pub return_type: ReturnType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl CompiledFormula {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    fn failed(e: ParseError) -> Self {
        CompiledFormula {
            pipeline: Pipeline::new(),
            dependencies: vec![],
            return_type: ReturnType::Error,
            error: Some(e.message),
            position: Some(e.position),
        }
    }
}

/// Parse and compile formula text.
///
/// # Examples
///
/// ```
/// use pipeform::{parse_formula, ReturnType};
///
/// let compiled = parse_formula("{Amount} * 2");
/// assert_eq!(compiled.dependencies, vec!["Amount".to_string()]);
/// assert_eq!(compiled.return_type, ReturnType::Number);
///
/// let broken = parse_formula("{Amount} +");
/// assert_eq!(broken.return_type, ReturnType::Error);
/// assert_eq!(broken.position, Some(10));
/// ```
pub fn parse_formula(text: &str) -> CompiledFormula {
    match compile_formula(text) {
        Ok(compiled) => compiled,
        Err(e) => {
            debug!("Formula {:?} failed to parse: {}", text, e);
            CompiledFormula::failed(e)
        }
    }
}

/// Like [`parse_formula`] but hands the syntax error back as a `Result`.
pub fn compile_formula(text: &str) -> Result<CompiledFormula, ParseError> {
    let expr = Parser::new(Lexer::new(text))?.parse()?;
    let pipeline = compile(&expr);
    let dependencies = extract_dependencies(&pipeline);
    let return_type = infer_return_type(&pipeline);
    debug!(
        "Compiled {:?} into {} step(s), dependencies {:?}",
        text,
        pipeline.len(),
        dependencies
    );

    Ok(CompiledFormula {
        pipeline,
        dependencies,
        return_type,
        error: None,
        position: None,
    })
}

/// Lower an expression to a pipeline.
pub fn compile(expr: &Expr) -> Pipeline {
    let mut pipeline = Pipeline::new();
    compile_into(expr, &mut pipeline);
    pipeline
}

fn compile_into(expr: &Expr, out: &mut Pipeline) {
    match expr {
        Expr::Literal { value, data_type } => out.push(Step::Alter(Alter::Literal {
            value: value.clone(),
            data_type: *data_type,
        })),
        Expr::Field { name, filter } => {
            if let Some(condition) = filter {
                out.push(Step::Segment {
                    condition: condition.clone(),
                });
            }
            out.push(Step::designate(name.clone()));
        }
        Expr::NodeRef { name, filter } => {
            out.push(Step::connect(name.clone()));
            if let Some(condition) = filter {
                out.push(Step::Segment {
                    condition: condition.clone(),
                });
            }
        }
        Expr::Property { source, name } => {
            compile_into(source, out);
            out.push(Step::designate(name.clone()));
        }
        Expr::Aggregation {
            source,
            mode,
            property,
            separator,
        } => {
            compile_into(source, out);
            out.push(Step::Synthesize {
                mode: *mode,
                property: property.clone(),
                separator: separator.clone(),
            });
        }
        Expr::Binary { op, left, right } => out.push(Step::Alter(Alter::Arithmetic {
            op: *op,
            left: compile(left),
            right: compile(right),
        })),
        Expr::Unary {
            op: UnaryOp::Negate,
            operand,
        } => out.push(Step::Alter(Alter::Arithmetic {
            op: BinOp::Multiply,
            left: compile(operand),
            right: Pipeline::from(vec![Step::literal(Value::Integer(-1))]),
        })),
        Expr::Function { name, args } => out.push(Step::Alter(Alter::Function {
            name: name.clone(),
            args: args.iter().map(compile).collect(),
        })),
    }
}

/// Names a pipeline reads from outside itself: every CONNECT source and every
/// DESIGNATE that reads the current record, in this pipeline and all nested
/// ones. Sorted, without duplicates.
pub fn extract_dependencies(pipeline: &Pipeline) -> Vec<String> {
    let mut names = BTreeSet::new();
    collect_dependencies(pipeline, &mut names);
    names.into_iter().collect()
}

fn collect_dependencies(pipeline: &Pipeline, names: &mut BTreeSet<String>) {
    // A DESIGNATE only reads the current record while nothing upstream has
    // produced a value yet.
    let mut reads_record = true;

    for step in pipeline {
        match step {
            Step::Connect { source } => {
                names.insert(source.trim_start_matches('#').to_string());
                reads_record = false;
            }
            Step::Designate { property } => {
                if reads_record {
                    names.insert(property.clone());
                }
                reads_record = false;
            }
            Step::Alter(Alter::Arithmetic { left, right, .. }) => {
                collect_dependencies(left, names);
                collect_dependencies(right, names);
                reads_record = false;
            }
            Step::Alter(Alter::Function { args, .. }) => {
                for arg in args {
                    collect_dependencies(arg, names);
                }
                reads_record = false;
            }
            Step::Alter(Alter::Literal { .. }) | Step::Synthesize { .. } => reads_record = false,
            Step::Segment { .. } | Step::Null { .. } | Step::Malformed { .. } => {}
        }
    }
}

/// Advisory return type from the final step.
pub fn infer_return_type(pipeline: &Pipeline) -> ReturnType {
    match pipeline.last() {
        Some(Step::Synthesize { mode, .. }) => match mode {
            AggregationMode::Count
            | AggregationMode::Sum
            | AggregationMode::Avg
            | AggregationMode::Min
            | AggregationMode::Max => ReturnType::Number,
            AggregationMode::Concat => ReturnType::Text,
            AggregationMode::Collect => ReturnType::Array,
            AggregationMode::First | AggregationMode::Last => ReturnType::Unknown,
        },
        Some(Step::Alter(Alter::Arithmetic { op, .. })) if op.is_comparison() => ReturnType::Boolean,
        Some(Step::Alter(Alter::Arithmetic { .. })) => ReturnType::Number,
        _ => ReturnType::Unknown,
    }
}

/// Human-readable description of each top-level step. Pure formatting.
///
/// ```
/// let lines = pipeform::inspect_formula("#Orders.SUM(Total)");
/// assert_eq!(lines, vec!["1. CONNECT Orders", "2. SYNTHESIZE SUM of Total"]);
/// ```
pub fn inspect_formula(text: &str) -> Vec<String> {
    match compile_formula(text) {
        Ok(compiled) => compiled
            .pipeline
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{}. {}", i + 1, step))
            .collect(),
        Err(e) => vec![format!("Syntax error: {}", e)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_after_connect_is_not_a_dependency() {
        let compiled = parse_formula("#LineItems.Amount.SUM()");
        assert_eq!(compiled.dependencies, vec!["LineItems".to_string()]);
    }

    #[test]
    fn dependencies_collapse_duplicates() {
        let compiled = parse_formula("{A} + {A} * #B.COUNT() - {C}");
        assert_eq!(compiled.dependencies, vec!["A", "B", "C"]);
    }

    #[test]
    fn unary_minus_becomes_multiplication() {
        let pipeline = compile(&Expr::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(Expr::field("X")),
        });
        match pipeline.steps() {
            [Step::Alter(Alter::Arithmetic { op, right, .. })] => {
                assert_eq!(*op, BinOp::Multiply);
                assert_eq!(right.steps(), &[Step::literal(Value::Integer(-1))]);
            }
            other => panic!("Expected one arithmetic step, got {:?}", other),
        }
    }

    #[test]
    fn comparison_infers_boolean() {
        assert_eq!(parse_formula("{Score} > 50").return_type, ReturnType::Boolean);
        assert_eq!(parse_formula("#Tags.CONCAT()").return_type, ReturnType::Text);
        assert_eq!(parse_formula("#Tags.COLLECT()").return_type, ReturnType::Array);
        assert_eq!(parse_formula("UPPER({Name})").return_type, ReturnType::Unknown);
    }
}
