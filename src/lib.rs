pub mod ast;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compiler;
pub mod engine;
pub mod evaluator;
pub mod functions;
pub mod graph;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod source;
pub mod value;

pub use ast::{AggregationMode, BinOp, Condition, ConditionOp, DataType, Expr, Token};
pub use compiler::{CompiledFormula, ReturnType, compile_formula, inspect_formula, parse_formula};
pub use engine::{DefineError, Engine};
pub use evaluator::{EvalContext, EvalError, Evaluation, Evaluator, EvaluatorConfig, ErrorKind, StepTrace};
pub use functions::{FunctionContext, FunctionRegistry};
pub use graph::{DependencyGraph, GraphError, GraphNode, NodeDefinition};
pub use lexer::{LexError, Lexer, Position};
pub use output::{to_json, to_json_pretty};
pub use parser::{ParseError, Parser};
pub use pipeline::{Alter, Pipeline, Step};
pub use source::{DataSource, FieldDef, MemorySource, RecordSet};
pub use value::{Record, Value};
