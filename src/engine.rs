//! Host-facing facade: one dependency graph plus one evaluator.
//!
//! ```
//! use pipeform::{Engine, EvalContext, Value};
//!
//! let mut engine = Engine::new();
//! engine.define_formula("base", "40 + 2").unwrap();
//! engine.define_formula("double", "#base * 2").unwrap();
//!
//! let ctx = EvalContext::new();
//! assert_eq!(engine.evaluate_node("double", &ctx).value, Value::Integer(84));
//! assert!(engine.evaluate_node("double", &ctx).from_cache);
//! ```

use log::debug;
use thiserror::Error;

use crate::{
    compiler::{self, CompiledFormula, extract_dependencies, infer_return_type},
    evaluator::{EvalContext, EvalError, Evaluation, Evaluator, EvaluatorConfig},
    functions::FunctionContext,
    graph::{DependencyGraph, GraphError, NodeDefinition},
    parser::ParseError,
    value::{Record, Value},
};

/// Why a node definition was refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefineError {
    #[error("Syntax error: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[derive(Debug, Default)]
pub struct Engine {
    graph: DependencyGraph,
    evaluator: Evaluator,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EvaluatorConfig) -> Self {
        Engine {
            graph: DependencyGraph::new(),
            evaluator: Evaluator::new(config),
        }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn config(&self) -> &EvaluatorConfig {
        self.evaluator.config()
    }

    /// Register a host function. Takes priority over a builtin of the same
    /// name.
    pub fn register_function<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&[Value], &FunctionContext) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.evaluator.config_mut().functions.register(name, function);
    }

    pub fn parse_formula(&self, text: &str) -> CompiledFormula {
        compiler::parse_formula(text)
    }

    pub fn inspect_formula(&self, text: &str) -> Vec<String> {
        compiler::inspect_formula(text)
    }

    /// Compile and run `text` once. `record`, when given, becomes the
    /// context's current record.
    pub fn evaluate_formula(&mut self, text: &str, record: Option<Record>, ctx: &EvalContext) -> Evaluation {
        let compiled = match compiler::compile_formula(text) {
            Ok(compiled) => compiled,
            Err(e) => return Evaluation::failed(EvalError::Syntax(e)),
        };

        let ctx = match record {
            Some(record) => ctx.clone().with_record(record),
            None => ctx.clone(),
        };
        self.evaluator
            .evaluate_pipeline(&mut self.graph, &compiled.pipeline, &ctx)
    }

    /// Define or replace a node.
    ///
    /// A definition with a formula and no pipeline is compiled first.
    /// Missing dependencies are read off the pipeline.
    pub fn define_node(&mut self, id: &str, mut definition: NodeDefinition) -> Result<(), DefineError> {
        if definition.pipeline.is_empty()
            && let Some(formula) = &definition.formula
        {
            let compiled = compiler::compile_formula(formula)?;
            definition.pipeline = compiled.pipeline;
            definition.dependencies = compiled.dependencies;
            definition.declared_type = compiled.return_type;
        } else if definition.dependencies.is_empty() {
            definition.dependencies = extract_dependencies(&definition.pipeline);
            definition.declared_type = infer_return_type(&definition.pipeline);
        }

        self.graph.set_node(id, definition)?;
        Ok(())
    }

    pub fn define_formula(&mut self, id: &str, formula: &str) -> Result<(), DefineError> {
        self.define_node(id, NodeDefinition::default().with_formula(formula))
    }

    pub fn evaluate_node(&mut self, id: &str, ctx: &EvalContext) -> Evaluation {
        self.evaluator.evaluate_node(&mut self.graph, id, ctx)
    }

    /// Dirty `id` and its dependents.
    pub fn invalidate(&mut self, id: &str) {
        self.graph.mark_dirty(id);
    }

    pub fn clear_cache(&mut self) {
        debug!("Clearing every cached node value");
        self.graph.clear_cache();
    }

    pub fn remove_node(&mut self, id: &str) -> bool {
        self.graph.remove_node(id).is_some()
    }

    /// Bring every node up to date in dependency order. One node failing
    /// does not stop the others.
    pub fn recompute_all(&mut self, ctx: &EvalContext) -> Vec<(String, Evaluation)> {
        let order = self.graph.topological_order();
        debug!("Recomputing {} node(s)", order.len());
        order
            .into_iter()
            .map(|id| {
                let result = self.evaluate_node(&id, ctx);
                (id, result)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_definitions_are_compiled() {
        let mut engine = Engine::new();
        engine.define_formula("total", "{Price} * {Qty}").unwrap();
        let node = engine.graph().get("total").unwrap();
        assert_eq!(node.dependencies, vec!["Price", "Qty"]);
        assert_eq!(node.formula.as_deref(), Some("{Price} * {Qty}"));
    }

    #[test]
    fn bad_formula_is_not_defined() {
        let mut engine = Engine::new();
        assert!(matches!(
            engine.define_formula("x", "{A} +"),
            Err(DefineError::Parse(_))
        ));
        assert!(engine.graph().is_empty());
    }

    #[test]
    fn syntax_errors_surface_as_evaluations() {
        let mut engine = Engine::new();
        let result = engine.evaluate_formula("(1 + ", None, &EvalContext::new());
        assert_eq!(result.value, Value::Null);
        assert_eq!(result.error.map(|e| e.kind()), Some(crate::evaluator::ErrorKind::SyntaxError));
    }

    #[test]
    fn custom_functions_shadow_builtins() {
        let mut engine = Engine::new();
        engine.register_function("upper", |_, _| Ok(Value::from("shadowed")));
        let result = engine.evaluate_formula("UPPER(\"x\")", None, &EvalContext::new());
        assert_eq!(result.value, Value::from("shadowed"));
    }
}
