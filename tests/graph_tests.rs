// tests/graph_tests.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pipeform::{
    DefineError, DependencyGraph, Engine, ErrorKind, EvalContext, EvalError, GraphError,
    NodeDefinition, Pipeline, Step, Value,
};

fn node(dependencies: &[&str]) -> NodeDefinition {
    NodeDefinition {
        dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
        ..NodeDefinition::default()
    }
}

/// a <- b <- c, plus an unrelated d
fn chain() -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    graph.set_node("a", node(&[])).unwrap();
    graph.set_node("b", node(&["a"])).unwrap();
    graph.set_node("c", node(&["b"])).unwrap();
    graph.set_node("d", node(&[])).unwrap();
    graph
}

fn abc_engine() -> Engine {
    let mut engine = Engine::new();
    engine.define_formula("a", "1").unwrap();
    engine.define_formula("b", "#a + 1").unwrap();
    engine.define_formula("c", "#b * 10").unwrap();
    engine
}

// ============================================================================
// Structure
// ============================================================================

#[test]
fn test_new_nodes_start_dirty() {
    let graph = chain();
    assert_eq!(graph.len(), 4);
    assert!(graph.nodes().all(|n| n.dirty));
    assert!(graph.nodes().all(|n| n.cached_value.is_null()));
}

#[test]
fn test_label_defaults_to_id() {
    let mut graph = DependencyGraph::new();
    graph.set_node("x", node(&[])).unwrap();
    graph.set_node("y", node(&[]).with_label("Yield")).unwrap();
    assert_eq!(graph.get("x").unwrap().label, "x");
    assert_eq!(graph.get("y").unwrap().label, "Yield");
}

#[test]
fn test_dependents() {
    let graph = chain();
    assert_eq!(graph.dependents("a"), vec!["b"]);
    assert_eq!(graph.dependents("b"), vec!["c"]);
    assert!(graph.dependents("c").is_empty());
}

#[test]
fn test_topological_order() {
    let mut graph = DependencyGraph::new();
    graph.set_node("total", node(&["price", "qty"])).unwrap();
    graph.set_node("qty", node(&[])).unwrap();
    graph.set_node("price", node(&["rate"])).unwrap();
    graph.set_node("rate", node(&[])).unwrap();

    assert_eq!(graph.topological_order(), vec!["qty", "rate", "price", "total"]);
}

#[test]
fn test_topological_order_ignores_external_dependencies() {
    let mut graph = DependencyGraph::new();
    graph.set_node("x", node(&["SomeField"])).unwrap();
    assert_eq!(graph.topological_order(), vec!["x"]);
}

// ============================================================================
// Cycles
// ============================================================================

#[test]
fn test_self_reference_is_rejected() {
    let mut graph = DependencyGraph::new();
    let err = graph.set_node("a", node(&["a"])).unwrap_err();
    assert_eq!(
        err,
        GraphError::CyclicDependency {
            path: vec!["a".to_string(), "a".to_string()]
        }
    );
    assert!(graph.is_empty());
}

#[test]
fn test_indirect_cycle_is_rejected_and_graph_unchanged() {
    let mut graph = chain();
    let err = graph.set_node("a", node(&["c"])).unwrap_err();

    match err {
        GraphError::CyclicDependency { path } => {
            assert_eq!(path, vec!["a", "c", "b", "a"]);
        }
    }
    assert!(graph.get("a").unwrap().dependencies.is_empty());
}

#[test]
fn test_engine_reports_cycles_as_define_errors() {
    let mut engine = abc_engine();
    let err = engine.define_formula("a", "#c + 1").unwrap_err();
    assert!(matches!(err, DefineError::Graph(GraphError::CyclicDependency { .. })));
    assert!(err.to_string().starts_with("Cyclic dependency: a -> c"));

    // The old definition is still in place
    let ctx = EvalContext::new();
    assert_eq!(engine.evaluate_node("c", &ctx).value, Value::Integer(20));
}

// ============================================================================
// Dirtying and caching
// ============================================================================

#[test]
fn test_mark_dirty_reaches_transitive_dependents_only() {
    let mut engine = abc_engine();
    engine.define_formula("d", "5").unwrap();
    let ctx = EvalContext::new();
    engine.recompute_all(&ctx);
    assert!(engine.graph().nodes().all(|n| !n.dirty));

    engine.invalidate("a");
    let graph = engine.graph();
    assert!(graph.get("a").unwrap().dirty);
    assert!(graph.get("b").unwrap().dirty);
    assert!(graph.get("c").unwrap().dirty);
    assert!(!graph.get("d").unwrap().dirty);
}

#[test]
fn test_second_evaluation_comes_from_cache() {
    let mut engine = abc_engine();
    let ctx = EvalContext::new();

    let first = engine.evaluate_node("c", &ctx);
    assert_eq!(first.value, Value::Integer(20));
    assert!(!first.from_cache);
    assert!(!first.steps.is_empty());

    let second = engine.evaluate_node("c", &ctx);
    assert_eq!(second.value, Value::Integer(20));
    assert!(second.from_cache);
    assert!(second.steps.is_empty());
}

#[test]
fn test_redefinition_propagates() {
    let mut engine = abc_engine();
    let ctx = EvalContext::new();
    assert_eq!(engine.evaluate_node("c", &ctx).value, Value::Integer(20));

    engine.define_formula("a", "4").unwrap();
    assert!(engine.graph().get("c").unwrap().dirty);
    assert_eq!(engine.evaluate_node("c", &ctx).value, Value::Integer(50));
}

#[test]
fn test_evaluation_records_timestamp_and_value() {
    let mut engine = abc_engine();
    engine.evaluate_node("b", &EvalContext::new());

    let b = engine.graph().get("b").unwrap();
    assert_eq!(b.cached_value, Value::Integer(2));
    assert!(b.last_evaluated_at.is_some());
    assert!(b.last_error.is_none());
    // Evaluating b brought a up to date as well
    assert!(!engine.graph().get("a").unwrap().dirty);
}

#[test]
fn test_clear_cache() {
    let mut engine = abc_engine();
    let ctx = EvalContext::new();
    engine.recompute_all(&ctx);

    engine.clear_cache();
    assert!(engine.graph().nodes().all(|n| n.dirty && n.cached_value.is_null()));
    assert!(!engine.evaluate_node("c", &ctx).from_cache);
}

#[test]
fn test_failed_nodes_are_retried() {
    let mut engine = Engine::new();
    engine.define_formula("ratio", "10 / 0").unwrap();
    let ctx = EvalContext::new();

    let first = engine.evaluate_node("ratio", &ctx);
    assert_eq!(first.error, Some(EvalError::DivisionByZero));
    let node = engine.graph().get("ratio").unwrap();
    assert_eq!(node.last_error, Some(EvalError::DivisionByZero));
    assert!(node.cached_value.is_null());

    let second = engine.evaluate_node("ratio", &ctx);
    assert!(!second.from_cache);
    assert_eq!(second.error, Some(EvalError::DivisionByZero));
}

// ============================================================================
// Removal and lookup failures
// ============================================================================

#[test]
fn test_remove_node_dirties_dependents() {
    let mut engine = abc_engine();
    let ctx = EvalContext::new();
    engine.recompute_all(&ctx);

    assert!(engine.remove_node("b"));
    assert!(!engine.remove_node("b"));
    assert!(engine.graph().get("c").unwrap().dirty);
    assert!(!engine.graph().get("a").unwrap().dirty);
}

#[test]
fn test_unknown_node() {
    let mut engine = Engine::new();
    let result = engine.evaluate_node("ghost", &EvalContext::new());
    assert_eq!(result.value, Value::Null);
    assert_eq!(result.error, Some(EvalError::NodeNotFound("ghost".to_string())));
    assert_eq!(result.error.map(|e| e.kind()), Some(ErrorKind::NodeNotFound));
}

#[test]
fn test_reference_to_removed_node_is_not_found() {
    let mut engine = abc_engine();
    let ctx = EvalContext::new();
    assert_eq!(engine.evaluate_node("b", &ctx).value, Value::Integer(2));

    engine.remove_node("a");
    let result = engine.evaluate_node("b", &ctx);
    assert_eq!(result.value, Value::Null);
    assert_eq!(result.error, Some(EvalError::NodeNotFound("a".to_string())));
    assert!(result.warnings.is_empty());

    let direct = engine.evaluate_formula("#a * 2", None, &ctx);
    assert_eq!(direct.error, Some(EvalError::NodeNotFound("a".to_string())));

    engine.define_formula("a", "7").unwrap();
    assert_eq!(engine.evaluate_node("b", &ctx).value, Value::Integer(8));
}

#[test]
fn test_unknown_set_reference_still_only_warns() {
    let mut engine = Engine::new();
    engine.define_formula("orders", "#Orders.COUNT()").unwrap();

    let result = engine.evaluate_node("orders", &EvalContext::new());
    assert_eq!(result.value, Value::Integer(0));
    assert_eq!(result.warnings, vec!["Unresolved reference: Orders"]);
}

#[test]
fn test_explicit_node_reference_to_missing_node() {
    let mut engine = Engine::new();
    engine
        .define_node(
            "orphan",
            NodeDefinition::from_pipeline(Pipeline::from(vec![Step::connect("#gone")])),
        )
        .unwrap();

    let result = engine.evaluate_node("orphan", &EvalContext::new());
    assert_eq!(result.error, Some(EvalError::NodeNotFound("gone".to_string())));
}

#[test]
fn test_pipeline_definitions_get_dependencies() {
    let mut engine = Engine::new();
    engine
        .define_node(
            "count",
            NodeDefinition::from_pipeline(
                Pipeline::default()
                    .then(Step::connect("Tasks"))
                    .then(Step::synthesize(pipeform::AggregationMode::Count)),
            ),
        )
        .unwrap();

    let node = engine.graph().get("count").unwrap();
    assert_eq!(node.dependencies, vec!["Tasks"]);
    assert_eq!(node.declared_type, pipeform::ReturnType::Number);
}

#[test]
fn test_failed_dependency_runs_once_per_evaluation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut engine = Engine::new();
    engine.register_function("FLAKY", move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(EvalError::Function("flaky".to_string()))
    });
    engine.define_formula("source", "FLAKY()").unwrap();
    engine.define_formula("reader", "#source").unwrap();

    let result = engine.evaluate_node("reader", &EvalContext::new());
    assert_eq!(result.error, Some(EvalError::Function("flaky".to_string())));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // A new evaluation retries the failed node
    engine.evaluate_node("reader", &EvalContext::new());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_dependency_warnings_reach_the_dependent() {
    let mut engine = Engine::new();
    engine.define_formula("ghost", "#Nowhere.COUNT()").unwrap();
    engine.define_formula("wrapper", "#ghost + 1").unwrap();

    let result = engine.evaluate_node("wrapper", &EvalContext::new());
    assert_eq!(result.value, Value::Integer(1));
    assert_eq!(result.warnings, vec!["Unresolved reference: Nowhere"]);
}

#[test]
fn test_depth_limit() {
    let mut engine = Engine::with_config(pipeform::EvaluatorConfig::new().with_max_depth(2));
    engine.define_formula("n1", "1").unwrap();
    engine.define_formula("n2", "#n1 + 1").unwrap();
    engine.define_formula("n3", "#n2 + 1").unwrap();

    let result = engine.evaluate_node("n3", &EvalContext::new());
    assert_eq!(result.error, Some(EvalError::DepthExceeded(2)));
}
