//! Named computed results and the dependencies between them.
//!
//! Each [`GraphNode`] owns a compiled pipeline, the names it reads and its
//! cached result. A node's cache is valid only while it is clean; redefining
//! or invalidating a node dirties it together with every node that depends on
//! it, directly or transitively. Cycles are rejected when a node is defined.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    compiler::{ReturnType, extract_dependencies, infer_return_type},
    evaluator::EvalError,
    pipeline::Pipeline,
    value::Value,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("Cyclic dependency: {}", .path.join(" -> "))]
    CyclicDependency { path: Vec<String> },
}

/// What a node is built from.
///
/// `formula` is kept for display; evaluation only ever runs `pipeline`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default)]
    pub pipeline: Pipeline,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, rename = "returnType")]
    pub declared_type: ReturnType,
}

impl NodeDefinition {
    /// Definition from an already compiled pipeline; dependencies and return
    /// type are read off the pipeline.
    pub fn from_pipeline(pipeline: Pipeline) -> Self {
        NodeDefinition {
            dependencies: extract_dependencies(&pipeline),
            declared_type: infer_return_type(&pipeline),
            pipeline,
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub formula: Option<String>,
    pub pipeline: Pipeline,
    pub dependencies: Vec<String>,
    pub declared_type: ReturnType,
    pub cached_value: Value,
    pub last_error: Option<EvalError>,
    pub dirty: bool,
    pub last_evaluated_at: Option<DateTime<Utc>>,
}

impl GraphNode {
    fn new(id: String, definition: NodeDefinition) -> Self {
        GraphNode {
            label: definition.label.unwrap_or_else(|| id.clone()),
            id,
            formula: definition.formula,
            pipeline: definition.pipeline,
            dependencies: definition.dependencies,
            declared_type: definition.declared_type,
            cached_value: Value::Null,
            last_error: None,
            dirty: true,
            last_evaluated_at: None,
        }
    }

    pub fn depends_on(&self, id: &str) -> bool {
        self.dependencies.iter().any(|d| d == id)
    }
}

/// Nodes keyed by id, iterated in id order.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, GraphNode>,
    /// Ids removed and not redefined since
    removed: BTreeSet<String>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or wholly replace node `id`, dirtying it and its dependents.
    ///
    /// Fails without touching the graph when the new dependencies would
    /// close a cycle.
    pub fn set_node(&mut self, id: impl Into<String>, definition: NodeDefinition) -> Result<(), GraphError> {
        let id = id.into();
        if let Some(path) = self.find_cycle(&id, &definition.dependencies) {
            debug!("Rejecting node {}: cycle {:?}", id, path);
            return Err(GraphError::CyclicDependency { path });
        }

        debug!("Defining node {} with dependencies {:?}", id, definition.dependencies);
        self.removed.remove(&id);
        self.nodes.insert(id.clone(), GraphNode::new(id.clone(), definition));
        self.mark_dirty(&id);
        Ok(())
    }

    /// Path `id -> ... -> id` if any of `dependencies` reaches `id`.
    fn find_cycle(&self, id: &str, dependencies: &[String]) -> Option<Vec<String>> {
        let mut path = vec![id.to_string()];
        let mut visited = HashSet::new();
        dependencies
            .iter()
            .any(|dep| self.reaches(dep, id, &mut path, &mut visited))
            .then_some(path)
    }

    fn reaches(&self, current: &str, target: &str, path: &mut Vec<String>, visited: &mut HashSet<String>) -> bool {
        path.push(current.to_string());
        if current == target {
            return true;
        }
        if visited.insert(current.to_string())
            && let Some(node) = self.nodes.get(current)
        {
            for dep in &node.dependencies {
                if self.reaches(dep, target, path, visited) {
                    return true;
                }
            }
        }
        path.pop();
        false
    }

    /// Mark `id` and everything downstream of it dirty.
    pub fn mark_dirty(&mut self, id: &str) {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([id.to_string()]);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get_mut(&current) {
                node.dirty = true;
            }
            queue.extend(self.dependents(&current));
        }
        debug!("Invalidated {} node(s) starting at {}", visited.len(), id);
    }

    /// Ids of the nodes that list `id` as a dependency.
    pub fn dependents(&self, id: &str) -> Vec<String> {
        self.nodes
            .values()
            .filter(|n| n.depends_on(id))
            .map(|n| n.id.clone())
            .collect()
    }

    /// Every id after all of the ids it depends on; ties go by id.
    /// Dependencies that are not nodes are ignored.
    pub fn topological_order(&self) -> Vec<String> {
        let mut pending: BTreeMap<&str, BTreeSet<&str>> = self
            .nodes
            .values()
            .map(|n| {
                let deps = n
                    .dependencies
                    .iter()
                    .map(String::as_str)
                    .filter(|d| self.nodes.contains_key(*d))
                    .collect();
                (n.id.as_str(), deps)
            })
            .collect();

        let mut ready: BTreeSet<&str> = pending
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(next) = ready.pop_first() {
            pending.remove(next);
            order.push(next.to_string());
            for (id, deps) in pending.iter_mut() {
                if deps.remove(next) && deps.is_empty() {
                    ready.insert(*id);
                }
            }
        }

        // Only reachable if a cycle slipped in through hand-edited data.
        order.extend(pending.keys().map(|id| id.to_string()));
        order
    }

    /// Delete `id` only. Its dependents are dirtied and will see a missing
    /// node when they next evaluate.
    pub fn remove_node(&mut self, id: &str) -> Option<GraphNode> {
        let removed = self.nodes.remove(id)?;
        self.removed.insert(id.to_string());
        for dependent in self.dependents(id) {
            self.mark_dirty(&dependent);
        }
        debug!("Removed node {}", id);
        Some(removed)
    }

    /// Drop every cached value.
    pub fn clear_cache(&mut self) {
        for node in self.nodes.values_mut() {
            node.dirty = true;
            node.cached_value = Value::Null;
            node.last_error = None;
        }
    }

    pub(crate) fn store_result(&mut self, id: &str, value: Value, error: Option<EvalError>, at: DateTime<Utc>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.cached_value = value;
            node.last_error = error;
            node.dirty = false;
            node.last_evaluated_at = Some(at);
        }
    }

    pub fn get(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Whether `id` named a node that has since been removed.
    pub fn was_removed(&self, id: &str) -> bool {
        self.removed.contains(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
