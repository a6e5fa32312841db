//! Workbook files: relational sets plus named nodes, in one JSON document.
//!
//! ```text
//! {
//!   "sets": {"Orders": [{"id": "o1", "values": {"Total": 12}}]},
//!   "nodes": [
//!     {"id": "revenue", "formula": "#Orders.Total.SUM()"},
//!     {"id": "doubled", "pipeline": [{"operator": "CONNECT", "source": "revenue"}]}
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use super::CliError;
use crate::{Engine, EvaluatorConfig, MemorySource, NodeDefinition, Pipeline, RecordSet};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Workbook {
    /// Set name to a bare record array or `{"records", "fields"}`
    #[serde(default)]
    pub sets: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub nodes: Vec<WorkbookNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkbookNode {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub pipeline: Option<Pipeline>,
}

impl Workbook {
    pub fn from_json_str(text: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = fs::read_to_string(path)?;
        debug!("Loading workbook {}", path.display());
        Self::from_json_str(&text)
    }

    pub fn data_source(&self) -> Result<MemorySource, CliError> {
        let mut source = MemorySource::new();
        for (name, json) in &self.sets {
            source.insert(RecordSet::from_json(name.clone(), json.clone())?);
        }
        Ok(source)
    }

    /// An engine over this workbook's sets with every node defined.
    pub fn into_engine(self) -> Result<Engine, CliError> {
        let config = EvaluatorConfig::new().with_data_source(self.data_source()?);
        let mut engine = Engine::with_config(config);

        for node in self.nodes {
            let definition = NodeDefinition {
                label: node.label,
                formula: node.formula,
                pipeline: node.pipeline.unwrap_or_default(),
                ..NodeDefinition::default()
            };
            engine
                .define_node(&node.id, definition)
                .map_err(|source| CliError::Define { id: node.id, source })?;
        }
        Ok(engine)
    }
}
