//! Compiled pipelines.
//!
//! A pipeline is an ordered list of [`Step`]s threading one running value.
//! Steps are a closed sum type over the six operators, so every consumer
//! matches them exhaustively. ALTER steps embed nested pipelines (arithmetic
//! operands, function arguments) that are evaluated on their own rather than
//! spliced into the parent sequence.
//!
//! # Persisted shape
//!
//! Pipelines serialize to a JSON array of step objects tagged by
//! `"operator"`; ALTER steps carry a second `"kind"` tag:
//!
//! ```text
//! [
//!   {"operator": "CONNECT", "source": "Tasks"},
//!   {"operator": "SEGMENT", "condition": {"field": "Status", "op": "eq", "value": "open"}},
//!   {"operator": "SYNTHESIZE", "mode": "COUNT"}
//! ]
//! ```
//!
//! Steps decode independently. A step that cannot be decoded becomes
//! [`Step::Malformed`], which fails only when evaluated.

use std::fmt;

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

use crate::ast::{AggregationMode, BinOp, Condition, DataType};
use crate::output::to_json;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operator", rename_all = "UPPERCASE")]
pub enum Step {
    /// Pull in another node's value or a relational set
    Connect { source: String },

    /// Keep the records that satisfy a condition
    Segment { condition: Condition },

    /// Read a property
    Designate { property: String },

    /// Reduce a collection
    Synthesize {
        mode: AggregationMode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        property: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        separator: Option<String>,
    },

    /// Literals, arithmetic and function calls
    Alter(Alter),

    /// Substitute a default for empty input
    Null {
        #[serde(default)]
        default: Value,
    },

    /// A persisted step that failed to decode
    Malformed {
        raw: serde_json::Value,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Alter {
    Literal {
        value: Value,
        #[serde(rename = "dataType")]
        data_type: DataType,
    },
    Arithmetic {
        op: BinOp,
        left: Pipeline,
        right: Pipeline,
    },
    Function {
        name: String,
        #[serde(default)]
        args: Vec<Pipeline>,
    },
}

impl Step {
    pub fn connect(source: impl Into<String>) -> Step {
        Step::Connect {
            source: source.into(),
        }
    }

    pub fn designate(property: impl Into<String>) -> Step {
        Step::Designate {
            property: property.into(),
        }
    }

    pub fn synthesize(mode: AggregationMode) -> Step {
        Step::Synthesize {
            mode,
            property: None,
            separator: None,
        }
    }

    pub fn literal(value: impl Into<Value>) -> Step {
        let value = value.into();
        Step::Alter(Alter::Literal {
            data_type: DataType::of(&value),
            value,
        })
    }

    /// Decode one persisted step, degrading to [`Step::Malformed`].
    pub fn from_json(raw: serde_json::Value) -> Step {
        match serde_json::from_value::<Step>(raw.clone()) {
            Ok(step) => step,
            Err(e) => {
                warn!("Keeping undecodable pipeline step as malformed: {}", e);
                Step::Malformed {
                    raw,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Operator name as recorded in traces.
    pub fn operator(&self) -> &str {
        match self {
            Step::Connect { .. } => "CONNECT",
            Step::Segment { .. } => "SEGMENT",
            Step::Designate { .. } => "DESIGNATE",
            Step::Synthesize { .. } => "SYNTHESIZE",
            Step::Alter(_) => "ALTER",
            Step::Null { .. } => "NULL",
            Step::Malformed { raw, .. } => raw
                .get("operator")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("UNKNOWN"),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Connect { source } => write!(f, "CONNECT {}", source),
            Step::Segment { condition } => write!(f, "SEGMENT where {}", condition),
            Step::Designate { property } => write!(f, "DESIGNATE {}", property),
            Step::Synthesize {
                mode,
                property,
                separator,
            } => {
                write!(f, "SYNTHESIZE {}", mode)?;
                if let Some(property) = property {
                    write!(f, " of {}", property)?;
                }
                if let Some(separator) = separator {
                    write!(f, " separated by {}", to_json(&Value::from(separator.as_str())))?;
                }
                Ok(())
            }
            Step::Alter(Alter::Literal { value, .. }) => {
                write!(f, "ALTER literal {}", to_json(value))
            }
            Step::Alter(Alter::Arithmetic { op, left, right }) => {
                write!(f, "ALTER [{}] {} [{}]", left, op, right)
            }
            Step::Alter(Alter::Function { name, args }) => {
                write!(f, "ALTER {}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "[{}]", arg)?;
                }
                f.write_str(")")
            }
            Step::Null { default } => write!(f, "NULL default {}", to_json(default)),
            Step::Malformed { reason, .. } => write!(f, "MALFORMED {} ({})", self.operator(), reason),
        }
    }
}

/// An ordered sequence of steps.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Pipeline(pub Vec<Step>);

impl Pipeline {
    pub fn new() -> Self {
        Pipeline(Vec::new())
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Step> {
        self.0.last()
    }

    pub fn push(&mut self, step: Step) {
        self.0.push(step);
    }

    pub fn then(mut self, step: Step) -> Self {
        self.0.push(step);
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Decode a persisted pipeline. Only a document that is not a JSON array
    /// fails as a whole; individual bad steps become [`Step::Malformed`].
    pub fn from_json(text: &str) -> serde_json::Result<Pipeline> {
        serde_json::from_str(text)
    }
}

impl<'de> Deserialize<'de> for Pipeline {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
        Ok(Pipeline(raw.into_iter().map(Step::from_json).collect()))
    }
}

impl From<Vec<Step>> for Pipeline {
    fn from(steps: Vec<Step>) -> Self {
        Pipeline(steps)
    }
}

impl<'a> IntoIterator for &'a Pipeline {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}
