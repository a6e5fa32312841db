use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Test applied by a bracketed filter (`#Tasks[Status = "open"]`) and by the
/// SEGMENT step it compiles to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Field of each record that is tested
    pub field: String,
    pub op: ConditionOp,
    /// Right-hand side; ignored by `isEmpty` / `isNotEmpty`
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: ConditionOp, value: impl Into<Value>) -> Self {
        Condition {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.op.takes_value() {
            write!(f, "{} {} {}", self.field, self.op, crate::output::to_json(&self.value))
        } else {
            write!(f, "{} {}", self.field, self.op)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
}

impl ConditionOp {
    /// Word operators usable inside a filter: `[Name contains "ab"]`, `[Notes isEmpty]`.
    pub fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "contains" => Some(ConditionOp::Contains),
            "startswith" => Some(ConditionOp::StartsWith),
            "endswith" => Some(ConditionOp::EndsWith),
            "isempty" => Some(ConditionOp::IsEmpty),
            "isnotempty" => Some(ConditionOp::IsNotEmpty),
            _ => None,
        }
    }

    pub fn takes_value(self) -> bool {
        !matches!(self, ConditionOp::IsEmpty | ConditionOp::IsNotEmpty)
    }
}

impl fmt::Display for ConditionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConditionOp::Eq => "=",
            ConditionOp::Ne => "!=",
            ConditionOp::Gt => ">",
            ConditionOp::Ge => ">=",
            ConditionOp::Lt => "<",
            ConditionOp::Le => "<=",
            ConditionOp::Contains => "contains",
            ConditionOp::StartsWith => "startsWith",
            ConditionOp::EndsWith => "endsWith",
            ConditionOp::IsEmpty => "isEmpty",
            ConditionOp::IsNotEmpty => "isNotEmpty",
        };
        f.write_str(s)
    }
}
