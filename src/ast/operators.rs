use std::fmt;

use serde::{Deserialize, Serialize};

/// Binary operators.
///
/// Arithmetic operators and comparisons share one ALTER/arithmetic step shape;
/// the serialized names are the ones persisted in pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    // Arithmetic
    /// Addition or string concatenation (`+`)
    #[serde(rename = "add")]
    Add,
    /// Subtraction (`-`)
    #[serde(rename = "subtract")]
    Subtract,
    /// Multiplication (`*`)
    #[serde(rename = "multiply")]
    Multiply,
    /// Division (`/`)
    #[serde(rename = "divide")]
    Divide,
    /// Modulo (`%`)
    #[serde(rename = "mod")]
    Modulo,
    /// Exponentiation (`^`)
    #[serde(rename = "power")]
    Power,

    // Comparison
    /// Equal (`=`, `==`)
    #[serde(rename = "eq")]
    Equal,
    /// Not equal (`!=`, `<>`)
    #[serde(rename = "ne")]
    NotEqual,
    /// Less than (`<`)
    #[serde(rename = "lt")]
    LessThan,
    /// Greater than (`>`)
    #[serde(rename = "gt")]
    GreaterThan,
    /// Less than or equal (`<=`)
    #[serde(rename = "le")]
    LessEqual,
    /// Greater than or equal (`>=`)
    #[serde(rename = "ge")]
    GreaterEqual,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Equal
                | BinOp::NotEqual
                | BinOp::LessThan
                | BinOp::GreaterThan
                | BinOp::LessEqual
                | BinOp::GreaterEqual
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Subtract => "-",
            BinOp::Multiply => "*",
            BinOp::Divide => "/",
            BinOp::Modulo => "%",
            BinOp::Power => "^",
            BinOp::Equal => "=",
            BinOp::NotEqual => "!=",
            BinOp::LessThan => "<",
            BinOp::GreaterThan => ">",
            BinOp::LessEqual => "<=",
            BinOp::GreaterEqual => ">=",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators. Only negation exists; the compiler lowers it to a
/// multiplication by `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
}

/// Reduction applied by a SYNTHESIZE step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregationMode {
    Sum,
    Count,
    Avg,
    Min,
    Max,
    First,
    Last,
    Concat,
    Collect,
}

impl AggregationMode {
    /// Looks up an aggregation suffix such as `SUM` in `#Orders.SUM()`.
    ///
    /// Matching is case-insensitive; anything outside the fixed vocabulary is
    /// an ordinary property or method call.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "SUM" => Some(AggregationMode::Sum),
            "COUNT" => Some(AggregationMode::Count),
            "AVG" => Some(AggregationMode::Avg),
            "MIN" => Some(AggregationMode::Min),
            "MAX" => Some(AggregationMode::Max),
            "FIRST" => Some(AggregationMode::First),
            "LAST" => Some(AggregationMode::Last),
            "CONCAT" => Some(AggregationMode::Concat),
            "COLLECT" => Some(AggregationMode::Collect),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AggregationMode::Sum => "SUM",
            AggregationMode::Count => "COUNT",
            AggregationMode::Avg => "AVG",
            AggregationMode::Min => "MIN",
            AggregationMode::Max => "MAX",
            AggregationMode::First => "FIRST",
            AggregationMode::Last => "LAST",
            AggregationMode::Concat => "CONCAT",
            AggregationMode::Collect => "COLLECT",
        }
    }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
