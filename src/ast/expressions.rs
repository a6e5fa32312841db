use serde::{Deserialize, Serialize};

use crate::ast::{AggregationMode, BinOp, Condition, UnaryOp};
use crate::value::Value;

/// Abstract Syntax Tree node representing a parsed formula.
///
/// Produced once by the parser and never mutated; the compiler lowers it to a
/// pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal string, number, boolean or null
    ///
    /// # Example
    /// ```text
    /// 42
    /// "open"
    /// TRUE
    /// ```
    Literal { value: Value, data_type: DataType },

    /// Field of the current record, braced or bare, with an optional filter
    ///
    /// # Examples
    /// ```text
    /// {Unit Price}
    /// Amount
    /// {Tags}[Name = "urgent"]
    /// ```
    Field {
        name: String,
        filter: Option<Condition>,
    },

    /// Reference to another node or a relational set
    ///
    /// # Examples
    /// ```text
    /// #Orders
    /// #Tasks[Status = "open"]
    /// ```
    NodeRef {
        name: String,
        filter: Option<Condition>,
    },

    /// Property access on the result of another expression
    ///
    /// # Example
    /// ```text
    /// #LineItems.Amount
    /// ```
    Property { source: Box<Expr>, name: String },

    /// Aggregation suffix
    ///
    /// # Examples
    /// ```text
    /// #Orders.SUM()
    /// #Orders.SUM(Amount)
    /// #Tags.CONCAT(" | ")
    /// ```
    Aggregation {
        source: Box<Expr>,
        mode: AggregationMode,
        /// Property projected from each element before reducing
        property: Option<String>,
        /// CONCAT separator
        separator: Option<String>,
    },

    /// Function call. Method-style calls (`{Name}.UPPER()`) become a call
    /// with the receiver as first argument.
    ///
    /// # Example
    /// ```text
    /// IF({Score} > 50, "pass", "fail")
    /// ```
    Function { name: String, args: Vec<Expr> },

    /// Binary operation (arithmetic or comparison)
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Unary operation
    Unary { op: UnaryOp, operand: Box<Expr> },
}

impl Expr {
    pub fn number(n: i64) -> Expr {
        Expr::Literal {
            value: Value::Integer(n),
            data_type: DataType::Number,
        }
    }

    pub fn text(s: impl Into<String>) -> Expr {
        Expr::Literal {
            value: Value::String(s.into()),
            data_type: DataType::Text,
        }
    }

    pub fn field(name: impl Into<String>) -> Expr {
        Expr::Field {
            name: name.into(),
            filter: None,
        }
    }
}

/// Declared type of a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Number,
    Text,
    Boolean,
    Null,
}

impl DataType {
    pub fn of(value: &Value) -> DataType {
        match value {
            Value::Integer(_) | Value::Float(_) => DataType::Number,
            Value::Boolean(_) => DataType::Boolean,
            Value::Null => DataType::Null,
            _ => DataType::Text,
        }
    }
}
