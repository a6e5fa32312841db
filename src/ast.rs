//! # Formula Language - Abstract Syntax Tree
//!
//! This module defines the Abstract Syntax Tree (AST) for the formula
//! language: a small spreadsheet-style expression language whose programs are
//! compiled into operator pipelines over relational records.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes (literals, references, calls, operations)
//! - **[operators]** - Binary/unary operators and aggregation modes
//! - **[filter]** - Bracketed filter conditions
//!
//! ## Quick Start
//!
//! ```text
//! #Tasks[Status = "open"].COUNT()
//! ```
//!
//! Connects to the `Tasks` set, keeps open tasks and counts them.
//!
//! ## References
//!
//! - `{Name}` or `Name` reads a field of the current record
//! - `#Name` connects to another node or a relational set
//! - `.Name` projects a property, `.SUM()` and friends aggregate
//!
//! ## Precedence (low to high)
//!
//! 1. Comparison `= == != <> < <= > >=`
//! 2. Additive `+ -`
//! 3. Multiplicative `* / %`
//! 4. Unary minus
//! 5. Power `^`
//! 6. Postfix `.`
//! 7. Primary: parentheses, references, literals, function calls
//!
//! ## Examples
//!
//! ```text
//! {Price} * {Qty}
//! IF({Score} > 50, "pass", "fail")
//! #LineItems.Amount.SUM()
//! #Orders[Total >= 100].CONCAT(Customer, "; ")
//! ```
pub mod expressions;
pub mod filter;
pub mod operators;
pub mod tokens;

pub use expressions::{DataType, Expr};
pub use filter::{Condition, ConditionOp};
pub use operators::{AggregationMode, BinOp, UnaryOp};
pub use tokens::Token;
