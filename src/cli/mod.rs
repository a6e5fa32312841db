//! CLI support for pipeform
//!
//! Provides programmatic access to the `pipeform` subcommands so other tools
//! can embed them.

mod docs;
mod eval;
mod workbook;

pub use docs::{DocCategory, get_doc_category, get_docs_overview};
pub use eval::{EvalOptions, evaluation_to_json, execute_eval, execute_inspect, execute_parse, execute_run};
pub use workbook::{Workbook, WorkbookNode};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    /// Formula did not parse
    #[error("Parse error: {0}")]
    Parse(#[from] crate::ParseError),

    /// Evaluation failed
    #[error("Evaluation error: {0}")]
    Eval(#[from] crate::EvalError),

    /// A workbook node could not be defined
    #[error("Invalid node {id}: {source}")]
    Define {
        id: String,
        #[source]
        source: crate::DefineError,
    },

    /// JSON parsing error
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Unknown documentation category
    #[error("Unknown category: '{0}'\nRun 'pipeform docs' to see available categories.")]
    UnknownCategory(String),
}
