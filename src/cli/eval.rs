//! Parse, inspect and evaluate formulas from the command line

use std::path::PathBuf;

use serde_json::json;

use super::{CliError, Workbook};
use crate::{EvalContext, Evaluation, Engine, Record};

/// Options for the eval command
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// Formula text
    pub formula: String,
    /// JSON record the formula is evaluated against
    pub record: Option<String>,
    /// Workbook whose sets and nodes the formula may reference
    pub workbook: Option<PathBuf>,
}

/// Compiled pipeline, dependencies and return type as JSON.
pub fn execute_parse(formula: &str) -> Result<serde_json::Value, CliError> {
    Ok(serde_json::to_value(crate::parse_formula(formula))?)
}

pub fn execute_inspect(formula: &str) -> Vec<String> {
    crate::inspect_formula(formula)
}

/// Evaluate one formula. Evaluation failures are returned inside the
/// [`Evaluation`], not as `Err`.
pub fn execute_eval(options: &EvalOptions) -> Result<Evaluation, CliError> {
    let mut engine = match &options.workbook {
        Some(path) => Workbook::load(path)?.into_engine()?,
        None => Engine::new(),
    };

    let record = match &options.record {
        Some(text) => Some(Record::from_json(serde_json::from_str(text)?)),
        None => None,
    };

    Ok(engine.evaluate_formula(&options.formula, record, &EvalContext::new()))
}

/// Recompute every node of a workbook in dependency order.
pub fn execute_run(path: &PathBuf) -> Result<Vec<(String, Evaluation)>, CliError> {
    let mut engine = Workbook::load(path)?.into_engine()?;
    Ok(engine.recompute_all(&EvalContext::new()))
}

/// JSON report of an evaluation; the step trace is included on request.
pub fn evaluation_to_json(evaluation: &Evaluation, include_trace: bool) -> serde_json::Value {
    let mut out = json!({ "value": evaluation.value });
    if let Some(error) = &evaluation.error {
        out["error"] = json!(error.to_string());
        out["kind"] = json!(error.kind());
    }
    if !evaluation.warnings.is_empty() {
        out["warnings"] = json!(evaluation.warnings);
    }
    if evaluation.from_cache {
        out["fromCache"] = json!(true);
    }
    if include_trace {
        out["steps"] = json!(evaluation.steps);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_reads_the_record_option() {
        let options = EvalOptions {
            formula: "{Price} * {Qty}".to_string(),
            record: Some(r#"{"Price": 10, "Qty": 3}"#.to_string()),
            workbook: None,
        };
        let evaluation = execute_eval(&options).unwrap();
        assert_eq!(evaluation_to_json(&evaluation, false), json!({"value": 30}));
    }

    #[test]
    fn failures_report_error_and_kind() {
        let options = EvalOptions {
            formula: "{X} / 0".to_string(),
            record: Some(r#"{"X": 4}"#.to_string()),
            workbook: None,
        };
        let report = evaluation_to_json(&execute_eval(&options).unwrap(), true);
        assert_eq!(report["value"], serde_json::Value::Null);
        assert_eq!(report["error"], json!("Division by zero"));
        assert_eq!(report["kind"], json!("DomainError"));
        assert_eq!(report["steps"][0]["operator"], json!("ALTER"));
    }

    #[test]
    fn parse_reports_position() {
        let compiled = execute_parse("{Amount} +").unwrap();
        assert_eq!(compiled["returnType"], json!("error"));
        assert_eq!(compiled["position"], json!(10));
        assert_eq!(compiled["pipeline"], json!([]));
    }
}
