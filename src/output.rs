//! Text rendering for values, evaluation traces and step descriptions.
//!
//! Values print as JSON with sorted object keys so descriptions and traces
//! are deterministic. Records print in their persisted `{"id", "values"}`
//! shape.
//!
//! # Examples
//!
//! ```
//! use pipeform::Value;
//! use pipeform::output::{to_json, to_json_pretty};
//!
//! let value = Value::Integer(42);
//! assert_eq!(to_json(&value), "42");
//! assert_eq!(to_json_pretty(&value), "42");
//! ```

use std::collections::HashMap;

use crate::evaluator::StepTrace;
use crate::value::{Record, Value};

pub struct JsonPrinter {
    pretty: bool,
}

impl JsonPrinter {
    pub fn new(pretty: bool) -> Self {
        JsonPrinter { pretty }
    }

    pub fn print(&self, value: &Value) -> String {
        self.print_value(value, 0)
    }

    fn print_value(&self, value: &Value, indent: usize) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Float(n) if n.is_finite() => n.to_string(),
            Value::Float(_) => "null".to_string(),
            Value::String(s) => format!("\"{}\"", self.escape_string(s)),
            Value::Array(arr) => self.print_array(arr, indent),
            Value::Object(obj) => {
                let entries: Vec<(&str, String)> = obj
                    .iter()
                    .map(|(k, v)| (k.as_str(), self.print_value(v, indent + 1)))
                    .collect();
                self.print_entries(entries, indent)
            }
            Value::Record(record) => self.print_record(record, indent),
        }
    }

    fn print_record(&self, record: &Record, indent: usize) -> String {
        let mut entries = vec![];
        if let Some(id) = &record.id {
            entries.push(("id", format!("\"{}\"", self.escape_string(id))));
        }
        entries.push(("values", self.print_fields(&record.fields, indent + 1)));
        self.print_entries(entries, indent)
    }

    fn print_fields(&self, fields: &HashMap<String, Value>, indent: usize) -> String {
        let entries: Vec<(&str, String)> = fields
            .iter()
            .map(|(k, v)| (k.as_str(), self.print_value(v, indent + 1)))
            .collect();
        self.print_entries(entries, indent)
    }

    fn print_array(&self, arr: &[Value], indent: usize) -> String {
        if arr.is_empty() {
            return "[]".to_string();
        }

        if self.pretty {
            let items: Vec<String> = arr
                .iter()
                .map(|v| {
                    format!(
                        "{}{}",
                        self.indent(indent + 1),
                        self.print_value(v, indent + 1)
                    )
                })
                .collect();
            format!("[\n{}\n{}]", items.join(",\n"), self.indent(indent))
        } else {
            let items: Vec<String> = arr.iter().map(|v| self.print_value(v, indent)).collect();
            format!("[{}]", items.join(","))
        }
    }

    /// Prints already-rendered entries, sorted by key.
    fn print_entries(&self, mut entries: Vec<(&str, String)>, indent: usize) -> String {
        if entries.is_empty() {
            return "{}".to_string();
        }
        entries.sort_by(|a, b| a.0.cmp(b.0));

        if self.pretty {
            let items: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}\"{}\": {}", self.indent(indent + 1), self.escape_string(k), v))
                .collect();
            format!("{{\n{}\n{}}}", items.join(",\n"), self.indent(indent))
        } else {
            let items: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("\"{}\":{}", self.escape_string(k), v))
                .collect();
            format!("{{{}}}", items.join(","))
        }
    }

    fn indent(&self, level: usize) -> String {
        "  ".repeat(level)
    }

    fn escape_string(&self, s: &str) -> String {
        s.chars()
            .flat_map(|c| match c {
                '"' => vec!['\\', '"'],
                '\\' => vec!['\\', '\\'],
                '\n' => vec!['\\', 'n'],
                '\r' => vec!['\\', 'r'],
                '\t' => vec!['\\', 't'],
                c if c.is_control() => format!("\\u{:04x}", c as u32).chars().collect(),
                c => vec![c],
            })
            .collect()
    }
}

/// Converts a Value to compact JSON text with sorted keys.
pub fn to_json(value: &Value) -> String {
    JsonPrinter::new(false).print(value)
}

/// Converts a Value to JSON text with 2-space indentation and sorted keys.
pub fn to_json_pretty(value: &Value) -> String {
    JsonPrinter::new(true).print(value)
}

/// One line per executed step: `1. DESIGNATE: null -> 10`.
pub fn format_trace(steps: &[StepTrace]) -> String {
    let mut out = String::new();
    for (i, step) in steps.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}: {} -> {}",
            i + 1,
            step.operator,
            to_json(&step.input),
            to_json(&step.output)
        ));
        if let Some(error) = &step.error {
            out.push_str(&format!(" ({})", error));
        }
        if let Some(warning) = &step.warning {
            out.push_str(&format!(" [warning: {}]", warning));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_prints_in_persisted_shape() {
        let record = Record::new("r1").with_field("b", Value::Integer(2)).with_field("a", "x");
        assert_eq!(
            to_json(&Value::Record(record)),
            r#"{"id":"r1","values":{"a":"x","b":2}}"#
        );
    }

    #[test]
    fn strings_are_escaped() {
        assert_eq!(to_json(&Value::from("a\"b\n")), r#""a\"b\n""#);
    }
}
