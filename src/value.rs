use std::collections::HashMap;

use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

/// A value flowing through a formula pipeline.
///
/// This type represents all JSON types plus [`Record`], the normalized shape
/// of a row from a relational set. Integers and floats are kept apart.
///
/// # Type Preservation
///
/// - Arithmetic operations maintain integer types when results are whole
/// - Mixed operations go through high-precision decimals to avoid
///   floating-point drift (`0.1 + 0.2 == 0.3`)
///
/// # Examples
///
/// ```
/// use pipeform::{Record, Value};
///
/// let total = Value::Integer(42);
/// let name = Value::from("Widget");
///
/// let record = Record::new("rec1").with_field("Amount", Value::Integer(5));
/// assert_eq!(Value::Record(record).field("Amount"), Some(&Value::Integer(5)));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    /// JSON null
    #[default]
    Null,

    /// JSON boolean (true/false)
    Boolean(bool),

    /// Floating-point number
    Float(f64),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// UTF-8 string
    String(String),

    /// Array of values (homogeneous or heterogeneous)
    Array(Vec<Value>),

    /// Plain object with string keys
    Object(HashMap<String, Value>),

    /// A row of a relational set
    Record(Record),
}

/// A single row of a relational set, normalized from whatever JSON shape the
/// host supplied.
///
/// Hosts hand records over either flat (`{"Amount": 5}`) or wrapped
/// (`{"id": "r1", "values": {"Amount": 5}}`). Both land here once, at the
/// boundary, so the evaluator only ever sees one shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub id: Option<String>,
    pub fields: HashMap<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Record {
            id: Some(id.into()),
            fields: HashMap::new(),
        }
    }

    /// A record without a stored id.
    pub fn anonymous() -> Self {
        Record::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Normalize a JSON record in either the flat or the `values`-wrapped shape.
    pub fn from_json(value: serde_json::Value) -> Record {
        match value {
            serde_json::Value::Object(mut obj) => {
                let id = obj.get("id").and_then(json_id);
                let fields = match obj.remove("values") {
                    Some(serde_json::Value::Object(values)) => values,
                    Some(other) => {
                        obj.insert("values".to_string(), other);
                        obj
                    }
                    None => obj,
                };
                Record {
                    id,
                    fields: fields.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
                }
            }
            _ => Record::default(),
        }
    }
}

fn json_id(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Value {
    /// Check if the value is truthy (for conditions)
    pub fn is_truthy(&self) -> bool {
        use Value::*;
        match self {
            Null => false,
            Boolean(b) => *b,
            Float(n) => *n != 0.0 && !n.is_nan(),
            Integer(n) => *n != 0,
            String(s) => !s.is_empty(),
            Array(arr) => !arr.is_empty(),
            Object(obj) => !obj.is_empty(),
            Record(_) => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null, the empty string and the empty array all count as "empty".
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(arr) => arr.is_empty(),
            _ => false,
        }
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric coercion: numbers as-is, strings when they parse as a number.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) if n.is_finite() => Some(*n),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Like [`Value::to_number`] but keeps integers as `Value::Integer`.
    pub fn to_numeric_value(&self) -> Option<Value> {
        match self {
            Value::Integer(_) => Some(self.clone()),
            Value::Float(n) if n.is_finite() => Some(self.clone()),
            Value::String(s) => {
                let s = s.trim();
                if let Ok(n) = s.parse::<i64>() {
                    Some(Value::Integer(n))
                } else {
                    s.parse::<f64>().ok().filter(|n| n.is_finite()).map(Value::Float)
                }
            }
            _ => None,
        }
    }

    /// Get as string (concatenation)
    pub fn as_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Float(n) => n.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Null => "null".to_string(),
            _ => crate::output::to_json(self),
        }
    }

    /// Text rendering used for string comparisons and concatenation:
    /// null becomes the empty string and arrays are joined with `", "`.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Array(arr) => arr.iter().map(Value::to_text).collect::<Vec<_>>().join(", "),
            other => other.as_string(),
        }
    }

    /// Read a named field of a record or object.
    ///
    /// An object's `values` wrapper is unwrapped transparently.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(record) => record.get(name),
            Value::Object(obj) => match obj.get("values") {
                Some(Value::Object(inner)) => inner.get(name).or_else(|| obj.get(name)),
                Some(Value::Record(inner)) => inner.get(name).or_else(|| obj.get(name)),
                _ => obj.get(name),
            },
            _ => None,
        }
    }

    /// Equality used by filters and SWITCH: numeric when both sides coerce to
    /// numbers, otherwise by text rendering.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self.to_number(), other.to_number()) {
            (Some(a), Some(b)) => a == b,
            _ => match (self, other) {
                (Value::Boolean(a), Value::Boolean(b)) => a == b,
                _ => self.to_text() == other.to_text(),
            },
        }
    }

    pub fn is_record_like(&self) -> bool {
        matches!(self, Value::Record(_) | Value::Object(_))
    }

    /// Returns a human-readable type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Record(_) => "record",
        }
    }

    pub(crate) fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Integer(n) => Decimal::from_i64(*n),
            Value::Float(n) => Decimal::from_f64(*n),
            _ => None,
        }
    }

    /// Converts a decimal result back, preferring an integer when the result
    /// is whole.
    pub(crate) fn from_decimal(d: Decimal) -> Option<Value> {
        if d.is_integer()
            && let Some(n) = d.to_i64()
        {
            return Some(Value::Integer(n));
        }
        d.to_f64().map(Value::Float)
    }

    /// Float result, collapsed to an integer when it is whole and in range.
    pub(crate) fn from_f64_lossy(n: f64) -> Value {
        if n.fract() == 0.0 && n.is_finite() && n.abs() < 9.0e15 {
            Value::Integer(n as i64)
        } else {
            Value::Float(n)
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else {
                    n.as_f64().map(Value::Float).unwrap_or(Value::Null)
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => {
                if matches!(obj.get("values"), Some(serde_json::Value::Object(_))) {
                    Value::Record(Record::from_json(serde_json::Value::Object(obj)))
                } else {
                    Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
                }
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(b),
            Value::Integer(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(arr) => {
                serde_json::Value::Array(arr.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Object(obj) => serde_json::Value::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
            Value::Record(record) => {
                let mut out = serde_json::Map::new();
                if let Some(id) = record.id {
                    out.insert("id".to_string(), serde_json::Value::String(id));
                }
                out.insert(
                    "values".to_string(),
                    serde_json::Value::Object(
                        record
                            .fields
                            .into_iter()
                            .map(|(k, v)| (k, serde_json::Value::from(v)))
                            .collect(),
                    ),
                );
                serde_json::Value::Object(out)
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(arr: Vec<Value>) -> Self {
        Value::Array(arr)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wrapped_and_flat_records_normalize_to_the_same_fields() {
        let wrapped = Record::from_json(json!({"id": "r1", "values": {"Amount": 5}}));
        let flat = Record::from_json(json!({"Amount": 5}));

        assert_eq!(wrapped.id.as_deref(), Some("r1"));
        assert_eq!(wrapped.get("Amount"), Some(&Value::Integer(5)));
        assert_eq!(flat.get("Amount"), Some(&Value::Integer(5)));
        assert_eq!(flat.id, None);
    }

    #[test]
    fn values_wrapper_is_unwrapped_on_plain_objects() {
        let mut inner = HashMap::new();
        inner.insert("Status".to_string(), Value::from("open"));
        let mut outer = HashMap::new();
        outer.insert("values".to_string(), Value::Object(inner));

        assert_eq!(Value::Object(outer).field("Status"), Some(&Value::from("open")));
    }

    #[test]
    fn record_survives_a_json_round_trip() {
        let record = Record::new("r9").with_field("Qty", Value::Integer(3));
        let json = serde_json::to_value(Value::Record(record.clone())).unwrap();
        let back: Value = serde_json::from_value(json).unwrap();
        assert_eq!(back, Value::Record(record));
    }

    #[test]
    fn numeric_coercion() {
        assert_eq!(Value::from(" 12.5 ").to_number(), Some(12.5));
        assert_eq!(Value::from("abc").to_number(), None);
        assert_eq!(Value::Null.to_number(), None);
        assert_eq!(Value::from("7").to_numeric_value(), Some(Value::Integer(7)));
    }

    #[test]
    fn loose_equality_coerces_numbers() {
        assert!(Value::from("5").loose_eq(&Value::Integer(5)));
        assert!(Value::Float(2.0).loose_eq(&Value::Integer(2)));
        assert!(Value::Null.loose_eq(&Value::from("")));
        assert!(!Value::from("open").loose_eq(&Value::from("closed")));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Integer(0).is_truthy());
        assert!(Value::Integer(-3).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::Record(Record::anonymous()).is_truthy());
    }
}
