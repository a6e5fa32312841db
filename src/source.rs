//! Relational data supplied by the host.
//!
//! CONNECT steps resolve names that are not graph nodes through a
//! [`DataSource`]: first as a relational set, then as linked records of the
//! current record.

use std::collections::HashMap;

use serde::Deserialize;

use crate::value::{Record, Value};

/// Declared field of a relational set. Records may store values under either
/// the id or the display name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldDef {
    pub id: String,
    pub name: String,
}

/// A named collection of records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSet {
    pub name: String,
    pub records: Vec<Record>,
    pub fields: Vec<FieldDef>,
}

impl RecordSet {
    pub fn new(name: impl Into<String>, records: Vec<Record>) -> Self {
        RecordSet {
            name: name.into(),
            records,
            fields: vec![],
        }
    }

    pub fn with_fields(mut self, fields: Vec<FieldDef>) -> Self {
        self.fields = fields;
        self
    }

    /// Accepts either a bare array of records or
    /// `{"records": [...], "fields": [{"id", "name"}]}`.
    pub fn from_json(name: impl Into<String>, json: serde_json::Value) -> Result<Self, serde_json::Error> {
        let name = name.into();
        match json {
            serde_json::Value::Array(rows) => Ok(RecordSet::new(
                name,
                rows.into_iter().map(Record::from_json).collect(),
            )),
            serde_json::Value::Object(mut obj) => {
                let records = match obj.remove("records") {
                    Some(serde_json::Value::Array(rows)) => {
                        rows.into_iter().map(Record::from_json).collect()
                    }
                    _ => vec![],
                };
                let fields = match obj.remove("fields") {
                    Some(fields) => serde_json::from_value(fields)?,
                    None => vec![],
                };
                Ok(RecordSet {
                    name,
                    records,
                    fields,
                })
            }
            _ => Ok(RecordSet::new(name, vec![])),
        }
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_id(&self, id: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.records.iter().cloned().map(Value::Record).collect())
    }
}

/// Host-side resolvers consulted by CONNECT.
pub trait DataSource: Send + Sync {
    /// Look up a relational set by name.
    fn get_set(&self, name: &str) -> Option<RecordSet>;

    /// Records linked from `record` through the field `field` (name or id).
    fn linked_records(&self, _record: &Record, _field: &str) -> Option<Vec<Record>> {
        None
    }
}

/// In-memory [`DataSource`] keyed by set name.
///
/// Linked records are read from the record's own field: embedded records are
/// used as they are, string ids are looked up across every set.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    sets: HashMap<String, RecordSet>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_set(mut self, set: RecordSet) -> Self {
        self.insert(set);
        self
    }

    pub fn insert(&mut self, set: RecordSet) {
        self.sets.insert(set.name.clone(), set);
    }

    fn find_record(&self, id: &str) -> Option<&Record> {
        self.sets
            .values()
            .flat_map(|set| set.records.iter())
            .find(|r| r.id.as_deref() == Some(id))
    }
}

impl DataSource for MemorySource {
    fn get_set(&self, name: &str) -> Option<RecordSet> {
        self.sets.get(name).cloned()
    }

    fn linked_records(&self, record: &Record, field: &str) -> Option<Vec<Record>> {
        let linked = match record.get(field)? {
            Value::Array(items) => items.clone(),
            single => vec![single.clone()],
        };

        let records = linked
            .into_iter()
            .filter_map(|item| match item {
                Value::Record(r) => Some(r),
                Value::Object(_) => {
                    Some(Record::from_json(serde_json::Value::from(item)))
                }
                Value::String(id) => self.find_record(&id).cloned(),
                _ => None,
            })
            .collect();
        Some(records)
    }
}
