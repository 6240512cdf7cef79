//! Record types held by the store
//!
//! A record is a free-form JSON object. Its `RecordKind` is fixed when the
//! record is built and decides how the store hands it out to callers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Field every record is keyed and ranked by
pub const ID_FIELD: &str = "id";

/// How a stored record is handed out to readers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordKind {
    /// Readers get their own deep copy
    #[default]
    Cacheable,
    /// Readers share the stored instance (sessions and similar live objects)
    PassThrough,
}

/// A stored record: named fields plus the hand-out kind
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    #[serde(flatten)]
    fields: Map<String, Value>,
    #[serde(skip)]
    kind: RecordKind,
}

impl Record {
    /// Create a cacheable record from its fields
    pub fn new(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            kind: RecordKind::Cacheable,
        }
    }

    /// Create a record that is shared by reference instead of copied
    pub fn pass_through(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            kind: RecordKind::PassThrough,
        }
    }

    /// Build a cacheable record from a JSON value, `None` unless it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self::new(fields)),
            _ => None,
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// The record's `id` field, when it is a string
    pub fn id(&self) -> Option<&str> {
        self.fields.get(ID_FIELD).and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Set a field, returning the previous value
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Text a query term is matched against.
    ///
    /// Strings are used as-is, numbers and booleans by their display form.
    /// Null, arrays and nested objects have no searchable text.
    pub fn searchable_text(&self, field: &str) -> Option<String> {
        match self.fields.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

/// Hand a stored record to a reader according to its kind
pub fn hand_out(stored: &Arc<Record>) -> Arc<Record> {
    match stored.kind {
        RecordKind::Cacheable => Arc::new(Record::clone(stored)),
        RecordKind::PassThrough => Arc::clone(stored),
    }
}
