use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Parameter, ParameterValueRow, Step};

/// A work item as returned by the batch endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkItem {
    pub id: u64,
    #[serde(default)]
    pub rev: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl WorkItem {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            rev: None,
            url: None,
            fields: Map::new(),
        }
    }

    /// Builder-style field setter, handy for fixtures.
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// A string field, `None` when missing, null or not a string.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// An integer field; numeric strings are accepted too.
    pub fn field_i64(&self, name: &str) -> Option<i64> {
        match self.fields.get(name)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// A work item together with its decoded payloads, produced by the standalone
/// work-item extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecodedWorkItem {
    pub id: u64,
    pub rev: Option<i64>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub fields: Map<String, Value>,
    pub test_steps: Vec<Step>,
    pub test_parameters: Vec<Parameter>,
    pub parameter_values: Vec<ParameterValueRow>,
}
