use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One action/expected-result pair of a case's procedure.
///
/// Steps keep document order; `id` is whatever the payload carried and is not
/// used for ordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Step {
    pub id: String,
    /// `ActionStep`, `ValidateStep`, ...
    pub step_type: String,
    pub title: String,
    pub action: String,
    pub expected_result: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub parameterized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_type: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// A file linked from a step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

/// A named placeholder declared by a data-driven case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub default: String,
    /// Any other attributes of the declaration, forwarded verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// One iteration's concrete values, keyed by parameter name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ParameterValueRow {
    pub values: BTreeMap<String, String>,
}

impl ParameterValueRow {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl FromIterator<(String, String)> for ParameterValueRow {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
