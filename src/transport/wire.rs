//! JSON shapes shared by both API generations.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::{
    parse_timestamp, ConfigurationValue, IdentityRef, TestConfiguration, TestResult, TestVariable,
};

/// `{ "id": ..., "name": ... }` reference. The legacy API sends ids as
/// strings, the modern one as numbers.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireRef {
    #[serde(default, deserialize_with = "flexible_id")]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireIdentity {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub unique_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl From<WireIdentity> for IdentityRef {
    fn from(w: WireIdentity) -> Self {
        Self {
            id: w.id,
            display_name: w.display_name,
            unique_name: w.unique_name,
            url: w.url,
        }
    }
}

/// Accept an id given as a number, a numeric string, or null.
pub(crate) fn flexible_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Like [`flexible_id`] for fields that must be present.
pub(crate) fn required_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    flexible_id(deserializer)?.ok_or_else(|| serde::de::Error::custom("missing or non-numeric id"))
}

pub(crate) fn ref_id(r: &Option<WireRef>) -> Option<u64> {
    r.as_ref().and_then(|r| r.id)
}

// Configurations, variables and results look the same in both generations.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireConfiguration {
    #[serde(deserialize_with = "required_id")]
    id: u64,
    #[serde(default)]
    name: String,
    description: Option<String>,
    state: Option<String>,
    #[serde(default)]
    values: Vec<WireNameValue>,
    #[serde(default)]
    is_default: bool,
    project: Option<WireRef>,
}

#[derive(Debug, Deserialize)]
struct WireNameValue {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: String,
}

impl From<WireConfiguration> for TestConfiguration {
    fn from(w: WireConfiguration) -> Self {
        Self {
            id: w.id,
            name: w.name,
            description: w.description.filter(|d| !d.is_empty()),
            state: w.state,
            values: w
                .values
                .into_iter()
                .map(|v| ConfigurationValue {
                    name: v.name,
                    value: v.value,
                })
                .collect(),
            is_default: w.is_default,
            project: w.project.and_then(|p| p.name),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireVariable {
    #[serde(deserialize_with = "required_id")]
    id: u64,
    #[serde(default)]
    name: String,
    description: Option<String>,
    #[serde(default)]
    values: Vec<String>,
}

impl From<WireVariable> for TestVariable {
    fn from(w: WireVariable) -> Self {
        Self {
            id: w.id,
            name: w.name,
            description: w.description.filter(|d| !d.is_empty()),
            values: w.values,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireTestResult {
    #[serde(deserialize_with = "required_id")]
    id: u64,
    test_run: Option<WireRef>,
    test_plan: Option<WireRef>,
    test_point: Option<WireRef>,
    test_case: Option<WireRef>,
    configuration: Option<WireRef>,
    outcome: Option<String>,
    state: Option<String>,
    error_message: Option<String>,
    comment: Option<String>,
    started_date: Option<String>,
    completed_date: Option<String>,
    duration_in_ms: Option<f64>,
    run_by: Option<WireIdentity>,
}

impl WireTestResult {
    /// `run_id` is the run the result was requested from, used when the
    /// payload omits its own run reference.
    pub(crate) fn into_result(self, run_id: u64) -> TestResult {
        TestResult {
            id: self.id,
            run_id: ref_id(&self.test_run).unwrap_or(run_id),
            plan_id: ref_id(&self.test_plan),
            point_id: ref_id(&self.test_point),
            test_case_id: ref_id(&self.test_case),
            configuration_id: ref_id(&self.configuration),
            outcome: self.outcome,
            state: self.state,
            error_message: self.error_message.filter(|m| !m.is_empty()),
            comment: self.comment.filter(|c| !c.is_empty()),
            started_date: self.started_date.as_deref().and_then(parse_timestamp),
            completed_date: self.completed_date.as_deref().and_then(parse_timestamp),
            duration_ms: self.duration_in_ms,
            run_by: self.run_by.map(Into::into),
        }
    }
}
