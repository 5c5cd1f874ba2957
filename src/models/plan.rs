use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A test plan as reported by either API generation.
///
/// Plans are created once per run from a list (or by-id) call and are not
/// modified afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub id: u64,
    pub name: String,
    pub area_path: Option<String>,
    pub iteration_path: Option<String>,
    pub description: Option<String>,
    pub owner: Option<IdentityRef>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub state: Option<String>,
    /// The suite the service created as the plan's root, when reported.
    pub root_suite_id: Option<u64>,
    pub revision: Option<i64>,
    pub updated_date: Option<DateTime<Utc>>,
    pub updated_by: Option<IdentityRef>,
}

impl Plan {
    /// Minimal plan with only identity fields set.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            area_path: None,
            iteration_path: None,
            description: None,
            owner: None,
            start_date: None,
            end_date: None,
            state: None,
            root_suite_id: None,
            revision: None,
            updated_date: None,
            updated_by: None,
        }
    }
}

/// A reference to a user or group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityRef {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub unique_name: Option<String>,
    pub url: Option<String>,
}

/// Parse a service timestamp.
///
/// Both API generations mostly send RFC 3339, but the legacy one also emits
/// offset-less values such as `0001-01-01T00:00:00`; those are read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
