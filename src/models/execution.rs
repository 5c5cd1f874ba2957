use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::IdentityRef;

/// A test configuration defined at project level, e.g. "Windows 10 + Edge".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestConfiguration {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub state: Option<String>,
    pub values: Vec<ConfigurationValue>,
    pub is_default: bool,
    pub project: Option<String>,
}

impl TestConfiguration {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            state: None,
            values: Vec::new(),
            is_default: false,
            project: None,
        }
    }
}

/// One variable setting inside a configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigurationValue {
    pub name: String,
    pub value: String,
}

/// A configuration variable and its allowed values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestVariable {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub values: Vec<String>,
}

impl TestVariable {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            values: Vec::new(),
        }
    }
}

/// One (case, configuration) pair of a suite, the unit that gets executed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestPoint {
    pub id: u64,
    pub plan_id: u64,
    pub suite_id: u64,
    pub test_case_id: Option<u64>,
    pub test_case_title: Option<String>,
    pub configuration_id: Option<u64>,
    pub configuration_name: Option<String>,
    pub tester: Option<IdentityRef>,
    pub outcome: Option<String>,
    pub state: Option<String>,
    /// Run and result of the most recent execution, when there was one.
    pub last_run_id: Option<u64>,
    pub last_result_id: Option<u64>,
}

impl TestPoint {
    pub fn new(id: u64, plan_id: u64, suite_id: u64) -> Self {
        Self {
            id,
            plan_id,
            suite_id,
            test_case_id: None,
            test_case_title: None,
            configuration_id: None,
            configuration_name: None,
            tester: None,
            outcome: None,
            state: None,
            last_run_id: None,
            last_result_id: None,
        }
    }

    /// `(run, result)` of the last execution.
    pub fn last_result(&self) -> Option<(u64, u64)> {
        match (self.last_run_id, self.last_result_id) {
            (Some(run), Some(result)) if run != 0 && result != 0 => Some((run, result)),
            _ => None,
        }
    }
}

/// The recorded outcome of executing a test point once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestResult {
    pub id: u64,
    pub run_id: u64,
    pub plan_id: Option<u64>,
    pub point_id: Option<u64>,
    pub test_case_id: Option<u64>,
    pub configuration_id: Option<u64>,
    pub outcome: Option<String>,
    pub state: Option<String>,
    pub error_message: Option<String>,
    pub comment: Option<String>,
    pub started_date: Option<DateTime<Utc>>,
    pub completed_date: Option<DateTime<Utc>>,
    pub duration_ms: Option<f64>,
    pub run_by: Option<IdentityRef>,
}

impl TestResult {
    pub fn new(id: u64, run_id: u64) -> Self {
        Self {
            id,
            run_id,
            plan_id: None,
            point_id: None,
            test_case_id: None,
            configuration_id: None,
            outcome: None,
            state: None,
            error_message: None,
            comment: None,
            started_date: None,
            completed_date: None,
            duration_ms: None,
            run_by: None,
        }
    }
}
