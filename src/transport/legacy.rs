use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::connection::ValueList;
use super::wire::{
    flexible_id, ref_id, required_id, WireConfiguration, WireIdentity, WireRef, WireTestResult, WireVariable,
};
use super::{ApiGeneration, AzureConnection, ClientError, TestPlanApi};
use crate::models::{
    parse_timestamp, Case, Plan, PointAssignment, Suite, SuiteType, TestConfiguration, TestPoint, TestResult,
    TestVariable,
};

const API_VERSION: &str = "api-version=5.0";

/// The older `_apis/test` endpoints. Ids come back as strings in places
/// and lists are returned in one response.
#[derive(Debug, Clone)]
pub struct LegacyApi {
    connection: Arc<AzureConnection>,
}

impl LegacyApi {
    pub fn new(connection: Arc<AzureConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl TestPlanApi for LegacyApi {
    fn generation(&self) -> ApiGeneration {
        ApiGeneration::Legacy
    }

    async fn list_plans(&self, project: &str) -> Result<Vec<Plan>, ClientError> {
        let url = self
            .connection
            .api_url(project, &format!("test/plans?{}&includePlanDetails=true", API_VERSION));
        let list: ValueList<WirePlan> = self.connection.get_json(&url).await?;
        Ok(list.value.into_iter().map(Plan::from).collect())
    }

    async fn get_plan(&self, project: &str, plan_id: u64) -> Result<Plan, ClientError> {
        let url = self
            .connection
            .api_url(project, &format!("test/plans/{}?{}", plan_id, API_VERSION));
        let plan: WirePlan = self.connection.get_json(&url).await?;
        Ok(plan.into())
    }

    async fn list_suites(&self, project: &str, plan_id: u64) -> Result<Vec<Suite>, ClientError> {
        let url = self
            .connection
            .api_url(project, &format!("test/Plans/{}/suites?{}", plan_id, API_VERSION));
        let list: ValueList<WireSuite> = self.connection.get_json(&url).await?;
        Ok(list.value.into_iter().map(|s| s.into_suite(plan_id)).collect())
    }

    async fn get_suite(&self, project: &str, plan_id: u64, suite_id: u64) -> Result<Suite, ClientError> {
        let url = self.connection.api_url(
            project,
            &format!("test/Plans/{}/suites/{}?{}", plan_id, suite_id, API_VERSION),
        );
        let suite: WireSuite = self.connection.get_json(&url).await?;
        Ok(suite.into_suite(plan_id))
    }

    async fn list_cases(&self, project: &str, plan_id: u64, suite_id: u64) -> Result<Vec<Case>, ClientError> {
        let url = self.connection.api_url(
            project,
            &format!("test/Plans/{}/suites/{}/testcases?{}", plan_id, suite_id, API_VERSION),
        );
        let list: ValueList<WireSuiteTestCase> = self.connection.get_json(&url).await?;
        Ok(list
            .value
            .into_iter()
            .enumerate()
            .filter_map(|(position, tc)| tc.into_case(position))
            .collect())
    }

    async fn list_configurations(&self, project: &str) -> Result<Vec<TestConfiguration>, ClientError> {
        let url = self
            .connection
            .api_url(project, &format!("test/configurations?{}", API_VERSION));
        let list: ValueList<WireConfiguration> = self.connection.get_json(&url).await?;
        Ok(list.value.into_iter().map(Into::into).collect())
    }

    async fn list_variables(&self, project: &str) -> Result<Vec<TestVariable>, ClientError> {
        let url = self
            .connection
            .api_url(project, &format!("test/variables?{}", API_VERSION));
        let list: ValueList<WireVariable> = self.connection.get_json(&url).await?;
        Ok(list.value.into_iter().map(Into::into).collect())
    }

    async fn list_points(&self, project: &str, plan_id: u64, suite_id: u64) -> Result<Vec<TestPoint>, ClientError> {
        let url = self.connection.api_url(
            project,
            &format!("test/Plans/{}/Suites/{}/points?{}", plan_id, suite_id, API_VERSION),
        );
        let list: ValueList<WireTestPoint> = self.connection.get_json(&url).await?;
        Ok(list.value.into_iter().map(|p| p.into_point(plan_id, suite_id)).collect())
    }

    async fn get_result(&self, project: &str, run_id: u64, result_id: u64) -> Result<TestResult, ClientError> {
        let url = self.connection.api_url(
            project,
            &format!("test/Runs/{}/results/{}?{}", run_id, result_id, API_VERSION),
        );
        let result: WireTestResult = self.connection.get_json(&url).await?;
        Ok(result.into_result(run_id))
    }
}

// ============================================================
// Wire types
// ============================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePlan {
    #[serde(deserialize_with = "required_id")]
    id: u64,
    #[serde(default)]
    name: String,
    area: Option<WireRef>,
    iteration: Option<String>,
    description: Option<String>,
    owner: Option<WireIdentity>,
    start_date: Option<String>,
    end_date: Option<String>,
    state: Option<String>,
    root_suite: Option<WireRef>,
    revision: Option<i64>,
    updated_date: Option<String>,
    updated_by: Option<WireIdentity>,
}

impl From<WirePlan> for Plan {
    fn from(w: WirePlan) -> Self {
        Self {
            id: w.id,
            name: w.name,
            area_path: w.area.and_then(|a| a.name),
            iteration_path: w.iteration,
            description: w.description.filter(|d| !d.is_empty()),
            owner: w.owner.map(Into::into),
            start_date: w.start_date.as_deref().and_then(parse_timestamp),
            end_date: w.end_date.as_deref().and_then(parse_timestamp),
            state: w.state,
            root_suite_id: ref_id(&w.root_suite),
            revision: w.revision,
            updated_date: w.updated_date.as_deref().and_then(parse_timestamp),
            updated_by: w.updated_by.map(Into::into),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSuite {
    #[serde(deserialize_with = "required_id")]
    id: u64,
    #[serde(default)]
    name: String,
    parent: Option<WireRef>,
    suite_type: Option<String>,
    plan: Option<WireRef>,
    state: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    requirement_id: Option<u64>,
    query_string: Option<String>,
    last_updated_date: Option<String>,
}

impl WireSuite {
    fn into_suite(self, plan_id: u64) -> Suite {
        Suite {
            id: self.id,
            plan_id: ref_id(&self.plan).unwrap_or(plan_id),
            name: self.name,
            parent_suite_id: ref_id(&self.parent),
            suite_type: self.suite_type.as_deref().map(SuiteType::from_service),
            state: self.state,
            requirement_id: self.requirement_id.filter(|id| *id != 0),
            query_string: self.query_string.filter(|q| !q.is_empty()),
            last_updated_date: self.last_updated_date.as_deref().and_then(parse_timestamp),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSuiteTestCase {
    test_case: Option<WireRef>,
    #[serde(default)]
    point_assignments: Vec<WirePointAssignment>,
}

#[derive(Debug, Deserialize)]
struct WirePointAssignment {
    configuration: Option<WireRef>,
    tester: Option<WireIdentity>,
}

impl WireSuiteTestCase {
    /// The legacy list carries no title or order; the list position stands
    /// in for the order.
    fn into_case(self, position: usize) -> Option<Case> {
        let Some(test_case) = self.test_case.filter(|t| t.id.is_some()) else {
            warn!("Skipping legacy test case without an id");
            return None;
        };
        let id = test_case.id?;

        let mut case = Case::new(id, test_case.name.unwrap_or_default());
        case.order = i64::try_from(position).ok();
        case.work_item.url = test_case.url;
        case.point_assignments = self
            .point_assignments
            .into_iter()
            .map(|p| {
                let configuration = p.configuration;
                PointAssignment {
                    configuration_id: ref_id(&configuration),
                    configuration_name: configuration.and_then(|c| c.name),
                    tester: p.tester.map(Into::into),
                }
            })
            .collect();
        Some(case)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTestPoint {
    #[serde(deserialize_with = "required_id")]
    id: u64,
    test_case: Option<WireRef>,
    configuration: Option<WireRef>,
    assigned_to: Option<WireIdentity>,
    outcome: Option<String>,
    state: Option<String>,
    last_test_run: Option<WireRef>,
    last_result: Option<WireRef>,
}

impl WireTestPoint {
    fn into_point(self, plan_id: u64, suite_id: u64) -> TestPoint {
        let mut point = TestPoint::new(self.id, plan_id, suite_id);
        point.test_case_id = ref_id(&self.test_case);
        point.test_case_title = self.test_case.and_then(|t| t.name);
        point.configuration_id = ref_id(&self.configuration);
        point.configuration_name = self.configuration.and_then(|c| c.name);
        point.tester = self.assigned_to.map(Into::into);
        point.outcome = self.outcome;
        point.state = self.state;
        point.last_run_id = ref_id(&self.last_test_run);
        point.last_result_id = ref_id(&self.last_result);
        point
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_string_ids_and_area_name() {
        let json = r#"{
            "id": 10,
            "name": "Release",
            "area": {"id": "3", "name": "P\\Web"},
            "rootSuite": {"id": "20"},
            "startDate": "0001-01-01T00:00:00"
        }"#;
        let plan: Plan = serde_json::from_str::<WirePlan>(json).unwrap().into();
        assert_eq!(plan.area_path.as_deref(), Some("P\\Web"));
        assert_eq!(plan.root_suite_id, Some(20));
        assert!(plan.start_date.is_some());
    }

    #[test]
    fn reads_parent_as_string() {
        let json = r#"{"id": 21, "name": "Login", "parent": {"id": "20"}, "suiteType": "StaticTestSuite"}"#;
        let suite = serde_json::from_str::<WireSuite>(json).unwrap().into_suite(10);
        assert_eq!(suite.plan_id, 10);
        assert_eq!(suite.parent_suite_id, Some(20));
    }

    #[test]
    fn orders_cases_by_position() {
        let json = r#"{"value": [
            {"testCase": {"id": "101", "url": "https://x/101"}, "pointAssignments": [{"configuration": {"id": "1", "name": "Win"}}]},
            {"testCase": {"id": "102"}}
        ]}"#;
        let list: ValueList<WireSuiteTestCase> = serde_json::from_str(json).unwrap();
        let cases: Vec<Case> = list
            .value
            .into_iter()
            .enumerate()
            .filter_map(|(i, tc)| tc.into_case(i))
            .collect();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].id, 101);
        assert_eq!(cases[0].work_item.url.as_deref(), Some("https://x/101"));
        assert_eq!(cases[0].point_assignments[0].configuration_id, Some(1));
        assert_eq!(cases[1].order, Some(1));
    }

    #[test]
    fn reads_point_run_references_as_strings() {
        let json = r#"{"value": [
            {"id": 5, "testCase": {"id": "101"}, "configuration": {"id": "1", "name": "Win"},
             "outcome": "Passed", "lastTestRun": {"id": "7"}, "lastResult": {"id": "100000"}},
            {"id": 6, "testCase": {"id": "102"}, "outcome": "Unspecified", "lastTestRun": {"id": "0"}, "lastResult": {"id": "0"}}
        ]}"#;
        let list: ValueList<WireTestPoint> = serde_json::from_str(json).unwrap();
        let points: Vec<TestPoint> = list.value.into_iter().map(|p| p.into_point(10, 21)).collect();
        assert_eq!(points[0].test_case_id, Some(101));
        assert_eq!(points[0].configuration_id, Some(1));
        assert_eq!(points[0].last_result(), Some((7, 100000)));
        assert_eq!(points[1].last_result(), None);
    }
}
