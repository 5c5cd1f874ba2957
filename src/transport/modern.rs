use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::wire::{
    flexible_id, ref_id, required_id, WireConfiguration, WireIdentity, WireRef, WireTestResult, WireVariable,
};
use super::{ApiGeneration, AzureConnection, ClientError, TestPlanApi};
use crate::models::{
    parse_timestamp, Case, Plan, PointAssignment, Suite, SuiteType, TestConfiguration, TestPoint, TestResult,
    TestVariable,
};

const API_VERSION: &str = "api-version=7.1";

/// The `_apis/testplan` REST endpoints.
#[derive(Debug, Clone)]
pub struct ModernApi {
    connection: Arc<AzureConnection>,
}

impl ModernApi {
    pub fn new(connection: Arc<AzureConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl TestPlanApi for ModernApi {
    fn generation(&self) -> ApiGeneration {
        ApiGeneration::Modern
    }

    async fn list_plans(&self, project: &str) -> Result<Vec<Plan>, ClientError> {
        let url = self.connection.api_url(
            project,
            &format!("testplan/plans?{}&includePlanDetails=true", API_VERSION),
        );
        let plans: Vec<WirePlan> = self.connection.get_paged(&url).await?;
        Ok(plans.into_iter().map(Plan::from).collect())
    }

    async fn get_plan(&self, project: &str, plan_id: u64) -> Result<Plan, ClientError> {
        let url = self
            .connection
            .api_url(project, &format!("testplan/plans/{}?{}", plan_id, API_VERSION));
        let plan: WirePlan = self.connection.get_json(&url).await?;
        Ok(plan.into())
    }

    async fn list_suites(&self, project: &str, plan_id: u64) -> Result<Vec<Suite>, ClientError> {
        let url = self
            .connection
            .api_url(project, &format!("testplan/Plans/{}/suites?{}", plan_id, API_VERSION));
        let suites: Vec<WireSuite> = self.connection.get_paged(&url).await?;
        Ok(suites.into_iter().map(|s| s.into_suite(plan_id)).collect())
    }

    async fn get_suite(&self, project: &str, plan_id: u64, suite_id: u64) -> Result<Suite, ClientError> {
        let url = self.connection.api_url(
            project,
            &format!("testplan/Plans/{}/suites/{}?{}", plan_id, suite_id, API_VERSION),
        );
        let suite: WireSuite = self.connection.get_json(&url).await?;
        Ok(suite.into_suite(plan_id))
    }

    async fn list_cases(&self, project: &str, plan_id: u64, suite_id: u64) -> Result<Vec<Case>, ClientError> {
        let url = self.connection.api_url(
            project,
            &format!("testplan/Plans/{}/Suites/{}/TestCase?{}", plan_id, suite_id, API_VERSION),
        );
        let cases: Vec<WireTestCase> = self.connection.get_paged(&url).await?;
        Ok(cases.into_iter().filter_map(WireTestCase::into_case).collect())
    }

    async fn list_configurations(&self, project: &str) -> Result<Vec<TestConfiguration>, ClientError> {
        let url = self
            .connection
            .api_url(project, &format!("testplan/configurations?{}", API_VERSION));
        let configurations: Vec<WireConfiguration> = self.connection.get_paged(&url).await?;
        Ok(configurations.into_iter().map(Into::into).collect())
    }

    async fn list_variables(&self, project: &str) -> Result<Vec<TestVariable>, ClientError> {
        let url = self
            .connection
            .api_url(project, &format!("testplan/variables?{}", API_VERSION));
        let variables: Vec<WireVariable> = self.connection.get_paged(&url).await?;
        Ok(variables.into_iter().map(Into::into).collect())
    }

    async fn list_points(&self, project: &str, plan_id: u64, suite_id: u64) -> Result<Vec<TestPoint>, ClientError> {
        let url = self.connection.api_url(
            project,
            &format!(
                "testplan/Plans/{}/Suites/{}/TestPoint?{}&includePointDetails=true",
                plan_id, suite_id, API_VERSION
            ),
        );
        let points: Vec<WireTestPoint> = self.connection.get_paged(&url).await?;
        Ok(points.into_iter().map(|p| p.into_point(plan_id, suite_id)).collect())
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
    area_path: Option<String>,
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
            area_path: w.area_path,
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
    parent_suite: Option<WireRef>,
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
            parent_suite_id: ref_id(&self.parent_suite),
            suite_type: self.suite_type.as_deref().map(SuiteType::from_service),
            state: self.state,
            requirement_id: self.requirement_id,
            query_string: self.query_string.filter(|q| !q.is_empty()),
            last_updated_date: self.last_updated_date.as_deref().and_then(parse_timestamp),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTestCase {
    work_item: Option<WireRef>,
    #[serde(default)]
    point_assignments: Vec<WirePointAssignment>,
    order: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePointAssignment {
    #[serde(default, deserialize_with = "flexible_id")]
    configuration_id: Option<u64>,
    configuration_name: Option<String>,
    tester: Option<WireIdentity>,
}

impl WireTestCase {
    fn into_case(self) -> Option<Case> {
        let Some(work_item) = self.work_item.filter(|w| w.id.is_some()) else {
            warn!("Skipping test case without a work item reference");
            return None;
        };
        let id = work_item.id?;

        let mut case = Case::new(id, work_item.name.unwrap_or_default());
        case.order = self.order;
        case.work_item.url = work_item.url;
        case.point_assignments = self
            .point_assignments
            .into_iter()
            .map(|p| PointAssignment {
                configuration_id: p.configuration_id,
                configuration_name: p.configuration_name,
                tester: p.tester.map(Into::into),
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
    test_case_reference: Option<WireRef>,
    configuration: Option<WireRef>,
    tester: Option<WireIdentity>,
    results: Option<WirePointResults>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePointResults {
    outcome: Option<String>,
    state: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    last_test_run_id: Option<u64>,
    #[serde(default, deserialize_with = "flexible_id")]
    last_result_id: Option<u64>,
}

impl WireTestPoint {
    fn into_point(self, plan_id: u64, suite_id: u64) -> TestPoint {
        let mut point = TestPoint::new(self.id, plan_id, suite_id);
        point.test_case_id = ref_id(&self.test_case_reference);
        point.test_case_title = self.test_case_reference.and_then(|r| r.name);
        point.configuration_id = ref_id(&self.configuration);
        point.configuration_name = self.configuration.and_then(|c| c.name);
        point.tester = self.tester.map(Into::into);
        if let Some(results) = self.results {
            point.outcome = results.outcome;
            point.state = results.state;
            point.last_run_id = results.last_test_run_id;
            point.last_result_id = results.last_result_id;
        }
        point
    }
}
