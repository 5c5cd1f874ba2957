#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use testplan_extract::models::{
    Case, Plan, Suite, TestConfiguration, TestPoint, TestResult, TestVariable, WorkItem,
};
use testplan_extract::transport::{ApiGeneration, ClientError, RetryPolicy, TestPlanApi, Transport, WorkItemApi};

/// How a scripted call fails.
#[derive(Debug, Clone, Copy)]
pub enum Fail {
    /// 503, retried by the transport
    Transient,
    NotFound,
    /// 401, not retried
    Fatal,
}

impl Fail {
    fn to_error(self) -> ClientError {
        match self {
            Fail::Transient => ClientError::Server {
                status: 503,
                body: "unavailable".into(),
            },
            Fail::NotFound => ClientError::NotFound("missing".into()),
            Fail::Fatal => ClientError::Unauthorized,
        }
    }
}

/// In-memory `TestPlanApi`.
///
/// Calls are keyed as `list_plans`, `get_plan:{plan}`, `list_suites:{plan}`,
/// `get_suite:{plan}:{suite}`, `list_cases:{plan}:{suite}`,
/// `list_configurations`, `list_variables`, `list_points:{plan}:{suite}` and
/// `get_result:{run}:{result}`. A failure
/// scripted for a key fails that many calls (or every call when `times` is
/// `None`) before the stored data is returned.
pub struct FakeApi {
    generation: ApiGeneration,
    plans: Vec<Plan>,
    suites: HashMap<u64, Vec<Suite>>,
    cases: HashMap<(u64, u64), Vec<Case>>,
    configurations: Vec<TestConfiguration>,
    variables: Vec<TestVariable>,
    points: HashMap<(u64, u64), Vec<TestPoint>>,
    results: Vec<TestResult>,
    failures: Mutex<HashMap<String, (Fail, Option<usize>)>>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new(generation: ApiGeneration) -> Self {
        Self {
            generation,
            plans: Vec::new(),
            suites: HashMap::new(),
            cases: HashMap::new(),
            configurations: Vec::new(),
            variables: Vec::new(),
            points: HashMap::new(),
            results: Vec::new(),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn modern() -> Self {
        Self::new(ApiGeneration::Modern)
    }

    pub fn legacy() -> Self {
        Self::new(ApiGeneration::Legacy)
    }

    pub fn with_plan(mut self, id: u64, name: &str) -> Self {
        self.plans.push(Plan::new(id, name));
        self
    }

    pub fn with_suite(mut self, plan_id: u64, id: u64, name: &str, parent: Option<u64>) -> Self {
        self.suites
            .entry(plan_id)
            .or_default()
            .push(Suite::new(id, plan_id, name, parent));
        self
    }

    pub fn with_case(mut self, plan_id: u64, suite_id: u64, id: u64, title: &str) -> Self {
        self.cases
            .entry((plan_id, suite_id))
            .or_default()
            .push(Case::new(id, title));
        self
    }

    pub fn with_configuration(mut self, id: u64, name: &str) -> Self {
        self.configurations.push(TestConfiguration::new(id, name));
        self
    }

    pub fn with_variable(mut self, id: u64, name: &str, values: &[&str]) -> Self {
        let mut variable = TestVariable::new(id, name);
        variable.values = values.iter().map(|v| v.to_string()).collect();
        self.variables.push(variable);
        self
    }

    /// A point for `case_id`, last executed as `(run, result)` when given.
    pub fn with_point(mut self, plan_id: u64, suite_id: u64, id: u64, case_id: u64, last: Option<(u64, u64)>) -> Self {
        let mut point = TestPoint::new(id, plan_id, suite_id);
        point.test_case_id = Some(case_id);
        if let Some((run, result)) = last {
            point.last_run_id = Some(run);
            point.last_result_id = Some(result);
        }
        self.points.entry((plan_id, suite_id)).or_default().push(point);
        self
    }

    pub fn with_result(mut self, run_id: u64, id: u64, outcome: &str) -> Self {
        let mut result = TestResult::new(id, run_id);
        result.outcome = Some(outcome.to_string());
        self.results.push(result);
        self
    }

    pub fn fail(self, key: &str, fail: Fail, times: Option<usize>) -> Self {
        self.failures.lock().unwrap().insert(key.to_string(), (fail, times));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, key: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == key).count()
    }

    fn record(&self, key: String) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(key.clone());
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(&key) {
            Some((fail, None)) => Err(fail.to_error()),
            Some((fail, Some(remaining))) if *remaining > 0 => {
                *remaining -= 1;
                Err(fail.to_error())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl TestPlanApi for FakeApi {
    fn generation(&self) -> ApiGeneration {
        self.generation
    }

    async fn list_plans(&self, _project: &str) -> Result<Vec<Plan>, ClientError> {
        self.record("list_plans".into())?;
        Ok(self.plans.clone())
    }

    async fn get_plan(&self, _project: &str, plan_id: u64) -> Result<Plan, ClientError> {
        self.record(format!("get_plan:{}", plan_id))?;
        self.plans
            .iter()
            .find(|p| p.id == plan_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("plan {}", plan_id)))
    }

    async fn list_suites(&self, _project: &str, plan_id: u64) -> Result<Vec<Suite>, ClientError> {
        self.record(format!("list_suites:{}", plan_id))?;
        Ok(self.suites.get(&plan_id).cloned().unwrap_or_default())
    }

    async fn get_suite(&self, _project: &str, plan_id: u64, suite_id: u64) -> Result<Suite, ClientError> {
        self.record(format!("get_suite:{}:{}", plan_id, suite_id))?;
        self.suites
            .get(&plan_id)
            .and_then(|suites| suites.iter().find(|s| s.id == suite_id))
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("suite {}", suite_id)))
    }

    async fn list_cases(&self, _project: &str, plan_id: u64, suite_id: u64) -> Result<Vec<Case>, ClientError> {
        self.record(format!("list_cases:{}:{}", plan_id, suite_id))?;
        Ok(self.cases.get(&(plan_id, suite_id)).cloned().unwrap_or_default())
    }

    async fn list_configurations(&self, _project: &str) -> Result<Vec<TestConfiguration>, ClientError> {
        self.record("list_configurations".into())?;
        Ok(self.configurations.clone())
    }

    async fn list_variables(&self, _project: &str) -> Result<Vec<TestVariable>, ClientError> {
        self.record("list_variables".into())?;
        Ok(self.variables.clone())
    }

    async fn list_points(&self, _project: &str, plan_id: u64, suite_id: u64) -> Result<Vec<TestPoint>, ClientError> {
        self.record(format!("list_points:{}:{}", plan_id, suite_id))?;
        Ok(self.points.get(&(plan_id, suite_id)).cloned().unwrap_or_default())
    }

    async fn get_result(&self, _project: &str, run_id: u64, result_id: u64) -> Result<TestResult, ClientError> {
        self.record(format!("get_result:{}:{}", run_id, result_id))?;
        self.results
            .iter()
            .find(|r| r.run_id == run_id && r.id == result_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("result {} of run {}", result_id, run_id)))
    }
}

/// In-memory `WorkItemApi` that records every batch it receives.
#[derive(Default)]
pub struct FakeWorkItems {
    items: HashMap<u64, WorkItem>,
    /// Any batch containing one of these ids fails.
    poisoned: HashSet<u64>,
    poison_error: Option<Fail>,
    batches: Mutex<Vec<Vec<u64>>>,
}

impl FakeWorkItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Work items 1..=n, each with a title.
    pub fn numbered(n: u64) -> Self {
        let mut fake = Self::new();
        for id in 1..=n {
            fake = fake.with_item(WorkItem::new(id).with_field("System.Title", format!("Item {}", id)));
        }
        fake
    }

    pub fn with_item(mut self, item: WorkItem) -> Self {
        self.items.insert(item.id, item);
        self
    }

    pub fn poison(mut self, id: u64, fail: Fail) -> Self {
        self.poisoned.insert(id);
        self.poison_error = Some(fail);
        self
    }

    pub fn batches(&self) -> Vec<Vec<u64>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkItemApi for FakeWorkItems {
    async fn get_work_items(
        &self,
        _project: &str,
        ids: &[u64],
        _fields: &[String],
    ) -> Result<Vec<WorkItem>, ClientError> {
        self.batches.lock().unwrap().push(ids.to_vec());
        if ids.iter().any(|id| self.poisoned.contains(id)) {
            return Err(self.poison_error.unwrap_or(Fail::Fatal).to_error());
        }
        Ok(ids.iter().filter_map(|id| self.items.get(id).cloned()).collect())
    }
}

/// A transport over fakes that never waits between attempts.
pub fn transport(api: Arc<FakeApi>, work_items: Arc<FakeWorkItems>) -> Transport {
    Transport::new(api, work_items).with_retry(RetryPolicy::none())
}

/// The plan 10 fixture: root suite 20 with case 100, child suite 21 with case 101.
pub fn release_plan() -> FakeApi {
    FakeApi::modern()
        .with_plan(10, "Release")
        .with_suite(10, 20, "Release", None)
        .with_suite(10, 21, "Login", Some(20))
        .with_case(10, 20, 100, "Smoke")
        .with_case(10, 21, 101, "Valid login")
}
