//! Access to the test-management service.
//!
//! The service exposes two API generations for the same data. Each logical
//! operation goes to the modern API first and, when that fails, to the legacy
//! one. Every individual call is wrapped in a [`RetryPolicy`].
//!
//! List operations return a [`ListOutcome`] so callers can tell "nothing
//! there" apart from "could not ask". Single-entity lookups return a
//! `Result` because callers cannot proceed without the entity.

mod connection;
mod error;
mod legacy;
mod modern;
mod retry;
mod wire;
mod work_items;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

pub use connection::AzureConnection;
pub use error::ClientError;
pub use legacy::LegacyApi;
pub use modern::ModernApi;
pub use retry::{RetryPolicy, DEFAULT_BACKOFF, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS, MAX_DELAY};
pub use work_items::WorkItemsClient;

use crate::config::AzureConfig;
use crate::models::{Case, Plan, Suite, TestConfiguration, TestPoint, TestResult, TestVariable, WorkItem};

/// Hard cap on ids per work-item batch call.
pub const MAX_BATCH_SIZE: usize = 200;

/// Which API generation an implementation talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiGeneration {
    Modern,
    Legacy,
}

impl ApiGeneration {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Modern => "modern",
            Self::Legacy => "legacy",
        }
    }
}

/// Plan, suite, case and execution-data reads against one API generation.
#[async_trait]
pub trait TestPlanApi: Send + Sync {
    fn generation(&self) -> ApiGeneration;

    async fn list_plans(&self, project: &str) -> Result<Vec<Plan>, ClientError>;

    async fn get_plan(&self, project: &str, plan_id: u64) -> Result<Plan, ClientError>;

    async fn list_suites(&self, project: &str, plan_id: u64) -> Result<Vec<Suite>, ClientError>;

    async fn get_suite(&self, project: &str, plan_id: u64, suite_id: u64) -> Result<Suite, ClientError>;

    async fn list_cases(&self, project: &str, plan_id: u64, suite_id: u64) -> Result<Vec<Case>, ClientError>;

    async fn list_configurations(&self, project: &str) -> Result<Vec<TestConfiguration>, ClientError>;

    async fn list_variables(&self, project: &str) -> Result<Vec<TestVariable>, ClientError>;

    async fn list_points(&self, project: &str, plan_id: u64, suite_id: u64) -> Result<Vec<TestPoint>, ClientError>;

    /// One result of one test run.
    async fn get_result(&self, project: &str, run_id: u64, result_id: u64) -> Result<TestResult, ClientError>;
}

/// Bulk work-item reads. One call must not exceed [`MAX_BATCH_SIZE`] ids.
#[async_trait]
pub trait WorkItemApi: Send + Sync {
    /// Fetch the given work items. Ids the service does not know are left out
    /// of the result rather than failing the call.
    async fn get_work_items(
        &self,
        project: &str,
        ids: &[u64],
        fields: &[String],
    ) -> Result<Vec<WorkItem>, ClientError>;
}

/// The result of a list operation.
#[derive(Debug)]
pub enum ListOutcome<T> {
    Found(Vec<T>),
    /// The call succeeded (or the container does not exist) but there is nothing in it.
    Empty,
    /// Every API generation failed after retries.
    Failed(ClientError),
}

impl<T> ListOutcome<T> {
    pub fn from_result(result: Result<Vec<T>, ClientError>) -> Self {
        match result {
            Ok(items) if items.is_empty() => Self::Empty,
            Ok(items) => Self::Found(items),
            Err(err) if err.is_not_found() => Self::Empty,
            Err(err) => Self::Failed(err),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Found(items) => items.len(),
            Self::Empty | Self::Failed(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The items, with a failure treated as "nothing found".
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Found(items) => items,
            Self::Empty | Self::Failed(_) => Vec::new(),
        }
    }

    /// Convert back to a `Result`, keeping "empty" as an empty list.
    pub fn into_result(self) -> Result<Vec<T>, ClientError> {
        match self {
            Self::Found(items) => Ok(items),
            Self::Empty => Ok(Vec::new()),
            Self::Failed(err) => Err(err),
        }
    }
}

/// One work-item batch that failed after retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// 1-based batch number.
    pub batch: usize,
    pub ids: Vec<u64>,
    pub error: String,
}

/// Items collected from every batch that succeeded, plus the batches that did not.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub items: Vec<WorkItem>,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.failures.iter().flat_map(|f| f.ids.iter().copied())
    }
}

/// The transport used by the tree builder and the extractor.
///
/// Holds the API implementations chosen at construction; none are
/// detected at call time.
#[derive(Clone)]
pub struct Transport {
    primary: Arc<dyn TestPlanApi>,
    fallback: Option<Arc<dyn TestPlanApi>>,
    work_items: Arc<dyn WorkItemApi>,
    retry: RetryPolicy,
    batch_size: usize,
}

impl Transport {
    pub fn new(primary: Arc<dyn TestPlanApi>, work_items: Arc<dyn WorkItemApi>) -> Self {
        Self {
            primary,
            fallback: None,
            work_items,
            retry: RetryPolicy::default(),
            batch_size: MAX_BATCH_SIZE,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn TestPlanApi>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the work-item batch size, clamped to `1..=MAX_BATCH_SIZE`.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    /// Modern API with legacy fallback over one shared connection.
    pub fn from_config(config: &AzureConfig) -> Self {
        let connection = Arc::new(AzureConnection::from_config(config));
        Self::new(
            Arc::new(ModernApi::new(Arc::clone(&connection))),
            Arc::new(WorkItemsClient::new(Arc::clone(&connection))),
        )
        .with_fallback(Arc::new(LegacyApi::new(connection)))
        .with_retry(config.retry)
        .with_batch_size(config.batch_size)
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    // ============================================================
    // Plans, suites and cases
    // ============================================================

    pub async fn fetch_plans(&self, project: &str) -> ListOutcome<Plan> {
        let result = self
            .call("list plans", |api| async move { api.list_plans(project).await })
            .await;
        ListOutcome::from_result(result)
    }

    pub async fn fetch_plan(&self, project: &str, plan_id: u64) -> Result<Plan, ClientError> {
        self.call("get plan", |api| async move { api.get_plan(project, plan_id).await })
            .await
    }

    pub async fn fetch_suites(&self, project: &str, plan_id: u64) -> ListOutcome<Suite> {
        let result = self
            .call("list suites", |api| async move {
                api.list_suites(project, plan_id).await
            })
            .await;
        ListOutcome::from_result(result)
    }

    pub async fn fetch_suite(&self, project: &str, plan_id: u64, suite_id: u64) -> Result<Suite, ClientError> {
        self.call("get suite", |api| async move {
            api.get_suite(project, plan_id, suite_id).await
        })
        .await
    }

    pub async fn fetch_cases(&self, project: &str, plan_id: u64, suite_id: u64) -> ListOutcome<Case> {
        let result = self
            .call("list cases", |api| async move {
                api.list_cases(project, plan_id, suite_id).await
            })
            .await;
        ListOutcome::from_result(result)
    }

    // ============================================================
    // Execution data
    // ============================================================

    pub async fn fetch_configurations(&self, project: &str) -> ListOutcome<TestConfiguration> {
        let result = self
            .call("list configurations", |api| async move {
                api.list_configurations(project).await
            })
            .await;
        ListOutcome::from_result(result)
    }

    pub async fn fetch_variables(&self, project: &str) -> ListOutcome<TestVariable> {
        let result = self
            .call("list variables", |api| async move { api.list_variables(project).await })
            .await;
        ListOutcome::from_result(result)
    }

    pub async fn fetch_points(&self, project: &str, plan_id: u64, suite_id: u64) -> ListOutcome<TestPoint> {
        let result = self
            .call("list points", |api| async move {
                api.list_points(project, plan_id, suite_id).await
            })
            .await;
        ListOutcome::from_result(result)
    }

    pub async fn fetch_result(&self, project: &str, run_id: u64, result_id: u64) -> Result<TestResult, ClientError> {
        self.call("get result", |api| async move {
            api.get_result(project, run_id, result_id).await
        })
        .await
    }

    /// Run `op` against the primary API, then against the fallback.
    ///
    /// Each generation gets its own retry budget. When both fail the
    /// fallback's error is returned.
    async fn call<T, F, Fut>(&self, operation: &str, op: F) -> Result<T, ClientError>
    where
        F: Fn(Arc<dyn TestPlanApi>) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let primary = self.retry.run(operation, || op(Arc::clone(&self.primary))).await;

        let err = match primary {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let Some(fallback) = &self.fallback else {
            return Err(err);
        };

        warn!(
            operation,
            from = self.primary.generation().as_str(),
            to = fallback.generation().as_str(),
            error = %err,
            "API call failed, falling back"
        );
        self.retry.run(operation, || op(Arc::clone(fallback))).await
    }

    // ============================================================
    // Work items
    // ============================================================

    /// Fetch work items in sequential batches of `batch_size`.
    ///
    /// A batch that still fails after retries is logged and skipped; items
    /// from the other batches are kept.
    pub async fn fetch_work_items_batch(&self, project: &str, ids: &[u64], fields: &[String]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        if ids.is_empty() {
            return outcome;
        }

        let total = ids.len().div_ceil(self.batch_size);
        info!(count = ids.len(), batches = total, "Fetching work items");

        for (index, chunk) in ids.chunks(self.batch_size).enumerate() {
            let batch = index + 1;
            let result = self
                .retry
                .run("work item batch", || self.work_items.get_work_items(project, chunk, fields))
                .await;

            match result {
                Ok(items) => {
                    debug!(batch, total, requested = chunk.len(), received = items.len(), "Batch fetched");
                    outcome.items.extend(items);
                }
                Err(err) => {
                    warn!(batch, total, size = chunk.len(), error = %err, "Skipping failed work item batch");
                    outcome.failures.push(BatchFailure {
                        batch,
                        ids: chunk.to_vec(),
                        error: err.to_string(),
                    });
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_lists_are_empty() {
        let outcome: ListOutcome<u64> = ListOutcome::from_result(Err(ClientError::NotFound("plan".into())));
        assert!(matches!(outcome, ListOutcome::Empty));
    }

    #[test]
    fn failed_lists_keep_the_error() {
        let outcome: ListOutcome<u64> = ListOutcome::from_result(Err(ClientError::Unauthorized));
        assert!(outcome.is_failed());
        assert!(outcome.into_vec().is_empty());
    }

    #[test]
    fn found_lists_keep_items() {
        let outcome = ListOutcome::from_result(Ok(vec![1u64, 2]));
        assert_eq!(outcome.len(), 2);
        assert_eq!(outcome.into_result().unwrap(), vec![1, 2]);
    }
}
