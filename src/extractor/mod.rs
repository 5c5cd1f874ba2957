//! The extraction run: plans → suites → cases → decoded payloads.
//!
//! Test points and last results of extracted suites, and the project's
//! configurations and variables, are collected alongside unless turned off.
//!
//! Failures below plan discovery never end a run. They are recorded in the
//! run's error and warning lists and the run continues with what is left.
//! Only a failed or empty plan discovery makes the run an error.

mod enrich;
mod execution;

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::models::fields::test_case_fields;
use crate::models::{
    ExtractionMode, ExtractionResult, ExtractionStats, Plan, PlanExtraction, RunIssues, RunStatus,
    SuiteSelection, TestConfiguration, TestVariable, WorkItemExtraction,
};
use crate::transport::{ListOutcome, Transport};
use crate::tree::SuiteTreeBuilder;

pub struct Extractor {
    transport: Transport,
    execution_data: bool,
}

/// What a plan/suite run collected, before it is turned into a result.
#[derive(Default)]
struct Collected {
    plans: Vec<PlanExtraction>,
    configurations: Vec<TestConfiguration>,
    variables: Vec<TestVariable>,
    work_items: usize,
}

impl Extractor {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            execution_data: true,
        }
    }

    /// Whether to collect configurations, variables, test points and results.
    pub fn with_execution_data(mut self, enabled: bool) -> Self {
        self.execution_data = enabled;
        self
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Full-project mode: every suite of every plan, with all cases.
    pub async fn extract_project(&self, project: &str) -> ExtractionResult {
        let started_at = Utc::now();
        let mut issues = RunIssues::default();
        info!(project, "Starting full project extraction");

        let plans = match self.transport.fetch_plans(project).await {
            ListOutcome::Found(plans) => plans,
            ListOutcome::Empty => {
                error!(project, "No test plans found");
                issues.error(format!("no test plans found in project {}", project));
                return finish(project, ExtractionMode::FullProject, started_at, Collected::default(), issues, true);
            }
            ListOutcome::Failed(err) => {
                error!(project, error = %err, "Plan discovery failed");
                issues.error(format!("plan discovery failed: {}", err));
                return finish(project, ExtractionMode::FullProject, started_at, Collected::default(), issues, true);
            }
        };
        info!(project, count = plans.len(), "Discovered plans");

        let mut collected = Collected::default();
        for plan in plans {
            if let Some((plan, fetched)) = self.extract_plan(project, plan, None, &mut issues).await {
                collected.work_items += fetched;
                collected.plans.push(plan);
            }
        }
        self.collect_definitions(project, &mut collected, &mut issues).await;

        finish(project, ExtractionMode::FullProject, started_at, collected, issues, false)
    }

    /// Selective mode: only the requested suites of the requested plans,
    /// each with its whole subtree.
    pub async fn extract_selection(&self, project: &str, selection: &SuiteSelection) -> ExtractionResult {
        let started_at = Utc::now();
        let mut issues = RunIssues::default();
        info!(
            project,
            plans = selection.plan_count(),
            suites = selection.suite_count(),
            "Starting selective extraction"
        );

        if selection.is_empty() {
            issues.error("no plans or suites selected");
            return finish(project, ExtractionMode::Selective, started_at, Collected::default(), issues, true);
        }

        let mut collected = Collected::default();
        let mut resolved = 0;
        for plan_id in selection.plan_ids() {
            let plan = match self.transport.fetch_plan(project, plan_id).await {
                Ok(plan) => plan,
                Err(err) => {
                    error!(plan_id, error = %err, "Plan lookup failed");
                    issues.error(format!("plan {} could not be fetched: {}", plan_id, err));
                    continue;
                }
            };
            resolved += 1;
            let requested = selection.suites_for(plan_id);
            if let Some((plan, fetched)) = self.extract_plan(project, plan, Some(&requested), &mut issues).await {
                collected.work_items += fetched;
                collected.plans.push(plan);
            }
        }

        let fatal = resolved == 0;
        if fatal {
            issues.error("none of the selected plans could be fetched");
        } else {
            self.collect_definitions(project, &mut collected, &mut issues).await;
        }
        finish(project, ExtractionMode::Selective, started_at, collected, issues, fatal)
    }

    /// Extract one plan's suite trees and enrich their cases.
    ///
    /// Returns `None` when the plan's suites could not be discovered. The
    /// second value is the number of work items retrieved.
    async fn extract_plan(
        &self,
        project: &str,
        plan: Plan,
        requested: Option<&BTreeSet<u64>>,
        issues: &mut RunIssues,
    ) -> Option<(PlanExtraction, usize)> {
        info!(plan_id = plan.id, plan = %plan.name, "Extracting plan");

        let suites = match self.transport.fetch_suites(project, plan.id).await {
            ListOutcome::Found(suites) => suites,
            ListOutcome::Empty => {
                warn!(plan_id = plan.id, "Plan has no suites");
                issues.warning(format!("plan {} ({}) has no suites", plan.id, plan.name));
                Vec::new()
            }
            ListOutcome::Failed(err) => {
                error!(plan_id = plan.id, error = %err, "Suite discovery failed, skipping plan");
                issues.error(format!("plan {} ({}) skipped, suites could not be fetched: {}", plan.id, plan.name, err));
                return None;
            }
        };

        let mut builder = SuiteTreeBuilder::new(&self.transport, project);
        // An empty suite list still has requested suites to look up directly.
        let trees = if suites.is_empty() && requested.is_none() {
            Vec::new()
        } else {
            builder.extract_plan(plan.id, suites, requested).await
        };
        issues.extend(builder.take_issues());

        let requested_suite_ids = requested.map(|r| r.iter().copied().collect()).unwrap_or_default();
        let mut extraction = PlanExtraction::new(plan, requested_suite_ids, trees);
        let fetched = enrich::enrich_plan(&self.transport, project, &mut extraction, issues).await;
        if self.execution_data {
            execution::collect_plan_execution(&self.transport, project, &mut extraction, issues).await;
        }

        info!(
            plan_id = extraction.plan.id,
            suites = extraction.suite_count(),
            cases = extraction.case_count(),
            points = extraction.points.len(),
            "Plan extracted"
        );
        Some((extraction, fetched))
    }

    async fn collect_definitions(&self, project: &str, collected: &mut Collected, issues: &mut RunIssues) {
        if !self.execution_data {
            return;
        }
        let (configurations, variables) = execution::project_definitions(&self.transport, project, issues).await;
        collected.configurations = configurations;
        collected.variables = variables;
    }

    /// Fetch work items by id and decode their payloads.
    ///
    /// Duplicate ids are fetched once. An empty field list means the
    /// standard test-case fields.
    pub async fn extract_work_items(&self, project: &str, ids: &[u64], fields: &[String]) -> WorkItemExtraction {
        let started_at = Utc::now();
        let mut issues = RunIssues::default();

        let mut seen = HashSet::new();
        let ids: Vec<u64> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        let fields = if fields.is_empty() {
            test_case_fields()
        } else {
            fields.to_vec()
        };
        info!(project, count = ids.len(), "Starting work item extraction");

        let outcome = self.transport.fetch_work_items_batch(project, &ids, &fields).await;
        for failure in &outcome.failures {
            issues.error(format!(
                "work item batch {} ({} ids) failed: {}",
                failure.batch,
                failure.ids.len(),
                failure.error
            ));
        }

        let failed: HashSet<u64> = outcome.failed_ids().collect();
        let returned: HashSet<u64> = outcome.items.iter().map(|item| item.id).collect();
        let missing: Vec<u64> = ids
            .iter()
            .copied()
            .filter(|id| !returned.contains(id) && !failed.contains(id))
            .collect();
        if !missing.is_empty() {
            warn!(count = missing.len(), "Some work items were not returned");
            issues.warning(format!("{} work item(s) not found: {:?}", missing.len(), missing));
        }

        let work_items: Vec<_> = outcome.items.into_iter().map(enrich::decode_work_item).collect();
        if ids.is_empty() {
            issues.error("no work item ids given");
        }
        let fatal = ids.is_empty() || (work_items.is_empty() && !failed.is_empty());
        let status = if fatal { RunStatus::Error } else { issues.status() };

        info!(retrieved = work_items.len(), status = status.as_str(), "Work item extraction finished");
        WorkItemExtraction {
            project: project.to_string(),
            started_at,
            finished_at: Utc::now(),
            status,
            requested: ids.len(),
            work_items,
            errors: issues.errors,
            warnings: issues.warnings,
        }
    }
}

fn finish(
    project: &str,
    mode: ExtractionMode,
    started_at: DateTime<Utc>,
    collected: Collected,
    issues: RunIssues,
    fatal: bool,
) -> ExtractionResult {
    let Collected {
        plans,
        configurations,
        variables,
        work_items,
    } = collected;
    let status = if fatal { RunStatus::Error } else { issues.status() };
    let stats = ExtractionStats {
        plans: plans.len(),
        suites: plans.iter().map(PlanExtraction::suite_count).sum(),
        cases: plans.iter().map(PlanExtraction::case_count).sum(),
        steps: plans.iter().map(PlanExtraction::step_count).sum(),
        work_items,
        configurations: configurations.len(),
        variables: variables.len(),
        points: plans.iter().map(|p| p.points.len()).sum(),
        results: plans.iter().map(|p| p.results.len()).sum(),
    };

    info!(
        project,
        mode = mode.as_str(),
        status = status.as_str(),
        plans = stats.plans,
        suites = stats.suites,
        cases = stats.cases,
        errors = issues.errors.len(),
        warnings = issues.warnings.len(),
        "Extraction finished"
    );

    ExtractionResult {
        project: project.to_string(),
        mode,
        started_at,
        finished_at: Utc::now(),
        status,
        plans,
        configurations,
        variables,
        errors: issues.errors,
        warnings: issues.warnings,
        stats,
    }
}
