use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DecodedWorkItem, Plan, SuiteNode, TestConfiguration, TestPoint, TestResult, TestVariable};

/// Which suites a selective run must extract, keyed by plan id.
///
/// Requesting a suite means requesting its whole subtree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SuiteSelection {
    plans: BTreeMap<u64, BTreeSet<u64>>,
}

impl SuiteSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request one suite of one plan. Duplicates are ignored.
    pub fn insert(&mut self, plan_id: u64, suite_id: u64) {
        self.plans.entry(plan_id).or_default().insert(suite_id);
    }

    pub fn plan_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.plans.keys().copied()
    }

    /// The requested suites of a plan; empty when the plan is not selected.
    pub fn suites_for(&self, plan_id: u64) -> BTreeSet<u64> {
        self.plans.get(&plan_id).cloned().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn plan_count(&self) -> usize {
        self.plans.len()
    }

    pub fn suite_count(&self) -> usize {
        self.plans.values().map(BTreeSet::len).sum()
    }
}

impl FromIterator<(u64, u64)> for SuiteSelection {
    fn from_iter<I: IntoIterator<Item = (u64, u64)>>(iter: I) -> Self {
        let mut selection = Self::new();
        for (plan_id, suite_id) in iter {
            selection.insert(plan_id, suite_id);
        }
        selection
    }
}

/// How a run chose its suites.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Every suite of every plan.
    FullProject,
    /// Only the requested suites and their subtrees.
    Selective,
    /// Work items by id, outside any plan.
    WorkItems,
}

impl ExtractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullProject => "full_project",
            Self::Selective => "selective",
            Self::WorkItems => "work_items",
        }
    }
}

/// The terminal status of a run.
///
/// - `Success`: No errors and no warnings
/// - `PartialWithWarnings`: Data was produced but something was skipped or degraded
/// - `Error`: Plan discovery failed or found nothing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    PartialWithWarnings,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::PartialWithWarnings => "partial_with_warnings",
            Self::Error => "error",
        }
    }
}

/// Itemized problems collected while a run continues past them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunIssues {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl RunIssues {
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn extend(&mut self, other: RunIssues) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Status for a run that got past plan discovery.
    pub fn status(&self) -> RunStatus {
        if self.is_clean() {
            RunStatus::Success
        } else {
            RunStatus::PartialWithWarnings
        }
    }
}

/// One plan and the suite trees extracted for it.
///
/// `suites` is a forest: the plan's root first, then any orphaned roots that
/// qualified for extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanExtraction {
    #[serde(flatten)]
    pub plan: Plan,
    /// Suites the caller asked for; empty in full-project mode.
    pub requested_suite_ids: Vec<u64>,
    pub suites: Vec<SuiteNode>,
    /// Test points of the suites whose cases were extracted.
    #[serde(default)]
    pub points: Vec<TestPoint>,
    /// Last recorded result of each executed point.
    #[serde(default)]
    pub results: Vec<TestResult>,
}

impl PlanExtraction {
    pub fn new(plan: Plan, requested_suite_ids: Vec<u64>, suites: Vec<SuiteNode>) -> Self {
        Self {
            plan,
            requested_suite_ids,
            suites,
            points: Vec::new(),
            results: Vec::new(),
        }
    }

    pub fn suite_count(&self) -> usize {
        self.suites.iter().map(SuiteNode::suite_count).sum()
    }

    pub fn case_count(&self) -> usize {
        self.suites.iter().map(SuiteNode::case_count).sum()
    }

    pub fn step_count(&self) -> usize {
        self.suites
            .iter()
            .flat_map(|root| root.walk())
            .flat_map(|node| node.cases.iter())
            .map(|case| case.steps.len())
            .sum()
    }
}

/// Counters reported with every run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractionStats {
    pub plans: usize,
    pub suites: usize,
    pub cases: usize,
    pub steps: usize,
    pub work_items: usize,
    #[serde(default)]
    pub configurations: usize,
    #[serde(default)]
    pub variables: usize,
    #[serde(default)]
    pub points: usize,
    #[serde(default)]
    pub results: usize,
}

/// Everything one plan/suite extraction run produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    pub project: String,
    pub mode: ExtractionMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    pub plans: Vec<PlanExtraction>,
    #[serde(default)]
    pub configurations: Vec<TestConfiguration>,
    #[serde(default)]
    pub variables: Vec<TestVariable>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub stats: ExtractionStats,
}

impl ExtractionResult {
    pub fn is_error(&self) -> bool {
        self.status == RunStatus::Error
    }

    pub fn plan(&self, plan_id: u64) -> Option<&PlanExtraction> {
        self.plans.iter().find(|p| p.plan.id == plan_id)
    }
}

/// Everything a standalone work-item run produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkItemExtraction {
    pub project: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    pub requested: usize,
    pub work_items: Vec<DecodedWorkItem>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}
