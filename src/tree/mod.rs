//! Suite tree reconstruction and selective sub-tree extraction.
//!
//! Suites arrive as a flat list with parent references. [`build_hierarchy`]
//! indexes them, [`plan_subtree`] decides which suites to visit and which to
//! pull cases for, and [`SuiteTreeBuilder`] fetches the cases and assembles
//! [`SuiteNode`] trees.

mod hierarchy;
mod render;
mod selection;

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};

pub use hierarchy::{build_hierarchy, SuiteHierarchy};
pub use render::render_tree;
pub use selection::{plan_subtree, PlannedNode, MAX_DEPTH};

use crate::models::{Case, RunIssues, Suite, SuiteNode};
use crate::transport::{ListOutcome, Transport};

/// Builds suite trees for one project, collecting issues as it goes.
///
/// Case lists are fetched one suite at a time. A suite whose cases cannot be
/// fetched is dropped together with its subtree; its siblings still complete.
pub struct SuiteTreeBuilder<'a> {
    transport: &'a Transport,
    project: &'a str,
    issues: RunIssues,
}

impl<'a> SuiteTreeBuilder<'a> {
    pub fn new(transport: &'a Transport, project: &'a str) -> Self {
        Self {
            transport,
            project,
            issues: RunIssues::default(),
        }
    }

    pub fn issues(&self) -> &RunIssues {
        &self.issues
    }

    pub fn take_issues(&mut self) -> RunIssues {
        std::mem::take(&mut self.issues)
    }

    /// Build every suite tree of a plan.
    ///
    /// With no requested set, every root (including orphans) is extracted
    /// with all cases. With a requested set the plan's root is always walked
    /// and other roots only when they lead to a requested suite. If the plan
    /// has no root at all, each requested suite is fetched on its own
    /// (see [`Self::extract_detached`]).
    pub async fn extract_plan(
        &mut self,
        plan_id: u64,
        suites: Vec<Suite>,
        requested: Option<&BTreeSet<u64>>,
    ) -> Vec<SuiteNode> {
        let hierarchy = build_hierarchy(plan_id, suites);

        for id in hierarchy.unreachable() {
            self.issues.warning(format!(
                "plan {}: suite {} is not reachable from any root (cyclic parent chain)",
                plan_id, id
            ));
        }

        let Some(requested) = requested else {
            let mut trees = Vec::new();
            for root in hierarchy.roots() {
                if let Some(node) = self.extract_subtree(plan_id, root, &hierarchy, true, &BTreeSet::new()).await {
                    trees.push(node);
                }
            }
            return trees;
        };

        let Some(main_root) = hierarchy.root().map(|s| s.id) else {
            warn!(plan_id, "No root suite found, extracting requested suites directly");
            self.issues
                .warning(format!("plan {}: no root suite found, requested suites extracted without hierarchy", plan_id));
            return self.extract_detached(plan_id, requested).await;
        };

        for &id in requested {
            if !hierarchy.contains(id) {
                warn!(plan_id, suite_id = id, "Requested suite not found in plan");
                self.issues
                    .warning(format!("plan {}: requested suite {} not found", plan_id, id));
            }
        }

        let mut trees = Vec::new();
        for root in hierarchy.roots() {
            let leads_to_request = requested
                .iter()
                .any(|&id| hierarchy.ancestry(id).contains(&root));
            if root != main_root && !leads_to_request {
                continue;
            }
            let include_all = requested.contains(&root);
            if let Some(node) = self.extract_subtree(plan_id, root, &hierarchy, include_all, requested).await {
                trees.push(node);
            }
        }
        trees
    }

    /// Extract the subtree below `root_suite_id`.
    ///
    /// Returns `None` when the root is unknown or its case fetch failed.
    pub async fn extract_subtree(
        &mut self,
        plan_id: u64,
        root_suite_id: u64,
        hierarchy: &SuiteHierarchy,
        include_all: bool,
        requested: &BTreeSet<u64>,
    ) -> Option<SuiteNode> {
        let plan = plan_subtree(hierarchy, root_suite_id, include_all, requested)?;
        let cases = self.fetch_planned_cases(plan_id, hierarchy, &plan).await;
        assemble(&plan, hierarchy, &cases)
    }

    /// Degraded mode: fetch each requested suite by id, without hierarchy.
    ///
    /// A suite that cannot be looked up is left out.
    pub async fn extract_detached(&mut self, plan_id: u64, requested: &BTreeSet<u64>) -> Vec<SuiteNode> {
        let mut nodes = Vec::new();
        for &suite_id in requested {
            let suite = match self.transport.fetch_suite(self.project, plan_id, suite_id).await {
                Ok(suite) => suite,
                Err(err) => {
                    self.issues
                        .error(format!("plan {}: suite {} could not be fetched: {}", plan_id, suite_id, err));
                    continue;
                }
            };
            let Some(cases) = self.fetch_cases(plan_id, &suite).await else {
                continue;
            };
            nodes.push(SuiteNode {
                suite,
                cases_included: true,
                cases,
                child_suites: Vec::new(),
            });
        }
        nodes
    }

    /// Fetch cases for every planned node that wants them, in pre-order.
    ///
    /// Nodes below a failed node are not fetched; they will be dropped anyway.
    async fn fetch_planned_cases(
        &mut self,
        plan_id: u64,
        hierarchy: &SuiteHierarchy,
        plan: &PlannedNode,
    ) -> HashMap<u64, Option<Vec<Case>>> {
        let mut fetched = HashMap::new();
        let mut stack = vec![plan];

        while let Some(node) = stack.pop() {
            let Some(suite) = hierarchy.get(node.suite_id) else {
                continue;
            };
            if node.extract_cases {
                let cases = self.fetch_cases(plan_id, suite).await;
                let failed = cases.is_none();
                fetched.insert(node.suite_id, cases);
                if failed {
                    continue;
                }
            }
            stack.extend(node.children.iter().rev());
        }

        fetched
    }

    /// `None` means the fetch failed and the suite must be dropped.
    async fn fetch_cases(&mut self, plan_id: u64, suite: &Suite) -> Option<Vec<Case>> {
        match self.transport.fetch_cases(self.project, plan_id, suite.id).await {
            ListOutcome::Found(cases) => {
                info!(plan_id, suite_id = suite.id, suite = %suite.name, count = cases.len(), "Fetched cases");
                Some(cases)
            }
            ListOutcome::Empty => {
                debug!(plan_id, suite_id = suite.id, "Suite has no cases");
                Some(Vec::new())
            }
            ListOutcome::Failed(err) => {
                warn!(plan_id, suite_id = suite.id, error = %err, "Skipping suite subtree, cases could not be fetched");
                self.issues.error(format!(
                    "plan {}: suite {} ({}) skipped, cases could not be fetched: {}",
                    plan_id, suite.id, suite.name, err
                ));
                None
            }
        }
    }
}

/// Turn a plan plus fetched cases into a node tree. A node whose case fetch
/// failed is absent, with its subtree.
fn assemble(
    plan: &PlannedNode,
    hierarchy: &SuiteHierarchy,
    fetched: &HashMap<u64, Option<Vec<Case>>>,
) -> Option<SuiteNode> {
    let suite = hierarchy.get(plan.suite_id)?.clone();

    let cases = if plan.extract_cases {
        fetched.get(&plan.suite_id)?.clone()?
    } else {
        Vec::new()
    };

    Some(SuiteNode {
        suite,
        cases_included: plan.extract_cases,
        cases,
        child_suites: plan
            .children
            .iter()
            .filter_map(|child| assemble(child, hierarchy, fetched))
            .collect(),
    })
}
