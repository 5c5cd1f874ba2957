use std::collections::{HashMap, HashSet};

use tracing::{debug, error, warn};

use crate::models::Suite;

/// A plan's suites indexed by id, with a parent → children index.
///
/// Children keep the order in which the service listed them.
#[derive(Debug, Clone, Default)]
pub struct SuiteHierarchy {
    plan_id: u64,
    suites: HashMap<u64, Suite>,
    order: Vec<u64>,
    children: HashMap<u64, Vec<u64>>,
    roots: Vec<u64>,
    orphans: Vec<u64>,
}

/// Index a flat suite list.
///
/// A suite whose parent is missing or equal to the plan id is a root. A
/// suite whose parent is not in the list is an orphan and is treated as an
/// additional root. Duplicate ids keep the first occurrence.
pub fn build_hierarchy(plan_id: u64, suites: Vec<Suite>) -> SuiteHierarchy {
    let mut hierarchy = SuiteHierarchy {
        plan_id,
        ..Default::default()
    };

    for suite in suites {
        if hierarchy.suites.contains_key(&suite.id) {
            warn!(plan_id, suite_id = suite.id, "Duplicate suite id, keeping the first");
            continue;
        }
        hierarchy.order.push(suite.id);
        hierarchy.suites.insert(suite.id, suite);
    }

    for &id in &hierarchy.order {
        let suite = &hierarchy.suites[&id];
        if suite.is_root_of(plan_id) {
            hierarchy.roots.push(id);
            continue;
        }
        // is_root_of guarantees a parent here
        let parent = suite.parent_suite_id.unwrap_or_default();
        if hierarchy.suites.contains_key(&parent) {
            hierarchy.children.entry(parent).or_default().push(id);
        } else {
            warn!(plan_id, suite_id = id, parent_id = parent, "Parent suite not found, treating as root");
            hierarchy.orphans.push(id);
        }
    }

    debug!(
        plan_id,
        suites = hierarchy.len(),
        roots = hierarchy.roots.len(),
        orphans = hierarchy.orphans.len(),
        "Built suite hierarchy"
    );

    for id in hierarchy.unreachable() {
        error!(plan_id, suite_id = id, "Suite is not reachable from any root (cyclic parent chain)");
    }

    hierarchy
}

impl SuiteHierarchy {
    pub fn plan_id(&self) -> u64 {
        self.plan_id
    }

    pub fn get(&self, suite_id: u64) -> Option<&Suite> {
        self.suites.get(&suite_id)
    }

    pub fn contains(&self, suite_id: u64) -> bool {
        self.suites.contains_key(&suite_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Suites in the order they were listed.
    pub fn suites(&self) -> impl Iterator<Item = &Suite> + '_ {
        self.order.iter().filter_map(|id| self.suites.get(id))
    }

    /// The flat `{suite_id: Suite}` lookup.
    pub fn as_map(&self) -> &HashMap<u64, Suite> {
        &self.suites
    }

    pub fn children_of(&self, suite_id: u64) -> &[u64] {
        self.children.get(&suite_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The plan's root suite: the first suite with no parent (or the plan as parent).
    pub fn root(&self) -> Option<&Suite> {
        self.roots.first().and_then(|id| self.suites.get(id))
    }

    /// Every root: proper roots first, then orphans.
    pub fn roots(&self) -> Vec<u64> {
        self.roots.iter().chain(self.orphans.iter()).copied().collect()
    }

    pub fn orphans(&self) -> &[u64] {
        &self.orphans
    }

    /// Suites no root leads to. Only a cyclic parent chain produces these.
    pub fn unreachable(&self) -> Vec<u64> {
        let mut seen = HashSet::new();
        let mut stack = self.roots();
        while let Some(id) = stack.pop() {
            if seen.insert(id) {
                stack.extend_from_slice(self.children_of(id));
            }
        }
        self.order.iter().copied().filter(|id| !seen.contains(id)).collect()
    }

    /// `suite_id` and all of its ancestors present in the hierarchy.
    ///
    /// Stops at the first repeated id, so a cyclic chain terminates.
    pub fn ancestry(&self, suite_id: u64) -> Vec<u64> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(suite_id);
        while let Some(id) = current {
            if !self.contains(id) || !seen.insert(id) {
                break;
            }
            chain.push(id);
            current = self
                .suites
                .get(&id)
                .filter(|s| !s.is_root_of(self.plan_id))
                .and_then(|s| s.parent_suite_id);
        }
        chain
    }
}
