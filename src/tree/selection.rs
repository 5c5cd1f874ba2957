use std::collections::{BTreeSet, HashSet};

use tracing::{error, warn};

use super::SuiteHierarchy;

/// Deepest suite nesting the walk will follow.
pub const MAX_DEPTH: usize = 64;

/// What the walk decided for one visited suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedNode {
    pub suite_id: u64,
    pub extract_cases: bool,
    pub children: Vec<PlannedNode>,
}

impl PlannedNode {
    /// Pre-order list of `(suite_id, extract_cases)`.
    pub fn flatten(&self) -> Vec<(u64, bool)> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push((node.suite_id, node.extract_cases));
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

/// Decide which suites below `root_suite_id` to visit and which of them
/// get their cases pulled.
///
/// A node's cases are pulled when `include_all` holds or it was requested.
/// A child is visited when `include_all` holds, the child was requested, the
/// node was requested, or a requested suite sits somewhere below the child.
/// Requesting a suite turns `include_all` on for its whole subtree.
///
/// Returns `None` when the root is not in the hierarchy. Revisited suites
/// (cycles) and suites deeper than [`MAX_DEPTH`] are logged and skipped.
pub fn plan_subtree(
    hierarchy: &SuiteHierarchy,
    root_suite_id: u64,
    include_all: bool,
    requested: &BTreeSet<u64>,
) -> Option<PlannedNode> {
    if !hierarchy.contains(root_suite_id) {
        warn!(plan_id = hierarchy.plan_id(), suite_id = root_suite_id, "Subtree root not in hierarchy");
        return None;
    }

    let on_path: HashSet<u64> = requested
        .iter()
        .flat_map(|&id| hierarchy.ancestry(id))
        .collect();

    let walk = Walk {
        hierarchy,
        requested,
        on_path: &on_path,
    };
    let mut visited = HashSet::new();
    Some(walk.visit(root_suite_id, include_all, 0, &mut visited))
}

struct Walk<'a> {
    hierarchy: &'a SuiteHierarchy,
    requested: &'a BTreeSet<u64>,
    on_path: &'a HashSet<u64>,
}

impl Walk<'_> {
    fn visit(&self, suite_id: u64, include_all: bool, depth: usize, visited: &mut HashSet<u64>) -> PlannedNode {
        visited.insert(suite_id);

        let requested = self.requested.contains(&suite_id);
        let mut node = PlannedNode {
            suite_id,
            extract_cases: include_all || requested,
            children: Vec::new(),
        };

        let children = self.hierarchy.children_of(suite_id);
        if depth + 1 >= MAX_DEPTH && !children.is_empty() {
            error!(suite_id, depth, "Suite nesting too deep, not descending further");
            return node;
        }

        for &child in children {
            let descend = include_all || requested || self.requested.contains(&child) || self.on_path.contains(&child);
            if !descend {
                continue;
            }
            if visited.contains(&child) {
                error!(suite_id, child_id = child, "Suite visited twice, breaking cycle");
                continue;
            }
            node.children
                .push(self.visit(child, include_all || requested, depth + 1, visited));
        }

        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Suite;
    use crate::tree::build_hierarchy;

    fn hierarchy(pairs: &[(u64, Option<u64>)]) -> SuiteHierarchy {
        build_hierarchy(
            10,
            pairs
                .iter()
                .map(|&(id, parent)| Suite::new(id, 10, format!("S{}", id), parent))
                .collect(),
        )
    }

    fn set(ids: &[u64]) -> BTreeSet<u64> {
        ids.iter().copied().collect()
    }

    #[test]
    fn include_all_visits_everything() {
        let h = hierarchy(&[(1, None), (2, Some(1)), (3, Some(2)), (4, Some(1))]);
        let plan = plan_subtree(&h, 1, true, &set(&[])).unwrap();
        assert_eq!(plan.flatten(), vec![(1, true), (2, true), (3, true), (4, true)]);
    }

    #[test]
    fn requested_suite_pulls_descendants() {
        let h = hierarchy(&[(1, None), (2, Some(1)), (3, Some(2)), (4, Some(1))]);
        let plan = plan_subtree(&h, 1, false, &set(&[2])).unwrap();
        assert_eq!(plan.flatten(), vec![(1, false), (2, true), (3, true)]);
    }

    #[test]
    fn deep_request_visits_path_without_cases() {
        let h = hierarchy(&[(1, None), (2, Some(1)), (3, Some(2)), (5, Some(2)), (4, Some(1))]);
        let plan = plan_subtree(&h, 1, false, &set(&[3])).unwrap();
        assert_eq!(plan.flatten(), vec![(1, false), (2, false), (3, true)]);
    }

    #[test]
    fn missing_root_yields_none() {
        let h = hierarchy(&[(1, None)]);
        assert!(plan_subtree(&h, 9, true, &set(&[])).is_none());
    }

    #[test]
    fn stops_at_depth_bound() {
        let mut pairs = vec![(1, None)];
        for id in 2..=100u64 {
            pairs.push((id, Some(id - 1)));
        }
        let h = hierarchy(&pairs);
        let plan = plan_subtree(&h, 1, true, &set(&[])).unwrap();
        assert_eq!(plan.flatten().len(), MAX_DEPTH);
    }
}
