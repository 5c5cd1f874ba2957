use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Case;

/// A test suite within a plan.
///
/// Suites form a tree via `parent_suite_id`. A suite whose parent is `None`
/// or equal to its plan's id is a root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suite {
    pub id: u64,
    pub plan_id: u64,
    pub name: String,
    pub parent_suite_id: Option<u64>,
    pub suite_type: Option<SuiteType>,
    pub state: Option<String>,
    /// Linked requirement for requirement-based suites.
    pub requirement_id: Option<u64>,
    /// Work-item query for query-based suites.
    pub query_string: Option<String>,
    pub last_updated_date: Option<DateTime<Utc>>,
}

impl Suite {
    /// Minimal static suite, mainly useful for building fixtures.
    pub fn new(id: u64, plan_id: u64, name: impl Into<String>, parent_suite_id: Option<u64>) -> Self {
        Self {
            id,
            plan_id,
            name: name.into(),
            parent_suite_id,
            suite_type: Some(SuiteType::Static),
            state: None,
            requirement_id: None,
            query_string: None,
            last_updated_date: None,
        }
    }

    /// Whether this suite sits at the top of its plan's hierarchy.
    pub fn is_root_of(&self, plan_id: u64) -> bool {
        match self.parent_suite_id {
            None => true,
            Some(parent) => parent == plan_id,
        }
    }
}

/// The kind of a suite.
///
/// - `Static`: Cases added by hand
/// - `DynamicQuery`: Cases selected by a work-item query
/// - `RequirementBased`: Cases linked to a requirement
/// - `Other`: Anything the service adds later, kept verbatim
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuiteType {
    Static,
    DynamicQuery,
    RequirementBased,
    Other(String),
}

impl SuiteType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Static => "static",
            Self::DynamicQuery => "dynamic_query",
            Self::RequirementBased => "requirement_based",
            Self::Other(s) => s,
        }
    }

    /// Map the service's spelling (`staticTestSuite`, `DynamicTestSuite`, ...)
    /// onto a suite type.
    pub fn from_service(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "statictestsuite" | "static" => Self::Static,
            "dynamictestsuite" | "dynamic" | "query" => Self::DynamicQuery,
            "requirementtestsuite" | "requirement" | "requirementbased" => Self::RequirementBased,
            _ => Self::Other(s.to_string()),
        }
    }
}

/// A visited suite with its cases and the child suites that qualified for
/// extraction.
///
/// The `suite` fields are flattened into the JSON output, with `cases` and a
/// nested `child_suites` array alongside.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuiteNode {
    #[serde(flatten)]
    pub suite: Suite,
    /// Whether this node's cases were pulled. `false` means the node was only
    /// visited on the way to selected descendants.
    pub cases_included: bool,
    pub cases: Vec<Case>,
    pub child_suites: Vec<SuiteNode>,
}

impl SuiteNode {
    /// Number of suites in this subtree, including this one.
    pub fn suite_count(&self) -> usize {
        1 + self.child_suites.iter().map(SuiteNode::suite_count).sum::<usize>()
    }

    /// Number of cases in this subtree.
    pub fn case_count(&self) -> usize {
        self.cases.len() + self.child_suites.iter().map(SuiteNode::case_count).sum::<usize>()
    }

    /// Depth-first iterator over every node in this subtree.
    pub fn walk(&self) -> Vec<&SuiteNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.child_suites.iter().rev());
        }
        out
    }

    /// Find a node by suite id anywhere in this subtree.
    pub fn find(&self, suite_id: u64) -> Option<&SuiteNode> {
        self.walk().into_iter().find(|n| n.suite.id == suite_id)
    }

    /// Apply `f` to every case in this subtree.
    pub fn for_each_case_mut(&mut self, f: &mut impl FnMut(&mut Case)) {
        for case in &mut self.cases {
            f(case);
        }
        for child in &mut self.child_suites {
            child.for_each_case_mut(f);
        }
    }
}
