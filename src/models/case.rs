use serde::{Deserialize, Serialize};

use super::{IdentityRef, Parameter, ParameterValueRow, Step, WorkItem};
use crate::decoder::{strip_markup, DecodedPayload};

/// Work-item field names the extractor reads for every case.
pub mod fields {
    pub const ID: &str = "System.Id";
    pub const TITLE: &str = "System.Title";
    pub const DESCRIPTION: &str = "System.Description";
    pub const STATE: &str = "System.State";
    pub const WORK_ITEM_TYPE: &str = "System.WorkItemType";
    pub const TAGS: &str = "System.Tags";
    pub const ASSIGNED_TO: &str = "System.AssignedTo";
    pub const CREATED_BY: &str = "System.CreatedBy";
    pub const CREATED_DATE: &str = "System.CreatedDate";
    pub const CHANGED_DATE: &str = "System.ChangedDate";
    pub const CHANGED_BY: &str = "System.ChangedBy";
    pub const STEPS: &str = "Microsoft.VSTS.TCM.Steps";
    pub const PARAMETERS: &str = "Microsoft.VSTS.TCM.Parameters";
    pub const LOCAL_DATA_SOURCE: &str = "Microsoft.VSTS.TCM.LocalDataSource";
    pub const PREREQUISITES: &str = "Microsoft.VSTS.TCM.Prerequisites";
    pub const AUTOMATION_STATUS: &str = "Microsoft.VSTS.TCM.AutomationStatus";
    pub const PRIORITY: &str = "Microsoft.VSTS.Common.Priority";

    /// The default field selection for test-case work items.
    pub const TEST_CASE_FIELDS: &[&str] = &[
        ID,
        TITLE,
        DESCRIPTION,
        STATE,
        WORK_ITEM_TYPE,
        TAGS,
        ASSIGNED_TO,
        CREATED_BY,
        CREATED_DATE,
        CHANGED_DATE,
        CHANGED_BY,
        STEPS,
        PARAMETERS,
        LOCAL_DATA_SOURCE,
        PREREQUISITES,
        AUTOMATION_STATUS,
        PRIORITY,
    ];

    pub fn test_case_fields() -> Vec<String> {
        TEST_CASE_FIELDS.iter().map(|f| f.to_string()).collect()
    }
}

/// A test case as listed under one suite.
///
/// Title, priority and payloads are usually incomplete when the case is first
/// listed; [`Case::apply_work_item`] fills them from the backing work item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Case {
    pub id: u64,
    pub title: String,
    pub order: Option<i64>,
    pub priority: Option<i64>,
    pub description: Option<String>,
    pub state: Option<String>,
    pub automation_status: Option<String>,
    pub prerequisites: Option<String>,
    pub work_item: WorkItemRef,
    pub point_assignments: Vec<PointAssignment>,
    pub steps: Vec<Step>,
    pub parameters: Vec<Parameter>,
    pub parameter_values: Vec<ParameterValueRow>,
}

impl Case {
    /// A case that only knows its backing work item.
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            order: None,
            priority: None,
            description: None,
            state: None,
            automation_status: None,
            prerequisites: None,
            work_item: WorkItemRef { id, url: None },
            point_assignments: Vec::new(),
            steps: Vec::new(),
            parameters: Vec::new(),
            parameter_values: Vec::new(),
        }
    }

    /// Fill descriptive fields and decoded payloads from the backing work item.
    ///
    /// Decoding never fails; a corrupt payload leaves the matching list empty.
    pub fn apply_work_item(&mut self, item: &WorkItem) {
        if self.title.is_empty() {
            if let Some(title) = item.field_str(fields::TITLE) {
                self.title = title.to_string();
            }
        }
        if let Some(description) = item.field_str(fields::DESCRIPTION) {
            self.description = Some(strip_markup(description));
        }
        if let Some(priority) = item.field_i64(fields::PRIORITY) {
            self.priority = Some(priority);
        }
        self.state = item.field_str(fields::STATE).map(str::to_string);
        self.automation_status = item.field_str(fields::AUTOMATION_STATUS).map(str::to_string);
        self.prerequisites = item
            .field_str(fields::PREREQUISITES)
            .map(strip_markup)
            .filter(|s| !s.is_empty());
        if self.work_item.url.is_none() {
            self.work_item.url = item.url.clone();
        }

        let payload = DecodedPayload::from_work_item(item);
        self.steps = payload.steps;
        self.parameters = payload.parameters;
        self.parameter_values = payload.parameter_values;
    }
}

/// Reference to the work item that carries a case's payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkItemRef {
    pub id: u64,
    pub url: Option<String>,
}

/// Which configuration a case runs under and who tests it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PointAssignment {
    pub configuration_id: Option<u64>,
    pub configuration_name: Option<String>,
    pub tester: Option<IdentityRef>,
}
