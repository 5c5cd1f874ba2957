use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::decoder::DecodedPayload;
use crate::models::{fields, DecodedWorkItem, PlanExtraction, RunIssues, WorkItem};
use crate::transport::{BatchOutcome, Transport};

/// Unique work-item ids of every case in the plan, in tree order.
pub(crate) fn work_item_ids(plan: &PlanExtraction) -> Vec<u64> {
    let mut seen = HashSet::new();
    plan.suites
        .iter()
        .flat_map(|root| root.walk())
        .flat_map(|node| node.cases.iter())
        .map(|case| case.work_item.id)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Fill every case of a plan from its backing work item.
///
/// Returns the number of work items retrieved. Failed batches and missing
/// items become warnings; the affected cases keep empty payloads.
pub(crate) async fn enrich_plan(
    transport: &Transport,
    project: &str,
    plan: &mut PlanExtraction,
    issues: &mut RunIssues,
) -> usize {
    let ids = work_item_ids(plan);
    if ids.is_empty() {
        return 0;
    }

    let outcome = transport
        .fetch_work_items_batch(project, &ids, &fields::test_case_fields())
        .await;
    report_batch_failures(plan.plan.id, &outcome, issues);

    let failed: HashSet<u64> = outcome.failed_ids().collect();
    let by_id: HashMap<u64, &WorkItem> = outcome.items.iter().map(|item| (item.id, item)).collect();

    let mut missing = 0usize;
    for root in &mut plan.suites {
        root.for_each_case_mut(&mut |case| match by_id.get(&case.work_item.id) {
            Some(item) => case.apply_work_item(item),
            None if failed.contains(&case.work_item.id) => {}
            None => missing += 1,
        });
    }

    if missing > 0 {
        warn!(plan_id = plan.plan.id, missing, "Work items not returned for some cases");
        issues.warning(format!(
            "plan {}: {} case(s) have no retrievable work item, payloads left empty",
            plan.plan.id, missing
        ));
    }

    debug!(plan_id = plan.plan.id, requested = ids.len(), received = outcome.items.len(), "Enriched cases");
    outcome.items.len()
}

fn report_batch_failures(plan_id: u64, outcome: &BatchOutcome, issues: &mut RunIssues) {
    for failure in &outcome.failures {
        issues.warning(format!(
            "plan {}: work item batch {} ({} ids) failed: {}",
            plan_id,
            failure.batch,
            failure.ids.len(),
            failure.error
        ));
    }
}

/// A work item with its payload fields decoded.
pub(crate) fn decode_work_item(item: WorkItem) -> DecodedWorkItem {
    let payload = DecodedPayload::from_work_item(&item);
    DecodedWorkItem {
        id: item.id,
        rev: item.rev,
        title: item.field_str(fields::TITLE).map(str::to_string),
        url: item.url,
        fields: item.fields,
        test_steps: payload.steps,
        test_parameters: payload.parameters,
        parameter_values: payload.parameter_values,
    }
}
