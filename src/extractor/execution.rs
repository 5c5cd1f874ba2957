use tracing::{debug, warn};

use crate::models::{PlanExtraction, RunIssues, TestConfiguration, TestVariable};
use crate::transport::{ListOutcome, Transport};

/// Project-level configurations and variables. A failed list is a warning
/// and leaves that list empty.
pub(crate) async fn project_definitions(
    transport: &Transport,
    project: &str,
    issues: &mut RunIssues,
) -> (Vec<TestConfiguration>, Vec<TestVariable>) {
    let configurations = match transport.fetch_configurations(project).await {
        ListOutcome::Failed(err) => {
            warn!(project, error = %err, "Could not fetch test configurations");
            issues.warning(format!("test configurations could not be fetched: {}", err));
            Vec::new()
        }
        outcome => outcome.into_vec(),
    };

    let variables = match transport.fetch_variables(project).await {
        ListOutcome::Failed(err) => {
            warn!(project, error = %err, "Could not fetch test variables");
            issues.warning(format!("test variables could not be fetched: {}", err));
            Vec::new()
        }
        outcome => outcome.into_vec(),
    };

    (configurations, variables)
}

/// Points of every suite whose cases were extracted, and the last result of
/// each executed point.
pub(crate) async fn collect_plan_execution(
    transport: &Transport,
    project: &str,
    plan: &mut PlanExtraction,
    issues: &mut RunIssues,
) {
    let plan_id = plan.plan.id;
    let suite_ids: Vec<u64> = plan
        .suites
        .iter()
        .flat_map(|root| root.walk())
        .filter(|node| node.cases_included)
        .map(|node| node.suite.id)
        .collect();

    for suite_id in suite_ids {
        match transport.fetch_points(project, plan_id, suite_id).await {
            ListOutcome::Found(points) => plan.points.extend(points),
            ListOutcome::Empty => debug!(plan_id, suite_id, "Suite has no test points"),
            ListOutcome::Failed(err) => {
                warn!(plan_id, suite_id, error = %err, "Could not fetch test points");
                issues.warning(format!(
                    "plan {} suite {}: test points could not be fetched: {}",
                    plan_id, suite_id, err
                ));
            }
        }
    }

    let executed: Vec<(u64, u64, u64)> = plan
        .points
        .iter()
        .filter_map(|point| point.last_result().map(|(run, result)| (point.id, run, result)))
        .collect();
    for (point_id, run_id, result_id) in executed {
        match transport.fetch_result(project, run_id, result_id).await {
            Ok(result) => plan.results.push(result),
            Err(err) => {
                warn!(plan_id, point_id, run_id, error = %err, "Could not fetch test result");
                issues.warning(format!(
                    "plan {} point {}: result {} of run {} could not be fetched: {}",
                    plan_id, point_id, result_id, run_id, err
                ));
            }
        }
    }
}
