mod common;

use std::sync::Arc;

use common::{release_plan, transport, Fail, FakeApi, FakeWorkItems};
use testplan_extract::extractor::Extractor;
use testplan_extract::models::{fields, ExtractionMode, RunStatus, SuiteSelection, WorkItem};

const STEPS: &str = r#"<steps><step id="1" type="ActionStep"><parameterizedString>Open</parameterizedString><parameterizedString>Opened</parameterizedString></step></steps>"#;

fn work_item(id: u64, title: &str) -> WorkItem {
    WorkItem::new(id)
        .with_field(fields::TITLE, title)
        .with_field(fields::STEPS, STEPS)
        .with_field(fields::PRIORITY, 2)
        .with_field(fields::STATE, "Ready")
}

fn backing_items() -> FakeWorkItems {
    FakeWorkItems::new()
        .with_item(work_item(100, "Smoke"))
        .with_item(work_item(101, "Valid login"))
}

fn setup(api: FakeApi, work_items: FakeWorkItems) -> (Extractor, Arc<FakeApi>, Arc<FakeWorkItems>) {
    let api = Arc::new(api);
    let work_items = Arc::new(work_items);
    let extractor = Extractor::new(transport(api.clone(), work_items.clone()));
    (extractor, api, work_items)
}

mod selective {
    use super::*;

    #[tokio::test]
    async fn requested_child_keeps_root_without_cases() {
        let (extractor, api, _) = setup(release_plan(), backing_items());
        let selection: SuiteSelection = [(10, 21)].into_iter().collect();

        let result = extractor.extract_selection("P", &selection).await;

        assert_eq!(result.status, RunStatus::Success);
        assert_eq!(result.mode, ExtractionMode::Selective);
        let plan = result.plan(10).unwrap();
        assert_eq!(plan.requested_suite_ids, vec![21]);
        assert_eq!(plan.suites.len(), 1);

        let root = &plan.suites[0];
        assert_eq!(root.suite.id, 20);
        assert!(root.cases.is_empty());
        assert_eq!(root.child_suites.len(), 1);

        let child = &root.child_suites[0];
        assert_eq!(child.suite.id, 21);
        let case_ids: Vec<u64> = child.cases.iter().map(|c| c.id).collect();
        assert_eq!(case_ids, vec![101]);
        assert_eq!(plan.case_count(), 1);
        assert_eq!(api.call_count("list_cases:10:20"), 0);
    }

    #[tokio::test]
    async fn enriches_cases_from_work_items() {
        let (extractor, _, work_items) = setup(release_plan(), backing_items());
        let selection: SuiteSelection = [(10, 21)].into_iter().collect();

        let result = extractor.extract_selection("P", &selection).await;

        let case = &result.plan(10).unwrap().suites[0].child_suites[0].cases[0];
        assert_eq!(case.steps.len(), 1);
        assert_eq!(case.steps[0].action, "Open");
        assert_eq!(case.priority, Some(2));
        assert_eq!(case.state.as_deref(), Some("Ready"));
        assert_eq!(work_items.batches(), vec![vec![101]]);
        assert_eq!(result.stats.steps, 1);
        assert_eq!(result.stats.work_items, 1);
    }

    #[tokio::test]
    async fn empty_suite_list_still_fetches_requested_suites() {
        let (extractor, api, _) = setup(
            release_plan().fail("list_suites:10", Fail::NotFound, None),
            backing_items(),
        );
        let selection: SuiteSelection = [(10, 21)].into_iter().collect();

        let result = extractor.extract_selection("P", &selection).await;

        let plan = result.plan(10).unwrap();
        assert_eq!(plan.suites.len(), 1);
        assert_eq!(plan.suites[0].suite.id, 21);
        assert_eq!(plan.suites[0].cases[0].id, 101);
        assert_eq!(api.call_count("get_suite:10:21"), 1);
        assert_eq!(result.status, RunStatus::PartialWithWarnings);
    }

    #[tokio::test]
    async fn unknown_plan_is_an_error_entry() {
        let (extractor, _, _) = setup(release_plan(), backing_items());
        let selection: SuiteSelection = [(10, 21), (99, 1)].into_iter().collect();

        let result = extractor.extract_selection("P", &selection).await;

        assert_eq!(result.status, RunStatus::PartialWithWarnings);
        assert_eq!(result.plans.len(), 1);
        assert_eq!(result.errors.len(), 1);
    }

    #[tokio::test]
    async fn no_resolvable_plan_is_an_error_run() {
        let (extractor, _, _) = setup(release_plan(), backing_items());
        let selection: SuiteSelection = [(99, 1)].into_iter().collect();

        let result = extractor.extract_selection("P", &selection).await;

        assert!(result.is_error());
        assert!(result.plans.is_empty());
    }

    #[tokio::test]
    async fn empty_selection_is_an_error_run() {
        let (extractor, _, _) = setup(release_plan(), backing_items());

        let result = extractor.extract_selection("P", &SuiteSelection::new()).await;

        assert!(result.is_error());
    }
}

mod full_project {
    use super::*;

    #[tokio::test]
    async fn extracts_every_suite_with_cases() {
        let (extractor, _, _) = setup(release_plan(), backing_items());

        let result = extractor.extract_project("P").await;

        assert_eq!(result.status, RunStatus::Success);
        assert_eq!(result.stats.plans, 1);
        assert_eq!(result.stats.suites, 2);
        assert_eq!(result.stats.cases, 2);
        let root = &result.plans[0].suites[0];
        assert!(root.cases_included);
        assert_eq!(root.cases[0].id, 100);
        assert_eq!(root.cases[0].title, "Smoke");
    }

    #[tokio::test]
    async fn failed_plan_discovery_is_an_error_run() {
        let (extractor, _, _) = setup(release_plan().fail("list_plans", Fail::Fatal, None), backing_items());

        let result = extractor.extract_project("P").await;

        assert!(result.is_error());
        assert_eq!(result.errors.len(), 1);
    }

    #[tokio::test]
    async fn no_plans_is_an_error_run() {
        let (extractor, _, _) = setup(FakeApi::modern(), FakeWorkItems::new());

        let result = extractor.extract_project("P").await;

        assert!(result.is_error());
    }

    #[tokio::test]
    async fn suite_failure_skips_only_that_plan() {
        let api = release_plan()
            .with_plan(11, "Hotfix")
            .with_suite(11, 30, "Hotfix", None)
            .fail("list_suites:10", Fail::Fatal, None);
        let (extractor, _, _) = setup(api, backing_items());

        let result = extractor.extract_project("P").await;

        assert_eq!(result.status, RunStatus::PartialWithWarnings);
        let ids: Vec<u64> = result.plans.iter().map(|p| p.plan.id).collect();
        assert_eq!(ids, vec![11]);
        assert_eq!(result.errors.len(), 1);
    }

    #[tokio::test]
    async fn missing_work_items_leave_cases_in_place() {
        let (extractor, _, _) = setup(release_plan(), FakeWorkItems::new().with_item(work_item(100, "Smoke")));

        let result = extractor.extract_project("P").await;

        assert_eq!(result.status, RunStatus::PartialWithWarnings);
        assert_eq!(result.stats.cases, 2);
        let child = &result.plans[0].suites[0].child_suites[0];
        assert_eq!(child.cases[0].title, "Valid login");
        assert!(child.cases[0].steps.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_payload_degrades_to_empty_steps() {
        let broken = WorkItem::new(101).with_field(fields::STEPS, "<steps><step id=\"1\">");
        let (extractor, _, _) = setup(
            release_plan(),
            FakeWorkItems::new().with_item(work_item(100, "Smoke")).with_item(broken),
        );

        let result = extractor.extract_project("P").await;

        assert_eq!(result.stats.cases, 2);
        let child = &result.plans[0].suites[0].child_suites[0];
        assert!(child.cases[0].steps.is_empty());
        assert_eq!(result.status, RunStatus::Success);
    }
}

mod execution_data {
    use super::*;

    fn executed_plan() -> FakeApi {
        release_plan()
            .with_configuration(1, "Windows 10")
            .with_variable(2, "Browser", &["Edge", "Chrome"])
            .with_point(10, 20, 500, 100, Some((7, 9000)))
            .with_point(10, 21, 501, 101, None)
            .with_result(7, 9000, "Passed")
    }

    #[tokio::test]
    async fn collects_points_results_and_definitions() {
        let (extractor, _, _) = setup(executed_plan(), backing_items());

        let result = extractor.extract_project("P").await;

        assert_eq!(result.status, RunStatus::Success);
        assert_eq!(result.configurations[0].name, "Windows 10");
        assert_eq!(result.variables[0].values, vec!["Edge", "Chrome"]);
        let plan = result.plan(10).unwrap();
        let point_ids: Vec<u64> = plan.points.iter().map(|p| p.id).collect();
        assert_eq!(point_ids, vec![500, 501]);
        assert_eq!(plan.results.len(), 1);
        assert_eq!(plan.results[0].outcome.as_deref(), Some("Passed"));
        assert_eq!(result.stats.points, 2);
        assert_eq!(result.stats.results, 1);
        assert_eq!(result.stats.configurations, 1);
    }

    #[tokio::test]
    async fn only_suites_with_extracted_cases_get_points() {
        let (extractor, api, _) = setup(executed_plan(), backing_items());
        let selection: SuiteSelection = [(10, 21)].into_iter().collect();

        let result = extractor.extract_selection("P", &selection).await;

        let plan = result.plan(10).unwrap();
        assert_eq!(plan.points.len(), 1);
        assert_eq!(plan.points[0].test_case_id, Some(101));
        assert!(plan.results.is_empty());
        assert_eq!(api.call_count("list_points:10:20"), 0);
        assert_eq!(api.call_count("list_points:10:21"), 1);
    }

    #[tokio::test]
    async fn failures_become_warnings() {
        let api = executed_plan()
            .fail("list_configurations", Fail::Fatal, None)
            .fail("list_points:10:21", Fail::Fatal, None)
            .fail("get_result:7:9000", Fail::Fatal, None);
        let (extractor, _, _) = setup(api, backing_items());

        let result = extractor.extract_project("P").await;

        assert_eq!(result.status, RunStatus::PartialWithWarnings);
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings.len(), 3);
        assert!(result.configurations.is_empty());
        assert_eq!(result.variables.len(), 1);
        let plan = result.plan(10).unwrap();
        assert_eq!(plan.points.len(), 1);
        assert!(plan.results.is_empty());
        assert_eq!(result.stats.cases, 2);
    }

    #[tokio::test]
    async fn can_be_turned_off() {
        let api = Arc::new(executed_plan());
        let extractor = Extractor::new(transport(api.clone(), Arc::new(backing_items()))).with_execution_data(false);

        let result = extractor.extract_project("P").await;

        assert!(result.configurations.is_empty());
        assert!(result.plans[0].points.is_empty());
        assert_eq!(api.call_count("list_configurations"), 0);
        assert_eq!(api.call_count("list_points:10:20"), 0);
    }
}

mod work_items {
    use super::*;

    #[tokio::test]
    async fn decodes_requested_items_once() {
        let (extractor, _, fake) = setup(FakeApi::modern(), backing_items());

        let result = extractor.extract_work_items("P", &[100, 101, 100], &[]).await;

        assert_eq!(result.status, RunStatus::Success);
        assert_eq!(result.requested, 2);
        assert_eq!(result.work_items.len(), 2);
        assert_eq!(result.work_items[0].test_steps.len(), 1);
        assert_eq!(result.work_items[1].title.as_deref(), Some("Valid login"));
        assert_eq!(fake.batches(), vec![vec![100, 101]]);
    }

    #[tokio::test]
    async fn reports_missing_items_as_warnings() {
        let (extractor, _, _) = setup(FakeApi::modern(), backing_items());

        let result = extractor.extract_work_items("P", &[100, 5], &[]).await;

        assert_eq!(result.status, RunStatus::PartialWithWarnings);
        assert_eq!(result.warnings.len(), 1);
    }

    #[tokio::test]
    async fn failed_only_batch_is_an_error_run() {
        let (extractor, _, _) = setup(FakeApi::modern(), backing_items().poison(100, Fail::Fatal));

        let result = extractor.extract_work_items("P", &[100, 101], &[]).await;

        assert_eq!(result.status, RunStatus::Error);
        assert!(result.work_items.is_empty());
    }
}
