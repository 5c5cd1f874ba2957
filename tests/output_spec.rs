use std::fs;

use chrono::{TimeZone, Utc};
use serde_json::Value;
use speculate2::speculate;
use testplan_extract::models::{
    ExtractionMode, ExtractionResult, ExtractionStats, Plan, PlanExtraction, RunStatus, Suite, SuiteNode,
    TestConfiguration, TestPoint, TestVariable, WorkItem, WorkItemExtraction,
};
use testplan_extract::output::{
    OutputLayout, ResultWriter, CONFIGURATIONS_FILE, PLANS_DIR, PLANS_FILE, SUMMARY_FILE, WORK_ITEMS_FILE,
};

fn plan(id: u64) -> PlanExtraction {
    PlanExtraction::new(
        Plan::new(id, &format!("Plan {}", id)),
        Vec::new(),
        vec![SuiteNode {
            suite: Suite::new(id * 10, id, "Root", None),
            cases_included: true,
            cases: Vec::new(),
            child_suites: Vec::new(),
        }],
    )
}

fn result(status: RunStatus, plans: Vec<PlanExtraction>) -> ExtractionResult {
    let started_at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
    ExtractionResult {
        project: "Shop".to_string(),
        mode: ExtractionMode::FullProject,
        started_at,
        finished_at: started_at + chrono::Duration::seconds(5),
        status,
        stats: ExtractionStats {
            plans: plans.len(),
            suites: plans.len(),
            ..Default::default()
        },
        plans,
        configurations: Vec::new(),
        variables: Vec::new(),
        errors: Vec::new(),
        warnings: Vec::new(),
    }
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

speculate! {
    before {
        let dir = tempfile::tempdir().unwrap();
    }

    describe "result writer" {
        it "names the run directory after the start time" {
            let writer = ResultWriter::new(dir.path(), OutputLayout::Monolithic);
            let run_dir = writer.write(&result(RunStatus::Success, vec![plan(1)])).unwrap();
            assert_eq!(run_dir.file_name().unwrap(), "extraction_20260301_093000");
        }

        it "writes all plans to one file" {
            let writer = ResultWriter::new(dir.path(), OutputLayout::Monolithic);
            let run_dir = writer.write(&result(RunStatus::Success, vec![plan(1), plan(2)])).unwrap();

            let doc = read_json(&run_dir.join(PLANS_FILE));
            assert_eq!(doc["project"], "Shop");
            assert_eq!(doc["plans"].as_array().unwrap().len(), 2);
            assert_eq!(doc["plans"][0]["suites"][0]["id"], 10);
            assert!(!run_dir.join(PLANS_DIR).exists());
        }

        it "writes one file per plan" {
            let writer = ResultWriter::new(dir.path(), OutputLayout::PerPlan);
            let run_dir = writer.write(&result(RunStatus::Success, vec![plan(1), plan(2)])).unwrap();

            assert!(run_dir.join(PLANS_DIR).join("plan_1.json").exists());
            assert!(run_dir.join(PLANS_DIR).join("plan_2.json").exists());
            assert!(!run_dir.join(PLANS_FILE).exists());

            let summary = read_json(&run_dir.join(SUMMARY_FILE));
            assert_eq!(summary["layout"], "per_plan");
            assert_eq!(summary["files"].as_array().unwrap().len(), 2);
        }

        it "writes execution data next to the plans" {
            let mut executed = plan(1);
            executed.points.push(TestPoint::new(5, 1, 10));
            let mut run = result(RunStatus::Success, vec![executed]);
            run.configurations.push(TestConfiguration::new(1, "Windows 10"));
            run.variables.push(TestVariable::new(2, "Browser"));
            let writer = ResultWriter::new(dir.path(), OutputLayout::Monolithic);

            let run_dir = writer.write(&run).unwrap();

            let doc = read_json(&run_dir.join(PLANS_FILE));
            assert_eq!(doc["plans"][0]["points"][0]["id"], 5);
            let definitions = read_json(&run_dir.join(CONFIGURATIONS_FILE));
            assert_eq!(definitions["configurations"][0]["name"], "Windows 10");
            assert_eq!(definitions["variables"][0]["name"], "Browser");
            let summary = read_json(&run_dir.join(SUMMARY_FILE));
            assert_eq!(summary["files"][1], CONFIGURATIONS_FILE);
        }

        it "skips the configurations file when there are none" {
            let writer = ResultWriter::new(dir.path(), OutputLayout::Monolithic);
            let run_dir = writer.write(&result(RunStatus::Success, vec![plan(1)])).unwrap();
            assert!(!run_dir.join(CONFIGURATIONS_FILE).exists());
        }

        it "writes a summary for an error run" {
            let mut failed = result(RunStatus::Error, Vec::new());
            failed.errors.push("plan discovery failed".to_string());
            let writer = ResultWriter::new(dir.path(), OutputLayout::Monolithic);

            let run_dir = writer.write(&failed).unwrap();

            let summary = read_json(&run_dir.join(SUMMARY_FILE));
            assert_eq!(summary["status"], "error");
            assert_eq!(summary["errors"][0], "plan discovery failed");
            assert_eq!(summary["duration_secs"], 5.0);
            assert_eq!(summary["stats"]["plans"], 0);
        }

        it "writes standalone work items" {
            let started_at = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
            let extraction = WorkItemExtraction {
                project: "Shop".to_string(),
                started_at,
                finished_at: started_at,
                status: RunStatus::Success,
                requested: 1,
                work_items: vec![testplan_extract::models::DecodedWorkItem {
                    id: 7,
                    rev: Some(3),
                    title: Some("Login".to_string()),
                    url: None,
                    fields: WorkItem::new(7).fields,
                    test_steps: Vec::new(),
                    test_parameters: Vec::new(),
                    parameter_values: Vec::new(),
                }],
                errors: Vec::new(),
                warnings: Vec::new(),
            };
            let writer = ResultWriter::new(dir.path(), OutputLayout::Monolithic);

            let run_dir = writer.write_work_items(&extraction).unwrap();

            let items = read_json(&run_dir.join(WORK_ITEMS_FILE));
            assert_eq!(items[0]["id"], 7);
            let summary = read_json(&run_dir.join(SUMMARY_FILE));
            assert_eq!(summary["mode"], "work_items");
            assert!(summary.get("layout").is_none());
        }
    }
}
