//! Writing extraction results to disk.
//!
//! Every run gets its own `extraction_<YYYYmmdd_HHMMSS>` directory holding
//! the data files and an `extraction_summary.json`. Test points and results
//! travel inside each plan; configurations and variables get their own file. Data is written whatever
//! the run status, so a degraded run still leaves everything it found.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::models::{
    ExtractionMode, ExtractionResult, ExtractionStats, PlanExtraction, RunStatus, TestConfiguration, TestVariable,
    WorkItemExtraction,
};

pub const SUMMARY_FILE: &str = "extraction_summary.json";
pub const PLANS_FILE: &str = "test_plans.json";
pub const PLANS_DIR: &str = "plans";
pub const WORK_ITEMS_FILE: &str = "work_items.json";
pub const CONFIGURATIONS_FILE: &str = "test_configurations.json";

/// One file for all plans, or one file per plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    #[default]
    Monolithic,
    PerPlan,
}

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    project: &'a str,
    mode: ExtractionMode,
    status: RunStatus,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    duration_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    layout: Option<OutputLayout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<ExtractionStats>,
    files: Vec<String>,
    errors: &'a [String],
    warnings: &'a [String],
}

#[derive(Debug, Serialize)]
struct PlansFile<'a> {
    project: &'a str,
    extracted_at: DateTime<Utc>,
    plans: &'a [PlanExtraction],
}

#[derive(Debug, Serialize)]
struct ConfigurationsFile<'a> {
    project: &'a str,
    configurations: &'a [TestConfiguration],
    variables: &'a [TestVariable],
}

pub struct ResultWriter {
    base_dir: PathBuf,
    layout: OutputLayout,
}

impl ResultWriter {
    pub fn new(base_dir: impl Into<PathBuf>, layout: OutputLayout) -> Self {
        Self {
            base_dir: base_dir.into(),
            layout,
        }
    }

    /// Write a plan/suite extraction. Returns the run directory.
    pub fn write(&self, result: &ExtractionResult) -> Result<PathBuf> {
        let run_dir = self.run_dir(result.started_at)?;
        let mut files = Vec::new();

        match self.layout {
            OutputLayout::Monolithic => {
                let doc = PlansFile {
                    project: &result.project,
                    extracted_at: result.finished_at,
                    plans: &result.plans,
                };
                write_json(&run_dir.join(PLANS_FILE), &doc)?;
                files.push(PLANS_FILE.to_string());
            }
            OutputLayout::PerPlan => {
                let plans_dir = run_dir.join(PLANS_DIR);
                fs::create_dir_all(&plans_dir)
                    .with_context(|| format!("Failed to create {}", plans_dir.display()))?;
                for plan in &result.plans {
                    let name = format!("plan_{}.json", plan.plan.id);
                    write_json(&plans_dir.join(&name), plan)?;
                    files.push(format!("{}/{}", PLANS_DIR, name));
                }
            }
        }

        if !result.configurations.is_empty() || !result.variables.is_empty() {
            let doc = ConfigurationsFile {
                project: &result.project,
                configurations: &result.configurations,
                variables: &result.variables,
            };
            write_json(&run_dir.join(CONFIGURATIONS_FILE), &doc)?;
            files.push(CONFIGURATIONS_FILE.to_string());
        }

        let summary = RunSummary {
            project: &result.project,
            mode: result.mode,
            status: result.status,
            started_at: result.started_at,
            finished_at: result.finished_at,
            duration_secs: duration_secs(result.started_at, result.finished_at),
            layout: Some(self.layout),
            stats: Some(result.stats),
            files,
            errors: &result.errors,
            warnings: &result.warnings,
        };
        write_json(&run_dir.join(SUMMARY_FILE), &summary)?;

        info!(dir = %run_dir.display(), status = result.status.as_str(), "Results written");
        Ok(run_dir)
    }

    /// Write a standalone work-item extraction. Returns the run directory.
    pub fn write_work_items(&self, result: &WorkItemExtraction) -> Result<PathBuf> {
        let run_dir = self.run_dir(result.started_at)?;
        write_json(&run_dir.join(WORK_ITEMS_FILE), &result.work_items)?;

        let summary = RunSummary {
            project: &result.project,
            mode: ExtractionMode::WorkItems,
            status: result.status,
            started_at: result.started_at,
            finished_at: result.finished_at,
            duration_secs: duration_secs(result.started_at, result.finished_at),
            layout: None,
            stats: None,
            files: vec![WORK_ITEMS_FILE.to_string()],
            errors: &result.errors,
            warnings: &result.warnings,
        };
        write_json(&run_dir.join(SUMMARY_FILE), &summary)?;

        info!(dir = %run_dir.display(), count = result.work_items.len(), "Work items written");
        Ok(run_dir)
    }

    fn run_dir(&self, started_at: DateTime<Utc>) -> Result<PathBuf> {
        let dir = self
            .base_dir
            .join(format!("extraction_{}", started_at.format("%Y%m%d_%H%M%S")));
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(dir)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn duration_secs(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 1000.0
}
