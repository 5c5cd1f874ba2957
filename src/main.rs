use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use testplan_extract::config::AzureConfig;
use testplan_extract::csv_selection::parse_selection_csv;
use testplan_extract::extractor::Extractor;
use testplan_extract::models::{ExtractionResult, RunStatus, SuiteSelection};
use testplan_extract::output::{OutputLayout, ResultWriter};
use testplan_extract::transport::Transport;
use testplan_extract::tree::render_tree;

#[derive(Parser)]
#[command(name = "tpx")]
#[command(about = "Extract test plans, suites and cases from Azure DevOps")]
struct Cli {
    /// Directory that receives the extraction_<timestamp> folder
    #[arg(long, global = true, default_value = "output")]
    output_dir: PathBuf,

    /// Write one file per plan instead of a single test_plans.json
    #[arg(long, global = true)]
    modular: bool,

    /// Print the extracted suite trees to stdout
    #[arg(long, global = true)]
    tree: bool,

    /// Skip configurations, variables, test points and results
    #[arg(long, global = true)]
    no_execution: bool,

    /// Debug logging (RUST_LOG still wins)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every plan of a project
    Project {
        /// Project name, defaults to PROJECT_NAME
        #[arg(long)]
        name: Option<String>,
    },
    /// Extract the suites listed in a selection CSV
    Csv {
        file: PathBuf,

        #[arg(long)]
        project: Option<String>,
    },
    /// Extract selected suites of one plan
    Suites {
        #[arg(long)]
        plan: u64,

        #[arg(long = "suite", required = true, num_args = 1..)]
        suites: Vec<u64>,

        #[arg(long)]
        project: Option<String>,
    },
    /// Fetch and decode work items by id
    WorkItems {
        #[arg(long, required = true, value_delimiter = ',')]
        ids: Vec<u64>,

        /// Fields to fetch, defaults to the test-case fields
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,

        #[arg(long)]
        project: Option<String>,
    },
}

/// Initialize tracing on stderr so stdout stays free for the tree preview
fn init_tracing(debug: bool) {
    let default = if debug {
        "testplan_extract=debug,tpx=debug"
    } else {
        "testplan_extract=info,tpx=info"
    };
    let filter = tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = AzureConfig::from_env().context("Invalid configuration")?;
    let extractor = Extractor::new(Transport::from_config(&config)).with_execution_data(!cli.no_execution);
    let layout = if cli.modular {
        OutputLayout::PerPlan
    } else {
        OutputLayout::Monolithic
    };
    let writer = ResultWriter::new(&cli.output_dir, layout);

    let result = match cli.command {
        Commands::Project { name } => {
            let project = config.project(name.as_deref())?;
            extractor.extract_project(&project).await
        }
        Commands::Csv { file, project } => {
            let project = config.project(project.as_deref())?;
            let parsed = parse_selection_csv(&file)?;
            extractor.extract_selection(&project, &parsed.selection).await
        }
        Commands::Suites { plan, suites, project } => {
            let project = config.project(project.as_deref())?;
            let selection: SuiteSelection = suites.into_iter().map(|suite| (plan, suite)).collect();
            extractor.extract_selection(&project, &selection).await
        }
        Commands::WorkItems { ids, fields, project } => {
            let project = config.project(project.as_deref())?;
            let result = extractor.extract_work_items(&project, &ids, &fields).await;
            let dir = writer.write_work_items(&result)?;
            tracing::info!("Output written to {}", dir.display());
            return Ok(exit_code(result.status));
        }
    };

    if cli.tree {
        print_trees(&result);
    }
    let dir = writer.write(&result)?;
    tracing::info!("Output written to {}", dir.display());

    Ok(exit_code(result.status))
}

fn print_trees(result: &ExtractionResult) {
    for plan in &result.plans {
        println!("Plan {} - {}", plan.plan.id, plan.plan.name);
        print!("{}", render_tree(&plan.suites));
        println!();
    }
}

fn exit_code(status: RunStatus) -> ExitCode {
    match status {
        RunStatus::Error => ExitCode::FAILURE,
        RunStatus::Success | RunStatus::PartialWithWarnings => ExitCode::SUCCESS,
    }
}
