// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::config::model::JobFile;
use crate::dag::Scheduler;
use crate::engine::RunOptions;
use crate::exec::{Environment, OsLauncher};

pub use crate::dag::{ExecutionNode, NodeId, RunSummary};
pub use crate::errors::JobdagError;
pub use crate::exec::{ProcessLauncher, ProcessState, Signal};
pub use crate::types::FailurePolicy;

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the job file, builds the graph with a snapshot of the
/// current environment, and runs it with real processes.
///
/// Returns whether every job finished successfully.
pub async fn run(args: CliArgs) -> Result<bool> {
    let cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading job file {:?}", args.config))?;

    let options = effective_options(&args, &cfg);
    let mut scheduler = Scheduler::from_config(&cfg, Environment::capture())?;

    if args.dry_run {
        print_dry_run(&scheduler, &options);
        return Ok(true);
    }

    let mut launcher = OsLauncher::new();
    let succeeded = scheduler.run(&mut launcher, &options).await?;

    let summary = scheduler.summary();
    if succeeded {
        info!(finished = summary.finished, "all jobs finished");
    } else {
        warn!(
            failed = ?summary.failed,
            not_started = summary.not_started,
            "some jobs failed"
        );
    }

    Ok(succeeded)
}

/// Merge `[config]` from the job file with CLI overrides.
pub fn effective_options(args: &CliArgs, cfg: &JobFile) -> RunOptions {
    let mut options = RunOptions::from_config(&cfg.config);
    if let Some(jobs) = args.jobs {
        options.jobs = jobs;
    }
    if args.verbose {
        options.verbose = true;
    }
    if let Some(policy) = args.on_failure {
        options.failure_policy = policy;
    }
    options
}

/// Simple dry-run output: jobs in launch-eligible order, commands and deps.
fn print_dry_run(scheduler: &Scheduler, options: &RunOptions) {
    println!("jobdag dry-run");
    println!("  jobs = {}", options.jobs.max(1));
    println!("  on_failure = {}", options.failure_policy);
    println!();

    println!("jobs ({}):", scheduler.len());
    for (_, node) in scheduler.nodes() {
        println!("  - {}", node.name());
        println!("      cmd: {:?}", node.argv());
        if !node.dependencies().is_empty() {
            let deps: Vec<&str> = node
                .dependencies()
                .iter()
                .filter_map(|dep| scheduler.node(*dep).map(ExecutionNode::name))
                .collect();
            println!("      after: {:?}", deps);
        }
    }

    debug!("dry-run complete (no execution)");
}
