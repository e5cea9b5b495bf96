mod run;
mod transfer;

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use colored::Colorize;
use domain::{
    model::{
        entity::{JobReport, JobRun, JobState},
        vo::{JobSpec, Resources, RunOptions},
    },
    service::JobOrchestrator,
};
use service::prelude::{write_csv, JobTimings};
use tokio_util::sync::CancellationToken;

use crate::cli::JobArgs;
use crate::config::PipelineConfig;

pub use self::{run::run, transfer::transfer};

/// Config resources with command-line overrides applied.
fn resources(config: &PipelineConfig, args: &JobArgs) -> Resources {
    let mut resources = config.resources();
    if let Some(partition) = &args.partition {
        resources.partition = partition.clone();
    }
    if let Some(time) = &args.time {
        resources.walltime = time.clone();
    }
    if let Some(mem) = &args.mem {
        resources.memory = mem.clone();
    }
    if let Some(cpus) = args.cpus {
        resources.cpus = cpus;
    }
    resources
}

/// How a chain of jobs ended.
#[derive(Debug)]
struct Outcome {
    success: bool,
    timings: JobTimings,
}

/// Submits `spec`, waits for it and reports. Returns whether every task completed.
async fn execute<O>(
    orchestrator: &O,
    config: &PipelineConfig,
    spec: JobSpec,
    args: &JobArgs,
    cancel: CancellationToken,
) -> anyhow::Result<bool>
where
    O: JobOrchestrator + Sync,
{
    let outcome = run_stages(orchestrator, config, spec, None, args, cancel).await?;
    outcome.timings.log();
    Ok(outcome.success)
}

/// Runs `first`, then `then` only if every task of `first` completed.
///
/// The follow-up job is timed as the processing span of the chain. The CSV report, if asked for,
/// covers the first job.
async fn run_stages<O>(
    orchestrator: &O,
    config: &PipelineConfig,
    first: JobSpec,
    then: Option<JobSpec>,
    args: &JobArgs,
    cancel: CancellationToken,
) -> anyhow::Result<Outcome>
where
    O: JobOrchestrator + Sync,
{
    let deadline = args.max_wait.or(config.poll.max_wait).map(Duration::from_secs);
    let run = run_stage(orchestrator, first, deadline, args.report.as_deref(), cancel.clone()).await?;
    let mut outcome = Outcome {
        success: run.report.success(),
        timings: JobTimings::from_run(&run),
    };

    let Some(then) = then else {
        return Ok(outcome);
    };
    if !outcome.success {
        tracing::warn!("Skipping job `{}`: job {} did not complete", then.name, run.report.job_id());
        return Ok(outcome);
    }
    let next = run_stage(orchestrator, then, deadline, None, cancel).await?;
    outcome.success = next.report.success();
    outcome.timings = outcome
        .timings
        .with_processing(next.submission.submitted_at, next.completed_at);
    Ok(outcome)
}

async fn run_stage<O>(
    orchestrator: &O,
    spec: JobSpec,
    deadline: Option<Duration>,
    report: Option<&Path>,
    cancel: CancellationToken,
) -> anyhow::Result<JobRun>
where
    O: JobOrchestrator + Sync,
{
    let run = orchestrator
        .run_job(&spec, RunOptions { deadline, cancel })
        .await
        .with_context(|| format!("Job `{}` did not run", spec.name).red())?;

    print_report(&run.report, &spec);

    if let Some(path) = report {
        let file = File::create(path)
            .with_context(|| format!("Cannot create report {}", path.display()))?;
        write_csv(&run.report, file)
            .with_context(|| format!("Cannot write report {}", path.display()))?;
        tracing::info!("Report written to {}", path.display());
    }

    Ok(run)
}

fn print_report(report: &JobReport, spec: &JobSpec) {
    println!("Job {} ({}): {}", report.job_id(), spec.name, report.outcome());
    for task in report.tasks().values() {
        let state = match task.state {
            JobState::Completed => task.state.to_string().green(),
            _ => task.state.to_string().red(),
        };
        let arg = spec
            .task_args
            .get(task.index as usize - 1)
            .map(String::as_str)
            .unwrap_or("");
        println!("  task {:>3}  {state:<10}  {arg}", task.index);
    }
    if !report.success() {
        println!("Failed tasks: {:?}", report.failed_indices());
    }
}
