use std::io::{self, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dep_inj::DepInj;
use domain::{
    error::JobError,
    model::{
        entity::{JobReport, JobRun, PollOutcome},
        vo::{AccountingRecord, JobSpec, RunOptions, SubmissionResult},
    },
    service::{JobOrchestrator, JobScheduler, ScriptRenderer},
};
use infrastructure::sync::timer::{Stop, Timer};
use retry_policies::{policies::ExponentialBackoff, RetryDecision, RetryPolicy};
use tempfile::NamedTempFile;
use tokio::time::Instant;
use typed_builder::TypedBuilder;

use crate::tracker::JobTracker;

#[derive(DepInj, TypedBuilder)]
#[target(JobOrchestratorImpl)]
pub struct JobOrchestratorState {
    /// Where transient submission scripts are written.
    #[builder(setter(into))]
    script_dir: PathBuf,

    /// Accounting lags job registration, so the first query waits this long.
    #[builder(default = Duration::from_secs(60))]
    grace_period: Duration,

    #[builder(default = Duration::from_secs(30))]
    poll_interval: Duration,

    /// Retries of a failing accounting query before giving up on the job.
    #[builder(default = 3)]
    query_retries: u32,

    #[builder(default = Duration::from_secs(2))]
    retry_backoff: Duration,
}

#[async_trait::async_trait]
impl<Deps> JobOrchestrator for JobOrchestratorImpl<Deps>
where
    Deps: AsRef<JobOrchestratorState> + JobScheduler + ScriptRenderer + Send + Sync,
{
    async fn run_job(&self, spec: &JobSpec, options: RunOptions) -> Result<JobRun, JobError> {
        let script = self.prj_ref().render(spec)?;
        let submission = self.submit(&script).await?;
        let job_id = submission.job_id.clone();
        tracing::info!(%job_id, tasks = spec.array_size, "Submitted job `{}`", spec.name);

        let report = self.wait(job_id, spec.array_size, options).await?;
        let completed_at = Utc::now();
        match report.outcome() {
            PollOutcome::Finished if report.success() => {
                tracing::info!(job_id = report.job_id(), "Job completed")
            }
            PollOutcome::Finished => tracing::warn!(
                job_id = report.job_id(),
                failed = ?report.failed_indices(),
                "Job finished with failed tasks"
            ),
            outcome => tracing::warn!(
                job_id = report.job_id(),
                unresolved = ?report.failed_indices(),
                "Stopped waiting for job: {outcome}"
            ),
        }

        Ok(JobRun {
            submission,
            report,
            completed_at,
        })
    }
}

impl<Deps> JobOrchestratorImpl<Deps>
where
    Deps: AsRef<JobOrchestratorState> + JobScheduler + Send + Sync,
{
    /// Hands `script` to the scheduler through a temp file that is removed on every path out.
    async fn submit(&self, script: &str) -> Result<SubmissionResult, JobError> {
        let dir = self.script_dir.clone();
        let script = script.to_owned();
        let file = tokio::task::spawn_blocking(move || write_script(&dir, &script))
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;

        self.prj_ref().submit_job(file.path()).await
    }

    async fn wait(
        &self,
        job_id: Arc<str>,
        array_size: u32,
        options: RunOptions,
    ) -> Result<JobReport, JobError> {
        let RunOptions { deadline, cancel } = options;
        let mut timer = Timer::new(self.grace_period, self.poll_interval)
            .with_deadline(deadline.map(|d| Instant::now() + d))
            .with_cancel(cancel);
        let mut tracker = JobTracker::new(job_id.clone(), array_size);

        tracing::info!(%job_id, "Waiting {:?} before the first accounting query", self.grace_period);
        let outcome = loop {
            if let ControlFlow::Break(stop) = timer.tick().await {
                break stop_outcome(stop);
            }

            // A stalled or retrying query must not outlive the deadline or the token.
            let records = tokio::select! {
                biased;
                stop = timer.stopped() => break stop_outcome(stop),
                records = self.query_records(&job_id) => records?,
            };
            let progress = tracker.observe(&records, Utc::now());
            if progress.complete {
                break PollOutcome::Finished;
            }
            tracing::info!(
                %job_id,
                pending = progress.pending,
                running = progress.running,
                done = progress.terminal,
                "Job is still running, next check in {:?}",
                self.poll_interval
            );
        };

        Ok(tracker.report(outcome, Utc::now()))
    }

    async fn query_records(&self, job_id: &str) -> Result<Vec<AccountingRecord>, JobError> {
        let policy = ExponentialBackoff::builder()
            .retry_bounds(self.retry_backoff, self.retry_backoff * 16)
            .build_with_max_retries(self.query_retries);
        let mut past_retries = 0;
        loop {
            let err = match self.prj_ref().get_job_records(job_id).await {
                Ok(records) => return Ok(records),
                Err(e) => e,
            };
            match policy.should_retry(past_retries) {
                RetryDecision::Retry { execute_after } => {
                    let backoff = (execute_after - Utc::now()).to_std().unwrap_or_default();
                    past_retries += 1;
                    tracing::warn!(
                        job_id,
                        attempt = past_retries,
                        "Accounting query failed, retrying in {backoff:?}: {err}"
                    );
                    tokio::time::sleep(backoff).await;
                }
                RetryDecision::DoNotRetry => {
                    tracing::error!(job_id, "Accounting query failed after {past_retries} retries");
                    return Err(err);
                }
            }
        }
    }
}

fn stop_outcome(stop: Stop) -> PollOutcome {
    match stop {
        Stop::Deadline => PollOutcome::TimedOut,
        Stop::Cancelled => PollOutcome::Cancelled,
    }
}

fn write_script(dir: &Path, script: &str) -> io::Result<NamedTempFile> {
    std::fs::create_dir_all(dir)?;
    let mut file = tempfile::Builder::new()
        .prefix("labflow-")
        .suffix(".sh")
        .tempfile_in(dir)?;
    file.write_all(script.as_bytes())?;
    file.flush()?;
    Ok(file)
}
