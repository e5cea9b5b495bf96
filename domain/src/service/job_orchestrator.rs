use crate::error::JobError;
use crate::model::entity::JobRun;
use crate::model::vo::{JobSpec, RunOptions};

#[async_trait::async_trait]
pub trait JobOrchestrator {
    /// Renders, submits and waits for `spec`, returning once every task is terminal or the wait
    /// is aborted through `options`.
    async fn run_job(&self, spec: &JobSpec, options: RunOptions) -> Result<JobRun, JobError>;
}
