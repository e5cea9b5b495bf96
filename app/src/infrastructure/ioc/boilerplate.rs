use std::path::Path;

use domain::{
    error::JobError,
    model::{
        entity::JobRun,
        vo::{AccountingRecord, JobSpec, RunOptions, SubmissionResult},
    },
    service::{JobOrchestrator, JobScheduler, ScriptRenderer},
};
use service::prelude::JobOrchestratorImpl;

use super::Container;
use crate::infrastructure::service::job_scheduler::SlurmClient;

#[async_trait::async_trait]
impl JobScheduler for Container {
    async fn submit_job(&self, script_path: &Path) -> Result<SubmissionResult, JobError> {
        SlurmClient::inj_ref(self).submit_job(script_path).await
    }

    async fn get_job_records(&self, job_id: &str) -> Result<Vec<AccountingRecord>, JobError> {
        SlurmClient::inj_ref(self).get_job_records(job_id).await
    }
}

impl ScriptRenderer for Container {
    fn render(&self, spec: &JobSpec) -> Result<String, JobError> {
        SlurmClient::inj_ref(self).render(spec)
    }
}

#[async_trait::async_trait]
impl JobOrchestrator for Container {
    async fn run_job(&self, spec: &JobSpec, options: RunOptions) -> Result<JobRun, JobError> {
        JobOrchestratorImpl::inj_ref(self).run_job(spec, options).await
    }
}
