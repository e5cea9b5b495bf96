use std::path::Path;

use crate::error::JobError;
use crate::model::vo::{AccountingRecord, SubmissionResult};

/// The two command-line surfaces of a batch scheduler: submission and accounting.
#[async_trait::async_trait]
pub trait JobScheduler {
    /// Submits the script at `script_path`. Never retried by callers.
    async fn submit_job(&self, script_path: &Path) -> Result<SubmissionResult, JobError>;

    /// Every accounting record whose id starts with `job_id`. An empty result is not an error.
    async fn get_job_records(&self, job_id: &str) -> Result<Vec<AccountingRecord>, JobError>;
}
