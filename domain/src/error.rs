use chrono::{DateTime, Utc};

/// Everything that can stop a job before a [`JobReport`] exists.
///
/// A task that ends `FAILED` is not an error: it is recorded in the report and the caller decides
/// what to do with it.
///
/// [`JobReport`]: crate::model::entity::JobReport
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("invalid job spec: {0}")]
    InvalidSpec(String),

    #[error("job submission failed ({status}): {stderr}")]
    SubmissionFailed { status: String, stderr: String },

    #[error("unable to parse job id from scheduler output: {0:?}")]
    UnparsableJobId(String),

    #[error("accounting query for job {job_id} failed: {reason}")]
    PollQueryFailed { job_id: String, reason: String },

    #[error("invalid time range: {end} precedes {start}")]
    InvalidTimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl JobError {
    pub fn invalid_spec(msg: impl Into<String>) -> Self {
        Self::InvalidSpec(msg.into())
    }

    pub fn poll_failed(job_id: &str, reason: impl ToString) -> Self {
        Self::PollQueryFailed {
            job_id: job_id.to_owned(),
            reason: reason.to_string(),
        }
    }
}
