use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Handle returned by the scheduler for an accepted job.
#[derive(Debug, Clone)]
pub struct SubmissionResult {
    pub job_id: Arc<str>,
    pub submitted_at: DateTime<Utc>,
    /// Scheduler stdout, kept for diagnostics.
    pub raw_output: String,
}

/// One line of scheduler accounting output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountingRecord {
    pub record_id: String,
    pub state: String,
}

impl AccountingRecord {
    pub fn new(record_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            state: state.into(),
        }
    }
}
