use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{JobState, TaskStatus};
use crate::model::vo::SubmissionResult;

/// Why polling stopped.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PollOutcome {
    /// Every tracked task reached a scheduler-reported terminal state.
    Finished,
    /// The caller's deadline expired first.
    TimedOut,
    /// The caller's cancellation token fired first.
    Cancelled,
}

/// Final snapshot of a job's tasks. Built once, read-only afterwards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    job_id: Arc<str>,
    tasks: BTreeMap<u32, TaskStatus>,
    success: bool,
    failed_indices: Vec<u32>,
    outcome: PollOutcome,
}

impl JobReport {
    pub fn new(job_id: Arc<str>, tasks: BTreeMap<u32, TaskStatus>, outcome: PollOutcome) -> Self {
        let failed_indices: Vec<u32> = tasks
            .values()
            .filter(|task| task.state != JobState::Completed)
            .map(|task| task.index)
            .collect();
        Self {
            job_id,
            success: failed_indices.is_empty() && outcome == PollOutcome::Finished,
            tasks,
            failed_indices,
            outcome,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn tasks(&self) -> &BTreeMap<u32, TaskStatus> {
        &self.tasks
    }

    pub fn task(&self, index: u32) -> Option<&TaskStatus> {
        self.tasks.get(&index)
    }

    /// True iff every task `COMPLETED`.
    pub fn success(&self) -> bool {
        self.success
    }

    /// Indices of tasks that did not complete, including `UNKNOWN` ones.
    pub fn failed_indices(&self) -> &[u32] {
        &self.failed_indices
    }

    pub fn outcome(&self) -> PollOutcome {
        self.outcome
    }
}

/// A submitted job together with how it ended.
#[derive(Debug, Clone)]
pub struct JobRun {
    pub submission: SubmissionResult,
    pub report: JobReport,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn tasks(states: &[JobState]) -> BTreeMap<u32, TaskStatus> {
        let job_id: Arc<str> = Arc::from("42");
        let now = Utc::now();
        (1..)
            .zip(states)
            .map(|(index, state)| (index, TaskStatus::new(job_id.clone(), index, *state, now)))
            .collect()
    }

    #[test]
    fn all_completed_is_success() {
        let report = JobReport::new(
            Arc::from("42"),
            tasks(&[JobState::Completed, JobState::Completed]),
            PollOutcome::Finished,
        );
        assert!(report.success());
        assert!(report.failed_indices().is_empty());
    }

    #[test]
    fn unknown_counts_as_failure() {
        let report = JobReport::new(
            Arc::from("42"),
            tasks(&[JobState::Completed, JobState::Failed, JobState::Unknown]),
            PollOutcome::Finished,
        );
        assert!(!report.success());
        assert_eq!(report.failed_indices(), &[2, 3]);
    }

    #[test]
    fn aborted_wait_is_never_success() {
        let report = JobReport::new(
            Arc::from("42"),
            tasks(&[JobState::Completed]),
            PollOutcome::TimedOut,
        );
        assert!(!report.success());
        assert_eq!(report.outcome(), PollOutcome::TimedOut);
    }
}
