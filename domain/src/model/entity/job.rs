use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// State of one task as seen through scheduler accounting.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    /// No record, an unrecognised state, or a wait that was aborted before the task resolved.
    #[default]
    Unknown,
}

impl JobState {
    /// Maps a Slurm state word (as printed by `sacct`) onto the tracked vocabulary.
    pub fn from_scheduler(state: &str) -> Self {
        match state.trim_end_matches('+') {
            "COMPLETED" => Self::Completed,
            "BOOT_FAIL" | "FAILED" | "NODE_FAIL" | "OUT_OF_MEMORY" | "TIMEOUT" | "DEADLINE"
            | "PREEMPTED" => Self::Failed,
            "CANCELLED" | "REVOKED" => Self::Cancelled,
            "PENDING" | "REQUEUED" | "REQUEUE_FED" | "REQUEUE_HOLD" | "RESV_DEL_HOLD" => {
                Self::Pending
            }
            "RUNNING" | "COMPLETING" | "CONFIGURING" | "SUSPENDED" | "STOPPED" | "SIGNALING"
            | "STAGE_OUT" | "RESIZING" => Self::Running,
            _ => Self::Unknown,
        }
    }

    /// Terminal states never change once observed.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub job_id: Arc<str>,
    /// 1-based array index; a single-task job is index 1.
    pub index: u32,
    pub state: JobState,
    pub observed_at: DateTime<Utc>,
}

impl TaskStatus {
    pub fn new(job_id: Arc<str>, index: u32, state: JobState, observed_at: DateTime<Utc>) -> Self {
        Self {
            job_id,
            index,
            state,
            observed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::JobState;

    #[test]
    fn scheduler_states() {
        assert_eq!(JobState::from_scheduler("COMPLETED"), JobState::Completed);
        assert_eq!(JobState::from_scheduler("OUT_OF_MEMORY"), JobState::Failed);
        assert_eq!(JobState::from_scheduler("TIMEOUT"), JobState::Failed);
        assert_eq!(JobState::from_scheduler("CANCELLED+"), JobState::Cancelled);
        assert_eq!(JobState::from_scheduler("COMPLETING"), JobState::Running);
        assert_eq!(JobState::from_scheduler("REQUEUED"), JobState::Pending);
        assert_eq!(JobState::from_scheduler("bogus"), JobState::Unknown);
    }

    #[test]
    fn terminal_set() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::Unknown.is_terminal());
        assert_eq!(JobState::Cancelled.to_string(), "CANCELLED");
    }
}
