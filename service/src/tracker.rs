use std::collections::{btree_map::Entry, BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain::model::{
    entity::{JobReport, JobState, PollOutcome, TaskStatus},
    vo::AccountingRecord,
};

/// How an accounting record relates to the job being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// The bare job id, e.g. `555`.
    Job,
    /// A logical array task, e.g. `555_2`.
    Task(u32),
    /// Step bookkeeping such as `555.batch`, `555_2.extern` or `555_2.0`.
    Step,
    /// Array tasks not spawned yet, e.g. `555_[3-8]` or `555_[1-4%2]`.
    PendingRange,
    /// A suffix that is neither a task index nor a known step form.
    Ambiguous,
    /// Some other job.
    Foreign,
}

pub fn classify(job_id: &str, record_id: &str) -> RecordKind {
    let Some(rest) = record_id.strip_prefix(job_id) else {
        return RecordKind::Foreign;
    };
    if rest.is_empty() {
        return RecordKind::Job;
    }
    if rest.starts_with('.') {
        return RecordKind::Step;
    }
    let Some(suffix) = rest.strip_prefix('_') else {
        // `5551` is another job, `555+0` is a heterogeneous component.
        return match rest.starts_with(|c: char| c.is_ascii_digit()) {
            true => RecordKind::Foreign,
            false => RecordKind::Ambiguous,
        };
    };
    if suffix.contains('.') {
        return RecordKind::Step;
    }
    if suffix.starts_with('[') && suffix.ends_with(']') {
        return RecordKind::PendingRange;
    }
    match suffix.parse::<u32>() {
        Ok(index) if index > 0 && suffix.bytes().all(|b| b.is_ascii_digit()) => {
            RecordKind::Task(index)
        }
        _ => RecordKind::Ambiguous,
    }
}

/// Counts from one accounting snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub pending: usize,
    pub running: usize,
    pub terminal: usize,
    /// Tasks never seen in any snapshot so far.
    pub missing: usize,
    pub complete: bool,
}

/// Per-task state machine fed by successive accounting snapshots.
///
/// A task that reached `COMPLETED`, `FAILED` or `CANCELLED` keeps that state no matter what later
/// snapshots say.
#[derive(Debug)]
pub struct JobTracker {
    job_id: Arc<str>,
    array_size: u32,
    tasks: BTreeMap<u32, TaskStatus>,
    flagged: HashSet<String>,
}

impl JobTracker {
    pub fn new(job_id: Arc<str>, array_size: u32) -> Self {
        Self {
            job_id,
            array_size,
            tasks: BTreeMap::new(),
            flagged: HashSet::new(),
        }
    }

    /// Folds one snapshot into the tracked state.
    ///
    /// The job is complete once every logical task present in the snapshot is terminal and no
    /// array range is still waiting to be spawned. Tasks absent from the snapshot do not hold
    /// completion back.
    pub fn observe(&mut self, records: &[AccountingRecord], now: DateTime<Utc>) -> Progress {
        let mut progress = Progress::default();
        let mut range_pending = false;
        let mut seen = HashSet::new();

        for record in records {
            let index = match classify(&self.job_id, &record.record_id) {
                RecordKind::Task(index) => index,
                RecordKind::Job if self.array_size == 1 => 1,
                RecordKind::Job | RecordKind::Step | RecordKind::Foreign => continue,
                RecordKind::PendingRange => {
                    range_pending |= !JobState::from_scheduler(&record.state).is_terminal();
                    continue;
                }
                RecordKind::Ambiguous => {
                    if self.flagged.insert(record.record_id.clone()) {
                        tracing::warn!(
                            job_id = %self.job_id,
                            record = %record.record_id,
                            "Ignoring accounting record with unrecognised suffix, please review"
                        );
                    }
                    continue;
                }
            };
            if index > self.array_size {
                tracing::warn!(
                    job_id = %self.job_id,
                    record = %record.record_id,
                    "Accounting record outside of array range 1-{}",
                    self.array_size
                );
                continue;
            }

            let state = JobState::from_scheduler(&record.state);
            if state == JobState::Unknown {
                tracing::debug!(
                    job_id = %self.job_id,
                    task = index,
                    "Unrecognised scheduler state `{}`",
                    record.state
                );
            }
            self.update(index, state, now);
            seen.insert(index);
        }

        for index in seen {
            match self.tasks[&index].state {
                JobState::Pending => progress.pending += 1,
                JobState::Running | JobState::Unknown => progress.running += 1,
                _ => (),
            }
        }

        progress.terminal = self.tasks.values().filter(|t| t.state.is_terminal()).count();
        progress.missing = (self.array_size as usize).saturating_sub(self.tasks.len());
        progress.complete = !range_pending && progress.pending == 0 && progress.running == 0;
        progress
    }

    /// Records `state` unless the task is already terminal.
    fn update(&mut self, index: u32, state: JobState, now: DateTime<Utc>) {
        match self.tasks.entry(index) {
            Entry::Vacant(entry) => {
                entry.insert(TaskStatus::new(self.job_id.clone(), index, state, now));
            }
            Entry::Occupied(mut entry) => {
                let task = entry.get_mut();
                if !task.state.is_terminal() {
                    task.state = state;
                    task.observed_at = now;
                }
            }
        }
    }

    /// Snapshot of every expected index; anything not terminal is reported `UNKNOWN`.
    pub fn report(&self, outcome: PollOutcome, now: DateTime<Utc>) -> JobReport {
        let tasks = (1..=self.array_size)
            .map(|index| {
                let status = match self.tasks.get(&index) {
                    Some(task) if task.state.is_terminal() => task.clone(),
                    Some(task) => TaskStatus::new(
                        self.job_id.clone(),
                        index,
                        JobState::Unknown,
                        task.observed_at,
                    ),
                    None => TaskStatus::new(self.job_id.clone(), index, JobState::Unknown, now),
                };
                (index, status)
            })
            .collect();
        JobReport::new(self.job_id.clone(), tasks, outcome)
    }
}
