use std::io;

use chrono::{DateTime, SecondsFormat, Utc};
use domain::{
    error::JobError,
    model::entity::{JobReport, JobRun},
};
use serde::Serialize;

/// Renders `end - start` as `minutes:seconds`, e.g. 125 s as `2:05`.
pub fn format_elapsed(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<String, JobError> {
    if end < start {
        return Err(JobError::InvalidTimeRange { start, end });
    }
    let seconds = (end - start).num_seconds();
    Ok(format!("{}:{:02}", seconds / 60, seconds % 60))
}

#[derive(Debug, Clone, Copy)]
pub struct Span {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Timestamps of one pipeline stage: the scheduler job plus optional caller-side processing.
#[derive(Debug, Clone)]
pub struct JobTimings {
    pub submitted_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub processing: Option<Span>,
}

impl JobTimings {
    pub fn from_run(run: &JobRun) -> Self {
        Self {
            submitted_at: run.submission.submitted_at,
            completed_at: run.completed_at,
            processing: None,
        }
    }

    pub fn with_processing(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.processing = Some(Span { start, end });
        self
    }

    /// Submission to observed completion.
    pub fn job(&self) -> Result<String, JobError> {
        format_elapsed(self.submitted_at, self.completed_at)
    }

    pub fn processing(&self) -> Option<Result<String, JobError>> {
        self.processing.map(|span| format_elapsed(span.start, span.end))
    }

    /// Submission to the end of the last known stage.
    pub fn total(&self) -> Result<String, JobError> {
        let end = match self.processing {
            Some(span) => span.end.max(self.completed_at),
            None => self.completed_at,
        };
        format_elapsed(self.submitted_at, end)
    }

    /// Formatted durations that could be computed; bad ranges are logged and left out.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let rows = [
            ("job", Some(self.job())),
            ("processing", self.processing()),
            ("total", Some(self.total())),
        ];
        rows.into_iter()
            .filter_map(|(name, elapsed)| match elapsed? {
                Ok(elapsed) => Some((name, elapsed)),
                Err(e) => {
                    tracing::warn!("Skipping {name} time: {e}");
                    None
                }
            })
            .collect()
    }

    pub fn log(&self) {
        for (name, elapsed) in self.summary() {
            tracing::info!("{name} time: {elapsed}");
        }
    }
}

#[derive(Serialize)]
struct ReportRow<'a> {
    task_index: u32,
    job_id: &'a str,
    state: String,
    observed_at: String,
}

/// Writes one CSV row per task.
pub fn write_csv<W: io::Write>(report: &JobReport, writer: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    for task in report.tasks().values() {
        writer.serialize(ReportRow {
            task_index: task.index,
            job_id: &task.job_id,
            state: task.state.to_string(),
            observed_at: task.observed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use chrono::{Duration, TimeZone};
    use domain::model::entity::{JobState, PollOutcome, TaskStatus};
    use indoc::indoc;

    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(seconds)
    }

    #[test]
    fn minutes_and_seconds() {
        assert_eq!(format_elapsed(at(0), at(125)).unwrap(), "2:05");
        assert_eq!(format_elapsed(at(0), at(0)).unwrap(), "0:00");
        assert_eq!(format_elapsed(at(0), at(3 * 3600 + 7)).unwrap(), "180:07");
    }

    #[test]
    fn completion_before_submission() {
        assert!(matches!(
            format_elapsed(at(10), at(5)),
            Err(JobError::InvalidTimeRange { .. })
        ));
    }

    #[test]
    fn timings_summary() {
        let timings = JobTimings {
            submitted_at: at(0),
            completed_at: at(95),
            processing: None,
        }
        .with_processing(at(100), at(160));

        assert_eq!(
            timings.summary(),
            vec![("job", "1:35".to_owned()), ("processing", "1:00".to_owned()), ("total", "2:40".to_owned())]
        );
    }

    #[test]
    fn bad_range_left_out_of_summary() {
        let timings = JobTimings {
            submitted_at: at(50),
            completed_at: at(10),
            processing: None,
        };
        assert!(timings.summary().is_empty());
    }

    #[test]
    fn csv_rows() {
        let job_id: Arc<str> = Arc::from("555");
        let tasks = BTreeMap::from([
            (1, TaskStatus::new(job_id.clone(), 1, JobState::Completed, at(0))),
            (2, TaskStatus::new(job_id.clone(), 2, JobState::Failed, at(30))),
        ]);
        let report = JobReport::new(job_id, tasks, PollOutcome::Finished);

        let mut out = Vec::new();
        write_csv(&report, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            indoc! {"
                task_index,job_id,state,observed_at
                1,555,COMPLETED,2023-11-14T22:13:20Z
                2,555,FAILED,2023-11-14T22:13:50Z
            "}
        );
    }
}
