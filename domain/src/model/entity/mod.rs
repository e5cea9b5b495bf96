pub mod job;
pub mod report;

#[rustfmt::skip]
pub use self::{
    job::{JobState, TaskStatus},
    report::{JobReport, JobRun, PollOutcome},
};
