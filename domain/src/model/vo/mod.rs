pub mod job;
pub mod submission;

#[rustfmt::skip]
pub use self::{
    job::{JobSpec, Resources, RunOptions},
    submission::{AccountingRecord, SubmissionResult},
};
