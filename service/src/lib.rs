pub mod orchestrator;
pub mod reporter;
pub mod tracker;

pub mod prelude {
    #[rustfmt::skip]
    pub use super::{
        orchestrator::{JobOrchestratorImpl, JobOrchestratorState},
        reporter::{format_elapsed, write_csv, JobTimings},
        tracker::{JobTracker, Progress},
    };
}
