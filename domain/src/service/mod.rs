mod job_orchestrator;
mod job_scheduler;
mod script_renderer;

#[rustfmt::skip]
pub use self::{
    job_orchestrator::JobOrchestrator,
    job_scheduler::JobScheduler,
    script_renderer::ScriptRenderer,
};
