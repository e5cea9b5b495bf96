use service::prelude::JobOrchestratorState;
use typed_builder::TypedBuilder;

use crate::infrastructure::{command::SshConfig, service::job_scheduler::SlurmClientState};

/// Every state the services need, wired once from [`PipelineConfig`].
///
/// [`PipelineConfig`]: crate::config::PipelineConfig
#[derive(derive_more::AsRef, TypedBuilder)]
pub struct Container {
    #[as_ref]
    pub(super) ssh_config: Option<SshConfig>,

    #[as_ref]
    pub(super) slurm: SlurmClientState,

    #[as_ref]
    pub(super) orchestrator: JobOrchestratorState,
}
