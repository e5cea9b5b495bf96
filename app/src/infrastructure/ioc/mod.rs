mod boilerplate;
mod container;

use service::prelude::JobOrchestratorState;

use crate::{
    config::PipelineConfig,
    infrastructure::{command::SshConfig, service::job_scheduler::SlurmClientState},
};

pub use self::container::Container;

impl Container {
    pub fn new(config: &PipelineConfig) -> anyhow::Result<Self> {
        let ssh_config = config.ssh_proxy.as_ref().map(SshConfig::new);

        let slurm = match config.scheduler.r#type.to_lowercase().as_str() {
            "slurm" => SlurmClientState::new(config.scheduler.log_dir.clone()),
            t => {
                anyhow::bail!("Unsupported `scheduler.type`: {t}");
            }
        };

        let orchestrator = JobOrchestratorState::builder()
            .script_dir(&config.script_dir)
            .grace_period(config.poll.grace_period())
            .poll_interval(config.poll.interval())
            .query_retries(config.poll.query_retries)
            .retry_backoff(config.poll.retry_backoff())
            .build();

        let container = Container::builder()
            .ssh_config(ssh_config)
            .slurm(slurm)
            .orchestrator(orchestrator)
            .build();

        Ok(container)
    }
}

