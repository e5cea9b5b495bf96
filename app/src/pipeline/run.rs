use domain::model::vo::JobSpec;
use tokio_util::sync::CancellationToken;

use super::{execute, resources};
use crate::cli::RunArgs;
use crate::config::PipelineConfig;
use crate::infrastructure::ioc::Container;

pub async fn run(
    container: &Container,
    config: &PipelineConfig,
    args: RunArgs,
    cancel: CancellationToken,
) -> anyhow::Result<bool> {
    let RunArgs {
        name,
        command,
        args: task_args,
        setup,
        job,
    } = args;

    let spec = JobSpec::builder()
        .name(name)
        .command(command)
        .setup(config.scheduler.setup.iter().cloned().chain(setup).collect())
        .resources(resources(config, &job))
        .array_size(task_args.len().max(1) as u32)
        .task_args(task_args)
        .mail_user(config.mail_user.clone())
        .build();

    execute(container, config, spec, &job, cancel).await
}
