use std::fs::File;

use anyhow::Context;
use domain::model::vo::JobSpec;
use indoc::formatdoc;
use tokio_util::sync::CancellationToken;

use super::{resources, run_stages};
use crate::cli::TransferArgs;
use crate::config::PipelineConfig;
use crate::dto::{read_inventory, select_rigs, Rig};
use crate::infrastructure::ioc::Container;

pub async fn transfer(
    container: &Container,
    config: &PipelineConfig,
    args: TransferArgs,
    cancel: CancellationToken,
) -> anyhow::Result<bool> {
    let file = File::open(&args.inventory)
        .with_context(|| format!("Cannot open inventory {}", args.inventory.display()))?;
    let rigs = read_inventory(file)
        .with_context(|| format!("Cannot read inventory {}", args.inventory.display()))?;
    let rigs = select_rigs(rigs, &args.rigs)?;

    let spec = transfer_spec(config, &args, &rigs)?;
    let then = follow_up_spec(config, &args);
    tracing::info!(
        "Running rsync on {} rig(s): {}",
        rigs.len(),
        rigs.iter().map(|rig| rig.ip_address.as_str()).collect::<Vec<_>>().join(" ")
    );
    let outcome = run_stages(container, config, spec, then, &args.job, cancel).await?;
    outcome.timings.log();
    Ok(outcome.success)
}

fn save_path(config: &PipelineConfig, args: &TransferArgs) -> String {
    let save_root = args.save_root.as_deref().unwrap_or(&config.transfer.save_root);
    format!("{}/{}", save_root.trim_end_matches('/'), args.experiment)
}

/// Single-task job over the experiment folder, run once the transfer completed.
fn follow_up_spec(config: &PipelineConfig, args: &TransferArgs) -> Option<JobSpec> {
    let command = args.then_run.as_ref()?;
    Some(
        JobSpec::builder()
            .name(args.then_name.clone())
            .command(command.clone())
            .setup(config.scheduler.setup.clone())
            .resources(resources(config, &args.job))
            .task_args(vec![save_path(config, args)])
            .mail_user(config.mail_user.clone())
            .build(),
    )
}

/// One array task per rig; each task's argument is `<rig_number>:<ip>`.
fn transfer_spec(config: &PipelineConfig, args: &TransferArgs, rigs: &[Rig]) -> anyhow::Result<JobSpec> {
    if !args.experiment.contains('/') {
        anyhow::bail!(
            "Experiment `{}` should contain your username, e.g. `rotator/2024-12-03_sideview-exp1`",
            args.experiment
        );
    }
    if rigs.is_empty() {
        anyhow::bail!("No IP addresses found. Check the inventory or the rig filter.");
    }

    let username = args.username.as_deref().unwrap_or(&config.transfer.username);
    let save_path = save_path(config, args);
    if save_path.contains('\'') {
        anyhow::bail!("Save path must not contain quotes: {save_path}");
    }

    Ok(JobSpec::builder()
        .name("rsync_pis")
        .command(rsync_command(username, &save_path, args.remove_source_files))
        .setup(config.scheduler.setup.clone())
        .resources(resources(config, &args.job))
        .array_size(rigs.len() as u32)
        .task_args(
            rigs.iter()
                .map(|rig| format!("{}:{}", rig.rig_number, rig.ip_address))
                .collect(),
        )
        .mail_user(config.mail_user.clone())
        .build())
}

fn rsync_command(username: &str, save_path: &str, remove_source_files: bool) -> String {
    let remove = if remove_source_files {
        "--remove-source-files "
    } else {
        ""
    };
    formatdoc! {r#"
        rig="${{TASK_ARG%%:*}}"
        ip="${{TASK_ARG#*:}}"
        echo "Using IP: $ip and rig: $rig"
        mkdir -p '{save_path}'
        rsync -avzh {remove}{username}@$ip:/home/{username}/data/ '{save_path}'
        rsync_status=$?
        if [ $rsync_status -eq 0 ]; then
            ssh {username}@$ip "find data/ -mindepth 1 -type d -empty -delete"
        else
            echo "Rsync failed for rig $rig (IP: $ip)" >&2
        fi
        (exit $rsync_status)"#}
}
