mod cli;
mod config;
mod dto;
mod infrastructure;
mod pipeline;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use self::cli::{Cli, Commands};
use self::config::build_config;
use self::infrastructure::ioc::Container;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config =
        build_config(cli.config.as_deref()).with_context(|| "Failed to build config".red())?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| "Failed to initialize logger".red())?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let container = Container::new(&config).with_context(|| "Cannot build IOC container".red())?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Stopping (ctrl-c handling).");
                cancel.cancel();
            }
        }
    });

    let success = match cli.command {
        Commands::Run(args) => pipeline::run(&container, &config, args, cancel).await?,
        Commands::Transfer(args) => pipeline::transfer(&container, &config, args, cancel).await?,
    };
    if !success {
        anyhow::bail!("{}", "Not every task completed".red());
    }
    Ok(())
}
