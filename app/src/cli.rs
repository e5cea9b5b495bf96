use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "labflow")]
#[command(about = "Submit lab pipeline stages as Slurm jobs and wait for them", long_about = None)]
pub struct Cli {
    /// Config file (yaml); defaults to ./labflow.yaml when present
    #[arg(short, long, env = "LABFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a command once per argument as an array job
    Run(RunArgs),
    /// Pull recorded data from rigs listed in an inventory CSV
    Transfer(TransferArgs),
}

/// Resource overrides and reporting shared by every job.
#[derive(Args, Debug, Default)]
pub struct JobArgs {
    #[arg(long)]
    pub partition: Option<String>,

    /// Walltime, e.g. 08:00:00
    #[arg(long)]
    pub time: Option<String>,

    /// Memory, e.g. 64G
    #[arg(long)]
    pub mem: Option<String>,

    #[arg(long)]
    pub cpus: Option<u32>,

    /// Give up waiting after this many seconds
    #[arg(long)]
    pub max_wait: Option<u64>,

    /// Write the per-task report to this CSV file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[arg(short, long)]
    pub name: String,

    /// Shell command; the task's argument is available as $TASK_ARG
    #[arg(long)]
    pub command: String,

    /// One per task, in array order
    #[arg(short, long = "arg")]
    pub args: Vec<String>,

    /// Extra setup lines run before the command
    #[arg(long)]
    pub setup: Vec<String>,

    #[command(flatten)]
    pub job: JobArgs,
}

#[derive(Args, Debug)]
pub struct TransferArgs {
    /// CSV with `rig_number` and `IP_address` columns
    #[arg(short, long)]
    pub inventory: PathBuf,

    /// Experiment folder, `<user>/<experiment>`
    #[arg(short, long)]
    pub experiment: String,

    /// Only these rig numbers; all rigs when omitted
    #[arg(short = 'l', long, num_args = 1..)]
    pub rigs: Vec<u32>,

    /// SSH user on the rigs
    #[arg(short, long)]
    pub username: Option<String>,

    /// Delete files from the rig once copied
    #[arg(short, long)]
    pub remove_source_files: bool,

    /// Root the experiment folder is created under
    #[arg(long)]
    pub save_root: Option<String>,

    /// Submitted once every rig copied; $TASK_ARG is the experiment folder
    #[arg(long)]
    pub then_run: Option<String>,

    /// Job name of the `--then-run` command
    #[arg(long, default_value = "process")]
    pub then_name: String,

    #[command(flatten)]
    pub job: JobArgs,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn transfer_args() {
        let cli = Cli::parse_from([
            "labflow",
            "transfer",
            "-i",
            "inventory.csv",
            "-e",
            "rotator/2024-12-03_sideview",
            "-l",
            "50",
            "51",
            "-r",
            "--max-wait",
            "3600",
        ]);
        let Commands::Transfer(args) = cli.command else {
            panic!("expected transfer");
        };
        assert_eq!(args.rigs, [50, 51]);
        assert!(args.remove_source_files);
        assert_eq!(args.job.max_wait, Some(3600));
        assert!(args.then_run.is_none());
        assert_eq!(args.then_name, "process");
    }
}
