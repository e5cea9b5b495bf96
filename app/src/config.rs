use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use domain::model::vo::Resources;
use serde::*;

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "PipelineConfig::default_log_level")]
    pub log_level: String,

    #[serde(default = "PipelineConfig::default_script_dir")]
    pub script_dir: String,

    #[serde(default = "Default::default")]
    pub scheduler: SchedulerConfig,

    #[serde(default = "Default::default")]
    pub poll: PollConfig,

    #[serde(default = "Default::default")]
    pub resources: ResourceConfig,

    #[serde(default = "Default::default")]
    pub transfer: TransferConfig,

    #[serde(default = "Default::default")]
    pub ssh_proxy: Option<SshProxyConfig>,

    #[serde(default = "Default::default")]
    pub mail_user: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "SchedulerConfig::default_type")]
    pub r#type: String,

    #[serde(default = "SchedulerConfig::default_partition")]
    pub partition: String,

    /// Directory for per-task stdout files, relative to the submission directory.
    #[serde(default = "SchedulerConfig::default_log_dir")]
    pub log_dir: String,

    /// Lines prepended to every job, e.g. `ml purge`.
    #[serde(default = "Default::default")]
    pub setup: Vec<String>,
}

/// All durations in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    #[serde(default = "PollConfig::default_grace_period")]
    pub grace_period: u64,

    #[serde(default = "PollConfig::default_interval")]
    pub interval: u64,

    #[serde(default = "PollConfig::default_query_retries")]
    pub query_retries: u32,

    #[serde(default = "PollConfig::default_retry_backoff")]
    pub retry_backoff: u64,

    #[serde(default = "Default::default")]
    pub max_wait: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default = "ResourceConfig::default_walltime")]
    pub walltime: String,

    #[serde(default = "ResourceConfig::default_memory")]
    pub memory: String,

    #[serde(default = "ResourceConfig::default_cpus")]
    pub cpus: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    #[serde(default = "TransferConfig::default_save_root")]
    pub save_root: String,

    #[serde(default = "TransferConfig::default_username")]
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SshProxyConfig {
    pub host: String,

    pub username: String,

    #[serde(default = "SshProxyConfig::default_port")]
    pub port: u16,

    #[serde(default = "SshProxyConfig::default_home_dir")]
    pub home_dir: String,

    #[serde(default = "SshProxyConfig::default_save_dir")]
    pub save_dir: String,
}

/// Layers `path` (or `./labflow.*` when absent) under `LABFLOW__*` environment variables.
pub fn build_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let file = match path {
        Some(path) => File::from(path),
        None => File::with_name("labflow").required(false),
    };
    let config = Config::builder()
        .add_source(file)
        .add_source(Environment::with_prefix("LABFLOW").separator("__"))
        .build()?;
    Ok(config.try_deserialize()?)
}

impl PipelineConfig {
    pub fn default_log_level() -> String {
        "info".to_owned()
    }

    pub fn default_script_dir() -> String {
        std::env::temp_dir().join("labflow").to_string_lossy().into_owned()
    }

    /// Config resources with the partition of the scheduler section.
    pub fn resources(&self) -> Resources {
        Resources {
            walltime: self.resources.walltime.clone(),
            memory: self.resources.memory.clone(),
            cpus: self.resources.cpus,
            partition: self.scheduler.partition.clone(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            r#type: Self::default_type(),
            partition: Self::default_partition(),
            log_dir: Self::default_log_dir(),
            setup: Vec::new(),
        }
    }
}

impl SchedulerConfig {
    pub fn default_type() -> String {
        "slurm".to_owned()
    }

    pub fn default_partition() -> String {
        "cpu".to_owned()
    }

    pub fn default_log_dir() -> String {
        ".".to_owned()
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            grace_period: Self::default_grace_period(),
            interval: Self::default_interval(),
            query_retries: Self::default_query_retries(),
            retry_backoff: Self::default_retry_backoff(),
            max_wait: None,
        }
    }
}

impl PollConfig {
    pub fn default_grace_period() -> u64 {
        60
    }

    pub fn default_interval() -> u64 {
        30
    }

    pub fn default_query_retries() -> u32 {
        3
    }

    pub fn default_retry_backoff() -> u64 {
        2
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval.max(1))
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff.max(1))
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            walltime: Self::default_walltime(),
            memory: Self::default_memory(),
            cpus: Self::default_cpus(),
        }
    }
}

impl ResourceConfig {
    pub fn default_walltime() -> String {
        "08:00:00".to_owned()
    }

    pub fn default_memory() -> String {
        "64G".to_owned()
    }

    pub fn default_cpus() -> u32 {
        8
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            save_root: Self::default_save_root(),
            username: Self::default_username(),
        }
    }
}

impl TransferConfig {
    pub fn default_save_root() -> String {
        ".".to_owned()
    }

    pub fn default_username() -> String {
        "plugcamera".to_owned()
    }
}

impl SshProxyConfig {
    pub fn default_port() -> u16 {
        22
    }

    pub fn default_home_dir() -> String {
        "~".to_owned()
    }

    pub fn default_save_dir() -> String {
        "labflow/scripts".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;
    use indoc::indoc;

    use super::*;

    fn parse(yaml: &str) -> PipelineConfig {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn defaults() {
        let config = parse("log_level: debug");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.scheduler.r#type, "slurm");
        assert_eq!(config.poll.grace_period, 60);
        assert_eq!(config.poll.interval, 30);
        assert_eq!(config.poll.query_retries, 3);
        assert!(config.poll.max_wait.is_none());
        assert!(config.ssh_proxy.is_none());
        assert_eq!(config.resources().partition, "cpu");
    }

    #[test]
    fn overrides() {
        let config = parse(indoc! {"
            scheduler:
              partition: ncpu
              setup:
                - ml purge
                - ml Anaconda3/2023.09-0
            poll:
              interval: 10
              max_wait: 3600
            resources:
              memory: 120G
              cpus: 16
            ssh_proxy:
              host: login.cluster
              username: rotator
        "});
        let resources = config.resources();
        assert_eq!(resources.partition, "ncpu");
        assert_eq!(resources.memory, "120G");
        assert_eq!(resources.cpus, 16);
        assert_eq!(resources.walltime, "08:00:00");
        assert_eq!(config.scheduler.setup.len(), 2);
        assert_eq!(config.poll.interval(), Duration::from_secs(10));
        assert_eq!(config.poll.max_wait, Some(3600));
        let ssh = config.ssh_proxy.unwrap();
        assert_eq!(ssh.port, 22);
        assert_eq!(ssh.save_dir, "labflow/scripts");
    }
}
