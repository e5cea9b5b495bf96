use std::time::Duration;

use tokio_util::sync::CancellationToken;
use typed_builder::TypedBuilder;

use crate::error::JobError;

/// Resource request attached to every task of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resources {
    /// Scheduler walltime, e.g. `08:00:00`.
    pub walltime: String,
    /// Memory per node, e.g. `64G`.
    pub memory: String,
    pub cpus: u32,
    pub partition: String,
}

impl Resources {
    fn validate(&self) -> Result<(), JobError> {
        let missing = [
            ("walltime", self.walltime.trim().is_empty()),
            ("memory", self.memory.trim().is_empty()),
            ("partition", self.partition.trim().is_empty()),
            ("cpus", self.cpus == 0),
        ]
        .into_iter()
        .filter_map(|(field, missing)| missing.then_some(field))
        .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(JobError::invalid_spec(format!(
                "missing resource field(s): {}",
                missing.join(", ")
            )));
        }
        for (field, value) in [
            ("walltime", &self.walltime),
            ("memory", &self.memory),
            ("partition", &self.partition),
        ] {
            if value.chars().any(char::is_whitespace) {
                return Err(JobError::invalid_spec(format!(
                    "resource field {field} contains whitespace: {value:?}"
                )));
            }
        }
        Ok(())
    }
}

/// What to run: one command body executed once per array index.
///
/// Inside the body the task's own argument is available as `$TASK_ARG`.
#[derive(Debug, Clone, TypedBuilder)]
pub struct JobSpec {
    #[builder(setter(into))]
    pub name: String,
    #[builder(setter(into))]
    pub command: String,
    /// Lines run before the command, e.g. module loads or environment activation.
    #[builder(default)]
    pub setup: Vec<String>,
    pub resources: Resources,
    #[builder(default = 1)]
    pub array_size: u32,
    #[builder(default)]
    pub task_args: Vec<String>,
    #[builder(default)]
    pub mail_user: Option<String>,
}

impl JobSpec {
    /// Checks the spec before anything is handed to the scheduler.
    pub fn validate(&self) -> Result<(), JobError> {
        if self.name.is_empty() || self.name.chars().any(char::is_whitespace) {
            return Err(JobError::invalid_spec(format!(
                "job name must be a single word: {:?}",
                self.name
            )));
        }
        if self.command.trim().is_empty() {
            return Err(JobError::invalid_spec("command is empty"));
        }
        match (self.array_size, self.task_args.len()) {
            (0, _) => return Err(JobError::invalid_spec("array size must be at least 1")),
            (1, n) if n > 1 => {
                return Err(JobError::invalid_spec(format!(
                    "single-task job given {n} task arguments"
                )))
            }
            (size, n) if size > 1 && n != size as usize => {
                return Err(JobError::invalid_spec(format!(
                    "array size {size} but {n} task arguments"
                )))
            }
            _ => (),
        }
        self.resources.validate()
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.array_size > 1
    }
}

/// Caller-side limits on how long to wait for a job.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Measured from submission.
    pub deadline: Option<Duration>,
    pub cancel: CancellationToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resources() -> Resources {
        Resources {
            walltime: "08:00:00".to_owned(),
            memory: "64G".to_owned(),
            cpus: 8,
            partition: "cpu".to_owned(),
        }
    }

    fn spec(array_size: u32, args: &[&str]) -> JobSpec {
        JobSpec::builder()
            .name("rsync_pis")
            .command("echo $TASK_ARG")
            .resources(resources())
            .array_size(array_size)
            .task_args(args.iter().map(|s| s.to_string()).collect())
            .build()
    }

    #[test]
    fn array_size_must_match_args() {
        assert!(spec(2, &["a", "b"]).validate().is_ok());
        for args in [&[][..], &["a"][..], &["a", "b", "c"][..]] {
            assert!(matches!(
                spec(2, args).validate(),
                Err(JobError::InvalidSpec(_))
            ));
        }
    }

    #[test]
    fn single_task_takes_at_most_one_arg() {
        assert!(spec(1, &[]).validate().is_ok());
        assert!(spec(1, &["a"]).validate().is_ok());
        assert!(spec(1, &["a", "b"]).validate().is_err());
        assert!(spec(0, &[]).validate().is_err());
    }

    #[test]
    fn directive_values_are_single_words() {
        let mut bad_name = spec(1, &[]);
        bad_name.name = "rsync pis".to_owned();
        assert!(bad_name.validate().is_err());

        let mut bad_partition = spec(1, &[]);
        bad_partition.resources.partition = "cpu\n#SBATCH --qos=high".to_owned();
        assert!(bad_partition.validate().is_err());
    }

    #[test]
    fn missing_resources() {
        let mut spec = spec(1, &[]);
        spec.resources.memory.clear();
        spec.resources.cpus = 0;
        let err = spec.validate().unwrap_err().to_string();
        assert!(err.contains("memory"));
        assert!(err.contains("cpus"));
    }
}
