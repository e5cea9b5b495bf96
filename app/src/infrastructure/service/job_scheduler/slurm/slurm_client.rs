use std::path::Path;
use std::process::Output;

use chrono::Utc;
use dep_inj::DepInj;
use domain::{
    error::JobError,
    model::vo::{AccountingRecord, JobSpec, SubmissionResult},
    service::{JobScheduler, ScriptRenderer},
};
use indoc::formatdoc;
use tokio::process::Command;

use super::{parse_accounting, parse_job_id, SACCT_FORMAT};
use crate::infrastructure::command::{MaybeSsh, Scp};

#[derive(DepInj)]
#[target(SlurmClient)]
pub struct SlurmClientState {
    log_dir: String,
    mail_type: String,
}

impl SlurmClientState {
    pub fn new(log_dir: String) -> Self {
        Self {
            log_dir,
            mail_type: "FAIL".to_owned(),
        }
    }
}

#[async_trait::async_trait]
impl<Deps> JobScheduler for SlurmClient<Deps>
where
    Deps: AsRef<SlurmClientState> + MaybeSsh + Scp + Send + Sync,
{
    async fn submit_job(&self, script_path: &Path) -> Result<SubmissionResult, JobError> {
        let out = if let Some((mut scp, ssh)) = self.prj_ref().scp() {
            let file_name = script_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| JobError::invalid_spec("script path has no file name"))?;
            let remote_path = ssh.remote_path(&file_name);
            let remote_dir = remote_path.parent().unwrap_or(Path::new("."));

            let out = self
                .prj_ref()
                .command("mkdir")
                .arg("-p")
                .arg(remote_dir)
                .output()
                .await
                .map_err(submission_failed)?;
            if let Err(e) = check_submission(&out) {
                tracing::error!(
                    "Unable to create directory {} for slurm script.",
                    remote_dir.to_string_lossy(),
                );
                return Err(e);
            }
            let copied = scp
                .local_path(script_path)
                .remote_path(&remote_path)
                .output()
                .await
                .map_err(submission_failed)?;
            check_submission(&copied)?;

            let out = self
                .prj_ref()
                .command("sbatch")
                .arg("--chdir")
                .arg(remote_dir)
                .arg(&remote_path)
                .output()
                .await;
            // The remote copy goes away whether or not sbatch accepted it.
            if let Err(e) = self.prj_ref().command("rm").arg("-f").arg(&remote_path).status().await
            {
                tracing::warn!("Unable to remove remote script {}: {e}", remote_path.display());
            }
            out.map_err(submission_failed)?
        } else {
            Command::new("sbatch").arg(script_path).output().await.map_err(submission_failed)?
        };
        check_submission(&out)?;

        let raw_output = String::from_utf8_lossy(&out.stdout).into_owned();
        let job_id = parse_job_id(&raw_output)?;
        tracing::debug!(%job_id, "sbatch: {}", raw_output.trim());
        Ok(SubmissionResult {
            job_id,
            submitted_at: Utc::now(),
            raw_output,
        })
    }

    async fn get_job_records(&self, job_id: &str) -> Result<Vec<AccountingRecord>, JobError> {
        tracing::debug!("getting accounting records for job id: {job_id}");
        let out = self
            .prj_ref()
            .command("sacct")
            .args(["-j", job_id, "--noheader", SACCT_FORMAT])
            .output()
            .await
            .map_err(|e| JobError::poll_failed(job_id, e))?;
        check_accounting(job_id, &out)?;
        Ok(parse_accounting(&String::from_utf8_lossy(&out.stdout)))
    }
}

impl<Deps> ScriptRenderer for SlurmClient<Deps>
where
    Deps: AsRef<SlurmClientState>,
{
    fn render(&self, spec: &JobSpec) -> Result<String, JobError> {
        spec.validate()?;
        Ok(self.gen_script(spec))
    }
}

impl<Deps> SlurmClient<Deps>
where
    Deps: AsRef<SlurmClientState>,
{
    fn gen_script(&self, spec: &JobSpec) -> String {
        let JobSpec {
            name,
            command,
            setup,
            resources,
            array_size,
            task_args,
            mail_user,
        } = spec;

        let mut directives = vec![
            format!("#SBATCH --job-name={name}"),
            "#SBATCH --ntasks=1".to_owned(),
            format!("#SBATCH --time={}", resources.walltime),
            format!("#SBATCH --mem={}", resources.memory),
            format!("#SBATCH --partition={}", resources.partition),
            format!("#SBATCH --cpus-per-task={}", resources.cpus),
        ];
        if spec.is_array() {
            directives.push(format!("#SBATCH --output={}/{name}-%A_%a.out", self.log_dir));
            directives.push(format!("#SBATCH --array=1-{array_size}"));
        } else {
            directives.push(format!("#SBATCH --output={}/{name}-%j.out", self.log_dir));
        }
        if let Some(mail_user) = mail_user {
            directives.push(format!("#SBATCH --mail-user={mail_user}"));
            directives.push(format!("#SBATCH --mail-type={}", self.mail_type));
        }
        let directives = directives.join("\n");
        let setup = setup.join("\n");

        let task_arg = if spec.is_array() {
            let quoted: Vec<String> = task_args.iter().map(|arg| shell_quote(arg)).collect();
            format!(
                "TASK_ARGS=({})\nTASK_ARG=\"${{TASK_ARGS[$((SLURM_ARRAY_TASK_ID - 1))]}}\"",
                quoted.join(" ")
            )
        } else {
            format!("TASK_ARG={}", shell_quote(task_args.first().map_or("", String::as_str)))
        };

        formatdoc! {r#"
            #!/bin/bash
            {directives}

            {setup}

            {task_arg}

            echo "Task ${{SLURM_ARRAY_TASK_ID:-1}} started at: $(date)"
            {command}
            ec=$?
            echo "Task ${{SLURM_ARRAY_TASK_ID:-1}} finished with status $ec at: $(date)"
            exit $ec
        "#}
    }
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn submission_failed(e: std::io::Error) -> JobError {
    JobError::SubmissionFailed {
        status: "not started".to_owned(),
        stderr: e.to_string(),
    }
}

fn check_submission(out: &Output) -> Result<(), JobError> {
    if out.status.success() {
        return Ok(());
    }
    Err(JobError::SubmissionFailed {
        status: out.status.to_string(),
        stderr: String::from_utf8_lossy(&out.stderr).trim().to_owned(),
    })
}

fn check_accounting(job_id: &str, out: &Output) -> Result<(), JobError> {
    if out.status.success() {
        return Ok(());
    }
    Err(JobError::poll_failed(
        job_id,
        format!(
            "exit status not 0 for sacct. real: {}, err: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        ),
    ))
}

#[cfg(test)]
mod tests {
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    use domain::model::vo::Resources;

    use super::*;

    struct Ctx(SlurmClientState);

    impl AsRef<SlurmClientState> for Ctx {
        fn as_ref(&self) -> &SlurmClientState {
            &self.0
        }
    }

    fn render(spec: &JobSpec) -> Result<String, JobError> {
        let ctx = Ctx(SlurmClientState::new("logs".to_owned()));
        SlurmClient::inj_ref(&ctx).render(spec)
    }

    fn spec(array_size: u32, args: &[&str]) -> JobSpec {
        JobSpec::builder()
            .name("rsync_pis")
            .command("rsync -avzh $TASK_ARG dest/")
            .setup(vec!["ml purge".to_owned()])
            .resources(Resources {
                walltime: "20:00:00".to_owned(),
                memory: "120G".to_owned(),
                cpus: 16,
                partition: "ncpu".to_owned(),
            })
            .array_size(array_size)
            .task_args(args.iter().map(|s| s.to_string()).collect())
            .build()
    }

    #[test]
    fn array_script() {
        let script = render(&spec(3, &["a", "b c", "it's"])).unwrap();
        assert!(script.starts_with("#!/bin/bash\n#SBATCH --job-name=rsync_pis\n"));
        assert!(script.contains("#SBATCH --array=1-3\n"));
        assert!(script.contains("#SBATCH --partition=ncpu\n"));
        assert!(script.contains("#SBATCH --mem=120G\n"));
        assert!(script.contains("#SBATCH --time=20:00:00\n"));
        assert!(script.contains("#SBATCH --cpus-per-task=16\n"));
        assert!(script.contains("#SBATCH --output=logs/rsync_pis-%A_%a.out\n"));
        assert!(script.contains(r#"TASK_ARGS=('a' 'b c' 'it'\''s')"#));
        assert!(script.contains(r#"TASK_ARG="${TASK_ARGS[$((SLURM_ARRAY_TASK_ID - 1))]}""#));
        assert!(script.contains("ml purge\n"));
        assert!(script.contains("rsync -avzh $TASK_ARG dest/\nec=$?\n"));
        assert!(script.trim_end().ends_with("exit $ec"));
        assert!(!script.contains("--mail-user"));
    }

    #[test]
    fn single_task_has_no_array_directive() {
        let script = render(&spec(1, &["only"])).unwrap();
        assert!(!script.contains("--array"));
        assert!(script.contains("TASK_ARG='only'\n"));
        assert!(script.contains("#SBATCH --output=logs/rsync_pis-%j.out\n"));

        let script = render(&spec(1, &[])).unwrap();
        assert!(script.contains("TASK_ARG=''\n"));
    }

    #[test]
    fn mail_directives() {
        let mut spec = spec(1, &[]);
        spec.mail_user = Some("someone@example.org".to_owned());
        let script = render(&spec).unwrap();
        assert!(script.contains("#SBATCH --mail-user=someone@example.org\n#SBATCH --mail-type=FAIL\n"));
    }

    #[test]
    fn mismatched_args_rejected() {
        assert!(matches!(
            render(&spec(2, &["a"])),
            Err(JobError::InvalidSpec(_))
        ));
        let mut spec = spec(1, &[]);
        spec.resources.walltime.clear();
        assert!(matches!(render(&spec), Err(JobError::InvalidSpec(_))));
    }

    fn output(code: i32, stderr: &str) -> Output {
        Output {
            // Raw wait status: the exit code lives in the second byte.
            status: ExitStatus::from_raw(code << 8),
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    #[test]
    fn rejected_submission_keeps_stderr() {
        assert!(check_submission(&output(0, "")).is_ok());

        let err = check_submission(&output(1, "sbatch: error: invalid partition specified\n"))
            .unwrap_err();
        let JobError::SubmissionFailed { status, stderr } = err else {
            panic!("expected SubmissionFailed, got {err:?}");
        };
        assert_eq!(stderr, "sbatch: error: invalid partition specified");
        assert!(status.contains('1'));
    }

    #[test]
    fn failed_accounting_query() {
        assert!(check_accounting("555", &output(0, "")).is_ok());

        let err = check_accounting("555", &output(1, "sacct: error: slurmdbd unreachable\n"))
            .unwrap_err();
        let JobError::PollQueryFailed { job_id, reason } = err else {
            panic!("expected PollQueryFailed, got {err:?}");
        };
        assert_eq!(job_id, "555");
        assert!(reason.ends_with("err: sacct: error: slurmdbd unreachable"));
    }
}
