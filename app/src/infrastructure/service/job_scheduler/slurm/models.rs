use std::sync::Arc;

use domain::{error::JobError, model::vo::AccountingRecord};

/// `sacct` columns, widened so ids like `1234567_12.batch` are not truncated.
pub const SACCT_FORMAT: &str = "--format=JobID%40,State%20";

/// Takes the job id from the last whitespace token of `sbatch` output.
pub fn parse_job_id(stdout: &str) -> Result<Arc<str>, JobError> {
    stdout
        .split_whitespace()
        .last()
        .map(Arc::from)
        .ok_or_else(|| JobError::UnparsableJobId(stdout.to_owned()))
}

/// Parses header-free `sacct` output. Lines with fewer than two fields are skipped.
pub fn parse_accounting(stdout: &str) -> Vec<AccountingRecord> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(record_id), Some(state)) => Some(AccountingRecord::new(record_id, state)),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn job_id() {
        assert_eq!(&*parse_job_id("Submitted batch job 12345\n").unwrap(), "12345");
        assert!(matches!(parse_job_id(""), Err(JobError::UnparsableJobId(_))));
        assert!(matches!(parse_job_id("  \n"), Err(JobError::UnparsableJobId(_))));
    }

    #[test]
    fn accounting() {
        let x = indoc! {"
                     555_1  COMPLETED
               555_1.batch  COMPLETED
              555_1.extern  COMPLETED
                     555_2  CANCELLED by 1042
            garbage

                   555_[3]    PENDING
        "};
        let records = parse_accounting(x);
        assert_eq!(
            records,
            vec![
                AccountingRecord::new("555_1", "COMPLETED"),
                AccountingRecord::new("555_1.batch", "COMPLETED"),
                AccountingRecord::new("555_1.extern", "COMPLETED"),
                AccountingRecord::new("555_2", "CANCELLED"),
                AccountingRecord::new("555_[3]", "PENDING"),
            ]
        );
    }
}
