use crate::error::JobError;
use crate::model::vo::JobSpec;

/// Turns a [`JobSpec`] into a script the target scheduler accepts.
pub trait ScriptRenderer {
    fn render(&self, spec: &JobSpec) -> Result<String, JobError>;
}
