pub mod slurm;

pub use self::slurm::{SlurmClient, SlurmClientState};
