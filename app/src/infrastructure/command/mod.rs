mod scp;
mod ssh_proxy;

pub use self::{
    scp::Scp,
    ssh_proxy::{MaybeSsh, SshConfig},
};
