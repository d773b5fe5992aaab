//! Command implementations

pub mod cleanup;
pub mod deploy;
pub mod status;
pub mod version;

use std::path::PathBuf;

use clap::Args;

use crate::config::RawInput;

/// Connection arguments shared by every command that reaches the host.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Deployment server hostname or address
    #[arg(long, env = "GANTRY_SERVER")]
    pub server: Option<String>,

    /// SSH user on the deployment server
    #[arg(long, env = "GANTRY_SSH_USER")]
    pub user: Option<String>,

    /// Path to the SSH private key
    #[arg(long, env = "GANTRY_SSH_KEY")]
    pub key: Option<String>,

    /// Settings file (default: gantry.yaml in the working directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl ConnectionArgs {
    /// Lift the connection flags into a raw input; all other fields stay
    /// empty.
    #[must_use]
    pub fn raw_input(&self) -> RawInput {
        RawInput {
            server: self.server.clone(),
            user: self.user.clone(),
            key: self.key.clone(),
            ..RawInput::default()
        }
    }
}
