//! OpenSSH CLI abstraction — enables test doubles for all remote operations.

use std::path::Path;
use std::process::Output;

use anyhow::{Context, Result};

use crate::command_runner::{
    CommandRunner, DEFAULT_CMD_TIMEOUT, DEFAULT_WORK_TIMEOUT, TokioCommandRunner,
};
use crate::config::ConnectionConfig;

/// Connect timeout passed to ssh/scp, in seconds.
const CONNECT_TIMEOUT_SECS: &str = "10";

/// Where to reach the host and how to authenticate.
#[derive(Debug, Clone)]
pub struct SshTarget {
    pub user: String,
    pub host: String,
    pub key_path: String,
}

impl SshTarget {
    #[must_use]
    pub fn from_connection(conn: &ConnectionConfig) -> Self {
        Self {
            user: conn.ssh_user.clone(),
            host: conn.server.clone(),
            key_path: conn.key_path.display().to_string(),
        }
    }

    /// `user@host` form used by ssh and scp.
    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

/// Abstraction over remote execution, enabling test doubles.
///
/// Transport failures (auth rejected, host unreachable) and remote command
/// failures are indistinguishable here: both surface as a non-zero exit in
/// the returned [`Output`]. An `Err` means the local client could not run at
/// all. This layer does not track or undo remote state changes.
#[allow(async_fn_in_trait)]
pub trait Ssh {
    /// Run a single inline command on the host.
    ///
    /// # Errors
    ///
    /// Returns an error if the ssh client cannot be spawned.
    async fn exec(&self, command: &str) -> Result<Output>;

    /// Deliver a multi-line script body to `bash -s` on the host in one
    /// session. Success is assessed only by exit code.
    ///
    /// # Errors
    ///
    /// Returns an error if the ssh client cannot be spawned.
    async fn exec_script(&self, script: &str) -> Result<Output>;

    /// Run a command on the host with stdin piped from `input`.
    ///
    /// # Errors
    ///
    /// Returns an error if the ssh client cannot be spawned.
    async fn exec_with_stdin(&self, command: &str, input: &[u8]) -> Result<Output>;

    /// Copy a local directory tree to `remote` on the host (`scp -r`).
    ///
    /// # Errors
    ///
    /// Returns an error if the scp client cannot be spawned.
    async fn upload_recursive(&self, local: &Path, remote: &str) -> Result<Output>;
}

/// Production implementation — shells out to `ssh`/`scp` through a
/// [`CommandRunner`].
///
/// Generic over `R: CommandRunner` so tests can inject a runner without
/// spawning real processes. Two runners are held:
/// - `cmd_runner`: short commands (status checks, file ops)
/// - `work_runner`: long-running work (scripts, builds, uploads)
pub struct OpenSsh<R: CommandRunner> {
    target: SshTarget,
    cmd_runner: R,
    work_runner: R,
}

impl<R: CommandRunner> OpenSsh<R> {
    pub fn new(target: SshTarget, cmd_runner: R, work_runner: R) -> Self {
        Self {
            target,
            cmd_runner,
            work_runner,
        }
    }

    /// Non-interactive option set shared by ssh and scp. `BatchMode` fails
    /// fast instead of prompting; unknown host keys are accepted on first
    /// contact so a fresh server does not stall the run.
    fn base_options(&self) -> Vec<String> {
        vec![
            "-i".to_string(),
            self.target.key_path.clone(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={CONNECT_TIMEOUT_SECS}"),
        ]
    }

    fn ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = self.base_options();
        args.push(self.target.destination());
        args.push(command.to_string());
        args
    }
}

impl OpenSsh<TokioCommandRunner> {
    /// Convenience constructor for production use, with default timeouts.
    #[must_use]
    pub fn default_runner(target: SshTarget) -> Self {
        Self {
            target,
            cmd_runner: TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT),
            work_runner: TokioCommandRunner::new(DEFAULT_WORK_TIMEOUT),
        }
    }
}

impl<R: CommandRunner> Ssh for OpenSsh<R> {
    async fn exec(&self, command: &str) -> Result<Output> {
        let args = self.ssh_args(command);
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        self.cmd_runner
            .run("ssh", &argv)
            .await
            .context("failed to run ssh")
    }

    async fn exec_script(&self, script: &str) -> Result<Output> {
        let mut args = self.base_options();
        args.push(self.target.destination());
        args.push("bash".to_string());
        args.push("-s".to_string());
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        self.work_runner
            .run_with_stdin("ssh", &argv, script.as_bytes())
            .await
            .context("failed to run ssh script")
    }

    async fn exec_with_stdin(&self, command: &str, input: &[u8]) -> Result<Output> {
        let args = self.ssh_args(command);
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        self.cmd_runner
            .run_with_stdin("ssh", &argv, input)
            .await
            .context("failed to run ssh")
    }

    async fn upload_recursive(&self, local: &Path, remote: &str) -> Result<Output> {
        let local_str = local.display().to_string();
        let mut args = self.base_options();
        args.push("-r".to_string());
        args.push(local_str);
        args.push(format!("{}:{remote}", self.target.destination()));
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        self.work_runner
            .run("scp", &argv)
            .await
            .context("failed to run scp")
    }
}

// ── Test support ──────────────────────────────────────────────────────────────


// ── Unit tests ────────────────────────────────────────────────────────────────
