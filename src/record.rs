//! Deployment record kept on the remote host.
//!
//! Written at the end of a successful deploy, read back by `cleanup` and
//! `status`, so teardown acts on the project a deploy actually created
//! instead of guessing from directory listings.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ssh::Ssh;

/// Remote directory holding gantry bookkeeping, relative to the home
/// directory.
pub const REMOTE_RECORD_DIR: &str = ".gantry";

/// Remote path of the deployment record, relative to the home directory.
pub const REMOTE_RECORD_PATH: &str = ".gantry/deployment.json";

/// What was deployed, and when.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentRecord {
    pub project: String,
    pub port: u32,
    pub deployed_at: DateTime<Utc>,
}

impl DeploymentRecord {
    #[must_use]
    pub fn new(project: &str, port: u32) -> Self {
        Self {
            project: project.to_string(),
            port,
            deployed_at: Utc::now(),
        }
    }
}

/// Write the record to the host.
///
/// # Errors
///
/// Returns an error if the write command fails on the host.
pub async fn write_remote(ssh: &impl Ssh, record: &DeploymentRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(record).context("serializing deployment record")?;
    let command = format!("mkdir -p {REMOTE_RECORD_DIR} && cat > {REMOTE_RECORD_PATH}");
    let output = ssh.exec_with_stdin(&command, json.as_bytes()).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("recording deployment on host failed: {}", stderr.trim());
    }
    Ok(())
}

/// Read the record from the host. `Ok(None)` when no record exists.
///
/// # Errors
///
/// Returns an error if the host is unreachable (ssh itself failed, exit
/// 255) or a record exists but cannot be parsed.
pub async fn read_remote(ssh: &impl Ssh) -> Result<Option<DeploymentRecord>> {
    let output = ssh.exec(&format!("cat {REMOTE_RECORD_PATH}")).await?;
    // ssh reserves exit 255 for its own failures; a missing record is the
    // remote cat's exit 1.
    if output.status.code() == Some(255) {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("cannot reach the host: {}", stderr.trim());
    }
    if !output.status.success() {
        return Ok(None);
    }
    let record = serde_json::from_slice(&output.stdout)
        .context("deployment record on host is not valid JSON")?;
    Ok(Some(record))
}
