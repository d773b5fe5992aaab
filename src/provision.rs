//! Remote provisioning: container engine, compose plugin, reverse proxy.

use anyhow::Result;

use crate::ssh::Ssh;

/// Host preparation script, delivered as one session. Package installs are
/// no-ops when already present (apt's idempotence, not ours); `set -e`
/// aborts the script on the first failing command.
pub const PROVISION_SCRIPT: &str = "\
set -e
export DEBIAN_FRONTEND=noninteractive
sudo apt-get update -y
sudo apt-get install -y docker.io docker-compose-v2 nginx curl
sudo systemctl enable docker
sudo systemctl start docker
";

/// Ensure docker, the compose plugin, and nginx are installed and the
/// docker service is running.
///
/// # Errors
///
/// Any script failure is fatal and carries the remote stderr.
pub async fn provision(ssh: &impl Ssh) -> Result<()> {
    let output = ssh.exec_script(PROVISION_SCRIPT).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("provisioning failed: {}", stderr.trim());
    }
    Ok(())
}
