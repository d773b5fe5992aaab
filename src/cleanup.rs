//! Remote teardown of a tracked deployment.
//!
//! Cleanup acts only on the project named in the deployment record the last
//! deploy left on the host. Without a record it refuses to touch anything:
//! untracked or multiple coexisting project directories cannot be
//! distinguished safely, and guessing risks deleting the wrong one.

use anyhow::Result;

use crate::output::OutputContext;
use crate::proxy::{SITE_AVAILABLE, SITE_ENABLED};
use crate::record::{self, REMOTE_RECORD_DIR};
use crate::ssh::Ssh;

/// Tear down the tracked deployment on the host.
///
/// Stops the compose stack (tolerating a stack that no longer exists),
/// removes the project directory, prunes Docker data host-wide, removes the
/// proxy site pair, reloads nginx, and deletes the record directory.
///
/// # Errors
///
/// Returns an error when no deployment record exists on the host, or when
/// any removal step fails.
pub async fn run(ssh: &impl Ssh, out: &OutputContext) -> Result<()> {
    let Some(deployment) = record::read_remote(ssh).await? else {
        anyhow::bail!(
            "no deployment record found on the host; cleanup cannot tell \
             untracked or multiple coexisting project directories apart, so \
             nothing was removed (deploy with this tool first, or remove the \
             directories manually)"
        );
    };
    let project = &deployment.project;
    out.kv("project", project);

    out.step("Stopping the compose stack");
    // The stack or its directory may already be gone; stop failures are
    // swallowed.
    let _ = ssh
        .exec(&format!(
            "cd ~/{project} && docker compose down --remove-orphans || true"
        ))
        .await;

    out.step("Removing the project directory");
    let output = ssh.exec(&format!("rm -rf ~/{project}")).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("removing ~/{project} failed: {}", stderr.trim());
    }

    out.step("Pruning Docker data");
    let output = ssh.exec("docker system prune -af").await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("docker system prune failed: {}", stderr.trim());
    }

    out.step("Removing the proxy site");
    let output = ssh
        .exec(&format!("sudo rm -f {SITE_AVAILABLE} {SITE_ENABLED}"))
        .await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("removing the proxy site failed: {}", stderr.trim());
    }

    let output = ssh.exec("sudo systemctl reload nginx").await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("reloading nginx failed: {}", stderr.trim());
    }

    out.step("Removing the deployment record");
    let output = ssh.exec(&format!("rm -rf {REMOTE_RECORD_DIR}")).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("removing the deployment record failed: {}", stderr.trim());
    }

    out.success(&format!("Removed {project} from the host"));
    Ok(())
}

// ── Unit tests ────────────────────────────────────────────────────────────────
