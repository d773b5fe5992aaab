//! Deployment: transfer the staged tree, restart the compose stack, record it.

use anyhow::Result;

use crate::output::{OutputContext, progress};
use crate::record::{self, DeploymentRecord};
use crate::ssh::Ssh;
use crate::stage::RepositoryHandle;

/// Push the staged repository to the host and bring the stack up.
///
/// Each call is a separate connection; there is no transaction. A failure
/// after the transfer leaves new files but no running containers, and the
/// run aborts without rollback.
///
/// # Errors
///
/// Returns an error if clearing, transferring, or starting fails. Stopping
/// the previous stack is tolerated (`down || true` semantics).
pub async fn deploy(
    ssh: &impl Ssh,
    repo: &RepositoryHandle,
    port: u32,
    out: &OutputContext,
) -> Result<()> {
    let project = &repo.project;

    // Destructive overwrite of any previous copy of the project.
    let output = ssh.exec(&format!("rm -rf ~/{project}")).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("clearing previous copy of {project} failed: {}", stderr.trim());
    }

    let output = ssh.upload_recursive(&repo.local_path, "~/").await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("transferring {project} to the host failed: {}", stderr.trim());
    }

    // The previous stack may not exist; stop failures are swallowed.
    let _ = ssh
        .exec(&format!(
            "cd ~/{project} && docker compose down --remove-orphans || true"
        ))
        .await;

    let pb = out
        .show_progress()
        .then(|| progress::spinner("building and starting the stack..."));
    let script = format!("set -e\ncd ~/{project}\ndocker compose up -d --build");
    let result = ssh.exec_script(&script).await;
    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }
    let output = result?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("starting the compose stack failed: {}", stderr.trim());
    }
    out.success("compose stack is up");

    record::write_remote(ssh, &DeploymentRecord::new(project, port)).await
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::ssh::testing::{Call, ScriptedSsh};

    fn handle() -> RepositoryHandle {
        RepositoryHandle {
            project: "app".to_string(),
            local_path: PathBuf::from("./app"),
        }
    }

    fn quiet_ctx() -> OutputContext {
        OutputContext::new(true, true)
    }

    #[tokio::test]
    async fn runs_the_full_sequence_in_order() {
        let ssh = ScriptedSsh::new();
        deploy(&ssh, &handle(), 8080, &quiet_ctx()).await.expect("deploy");

        let texts = ssh.call_texts();
        assert_eq!(texts.len(), 5);
        assert_eq!(texts[0], "rm -rf ~/app");
        assert!(texts[1].starts_with("scp ./app"));
        assert!(texts[2].contains("docker compose down --remove-orphans || true"));
        assert!(texts[3].contains("docker compose up -d --build"));
        assert!(texts[4].contains("deployment.json"));
    }

    #[tokio::test]
    async fn up_runs_under_set_e_in_the_project_dir() {
        let ssh = ScriptedSsh::new();
        deploy(&ssh, &handle(), 8080, &quiet_ctx()).await.expect("deploy");

        let calls = ssh.calls.borrow();
        let Call::Script(script) = &calls[3] else {
            panic!("expected a script call, got {:?}", calls[3]);
        };
        assert!(script.starts_with("set -e\n"));
        assert!(script.contains("cd ~/app\n"));
    }

    #[tokio::test]
    async fn clear_failure_aborts_before_transfer() {
        let mut ssh = ScriptedSsh::new();
        ssh.fail_matching("rm -rf", "permission denied");
        let err = deploy(&ssh, &handle(), 8080, &quiet_ctx()).await.expect_err("must fail");
        assert!(err.to_string().contains("clearing previous copy"));
        assert_eq!(ssh.call_count(), 1);
    }

    #[tokio::test]
    async fn transfer_failure_aborts_before_compose() {
        let mut ssh = ScriptedSsh::new();
        ssh.fail_matching("scp", "connection reset");
        let err = deploy(&ssh, &handle(), 8080, &quiet_ctx()).await.expect_err("must fail");
        assert!(err.to_string().contains("transferring app"));
        assert_eq!(ssh.call_count(), 2);
    }

    #[tokio::test]
    async fn stop_failure_is_tolerated() {
        let mut ssh = ScriptedSsh::new();
        ssh.fail_matching("compose down", "no such stack");
        deploy(&ssh, &handle(), 8080, &quiet_ctx()).await.expect("deploy despite down failure");
        assert_eq!(ssh.call_count(), 5);
    }

    #[tokio::test]
    async fn stop_transport_error_is_tolerated() {
        let mut ssh = ScriptedSsh::new();
        ssh.break_matching("compose down", "connection closed by remote host");
        deploy(&ssh, &handle(), 8080, &quiet_ctx()).await.expect("deploy despite transport error");
        assert_eq!(ssh.call_count(), 5);
    }

    #[tokio::test]
    async fn compose_up_failure_is_fatal_and_skips_the_record() {
        let mut ssh = ScriptedSsh::new();
        ssh.fail_matching("compose up", "build step failed");
        let err = deploy(&ssh, &handle(), 8080, &quiet_ctx()).await.expect_err("must fail");
        assert!(err.to_string().contains("compose stack failed"));
        assert!(err.to_string().contains("build step failed"));
        assert!(
            !ssh.call_texts().iter().any(|t| t.contains("deployment.json")),
            "record must not be written after a failed start"
        );
    }

    #[tokio::test]
    async fn records_the_deployed_project_and_port() {
        let ssh = ScriptedSsh::new();
        deploy(&ssh, &handle(), 9001, &quiet_ctx()).await.expect("deploy");

        let calls = ssh.calls.borrow();
        let Call::Stdin { input, .. } = &calls[4] else {
            panic!("expected the record write, got {:?}", calls[4]);
        };
        let record: DeploymentRecord = serde_json::from_slice(input).expect("valid record");
        assert_eq!(record.project, "app");
        assert_eq!(record.port, 9001);
    }
}
