//! Repository staging: clone-or-pull, branch checkout, build descriptor check.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::command_runner::{CommandRunner, DEFAULT_WORK_TIMEOUT, TokioCommandRunner};
use crate::config::{AccessToken, DeploymentConfig};
use crate::error::ConfigError;

/// Files that mark a tree as deployable.
pub const BUILD_DESCRIPTORS: &[&str] = &[
    "Dockerfile",
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// A staged working copy, ready to transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    /// Directory name derived from the repository URL; doubles as the remote
    /// project name.
    pub project: String,
    pub local_path: PathBuf,
}

/// Derive the project name from a repository URL: last path segment with a
/// trailing `.git` stripped.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidRepoUrl`] when no usable name remains.
pub fn project_name_from_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or("");
    let stripped = last.strip_suffix(".git").unwrap_or(last);
    // scp-style remotes (git@host:name.git) have no slash before the name.
    let name = stripped.rsplit(':').next().unwrap_or(stripped);

    if name.is_empty() || name == "." || name == ".." {
        return Err(ConfigError::InvalidRepoUrl(url.to_string()).into());
    }
    Ok(name.to_string())
}

/// True if `dir` contains any recognized container-build descriptor.
#[must_use]
pub fn has_build_descriptor(dir: &Path) -> bool {
    BUILD_DESCRIPTORS.iter().any(|name| dir.join(name).is_file())
}

// ── Credential helper ────────────────────────────────────────────────────────

/// One-shot `GIT_ASKPASS` script carrying the access token.
///
/// git calls the script for its username and password prompts, so the token
/// never appears in process arguments or in git's environment. The script is
/// a mode-0700 temp file owned by this guard and removed on drop, on success
/// and failure paths alike.
pub struct AskpassGuard {
    file: tempfile::NamedTempFile,
}

impl AskpassGuard {
    /// Write the helper script for `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the temp file cannot be created or written.
    pub fn new(token: &AccessToken) -> Result<Self> {
        use std::io::Write as _;
        use std::os::unix::fs::PermissionsExt as _;

        let mut file = tempfile::Builder::new()
            .prefix("gantry-askpass-")
            .suffix(".sh")
            .tempfile()
            .context("creating credential helper script")?;

        let script = format!(
            "#!/bin/sh\ncase \"$1\" in\n  Username*) printf '%s\\n' 'x-access-token' ;;\n  *) printf '%s\\n' {} ;;\nesac\n",
            shell_quote(token.expose())
        );
        file.write_all(script.as_bytes())
            .context("writing credential helper script")?;
        file.flush().context("flushing credential helper script")?;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o700))
            .context("marking credential helper executable")?;

        Ok(Self { file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Single-quote `value` for POSIX sh, escaping embedded quotes.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

// ── Stager ───────────────────────────────────────────────────────────────────

/// Ensures a working copy of the target repository at the requested branch.
///
/// Generic over `R: CommandRunner` so tests can script git without spawning
/// processes.
pub struct RepoStager<R: CommandRunner> {
    runner: R,
}

impl RepoStager<TokioCommandRunner> {
    /// Convenience constructor for production use. Clones can be slow, so
    /// the stager gets the long-work timeout.
    #[must_use]
    pub fn default_runner() -> Self {
        Self {
            runner: TokioCommandRunner::new(DEFAULT_WORK_TIMEOUT),
        }
    }
}

impl<R: CommandRunner> RepoStager<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Stage the repository under `cfg.workdir` and check out `cfg.branch`.
    ///
    /// An existing checkout is updated in place (`git pull`); a pull that
    /// fails, e.g. on diverged history, aborts the run rather than
    /// reconciling. A fresh clone authenticates through [`AskpassGuard`].
    ///
    /// # Errors
    ///
    /// Returns an error if git fails, the branch cannot be checked out, or
    /// the tree has no recognized build descriptor.
    pub async fn stage(&self, cfg: &DeploymentConfig) -> Result<RepositoryHandle> {
        let project = project_name_from_url(&cfg.repo_url)?;
        let dest = cfg.workdir.join(&project);
        let dest_str = dest.display().to_string();

        {
            let askpass = AskpassGuard::new(&cfg.token)?;
            let askpass_path = askpass.path().display().to_string();
            let envs = [
                ("GIT_ASKPASS", askpass_path.as_str()),
                ("GIT_TERMINAL_PROMPT", "0"),
            ];

            let (action, output) = if dest.is_dir() {
                let out = self
                    .runner
                    .run_with_env("git", &["-C", &dest_str, "pull"], &envs)
                    .await?;
                ("updating existing checkout of", out)
            } else {
                let out = self
                    .runner
                    .run_with_env("git", &["clone", &cfg.repo_url, &dest_str], &envs)
                    .await?;
                ("cloning", out)
            };

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                anyhow::bail!("{action} {} failed: {}", cfg.repo_url, stderr.trim());
            }
        }

        let output = self
            .runner
            .run("git", &["-C", &dest_str, "checkout", &cfg.branch])
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "cannot check out branch '{}': {}",
                cfg.branch,
                stderr.trim()
            );
        }

        if !has_build_descriptor(&dest) {
            anyhow::bail!(
                "no Dockerfile or compose file found in {} — nothing to build",
                dest.display()
            );
        }

        Ok(RepositoryHandle {
            project,
            local_path: dest,
        })
    }
}

// ── Unit tests ────────────────────────────────────────────────────────────────
