//! Ordered deploy flow.
//!
//! Each step runs to completion before the next starts; the first failure
//! aborts the run. Configuration is resolved before this module is reached,
//! so a failing run never gets here on bad input.

use anyhow::{Context, Result};

use crate::command_runner::CommandRunner;
use crate::config::DeploymentConfig;
use crate::health::{HealthVerifier, Sleeper};
use crate::output::OutputContext;
use crate::proxy::HttpProbe;
use crate::ssh::Ssh;
use crate::stage::{RepoStager, RepositoryHandle};
use crate::{deploy, provision, proxy};

/// The deploy steps after configuration, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStep {
    Stage,
    Provision,
    Deploy,
    VerifyHealth,
    ConfigureProxy,
    FinalVerify,
}

impl DeployStep {
    pub const ALL: [Self; 6] = [
        Self::Stage,
        Self::Provision,
        Self::Deploy,
        Self::VerifyHealth,
        Self::ConfigureProxy,
        Self::FinalVerify,
    ];

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Stage => "Staging the repository",
            Self::Provision => "Provisioning the host",
            Self::Deploy => "Deploying the application",
            Self::VerifyHealth => "Verifying container health",
            Self::ConfigureProxy => "Configuring the reverse proxy",
            Self::FinalVerify => "Verifying end to end",
        }
    }
}

/// Run every deploy step in order, stopping at the first failure.
///
/// # Errors
///
/// Returns the failing step's error unchanged; later steps do not run.
pub async fn run(
    config: &DeploymentConfig,
    ssh: &impl Ssh,
    stager: &RepoStager<impl CommandRunner>,
    verifier: &HealthVerifier,
    sleeper: &impl Sleeper,
    probe: &impl HttpProbe,
    out: &OutputContext,
) -> Result<()> {
    let mut repo: Option<RepositoryHandle> = None;

    for step in DeployStep::ALL {
        out.step(step.description());
        match step {
            DeployStep::Stage => repo = Some(stager.stage(config).await?),
            DeployStep::Provision => provision::provision(ssh).await?,
            DeployStep::Deploy => {
                deploy::deploy(ssh, staged(repo.as_ref())?, config.port, out).await?;
            }
            DeployStep::VerifyHealth => {
                let handle = staged(repo.as_ref())?;
                verifier
                    .verify(ssh, sleeper, &handle.project, config.port, out)
                    .await?;
            }
            DeployStep::ConfigureProxy => proxy::configure(ssh, config.port).await?,
            DeployStep::FinalVerify => {
                proxy::verify(ssh, probe, &config.connection.server).await?;
            }
        }
    }

    Ok(())
}

fn staged(repo: Option<&RepositoryHandle>) -> Result<&RepositoryHandle> {
    repo.context("repository was not staged before use")
}

// ── Unit tests ────────────────────────────────────────────────────────────────
