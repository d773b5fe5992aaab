//! `gantry deploy` — the full staging-to-verification flow.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::commands::ConnectionArgs;
use crate::config::{self, RawInput};
use crate::health::{HealthVerifier, TokioSleeper};
use crate::pipeline;
use crate::proxy::UreqProbe;
use crate::ssh::{OpenSsh, SshTarget};
use crate::stage::{self, RepoStager};

/// Arguments for `gantry deploy`.
#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    /// Repository URL to deploy
    #[arg(long, env = "GANTRY_REPO")]
    pub repo: Option<String>,

    /// Branch to check out (default: main)
    #[arg(long, env = "GANTRY_BRANCH")]
    pub branch: Option<String>,

    /// Port the application listens on (2-5 digits)
    #[arg(long, env = "GANTRY_APP_PORT")]
    pub port: Option<String>,

    /// Parent directory for the local working copy
    #[arg(long, value_name = "DIR")]
    pub workdir: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

impl DeployArgs {
    fn raw_input(&self) -> RawInput {
        RawInput {
            repo: self.repo.clone(),
            branch: self.branch.clone(),
            port: self.port.clone(),
            workdir: self.workdir.clone(),
            ..self.connection.raw_input()
        }
    }
}

/// Run `gantry deploy`.
///
/// Configuration is resolved and validated up front; a bad configuration
/// fails here, before the first remote call.
///
/// # Errors
///
/// Returns an error if configuration is invalid or any deploy step fails.
pub async fn run(args: &DeployArgs, app: &AppContext) -> Result<()> {
    let out = &app.output;

    out.step("Collecting configuration");
    let file = config::load_file(args.connection.config.as_deref())?;
    let token = app.collect_token()?;
    let cfg = config::resolve_deploy(&args.raw_input(), &file, token)?;
    let project = stage::project_name_from_url(&cfg.repo_url)?;

    out.kv("repository", &cfg.repo_url);
    out.kv("branch", &cfg.branch);
    out.kv(
        "target",
        &format!("{}@{}", cfg.connection.ssh_user, cfg.connection.server),
    );
    out.kv("port", &cfg.port.to_string());

    let ssh = OpenSsh::default_runner(SshTarget::from_connection(&cfg.connection));
    let stager = RepoStager::default_runner();

    pipeline::run(
        &cfg,
        &ssh,
        &stager,
        &HealthVerifier::default(),
        &TokioSleeper,
        &UreqProbe,
        out,
    )
    .await?;

    out.success(&format!(
        "{project} is live at http://{}/",
        cfg.connection.server
    ));
    Ok(())
}
