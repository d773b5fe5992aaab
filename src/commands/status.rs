//! `gantry status` — read-only view of the tracked deployment.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::commands::ConnectionArgs;
use crate::config;
use crate::record;
use crate::ssh::{OpenSsh, Ssh as _, SshTarget};

/// Arguments for `gantry status`.
#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Run `gantry status`.
///
/// # Errors
///
/// Returns an error if the connection settings are invalid or the host
/// cannot be reached.
pub async fn run(args: &StatusArgs, app: &AppContext) -> Result<()> {
    let out = &app.output;
    let file = config::load_file(args.connection.config.as_deref())?;
    let connection = config::resolve_connection(&args.connection.raw_input(), &file)?;

    let ssh = OpenSsh::default_runner(SshTarget::from_connection(&connection));
    let Some(deployment) = record::read_remote(&ssh).await? else {
        out.info(&format!("No deployment recorded on {}.", connection.server));
        return Ok(());
    };

    out.header(&format!("Deployment on {}", connection.server));
    out.kv("project", &deployment.project);
    out.kv("port", &deployment.port.to_string());
    out.kv(
        "deployed",
        &deployment
            .deployed_at
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
    );
    out.kv("url", &format!("http://{}/", connection.server));

    let output = ssh
        .exec(&format!(
            "cd ~/{} && docker compose ps",
            deployment.project
        ))
        .await?;
    if output.status.success() {
        let listing = String::from_utf8_lossy(&output.stdout);
        let trimmed = listing.trim_end();
        if !trimmed.is_empty() && !out.quiet {
            println!();
            println!("{trimmed}");
        }
    } else {
        out.warn("docker compose ps failed on the host; the stack may be gone");
    }
    Ok(())
}
