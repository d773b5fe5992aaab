//! `gantry cleanup` — confirmation-gated remote teardown.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::commands::ConnectionArgs;
use crate::config;
use crate::ssh::{OpenSsh, SshTarget};

/// Arguments for `gantry cleanup`.
#[derive(Args, Debug, Clone)]
pub struct CleanupArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Run `gantry cleanup`.
///
/// Declining the confirmation performs zero remote calls and exits
/// successfully.
///
/// # Errors
///
/// Returns an error if the connection settings are invalid or teardown
/// fails.
pub async fn run(args: &CleanupArgs, app: &AppContext) -> Result<()> {
    let file = config::load_file(args.connection.config.as_deref())?;
    let connection = config::resolve_connection(&args.connection.raw_input(), &file)?;

    if !app.output.quiet {
        println!();
        println!(
            "This will remove the tracked deployment from {}:",
            connection.server
        );
        println!("  • its compose stack and project directory");
        println!("  • unused Docker data host-wide (docker system prune -af)");
        println!("  • the managed nginx site");
        println!();
    }

    if !app.non_interactive && !app.confirm("Continue?")? {
        println!("Cancelled.");
        return Ok(());
    }

    let ssh = OpenSsh::default_runner(SshTarget::from_connection(&connection));
    crate::cleanup::run(&ssh, &app.output).await
}
