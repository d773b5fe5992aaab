//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags};
use crate::commands;

/// Deploy a containerized application to a single host over ssh
#[derive(Parser)]
#[command(
    name = "gantry",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Skip interactive prompts
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy a repository to the target host
    Deploy(commands::deploy::DeployArgs),

    /// Remove the tracked deployment from the target host
    Cleanup(commands::cleanup::CleanupArgs),

    /// Show the tracked deployment on the target host
    Status(commands::status::StatusArgs),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// A failing command is printed through its output context (and so
    /// mirrored into the run log) before the error is returned; `main` only
    /// maps it to an exit code.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            quiet,
            no_color,
            yes,
            command,
        } = self;

        let flags = AppFlags {
            no_color,
            quiet,
            yes,
        };

        match command {
            Command::Version => {
                commands::version::run();
                Ok(())
            }
            Command::Deploy(args) => {
                let app = AppContext::new(&flags).with_run_log();
                report(commands::deploy::run(&args, &app).await, &app)
            }
            Command::Cleanup(args) => {
                let app = AppContext::new(&flags).with_run_log();
                report(commands::cleanup::run(&args, &app).await, &app)
            }
            Command::Status(args) => {
                let app = AppContext::new(&flags).with_run_log();
                report(commands::status::run(&args, &app).await, &app)
            }
        }
    }
}

/// Print a command failure through the output context — stderr gets the `✗`
/// line and the run log records the reason — then propagate it.
fn report(result: Result<()>, app: &AppContext) -> Result<()> {
    if let Err(e) = &result {
        app.output.error(&format!("{e:#}"));
    }
    result
}
