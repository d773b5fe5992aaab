//! gantry — deploy a containerized application to a single host over ssh.

use clap::Parser;

use gantry::cli::Cli;
use gantry::error::exit_code_for;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = cli.run().await {
        std::process::exit(exit_code_for(&e));
    }
}
