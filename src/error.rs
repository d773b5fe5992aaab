//! Typed configuration errors and process exit codes.
//!
//! Anything raised here happens before the first remote call. The exit-code
//! mapper in [`exit_code_for`] gives these errors code 1; every other failure
//! (a deployment step that touched the host) maps to code 2.

use thiserror::Error;

/// Exit code for invalid or missing input. No remote call has been made.
pub const EXIT_INVALID_INPUT: i32 = 1;

/// Exit code for a failed deployment step. The host may be partially mutated.
pub const EXIT_DEPLOY_FAILED: i32 = 2;

/// Errors related to deployment configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}\n\nProvide it as a flag, an environment variable, or in gantry.yaml.")]
    MissingField(&'static str),

    #[error("Missing repository access token\n\nSet the GANTRY_TOKEN environment variable or enter it at the interactive prompt.")]
    MissingToken,

    #[error("Invalid application port '{0}': must be 2-5 digits.")]
    InvalidPort(String),

    #[error("Cannot derive a project name from repository URL '{0}'.")]
    InvalidRepoUrl(String),

    #[error("Cannot use config file {path}: {reason}")]
    InvalidFile { path: String, reason: String },
}

/// Map an error chain to a process exit code.
///
/// A [`ConfigError`] anywhere in the chain means validation rejected the run
/// before it touched the host; everything else is a deployment failure.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err
        .chain()
        .any(|cause| cause.downcast_ref::<ConfigError>().is_some())
    {
        EXIT_INVALID_INPUT
    } else {
        EXIT_DEPLOY_FAILED
    }
}
