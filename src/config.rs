//! Deployment configuration: merging and validation.
//!
//! Values merge with flag → environment → config file → built-in default
//! precedence (clap resolves flag/env; this module layers the file and the
//! defaults underneath). Validation is pure — no I/O, no network — so a bad
//! configuration is rejected before the first remote call.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::stage::project_name_from_url;

// ── Constants ────────────────────────────────────────────────────────────────

/// Branch checked out when none is configured.
pub const DEFAULT_BRANCH: &str = "main";

/// Staging parent directory when none is configured.
pub const DEFAULT_WORKDIR: &str = ".";

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "gantry.yaml";

/// Environment variable carrying the repository access token.
/// Deliberately not a flag: argv leaks into shell history and `ps`.
pub const TOKEN_ENV: &str = "GANTRY_TOKEN";

static PORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[0-9]{2,5}$").expect("valid regex")
});

// ── Secret handling ──────────────────────────────────────────────────────────

/// Repository access token. Never rendered by `Debug` and has no `Display`,
/// so it cannot reach the console or the log file by accident. The raw value
/// is reachable only through [`AccessToken::expose`], consumed by the git
/// credential hook.
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn new(raw: String) -> Self {
        Self(raw)
    }

    /// The raw secret. Callers must not log or persist the value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

// ── Config schema ────────────────────────────────────────────────────────────

/// How to reach the target host over ssh.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub ssh_user: String,
    pub server: String,
    pub key_path: PathBuf,
}

/// Validated parameters for one deployment run. Immutable once constructed.
#[derive(Debug)]
pub struct DeploymentConfig {
    pub repo_url: String,
    pub token: AccessToken,
    pub branch: String,
    pub port: u32,
    pub workdir: PathBuf,
    pub connection: ConnectionConfig,
}

/// Optional settings file (`gantry.yaml`), flat keys only.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub repo: Option<String>,
    pub branch: Option<String>,
    pub server: Option<String>,
    pub user: Option<String>,
    pub key: Option<String>,
    pub port: Option<u32>,
}

/// Raw inputs after the clap layer (flags and environment variables),
/// before the file layer and validation.
#[derive(Debug, Default)]
pub struct RawInput {
    pub repo: Option<String>,
    pub branch: Option<String>,
    pub server: Option<String>,
    pub user: Option<String>,
    pub key: Option<String>,
    pub port: Option<String>,
    pub workdir: Option<PathBuf>,
}

// ── File layer ───────────────────────────────────────────────────────────────

/// Load the config file layer.
///
/// An explicitly passed path must exist and parse; the implicit
/// `gantry.yaml` is optional and silently absent.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidFile`] if the file cannot be read or parsed.
pub fn load_file(explicit: Option<&Path>) -> Result<FileConfig> {
    let (path, required) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    if !path.exists() {
        if required {
            return Err(ConfigError::InvalidFile {
                path: path.display().to_string(),
                reason: "file not found".to_string(),
            }
            .into());
        }
        return Ok(FileConfig::default());
    }

    let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::InvalidFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let parsed = serde_yaml::from_str(&text).map_err(|e| ConfigError::InvalidFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(parsed)
}

// ── Resolution & validation ──────────────────────────────────────────────────

/// Resolve and validate the connection settings shared by every subcommand.
///
/// # Errors
///
/// Returns a [`ConfigError`] for any missing field.
pub fn resolve_connection(raw: &RawInput, file: &FileConfig) -> Result<ConnectionConfig> {
    let server = required(raw.server.clone().or_else(|| file.server.clone()), "server")?;
    let ssh_user = required(raw.user.clone().or_else(|| file.user.clone()), "ssh user")?;
    let key = required(raw.key.clone().or_else(|| file.key.clone()), "ssh key path")?;
    Ok(ConnectionConfig {
        ssh_user,
        server,
        key_path: PathBuf::from(key),
    })
}

/// Resolve and validate the full deployment configuration.
///
/// Field order is deterministic: repository URL, token, connection settings,
/// then port. The first missing or invalid field wins.
///
/// # Errors
///
/// Returns a [`ConfigError`] for any missing field, a port outside 2–5
/// digits, or a repository URL no project name can be derived from.
pub fn resolve_deploy(
    raw: &RawInput,
    file: &FileConfig,
    token: Option<AccessToken>,
) -> Result<DeploymentConfig> {
    let repo_url = required(raw.repo.clone().or_else(|| file.repo.clone()), "repository URL")?;
    project_name_from_url(&repo_url)?;

    let token = match token {
        Some(t) if !t.is_empty() => t,
        _ => return Err(ConfigError::MissingToken.into()),
    };

    let connection = resolve_connection(raw, file)?;

    let port_raw = required(
        raw.port
            .clone()
            .or_else(|| file.port.map(|p| p.to_string())),
        "application port",
    )?;
    let port = validate_port(&port_raw)?;

    let branch = raw
        .branch
        .clone()
        .or_else(|| file.branch.clone())
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BRANCH.to_string());

    let workdir = raw
        .workdir
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKDIR));

    Ok(DeploymentConfig {
        repo_url,
        token,
        branch,
        port,
        workdir,
        connection,
    })
}

/// Validate an application port: 2–5 digits.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPort`] otherwise.
pub fn validate_port(raw: &str) -> Result<u32> {
    let trimmed = raw.trim();
    if !PORT_RE.is_match(trimmed) {
        return Err(ConfigError::InvalidPort(raw.to_string()).into());
    }
    trimmed
        .parse()
        .map_err(|_| ConfigError::InvalidPort(raw.to_string()).into())
}

fn required(value: Option<String>, name: &'static str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::MissingField(name).into()),
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
