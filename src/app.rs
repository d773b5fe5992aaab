//! Application context — unified state passed to every command handler.
//!
//! Constructed once in `Cli::run()` and passed as `&AppContext` to the
//! command handlers, so cross-cutting flags (`--quiet`, `--no-color`,
//! `--yes`) are threaded through one value instead of loose parameters.

use anyhow::{Context, Result};

use crate::config::{AccessToken, TOKEN_ENV};
use crate::output::{OutputContext, RunLog};

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Skip interactive prompts (also set by the `CI` / `GANTRY_YES`
    /// environment variables).
    pub yes: bool,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode, run log).
    pub output: OutputContext,
    /// When `true`, skip interactive prompts.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or `GANTRY_YES`
    /// environment variables are present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    #[must_use]
    pub fn new(flags: &AppFlags) -> Self {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("GANTRY_YES").is_ok();
        let non_interactive = flags.yes || ci_env;

        Self {
            output: OutputContext::new(flags.no_color, flags.quiet),
            non_interactive,
        }
    }

    /// Attach the default run log (`~/.gantry/gantry.log`).
    ///
    /// Failures are swallowed: logging must never block a run.
    #[must_use]
    pub fn with_run_log(mut self) -> Self {
        if let Ok(path) = RunLog::default_path()
            && let Ok(log) = RunLog::create(&path)
        {
            self.output = self.output.with_log(log);
        }
        self
    }

    /// Ask the user for a yes/no confirmation, declining by default.
    ///
    /// Reads one line from stdin, so piped input works the same as a
    /// terminal. Callers gate on `non_interactive` themselves.
    ///
    /// # Errors
    ///
    /// Returns an error if stdin is closed before any input arrives.
    pub fn confirm(&self, prompt: &str) -> Result<bool> {
        use std::io::{BufRead as _, Write as _};
        print!("{prompt} [y/N]: ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        let n = std::io::stdin().lock().read_line(&mut line)?;
        anyhow::ensure!(n > 0, "no input provided");
        Ok(line.trim().eq_ignore_ascii_case("y"))
    }

    /// Collect the repository access token.
    ///
    /// Sources, strongest first: the `GANTRY_TOKEN` environment variable,
    /// then a hidden interactive prompt. There is deliberately no flag for
    /// the token — argv leaks into shell history and `ps` output. Returns
    /// `None` when no source is available; validation turns that into a
    /// missing-field error.
    ///
    /// # Errors
    ///
    /// Returns an error if the interactive prompt fails mid-read.
    pub fn collect_token(&self) -> Result<Option<AccessToken>> {
        if let Ok(value) = std::env::var(TOKEN_ENV)
            && !value.trim().is_empty()
        {
            return Ok(Some(AccessToken::new(value)));
        }

        if self.non_interactive || !self.output.is_tty {
            return Ok(None);
        }

        let value = dialoguer::Password::new()
            .with_prompt("Repository access token")
            .interact()
            .context("reading access token")?;
        Ok(Some(AccessToken::new(value)))
    }
}
