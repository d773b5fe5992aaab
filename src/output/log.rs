//! Timestamped file sink mirroring console output.

use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};

/// Appends `YYYY-MM-DD HH:MM:SS [LEVEL] message` lines to a file.
///
/// Write failures after opening are swallowed: logging must never abort a
/// deployment.
pub struct RunLog {
    file: Mutex<File>,
}

impl RunLog {
    /// Open the log file at `path` for appending, creating parents as
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or opened.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Default location: `~/.gantry/gantry.log`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".gantry").join("gantry.log"))
    }

    /// Append one timestamped line.
    pub fn line(&self, level: &str, msg: &str) {
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{stamp} [{level}] {msg}");
        }
    }
}
