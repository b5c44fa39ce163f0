//! Runtime settings for the installer binary.
//!
//! Loaded from TOML (`/etc/gohan/config.toml` by default); every field has a
//! sensible default so the file is optional. Derived paths (database,
//! snapshots, history, logs) follow `state_dir` unless overridden.

use std::path::{Path, PathBuf};

use crate::domain::error::Error;
use crate::util::GB;

/// Default location of the settings file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/gohan/config.toml";

/// Tunables for the installer runtime.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory all state lives under.
    pub state_dir: PathBuf,
    /// Session database file; defaults to `<state_dir>/sessions.db`.
    pub database_file: Option<PathBuf>,
    /// Snapshot manifest directory; defaults to `<state_dir>/snapshots`.
    pub snapshot_dir: Option<PathBuf>,
    /// History log file; defaults to `<state_dir>/history.jsonl`.
    pub history_file: Option<PathBuf>,
    /// Log directory; defaults to `<state_dir>/logs`.
    pub log_dir: Option<PathBuf>,
    /// apt mirror probed during preflight.
    pub mirror_host: String,
    /// Filesystem the packages land on.
    pub install_root: PathBuf,
    /// Default disk requirement for an installation.
    pub required_bytes: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("/var/lib/gohan"),
            database_file: None,
            snapshot_dir: None,
            history_file: None,
            log_dir: None,
            mirror_host: "deb.debian.org".to_string(),
            install_root: PathBuf::from("/"),
            required_bytes: 10 * GB,
        }
    }
}

impl Settings {
    /// What: Load settings from a TOML file, falling back to defaults.
    ///
    /// Input:
    /// - `path`: Explicit settings file, or `None` for the default path.
    ///
    /// Output:
    /// - Parsed settings; defaults when the default path does not exist.
    ///
    /// # Errors
    /// - `Error::ConfigurationInvalid` when an explicitly named file is
    ///   missing, or any file fails to parse.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let (file, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };
        let body = match std::fs::read_to_string(&file) {
            Ok(body) => body,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && !explicit => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(Error::ConfigurationInvalid(format!(
                    "could not read {}: {err}",
                    file.display()
                )));
            }
        };
        toml::from_str(&body).map_err(|err| {
            Error::ConfigurationInvalid(format!("could not parse {}: {err}", file.display()))
        })
    }

    /// Session database file.
    #[must_use]
    pub fn database_file(&self) -> PathBuf {
        self.database_file
            .clone()
            .unwrap_or_else(|| self.state_dir.join("sessions.db"))
    }

    /// Snapshot manifest directory.
    #[must_use]
    pub fn snapshot_dir(&self) -> PathBuf {
        self.snapshot_dir
            .clone()
            .unwrap_or_else(|| self.state_dir.join("snapshots"))
    }

    /// History log file.
    #[must_use]
    pub fn history_file(&self) -> PathBuf {
        self.history_file
            .clone()
            .unwrap_or_else(|| self.state_dir.join("history.jsonl"))
    }

    /// Log directory.
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.state_dir.join("logs"))
    }
}
