//! Error taxonomy for the installer core.
//!
//! One enum covers validation, session lifecycle, component, snapshot,
//! configuration, and repository failures so callers can match on the kind
//! while `source` chains preserve the root cause. Validation errors propagate
//! verbatim to callers; collaborator failures inside the orchestrator are
//! converted to a failure reason on the session instead of bubbling out (see
//! the orchestrator module).

use std::fmt;

use crate::domain::session::Status;
use crate::install::progress::InstallationProgress;

/// Boxed root cause retained by wrapping variants.
type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure kinds surfaced by the installer core.
#[derive(Debug)]
pub enum Error {
    /// Disk-space value rejected at construction.
    InvalidDiskSpace(String),
    /// Package metadata rejected at construction.
    InvalidPackageInfo(String),
    /// Component selection rejected at construction.
    InvalidComponentSelection(String),
    /// GPU support descriptor rejected at construction.
    InvalidGpuSupport(String),
    /// Installation configuration rejected at construction.
    InvalidConfiguration(String),
    /// Progress value out of range.
    InvalidProgress(String),

    /// Available disk space is below the requirement.
    InsufficientDiskSpace {
        /// Bytes available on the install target.
        available: u64,
        /// Bytes the installation requires.
        required: u64,
    },
    /// A package conflict blocked the operation.
    PackageConflict(String),
    /// Network connectivity was lost or unavailable.
    NetworkInterruption(String),
    /// A package apply step failed.
    InstallationFailed {
        /// Human-readable reason suitable for display.
        reason: String,
        /// Root cause, when wrapping a collaborator failure.
        source: Option<Cause>,
    },
    /// Restoring from the pre-installation snapshot failed.
    RollbackFailed {
        /// Human-readable reason suitable for display.
        reason: String,
        /// Root cause, when wrapping a collaborator failure.
        source: Option<Cause>,
    },
    /// The requested status transition is not in the legal graph.
    InvalidStateTransition {
        /// Status the session currently holds.
        from: Status,
        /// Status the caller attempted to move to.
        to: Status,
    },
    /// A mutation requires the session to be mid-installation.
    SessionNotStarted(String),
    /// The session already reached a terminal status.
    SessionAlreadyComplete(String),

    /// Referenced component does not exist.
    ComponentNotFound(String),
    /// Component already present where a single instance is required.
    ComponentAlreadyExists(String),
    /// A required dependency is missing.
    DependencyMissing(String),
    /// Every configuration must contain the compositor.
    CoreComponentRequired,

    /// Capturing the system snapshot failed.
    SnapshotCreationFailed {
        /// Human-readable reason suitable for display.
        reason: String,
        /// Root cause, when wrapping a collaborator failure.
        source: Option<Cause>,
    },
    /// Replaying the system snapshot failed.
    SnapshotRestorationFailed {
        /// Human-readable reason suitable for display.
        reason: String,
        /// Root cause, when wrapping a collaborator failure.
        source: Option<Cause>,
    },
    /// Snapshot is structurally unusable (empty path, corrupted, absent).
    SnapshotInvalid(String),
    /// No snapshot recorded for the session.
    SnapshotNotFound(String),
    /// Persisting the snapshot manifest failed.
    SnapshotSaveFailed {
        /// Human-readable reason suitable for display.
        reason: String,
        /// Root cause, when wrapping an I/O failure.
        source: Option<Cause>,
    },

    /// Merging existing user configuration failed.
    ConfigurationMergeFailed(String),
    /// Backing up existing user configuration failed.
    ConfigurationBackupFailed(String),
    /// Settings or request configuration is invalid.
    ConfigurationInvalid(String),

    /// No session stored under the requested id.
    SessionNotFound(String),
    /// Storage-layer failure (open, encode, decode, query).
    Repository {
        /// What the repository was doing when it failed.
        context: String,
        /// Root cause, when wrapping a storage failure.
        source: Option<Cause>,
    },

    /// Preflight found blocking requirements. Carries the failed progress
    /// response so callers get both the response and a matchable error.
    PreflightBlocked {
        /// Aggregated blocker message, one blocker per line.
        reason: String,
        /// Terminal progress response with phase "Preflight Checks".
        response: Box<InstallationProgress>,
    },
    /// The cancellation token fired.
    Cancelled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidDiskSpace(msg) => write!(f, "invalid disk space: {msg}"),
            Error::InvalidPackageInfo(msg) => write!(f, "invalid package info: {msg}"),
            Error::InvalidComponentSelection(msg) => {
                write!(f, "invalid component selection: {msg}")
            }
            Error::InvalidGpuSupport(msg) => write!(f, "invalid GPU support: {msg}"),
            Error::InvalidConfiguration(msg) => write!(f, "invalid configuration: {msg}"),
            Error::InvalidProgress(msg) => write!(f, "invalid progress: {msg}"),
            Error::InsufficientDiskSpace {
                available,
                required,
            } => write!(
                f,
                "insufficient disk space: {} available, {} required",
                crate::util::format_bytes(*available),
                crate::util::format_bytes(*required)
            ),
            Error::PackageConflict(msg) => write!(f, "package conflict: {msg}"),
            Error::NetworkInterruption(msg) => write!(f, "network interruption: {msg}"),
            Error::InstallationFailed { reason, .. } => write!(f, "{reason}"),
            Error::RollbackFailed { reason, .. } => write!(f, "rollback failed: {reason}"),
            Error::InvalidStateTransition { from, to } => {
                write!(f, "invalid state transition from {from} to {to}")
            }
            Error::SessionNotStarted(msg) => write!(f, "session not started: {msg}"),
            Error::SessionAlreadyComplete(id) => {
                write!(f, "session {id} already reached a terminal status")
            }
            Error::ComponentNotFound(msg) => write!(f, "component not found: {msg}"),
            Error::ComponentAlreadyExists(msg) => write!(f, "component already exists: {msg}"),
            Error::DependencyMissing(msg) => write!(f, "dependency missing: {msg}"),
            Error::CoreComponentRequired => {
                write!(f, "configuration requires at least one core component")
            }
            Error::SnapshotCreationFailed { reason, .. } => {
                write!(f, "snapshot creation failed: {reason}")
            }
            Error::SnapshotRestorationFailed { reason, .. } => {
                write!(f, "snapshot restoration failed: {reason}")
            }
            Error::SnapshotInvalid(msg) => write!(f, "snapshot invalid: {msg}"),
            Error::SnapshotNotFound(id) => write!(f, "no snapshot recorded for session {id}"),
            Error::SnapshotSaveFailed { reason, .. } => {
                write!(f, "snapshot save failed: {reason}")
            }
            Error::ConfigurationMergeFailed(msg) => {
                write!(f, "configuration merge failed: {msg}")
            }
            Error::ConfigurationBackupFailed(msg) => {
                write!(f, "configuration backup failed: {msg}")
            }
            Error::ConfigurationInvalid(msg) => write!(f, "configuration invalid: {msg}"),
            Error::SessionNotFound(id) => write!(f, "session not found: {id}"),
            Error::Repository { context, source } => match source {
                Some(cause) => write!(f, "repository error: {context}: {cause}"),
                None => write!(f, "repository error: {context}"),
            },
            Error::PreflightBlocked { reason, .. } => f.write_str(reason),
            Error::Cancelled => write!(f, "installation cancelled by user"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InstallationFailed { source, .. }
            | Error::RollbackFailed { source, .. }
            | Error::SnapshotCreationFailed { source, .. }
            | Error::SnapshotRestorationFailed { source, .. }
            | Error::SnapshotSaveFailed { source, .. }
            | Error::Repository { source, .. } => match source {
                Some(cause) => {
                    let cause: &(dyn std::error::Error + 'static) = cause.as_ref();
                    Some(cause)
                }
                None => None,
            },
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        Error::Repository {
            context: "sqlite".to_string(),
            source: Some(Box::new(value)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Repository {
            context: "json".to_string(),
            source: Some(Box::new(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// What: Wrapping variants keep the root cause reachable via `source()`.
    ///
    /// - Input: `InstallationFailed` wrapping an I/O error.
    /// - Output: `source()` yields the original error text.
    fn source_chain_preserves_root_cause() {
        let root = std::io::Error::other("exit status 100");
        let err = Error::InstallationFailed {
            reason: "failed to install hyprland".into(),
            source: Some(Box::new(root)),
        };
        let cause = std::error::Error::source(&err).expect("source present");
        assert!(cause.to_string().contains("exit status 100"));
    }

    #[test]
    /// What: Display renders sentinel kinds in user-facing form.
    ///
    /// - Input: A few representative variants.
    /// - Output: Stable human-readable messages.
    fn display_is_human_readable() {
        let err = Error::InsufficientDiskSpace {
            available: crate::util::GB,
            required: 2 * crate::util::GB,
        };
        assert_eq!(
            err.to_string(),
            "insufficient disk space: 1.0 GiB available, 2.0 GiB required"
        );
        assert_eq!(
            Error::SessionNotFound("nonexistent".into()).to_string(),
            "session not found: nonexistent"
        );
        assert_eq!(
            Error::Cancelled.to_string(),
            "installation cancelled by user"
        );
    }
}
