//! The pre-installation system snapshot entity, used as the rollback target.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::config::DiskSpace;
use crate::domain::error::Error;

/// A record of pre-installation system state.
///
/// Created during the Preparation phase and referenced by the session for the
/// rest of its life; a later failed restore may mark it corrupted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSnapshot {
    /// Opaque unique identity.
    id: String,
    /// When the snapshot was captured.
    created_at: DateTime<Utc>,
    /// Where the snapshot manifest is stored.
    path: String,
    /// Disk capacity at snapshot time.
    disk_space: DiskSpace,
    /// Installed `name=version` pairs captured from the host.
    packages: Vec<String>,
    /// Whether a restore attempt found the snapshot unusable.
    corrupted: bool,
    /// Why the snapshot was marked corrupted, when it was.
    corruption_reason: Option<String>,
}

impl SystemSnapshot {
    /// What: Capture-time constructor for a snapshot entity.
    ///
    /// Input:
    /// - `path`: Manifest location; trimmed, must be non-empty.
    /// - `disk_space`: Disk capacity at capture time.
    /// - `packages`: Captured `name=version` pairs; copied into the entity.
    ///
    /// Output:
    /// - `Ok(SystemSnapshot)` with a fresh id and timestamp, or
    ///   `Err(Error::SnapshotInvalid)` when the path is empty.
    pub fn new(path: &str, disk_space: DiskSpace, packages: &[String]) -> Result<Self, Error> {
        let path = path.trim();
        if path.is_empty() {
            return Err(Error::SnapshotInvalid(
                "snapshot path must not be empty".into(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            path: path.to_string(),
            disk_space,
            packages: packages.to_vec(),
            corrupted: false,
            corruption_reason: None,
        })
    }

    /// What: Rebuild a persisted snapshot without minting a new identity.
    ///
    /// Input: Every persisted field, including the original id, timestamp,
    /// and corruption state.
    ///
    /// Output: `Ok(SystemSnapshot)` or `Err(Error::SnapshotInvalid)` when
    /// the id or path is empty.
    ///
    /// Details: Only the persistence layer may call this; application code
    /// goes through [`SystemSnapshot::new`].
    pub(crate) fn reconstruct(
        id: &str,
        created_at: DateTime<Utc>,
        path: &str,
        disk_space: DiskSpace,
        packages: Vec<String>,
        corrupted: bool,
        corruption_reason: Option<String>,
    ) -> Result<Self, Error> {
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::SnapshotInvalid("snapshot id must not be empty".into()));
        }
        let path = path.trim();
        if path.is_empty() {
            return Err(Error::SnapshotInvalid(
                "snapshot path must not be empty".into(),
            ));
        }
        Ok(Self {
            id: id.to_string(),
            created_at,
            path: path.to_string(),
            disk_space,
            packages,
            corrupted,
            corruption_reason,
        })
    }

    /// Opaque unique identity.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the snapshot was captured.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Manifest location.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Disk capacity at capture time.
    #[must_use]
    pub fn disk_space(&self) -> &DiskSpace {
        &self.disk_space
    }

    /// Captured `name=version` pairs.
    #[must_use]
    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    /// Whether a restore attempt found the snapshot unusable.
    #[must_use]
    pub fn is_corrupted(&self) -> bool {
        self.corrupted
    }

    /// Why the snapshot was marked corrupted, when it was.
    #[must_use]
    pub fn corruption_reason(&self) -> Option<&str> {
        self.corruption_reason.as_deref()
    }

    /// Negation of [`SystemSnapshot::is_corrupted`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.corrupted
    }

    /// What: Mark the snapshot unusable for restore.
    ///
    /// Input: `reason` describing what went wrong.
    /// Output: None; `is_valid` flips to false.
    pub fn mark_corrupted(&mut self, reason: &str) {
        self.corrupted = true;
        self.corruption_reason = Some(reason.to_string());
    }

    /// Time elapsed since the snapshot was captured.
    #[must_use]
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.created_at
    }
}
