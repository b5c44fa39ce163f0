//! Snapshot store contract and the dpkg-backed implementation.
//!
//! Capture writes a JSON manifest of the installed package set under the
//! snapshot directory; restore replays the recorded `name=version` pairs
//! through the package manager.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::error::Error;
use crate::domain::session::InstallationSession;
use crate::domain::snapshot::SystemSnapshot;
use crate::pm::PackageManager;
use crate::util::{CommandError, CommandRunner};

/// What: Snapshot capture and restore operations the pipeline consumes.
///
/// Inputs: The session being installed (capture) or its recorded snapshot
/// (restore), plus a cancellation token.
///
/// Output: A fresh [`SystemSnapshot`] entity, or the outcome of the restore.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Capture the host's pre-installation state.
    async fn capture(
        &self,
        ctx: &CancellationToken,
        session: &InstallationSession,
    ) -> Result<SystemSnapshot, Error>;

    /// Restore the host to the captured state.
    async fn restore(
        &self,
        ctx: &CancellationToken,
        snapshot: &SystemSnapshot,
    ) -> Result<(), Error>;
}

/// Manifest body persisted next to every snapshot.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct SnapshotManifest {
    /// Snapshot entity id.
    id: String,
    /// Capture timestamp, RFC 3339.
    created_at: String,
    /// Captured `name=version` pairs.
    packages: Vec<String>,
}

/// Snapshot store backed by the dpkg database and a manifest directory.
pub struct DpkgSnapshotStore {
    /// Directory manifests are written into.
    dir: PathBuf,
    /// Subprocess seam for `dpkg-query`.
    runner: Arc<dyn CommandRunner>,
    /// Package manager used to replay manifests.
    package_manager: Arc<dyn PackageManager>,
}

impl DpkgSnapshotStore {
    /// Build a store writing manifests under `dir`.
    #[must_use]
    pub fn new(
        dir: PathBuf,
        runner: Arc<dyn CommandRunner>,
        package_manager: Arc<dyn PackageManager>,
    ) -> Self {
        Self {
            dir,
            runner,
            package_manager,
        }
    }
}

#[async_trait]
impl SnapshotStore for DpkgSnapshotStore {
    async fn capture(
        &self,
        ctx: &CancellationToken,
        session: &InstallationSession,
    ) -> Result<SystemSnapshot, Error> {
        let out = self
            .runner
            .run(
                ctx,
                "dpkg-query",
                &["-W", "-f", "${Package}=${Version}\\n"],
                &[],
            )
            .await
            .map_err(|err| match err {
                CommandError::Cancelled => Error::Cancelled,
                other => Error::SnapshotCreationFailed {
                    reason: "could not read the installed package set".into(),
                    source: Some(Box::new(other)),
                },
            })?;
        let packages: Vec<String> = out
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| Error::SnapshotCreationFailed {
                reason: format!("could not create snapshot directory {}", self.dir.display()),
                source: Some(Box::new(err)),
            })?;
        let path = self.dir.join(format!("snapshot-{}.json", Uuid::new_v4()));
        let snapshot = SystemSnapshot::new(
            &path.to_string_lossy(),
            *session.configuration().disk_space(),
            &packages,
        )?;

        let manifest = SnapshotManifest {
            id: snapshot.id().to_string(),
            created_at: snapshot.created_at().to_rfc3339(),
            packages,
        };
        let body = serde_json::to_vec_pretty(&manifest).map_err(|err| Error::SnapshotSaveFailed {
            reason: "could not encode the snapshot manifest".into(),
            source: Some(Box::new(err)),
        })?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|err| Error::SnapshotSaveFailed {
                reason: format!("could not write {}", path.display()),
                source: Some(Box::new(err)),
            })?;
        tracing::info!(
            snapshot = %snapshot.id(),
            path = %path.display(),
            packages = snapshot.packages().len(),
            "snapshot captured"
        );
        Ok(snapshot)
    }

    async fn restore(
        &self,
        ctx: &CancellationToken,
        snapshot: &SystemSnapshot,
    ) -> Result<(), Error> {
        if !snapshot.is_valid() {
            return Err(Error::SnapshotInvalid(format!(
                "snapshot {} is marked corrupted",
                snapshot.id()
            )));
        }
        tracing::info!(
            snapshot = %snapshot.id(),
            packages = snapshot.packages().len(),
            "restoring snapshot"
        );
        for entry in snapshot.packages() {
            if ctx.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let (name, version) = entry.split_once('=').unwrap_or((entry.as_str(), ""));
            self.package_manager
                .install(ctx, name, version)
                .await
                .map_err(|err| match err {
                    Error::Cancelled => Error::Cancelled,
                    other => Error::SnapshotRestorationFailed {
                        reason: format!("could not restore {name}"),
                        source: Some(Box::new(other)),
                    },
                })?;
        }
        Ok(())
    }
}
