//! Package-manager contract consumed by the orchestrator, plus the dry-run
//! stand-in. The real apt-backed driver lives in [`apt`].

pub mod apt;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::error::Error;

pub use apt::AptPackageManager;

/// Catalog metadata for one package as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    /// Package name.
    pub name: String,
    /// Candidate or installed version.
    pub version: String,
    /// Target architecture.
    pub arch: String,
    /// One-line description.
    pub description: String,
}

/// Step a batch install is currently in for one package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageStatus {
    /// The package was dequeued.
    Started,
    /// The package manager is applying it.
    Installing,
    /// The apply finished successfully.
    Completed,
    /// The apply failed.
    Failed,
}

/// Progress emission for one package inside `install_many`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageProgress {
    /// Package the emission is about.
    pub name: String,
    /// Step the package is in.
    pub status: PackageStatus,
    /// Percent complete for this package, 0–100.
    pub percent: u8,
    /// Failure detail when `status` is `Failed`.
    pub error: Option<String>,
}

/// Channel end batch installs push [`PackageProgress`] values into.
pub type PackageProgressSender = mpsc::UnboundedSender<PackageProgress>;

/// What: Host package-manager operations the installer consumes.
///
/// Inputs: Every operation carries a cancellation token; package names are
/// the host package manager's names, not component names.
///
/// Output: Domain errors wrapping the subprocess exit status where a
/// subprocess is involved.
///
/// Details:
/// - `install` applies `name=version`, or the repository default when
///   `version` is empty or the `latest` sentinel.
/// - `install_many` is sequential, emits per-package progress, and observes
///   cancellation between packages.
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Install one package at the given version.
    async fn install(
        &self,
        ctx: &CancellationToken,
        name: &str,
        version: &str,
    ) -> Result<(), Error>;

    /// Remove one package.
    async fn remove(&self, ctx: &CancellationToken, name: &str) -> Result<(), Error>;

    /// Whether the package is currently installed.
    async fn is_installed(&self, ctx: &CancellationToken, name: &str) -> Result<bool, Error>;

    /// Refresh the package cache.
    async fn update_cache(&self, ctx: &CancellationToken) -> Result<(), Error>;

    /// Catalog metadata for one package.
    async fn get_info(
        &self,
        ctx: &CancellationToken,
        name: &str,
    ) -> Result<PackageMetadata, Error>;

    /// Install several packages sequentially, emitting per-package progress.
    async fn install_many(
        &self,
        ctx: &CancellationToken,
        names: &[String],
        progress: Option<PackageProgressSender>,
    ) -> Result<(), Error>;
}

/// Package manager that logs every operation instead of executing it.
///
/// Backs the CLI `--dry-run` flag; reports nothing as installed so a
/// subsequent real run starts from a clean plan.
#[derive(Debug, Default)]
pub struct DryRunPackageManager;

#[async_trait]
impl PackageManager for DryRunPackageManager {
    async fn install(
        &self,
        _ctx: &CancellationToken,
        name: &str,
        version: &str,
    ) -> Result<(), Error> {
        tracing::info!(package = %name, version = %version, "dry run: skipping install");
        Ok(())
    }

    async fn remove(&self, _ctx: &CancellationToken, name: &str) -> Result<(), Error> {
        tracing::info!(package = %name, "dry run: skipping remove");
        Ok(())
    }

    async fn is_installed(&self, _ctx: &CancellationToken, name: &str) -> Result<bool, Error> {
        tracing::debug!(package = %name, "dry run: reporting not installed");
        Ok(false)
    }

    async fn update_cache(&self, _ctx: &CancellationToken) -> Result<(), Error> {
        tracing::info!("dry run: skipping cache update");
        Ok(())
    }

    async fn get_info(
        &self,
        _ctx: &CancellationToken,
        name: &str,
    ) -> Result<PackageMetadata, Error> {
        Ok(PackageMetadata {
            name: name.to_string(),
            version: "0".to_string(),
            arch: "amd64".to_string(),
            description: "dry run placeholder".to_string(),
        })
    }

    async fn install_many(
        &self,
        ctx: &CancellationToken,
        names: &[String],
        progress: Option<PackageProgressSender>,
    ) -> Result<(), Error> {
        for name in names {
            if ctx.is_cancelled() {
                return Err(Error::Cancelled);
            }
            self.install(ctx, name, "").await?;
            if let Some(sink) = progress.as_ref() {
                let _ = sink.send(PackageProgress {
                    name: name.clone(),
                    status: PackageStatus::Completed,
                    percent: 100,
                    error: None,
                });
            }
        }
        Ok(())
    }
}
