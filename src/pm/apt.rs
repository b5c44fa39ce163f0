//! apt-backed package manager driver.
//!
//! Every operation shells out through the [`CommandRunner`] seam with
//! `DEBIAN_FRONTEND=noninteractive`, so unit tests can stub the host and the
//! orchestrator never blocks on a debconf prompt.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::error::Error;
use crate::pm::{
    PackageManager, PackageMetadata, PackageProgress, PackageProgressSender, PackageStatus,
};
use crate::util::{CommandError, CommandRunner};

/// Version sentinel treated as "whatever the repositories offer".
const LATEST: &str = "latest";

/// Environment forced onto every apt invocation.
const APT_ENV: &[(&str, &str)] = &[("DEBIAN_FRONTEND", "noninteractive")];

/// Package manager backed by `apt-get` and `dpkg-query`.
pub struct AptPackageManager {
    /// Subprocess seam; stubbed in tests.
    runner: Arc<dyn CommandRunner>,
}

impl AptPackageManager {
    /// Build a driver on top of the given command runner.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// `name=version` pin, or the bare name for default-version installs.
    fn install_spec(name: &str, version: &str) -> String {
        let version = version.trim();
        if version.is_empty() || version.eq_ignore_ascii_case(LATEST) {
            name.to_string()
        } else {
            format!("{name}={version}")
        }
    }

    /// Map a command failure onto the installation error taxonomy.
    fn install_error(name: &str, err: CommandError) -> Error {
        match err {
            CommandError::Cancelled => Error::Cancelled,
            other => Error::InstallationFailed {
                reason: format!("apt-get could not install {name}: {other}"),
                source: Some(Box::new(other)),
            },
        }
    }
}

#[async_trait]
impl PackageManager for AptPackageManager {
    async fn install(
        &self,
        ctx: &CancellationToken,
        name: &str,
        version: &str,
    ) -> Result<(), Error> {
        let spec = Self::install_spec(name, version);
        tracing::info!(package = %name, spec = %spec, "installing package");
        self.runner
            .run(ctx, "apt-get", &["install", "-y", &spec], APT_ENV)
            .await
            .map_err(|err| Self::install_error(name, err))?;
        Ok(())
    }

    async fn remove(&self, ctx: &CancellationToken, name: &str) -> Result<(), Error> {
        tracing::info!(package = %name, "removing package");
        self.runner
            .run(ctx, "apt-get", &["remove", "-y", name], APT_ENV)
            .await
            .map_err(|err| match err {
                CommandError::Cancelled => Error::Cancelled,
                other => Error::InstallationFailed {
                    reason: format!("apt-get could not remove {name}: {other}"),
                    source: Some(Box::new(other)),
                },
            })?;
        Ok(())
    }

    async fn is_installed(&self, ctx: &CancellationToken, name: &str) -> Result<bool, Error> {
        match self
            .runner
            .run(
                ctx,
                "dpkg-query",
                &["-W", "-f", "${db:Status-Status}", name],
                &[],
            )
            .await
        {
            Ok(out) => Ok(out.trim() == "installed"),
            // dpkg-query exits non-zero for unknown packages.
            Err(CommandError::Failed { .. }) => Ok(false),
            Err(CommandError::Cancelled) => Err(Error::Cancelled),
            Err(other) => Err(Error::InstallationFailed {
                reason: format!("dpkg-query failed for {name}: {other}"),
                source: Some(Box::new(other)),
            }),
        }
    }

    async fn update_cache(&self, ctx: &CancellationToken) -> Result<(), Error> {
        tracing::info!("refreshing apt cache");
        self.runner
            .run(ctx, "apt-get", &["update"], APT_ENV)
            .await
            .map_err(|err| match err {
                CommandError::Cancelled => Error::Cancelled,
                other => Error::NetworkInterruption(format!("apt-get update failed: {other}")),
            })?;
        Ok(())
    }

    async fn get_info(
        &self,
        ctx: &CancellationToken,
        name: &str,
    ) -> Result<PackageMetadata, Error> {
        let out = self
            .runner
            .run(ctx, "apt-cache", &["show", name], &[])
            .await
            .map_err(|err| match err {
                CommandError::Cancelled => Error::Cancelled,
                other => Error::ComponentNotFound(format!("{name}: {other}")),
            })?;
        let mut metadata = PackageMetadata {
            name: name.to_string(),
            version: String::new(),
            arch: String::new(),
            description: String::new(),
        };
        // First stanza wins; apt-cache may print one per origin.
        for line in out.lines() {
            if line.is_empty() {
                break;
            }
            if let Some(version) = line.strip_prefix("Version: ") {
                metadata.version = version.trim().to_string();
            } else if let Some(arch) = line.strip_prefix("Architecture: ") {
                metadata.arch = arch.trim().to_string();
            } else if let Some(description) = line.strip_prefix("Description: ") {
                metadata.description = description.trim().to_string();
            } else if let Some(description) = line.strip_prefix("Description-en: ") {
                metadata.description = description.trim().to_string();
            }
        }
        if metadata.version.is_empty() {
            return Err(Error::InvalidPackageInfo(format!(
                "apt-cache show {name} reported no version"
            )));
        }
        Ok(metadata)
    }

    async fn install_many(
        &self,
        ctx: &CancellationToken,
        names: &[String],
        progress: Option<PackageProgressSender>,
    ) -> Result<(), Error> {
        let emit = |status: PackageStatus, name: &str, percent: u8, error: Option<String>| {
            if let Some(sink) = progress.as_ref() {
                let _ = sink.send(PackageProgress {
                    name: name.to_string(),
                    status,
                    percent,
                    error,
                });
            }
        };
        for name in names {
            if ctx.is_cancelled() {
                return Err(Error::Cancelled);
            }
            emit(PackageStatus::Started, name, 0, None);
            emit(PackageStatus::Installing, name, 50, None);
            match self.install(ctx, name, "").await {
                Ok(()) => emit(PackageStatus::Completed, name, 100, None),
                Err(err) => {
                    emit(PackageStatus::Failed, name, 100, Some(err.to_string()));
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}
