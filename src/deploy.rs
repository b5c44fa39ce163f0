//! Configuration deployment: the collaborator contract the Configure phase
//! delegates to, plus the filesystem implementation.
//!
//! Templates ship on the host (the `gohan-default-config` package installs
//! them under `/usr/share/gohan/config`); the deployer copies them into the
//! user's config root, backing up anything it would touch. The session's
//! merge flag decides whether existing user files win or get replaced.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::component::ComponentName;
use crate::domain::error::Error;
use crate::domain::session::InstallationSession;

/// What: Configuration deployment the Configure phase delegates to.
///
/// Inputs: The session after its packages were applied; the implementation
/// reads the installed components and the merge flag.
///
/// Output: Success, or a configuration error kind describing the failed
/// step.
#[async_trait]
pub trait ConfigDeployer: Send + Sync {
    /// Deploy configuration for every installed component.
    async fn deploy(
        &self,
        ctx: &CancellationToken,
        session: &InstallationSession,
    ) -> Result<(), Error>;
}

/// Subdirectory of the config root a component's files live in.
fn config_dir_for(component: &ComponentName) -> Option<&'static str> {
    match component {
        ComponentName::Hyprland | ComponentName::Hyprpaper | ComponentName::Hyprlock => {
            Some("hypr")
        }
        ComponentName::Waybar => Some("waybar"),
        ComponentName::Rofi | ComponentName::Fuzzel => Some("rofi"),
        ComponentName::Kitty => Some("kitty"),
        ComponentName::DefaultConfig
        | ComponentName::AmdDriver
        | ComponentName::NvidiaDriver
        | ComponentName::IntelDriver
        | ComponentName::Other(_) => None,
    }
}

/// Recursively copy `source` into `target`.
///
/// Existing files are skipped when `keep_existing` is set, replaced
/// otherwise. Directories are merged either way.
fn copy_tree(source: &Path, target: &Path, keep_existing: bool) -> std::io::Result<()> {
    std::fs::create_dir_all(target)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let source_path = entry.path();
        let target_path = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&source_path, &target_path, keep_existing)?;
        } else {
            if keep_existing && target_path.exists() {
                continue;
            }
            std::fs::copy(&source_path, &target_path)?;
        }
    }
    Ok(())
}

/// Deployer copying shipped templates into the user's config root.
pub struct FsConfigDeployer {
    /// Where the shipped templates live.
    template_dir: PathBuf,
    /// The user's configuration root (usually `~/.config`).
    config_root: PathBuf,
    /// Where pre-deployment backups are written.
    backup_dir: PathBuf,
}

impl FsConfigDeployer {
    /// Build a deployer over the given directories.
    #[must_use]
    pub fn new(template_dir: PathBuf, config_root: PathBuf, backup_dir: PathBuf) -> Self {
        Self {
            template_dir,
            config_root,
            backup_dir,
        }
    }

    /// Back up one existing config directory for the session.
    fn back_up(&self, session_id: &str, name: &str, target: &Path) -> Result<(), Error> {
        let backup_target = self.backup_dir.join(session_id).join(name);
        copy_tree(target, &backup_target, false).map_err(|err| {
            Error::ConfigurationBackupFailed(format!(
                "could not back up {} to {}: {err}",
                target.display(),
                backup_target.display()
            ))
        })
    }
}

#[async_trait]
impl ConfigDeployer for FsConfigDeployer {
    async fn deploy(
        &self,
        ctx: &CancellationToken,
        session: &InstallationSession,
    ) -> Result<(), Error> {
        let merge = session.configuration().merge_existing_config();
        let mut deployed: Vec<&str> = Vec::new();
        for component in session.installed_components() {
            if ctx.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let Some(name) = config_dir_for(component.component()) else {
                continue;
            };
            if deployed.contains(&name) {
                continue;
            }
            deployed.push(name);

            let source = self.template_dir.join(name);
            if !source.is_dir() {
                tracing::debug!(component = name, "no shipped templates, skipping");
                continue;
            }
            let target = self.config_root.join(name);
            if target.exists() {
                self.back_up(session.id(), name, &target)?;
            }
            copy_tree(&source, &target, merge).map_err(|err| {
                Error::ConfigurationMergeFailed(format!(
                    "could not deploy {} configuration to {}: {err}",
                    name,
                    target.display()
                ))
            })?;
            tracing::info!(component = name, merge, "configuration deployed");
        }
        Ok(())
    }
}
