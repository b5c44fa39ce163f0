//! Mock collaborators shared by the orchestrator scenarios.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use gohan::deploy::ConfigDeployer;
use gohan::domain::{
    ComponentName, ComponentSelection, DiskSpace, Error, InstallationConfiguration,
    InstallationSession, PackageConflict, ResolutionAction, SystemSnapshot,
};
use gohan::install::conflict::ConflictResolver;
use gohan::pm::{PackageManager, PackageMetadata, PackageProgressSender};
use gohan::preflight::{
    CheckResult, Guidance, PreflightChecker, PreflightUpdateSender, ProgressUpdate, Requirement,
    Severity, ValidationSession,
};
use gohan::snapshot::SnapshotStore;
use gohan::util::GB;

/// Build a session for one pinned hyprland component.
pub fn hyprland_session() -> InstallationSession {
    session_with(&[("hyprland", "0.35.0")])
}

/// Build a session for the given `(component, version)` pins.
pub fn session_with(pins: &[(&str, &str)]) -> InstallationSession {
    let selections: Vec<ComponentSelection> = pins
        .iter()
        .map(|(name, version)| {
            ComponentSelection::new(ComponentName::from(*name), version, None)
                .expect("valid selection")
        })
        .collect();
    let config = InstallationConfiguration::new(
        &selections,
        None,
        DiskSpace::new(100 * GB, 10 * GB).expect("valid disk space"),
        false,
    )
    .expect("valid configuration");
    InstallationSession::new(config)
}

/// Package manager recording installs/removals, with an optional poisoned
/// package whose install fails.
#[derive(Default)]
pub struct MockPackageManager {
    /// Package name whose install returns an error.
    pub fail_on: Option<String>,
    /// Recorded `(name, version)` install calls.
    pub installed: Mutex<Vec<(String, String)>>,
    /// Recorded removal calls.
    pub removed: Mutex<Vec<String>>,
}

impl MockPackageManager {
    /// Manager that succeeds for every package.
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Manager that fails to install `package`.
    pub fn failing_on(package: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_on: Some(package.to_string()),
            ..Self::default()
        })
    }

    /// Names installed so far.
    pub fn installed_names(&self) -> Vec<String> {
        self.installed
            .lock()
            .expect("lock")
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl PackageManager for MockPackageManager {
    async fn install(
        &self,
        _ctx: &CancellationToken,
        name: &str,
        version: &str,
    ) -> Result<(), Error> {
        if self.fail_on.as_deref() == Some(name) {
            return Err(Error::InstallationFailed {
                reason: format!("apt-get could not install {name}: exit status 100"),
                source: None,
            });
        }
        self.installed
            .lock()
            .expect("lock")
            .push((name.to_string(), version.to_string()));
        Ok(())
    }

    async fn remove(&self, _ctx: &CancellationToken, name: &str) -> Result<(), Error> {
        self.removed.lock().expect("lock").push(name.to_string());
        Ok(())
    }

    async fn is_installed(&self, _ctx: &CancellationToken, name: &str) -> Result<bool, Error> {
        Ok(self
            .installed
            .lock()
            .expect("lock")
            .iter()
            .any(|(installed, _)| installed == name))
    }

    async fn update_cache(&self, _ctx: &CancellationToken) -> Result<(), Error> {
        Ok(())
    }

    async fn get_info(
        &self,
        _ctx: &CancellationToken,
        name: &str,
    ) -> Result<PackageMetadata, Error> {
        Ok(PackageMetadata {
            name: name.to_string(),
            version: "1.0".to_string(),
            arch: "amd64".to_string(),
            description: "mock".to_string(),
        })
    }

    async fn install_many(
        &self,
        ctx: &CancellationToken,
        names: &[String],
        _progress: Option<PackageProgressSender>,
    ) -> Result<(), Error> {
        for name in names {
            self.install(ctx, name, "").await?;
        }
        Ok(())
    }
}

/// Preflight stub streaming two updates and returning a fixed session.
pub struct StaticPreflight {
    /// Results the validation session will contain.
    pub results: Vec<CheckResult>,
    /// Cancel this token mid-run, when set (exercises the failure path).
    pub cancel_during_run: Option<CancellationToken>,
}

impl StaticPreflight {
    /// Preflight whose checks all pass.
    pub fn passing() -> Arc<Self> {
        Arc::new(Self {
            results: vec![CheckResult::new(
                Requirement::DebianVersion,
                Severity::Critical,
                true,
                "trixie",
                "sid or trixie",
                Guidance::new("nothing to do"),
            )],
            cancel_during_run: None,
        })
    }

    /// Preflight blocked on the Debian release.
    pub fn blocked_on_release() -> Arc<Self> {
        Arc::new(Self {
            results: vec![CheckResult::new(
                Requirement::DebianVersion,
                Severity::Critical,
                false,
                "noble",
                "sid or trixie",
                Guidance::new("upgrade the host to Debian sid or trixie"),
            )],
            cancel_during_run: None,
        })
    }

    /// Passing preflight that fires the given token before returning.
    pub fn cancelling(token: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            results: vec![CheckResult::new(
                Requirement::Network,
                Severity::Critical,
                true,
                "reachable",
                "mirror reachable",
                Guidance::new("nothing to do"),
            )],
            cancel_during_run: Some(token),
        })
    }
}

#[async_trait]
impl PreflightChecker for StaticPreflight {
    async fn run(
        &self,
        _ctx: &CancellationToken,
        updates: PreflightUpdateSender,
    ) -> Result<ValidationSession, Error> {
        let _ = updates.send(ProgressUpdate {
            message: "checking Debian release".to_string(),
        });
        let _ = updates.send(ProgressUpdate {
            message: "checking network connectivity".to_string(),
        });
        if let Some(token) = &self.cancel_during_run {
            token.cancel();
        }
        let mut session = ValidationSession::new();
        for result in &self.results {
            session.add(result.clone());
        }
        Ok(session)
    }
}

/// Resolver returning fixed conflicts and recording resolve calls.
#[derive(Default)]
pub struct StaticResolver {
    /// Conflicts `detect` reports.
    pub conflicts: Vec<PackageConflict>,
    /// Recorded `(conflicting_package, action)` resolve calls.
    pub resolved: Mutex<Vec<(String, ResolutionAction)>>,
}

impl StaticResolver {
    /// Resolver detecting nothing.
    pub fn clean() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Resolver reporting the given conflicts.
    pub fn with_conflicts(conflicts: Vec<PackageConflict>) -> Arc<Self> {
        Arc::new(Self {
            conflicts,
            resolved: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ConflictResolver for StaticResolver {
    async fn detect(
        &self,
        _ctx: &CancellationToken,
        _components: &[ComponentSelection],
    ) -> Result<Vec<PackageConflict>, Error> {
        Ok(self.conflicts.clone())
    }

    async fn resolve(
        &self,
        _ctx: &CancellationToken,
        conflict: &PackageConflict,
        action: ResolutionAction,
    ) -> Result<(), Error> {
        self.resolved
            .lock()
            .expect("lock")
            .push((conflict.conflicting_package().to_string(), action));
        Ok(())
    }
}

/// Snapshot store faking capture and optionally failing restore.
#[derive(Default)]
pub struct FakeSnapshotStore {
    /// Fail restore calls when set.
    pub fail_restore: bool,
    /// Number of restore calls observed.
    pub restores: Mutex<usize>,
}

impl FakeSnapshotStore {
    /// Store whose capture and restore both succeed.
    pub fn reliable() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store whose restore fails.
    pub fn broken_restore() -> Arc<Self> {
        Arc::new(Self {
            fail_restore: true,
            restores: Mutex::new(0),
        })
    }

    /// A standalone snapshot entity for seeding sessions.
    pub fn sample_snapshot() -> SystemSnapshot {
        SystemSnapshot::new(
            "/tmp/gohan-tests/snapshot.json",
            DiskSpace::new(100 * GB, 10 * GB).expect("valid disk space"),
            &["hyprland=0.34.0".to_string()],
        )
        .expect("valid snapshot")
    }
}

/// Config deployer that always fails its backup step.
pub struct BrokenConfigDeployer;

#[async_trait]
impl ConfigDeployer for BrokenConfigDeployer {
    async fn deploy(
        &self,
        _ctx: &CancellationToken,
        _session: &InstallationSession,
    ) -> Result<(), Error> {
        Err(Error::ConfigurationBackupFailed(
            "could not back up /home/op/.config/hypr: read-only file system".to_string(),
        ))
    }
}

#[async_trait]
impl SnapshotStore for FakeSnapshotStore {
    async fn capture(
        &self,
        _ctx: &CancellationToken,
        session: &InstallationSession,
    ) -> Result<SystemSnapshot, Error> {
        SystemSnapshot::new(
            "/tmp/gohan-tests/snapshot.json",
            *session.configuration().disk_space(),
            &["hyprland=0.34.0".to_string(), "kitty=0.31.0".to_string()],
        )
    }

    async fn restore(
        &self,
        _ctx: &CancellationToken,
        snapshot: &SystemSnapshot,
    ) -> Result<(), Error> {
        *self.restores.lock().expect("lock") += 1;
        if self.fail_restore {
            return Err(Error::SnapshotRestorationFailed {
                reason: format!("manifest {} unreadable", snapshot.path()),
                source: None,
            });
        }
        Ok(())
    }
}
