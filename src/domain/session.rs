//! The installation session aggregate: status state machine, installed
//! components, and the mutation operations the orchestrator drives.
//!
//! All mutations to a session flow through this type. The status graph is
//! enforced by [`Status::can_transition`]; terminal statuses refuse every
//! further mutation. Persistence rebuilds sessions through the crate-private
//! reconstruction factory so application code cannot forge aggregates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::component::ComponentName;
use crate::domain::config::InstallationConfiguration;
use crate::domain::error::Error;
use crate::domain::package::PackageInfo;
use crate::domain::snapshot::SystemSnapshot;

/// Lifecycle status of an installation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Created but not yet started.
    Pending,
    /// Snapshot capture and host preparation.
    Preparation,
    /// Package downloads (reserved; the current pipeline skips it).
    Downloading,
    /// Packages being applied.
    Installing,
    /// Configuration files being deployed.
    Configuring,
    /// Installed components being verified.
    Verifying,
    /// Finished successfully (terminal).
    Completed,
    /// Finished unsuccessfully (terminal).
    Failed,
    /// Restoring the pre-installation snapshot.
    RollingBack,
    /// Snapshot restored (terminal).
    RolledBack,
}

impl Status {
    /// Canonical lower-case string form, stable across persistence.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Preparation => "preparation",
            Status::Downloading => "downloading",
            Status::Installing => "installing",
            Status::Configuring => "configuring",
            Status::Verifying => "verifying",
            Status::Completed => "completed",
            Status::Failed => "failed",
            Status::RollingBack => "rolling_back",
            Status::RolledBack => "rolled_back",
        }
    }

    /// True for statuses that accept no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Completed | Status::Failed | Status::RolledBack)
    }

    /// What: Whether the status graph contains the edge `self → to`.
    ///
    /// Input:
    /// - `to`: Proposed next status.
    ///
    /// Output:
    /// - `true` iff the transition is legal.
    ///
    /// Details:
    /// - Any non-terminal status may move to `Failed` or `RollingBack`.
    /// - `Preparation → Installing` is always legal; `Downloading` stays in
    ///   the table for planners that stage downloads separately.
    #[must_use]
    pub fn can_transition(self, to: Status) -> bool {
        if self.is_terminal() {
            return false;
        }
        if matches!(to, Status::Failed | Status::RollingBack) {
            return true;
        }
        matches!(
            (self, to),
            (Status::Pending, Status::Preparation)
                | (Status::Preparation, Status::Downloading)
                | (Status::Preparation, Status::Installing)
                | (Status::Downloading, Status::Installing)
                | (Status::Installing, Status::Configuring)
                | (Status::Configuring, Status::Verifying)
                | (Status::Verifying, Status::Completed)
                | (Status::RollingBack, Status::RolledBack)
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Status::Pending),
            "preparation" => Ok(Status::Preparation),
            "downloading" => Ok(Status::Downloading),
            "installing" => Ok(Status::Installing),
            "configuring" => Ok(Status::Configuring),
            "verifying" => Ok(Status::Verifying),
            "completed" => Ok(Status::Completed),
            "failed" => Ok(Status::Failed),
            "rolling_back" => Ok(Status::RollingBack),
            "rolled_back" => Ok(Status::RolledBack),
            other => Err(Error::Repository {
                context: format!("unknown session status `{other}`"),
                source: None,
            }),
        }
    }
}

/// One component that a session successfully applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledComponent {
    /// Opaque unique identity.
    id: String,
    /// Which component was installed.
    component: ComponentName,
    /// Version that was applied.
    version: String,
    /// Package metadata recorded at apply time, when known.
    package_info: Option<PackageInfo>,
    /// When the package apply finished.
    installed_at: DateTime<Utc>,
    /// Whether a later verification pass confirmed the component.
    verified: bool,
    /// When verification succeeded, if it did.
    verified_at: Option<DateTime<Utc>>,
}

impl InstalledComponent {
    /// What: Record a successful package apply.
    ///
    /// Input:
    /// - `component`: The component that was installed.
    /// - `version`: Applied version; trimmed, must be non-empty.
    /// - `package_info`: Package metadata, if the planner resolved it.
    ///
    /// Output:
    /// - `Ok(InstalledComponent)` with a fresh id and timestamp, or
    ///   `Err(Error::InvalidComponentSelection)` when the version is empty.
    pub fn new(
        component: ComponentName,
        version: &str,
        package_info: Option<PackageInfo>,
    ) -> Result<Self, Error> {
        let version = version.trim();
        if version.is_empty() {
            return Err(Error::InvalidComponentSelection(format!(
                "installed version for {component} must not be empty"
            )));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            component,
            version: version.to_string(),
            package_info,
            installed_at: Utc::now(),
            verified: false,
            verified_at: None,
        })
    }

    /// Rebuild a persisted installed component without minting a new id.
    pub(crate) fn reconstruct(
        id: &str,
        component: ComponentName,
        version: &str,
        package_info: Option<PackageInfo>,
        installed_at: DateTime<Utc>,
        verified: bool,
        verified_at: Option<DateTime<Utc>>,
    ) -> Result<Self, Error> {
        if id.trim().is_empty() {
            return Err(Error::Repository {
                context: "installed component id must not be empty".into(),
                source: None,
            });
        }
        let version = version.trim();
        if version.is_empty() {
            return Err(Error::InvalidComponentSelection(format!(
                "installed version for {component} must not be empty"
            )));
        }
        Ok(Self {
            id: id.trim().to_string(),
            component,
            version: version.to_string(),
            package_info,
            installed_at,
            verified,
            verified_at,
        })
    }

    /// Opaque unique identity.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Which component was installed.
    #[must_use]
    pub fn component(&self) -> &ComponentName {
        &self.component
    }

    /// Version that was applied.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Package metadata recorded at apply time.
    #[must_use]
    pub fn package_info(&self) -> Option<&PackageInfo> {
        self.package_info.as_ref()
    }

    /// When the package apply finished.
    #[must_use]
    pub fn installed_at(&self) -> DateTime<Utc> {
        self.installed_at
    }

    /// Whether verification confirmed the component.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// When verification succeeded, if it did.
    #[must_use]
    pub fn verified_at(&self) -> Option<DateTime<Utc>> {
        self.verified_at
    }

    /// Mark the component as verified now.
    fn mark_verified(&mut self) {
        self.verified = true;
        self.verified_at = Some(Utc::now());
    }
}

/// The aggregate root for one installation run.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallationSession {
    /// Opaque unique identity.
    id: String,
    /// The inputs this session installs from.
    configuration: InstallationConfiguration,
    /// Current lifecycle status.
    status: Status,
    /// Pre-installation snapshot, attached on entering Preparation.
    snapshot: Option<SystemSnapshot>,
    /// Components applied so far, in apply order.
    installed_components: Vec<InstalledComponent>,
    /// When the session was created.
    started_at: DateTime<Utc>,
    /// When the session reached a terminal status.
    completed_at: Option<DateTime<Utc>>,
    /// Why the session failed; empty unless status is Failed.
    failure_reason: String,
}

impl InstallationSession {
    /// What: Create a new pending session for a validated configuration.
    ///
    /// Input:
    /// - `configuration`: Already-validated installation configuration.
    ///
    /// Output:
    /// - A `Pending` session with a fresh id and start timestamp.
    #[must_use]
    pub fn new(configuration: InstallationConfiguration) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            configuration,
            status: Status::Pending,
            snapshot: None,
            installed_components: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            failure_reason: String::new(),
        }
    }

    /// What: Rebuild a persisted session, bypassing transition replay.
    ///
    /// Input: Every persisted field.
    ///
    /// Output: `Ok(InstallationSession)` or an `Error::Repository` naming
    /// the violated structural invariant.
    ///
    /// Details:
    /// - Enforces: non-empty id, non-zero started-at, completed-at present
    ///   for `Completed`, failure reason present for `Failed`.
    /// - Value objects and entities arrive already validated by their own
    ///   constructors; their errors bubble up verbatim from the DTO layer.
    /// - Crate-private so application code cannot forge sessions.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn reconstruct(
        id: &str,
        configuration: InstallationConfiguration,
        status: Status,
        snapshot: Option<SystemSnapshot>,
        installed_components: Vec<InstalledComponent>,
        started_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        failure_reason: String,
    ) -> Result<Self, Error> {
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::Repository {
                context: "session id must not be empty".into(),
                source: None,
            });
        }
        if started_at.timestamp() == 0 {
            return Err(Error::Repository {
                context: format!("session {id} has no start timestamp"),
                source: None,
            });
        }
        if status == Status::Completed && completed_at.is_none() {
            return Err(Error::Repository {
                context: format!("completed session {id} has no completion timestamp"),
                source: None,
            });
        }
        if status == Status::Failed && failure_reason.trim().is_empty() {
            return Err(Error::Repository {
                context: format!("failed session {id} has no failure reason"),
                source: None,
            });
        }
        Ok(Self {
            id: id.to_string(),
            configuration,
            status,
            snapshot,
            installed_components,
            started_at,
            completed_at,
            failure_reason,
        })
    }

    /// Opaque unique identity.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The inputs this session installs from.
    #[must_use]
    pub fn configuration(&self) -> &InstallationConfiguration {
        &self.configuration
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Pre-installation snapshot, once attached.
    #[must_use]
    pub fn snapshot(&self) -> Option<&SystemSnapshot> {
        self.snapshot.as_ref()
    }

    /// Components applied so far, in apply order.
    #[must_use]
    pub fn installed_components(&self) -> &[InstalledComponent] {
        &self.installed_components
    }

    /// When the session was created.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the session reached a terminal status, if it has.
    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Why the session failed; empty unless status is Failed.
    #[must_use]
    pub fn failure_reason(&self) -> &str {
        &self.failure_reason
    }

    /// What: Wall-clock duration of the session.
    ///
    /// Input: None.
    /// Output: `completed_at − started_at` once terminal, otherwise
    /// `now − started_at`.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        match (self.status.is_terminal(), self.completed_at) {
            (true, Some(done)) => done - self.started_at,
            _ => Utc::now() - self.started_at,
        }
    }

    /// Move to `to` or report the illegal edge.
    fn transition_to(&mut self, to: Status) -> Result<(), Error> {
        if !self.status.can_transition(to) {
            return Err(Error::InvalidStateTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// What: Enter Preparation and attach the pre-installation snapshot.
    ///
    /// Input:
    /// - `snapshot`: Freshly captured snapshot; must still be valid.
    ///
    /// Output:
    /// - `Err(Error::InvalidStateTransition)` when Preparation is not
    ///   reachable from the current status.
    /// - `Err(Error::SnapshotInvalid)` when the snapshot is corrupted.
    ///
    /// Details:
    /// - The snapshot may only be attached on this transition; it stays with
    ///   the session for the rest of its life.
    pub fn start_preparation(&mut self, snapshot: SystemSnapshot) -> Result<(), Error> {
        if !self.status.can_transition(Status::Preparation) {
            return Err(Error::InvalidStateTransition {
                from: self.status,
                to: Status::Preparation,
            });
        }
        if !snapshot.is_valid() {
            return Err(Error::SnapshotInvalid(format!(
                "snapshot {} is corrupted and cannot be attached",
                snapshot.id()
            )));
        }
        self.status = Status::Preparation;
        self.snapshot = Some(snapshot);
        Ok(())
    }

    /// Enter the Downloading phase.
    pub fn start_downloading(&mut self) -> Result<(), Error> {
        self.transition_to(Status::Downloading)
    }

    /// Enter the Installing phase.
    pub fn start_installing(&mut self) -> Result<(), Error> {
        self.transition_to(Status::Installing)
    }

    /// Enter the Configuring phase.
    pub fn start_configuring(&mut self) -> Result<(), Error> {
        self.transition_to(Status::Configuring)
    }

    /// Enter the Verifying phase.
    pub fn start_verifying(&mut self) -> Result<(), Error> {
        self.transition_to(Status::Verifying)
    }

    /// What: Append a successfully applied component.
    ///
    /// Input:
    /// - `component`: The installed-component record to append.
    ///
    /// Output:
    /// - `Err(Error::SessionNotStarted)` unless status is Installing or
    ///   Configuring.
    pub fn add_installed_component(
        &mut self,
        component: InstalledComponent,
    ) -> Result<(), Error> {
        if !matches!(self.status, Status::Installing | Status::Configuring) {
            return Err(Error::SessionNotStarted(format!(
                "components can only be added while installing or configuring (status is {})",
                self.status
            )));
        }
        self.installed_components.push(component);
        Ok(())
    }

    /// What: Mark one installed component as verified.
    ///
    /// Input:
    /// - `component_id`: Identity of the component to mark.
    ///
    /// Output:
    /// - `Err(Error::SessionAlreadyComplete)` once terminal, or
    ///   `Err(Error::ComponentNotFound)` for an unknown id.
    pub fn verify_component(&mut self, component_id: &str) -> Result<(), Error> {
        if self.status.is_terminal() {
            return Err(Error::SessionAlreadyComplete(self.id.clone()));
        }
        let Some(found) = self
            .installed_components
            .iter_mut()
            .find(|c| c.id() == component_id)
        else {
            return Err(Error::ComponentNotFound(component_id.to_string()));
        };
        found.mark_verified();
        Ok(())
    }

    /// What: Finish the session successfully.
    ///
    /// Input: None.
    ///
    /// Output:
    /// - `Err(Error::InstallationFailed)` when nothing was installed.
    /// - `Err(Error::InvalidStateTransition)` when Completed is not
    ///   reachable from the current status.
    pub fn complete(&mut self) -> Result<(), Error> {
        if self.installed_components.is_empty() {
            return Err(Error::InstallationFailed {
                reason: "cannot complete a session with no installed components".into(),
                source: None,
            });
        }
        self.transition_to(Status::Completed)?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// What: Finish the session unsuccessfully.
    ///
    /// Input:
    /// - `reason`: Display-ready failure reason; an empty string is replaced
    ///   with a generic one so the Failed invariant holds.
    ///
    /// Output:
    /// - `Err(Error::SessionAlreadyComplete)` once terminal.
    pub fn fail(&mut self, reason: &str) -> Result<(), Error> {
        if self.status.is_terminal() {
            return Err(Error::SessionAlreadyComplete(self.id.clone()));
        }
        let reason = reason.trim();
        self.failure_reason = if reason.is_empty() {
            "installation failed".to_string()
        } else {
            reason.to_string()
        };
        self.status = Status::Failed;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Enter the RollingBack phase.
    pub fn start_rollback(&mut self) -> Result<(), Error> {
        self.transition_to(Status::RollingBack)
    }

    /// What: Finish a rollback successfully.
    ///
    /// Input: None.
    /// Output: `Err(Error::InvalidStateTransition)` unless currently
    /// RollingBack.
    pub fn complete_rollback(&mut self) -> Result<(), Error> {
        self.transition_to(Status::RolledBack)?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// What: Mark the attached snapshot corrupted.
    ///
    /// Input:
    /// - `reason`: Why the snapshot is unusable.
    ///
    /// Output:
    /// - `Err(Error::SessionAlreadyComplete)` once terminal, or
    ///   `Err(Error::SnapshotNotFound)` when no snapshot is attached.
    pub fn mark_snapshot_corrupted(&mut self, reason: &str) -> Result<(), Error> {
        if self.status.is_terminal() {
            return Err(Error::SessionAlreadyComplete(self.id.clone()));
        }
        let Some(snapshot) = self.snapshot.as_mut() else {
            return Err(Error::SnapshotNotFound(self.id.clone()));
        };
        snapshot.mark_corrupted(reason);
        Ok(())
    }
}
