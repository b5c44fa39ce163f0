//! Typed domain events emitted at phase boundaries.
//!
//! Events are immutable value records; the orchestrator sends them over an
//! optional unbounded channel so observers (front-ends, audit sinks) can fan
//! out without coupling to the pipeline.

use chrono::{DateTime, Utc};

use crate::domain::component::ComponentName;
use crate::domain::package::PackageConflict;

/// One domain event, timestamped at emission.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// The orchestrator picked up a session and began the pipeline.
    InstallationStarted {
        /// Session the event belongs to.
        session_id: String,
        /// When the event was emitted.
        at: DateTime<Utc>,
        /// Number of components the session will apply.
        component_count: usize,
    },
    /// Pipeline progress changed.
    ProgressUpdated {
        /// Session the event belongs to.
        session_id: String,
        /// When the event was emitted.
        at: DateTime<Utc>,
        /// Label of the active phase.
        phase: String,
        /// Percent complete across the whole pipeline.
        percent: u8,
        /// Display message for the step that just finished.
        message: String,
    },
    /// A pipeline phase finished.
    PhaseCompleted {
        /// Session the event belongs to.
        session_id: String,
        /// When the event was emitted.
        at: DateTime<Utc>,
        /// Label of the phase that completed.
        phase: String,
    },
    /// One component was applied and recorded on the session.
    ComponentInstalled {
        /// Session the event belongs to.
        session_id: String,
        /// When the event was emitted.
        at: DateTime<Utc>,
        /// Component that was installed.
        component: ComponentName,
        /// Version that was applied.
        version: String,
    },
    /// The session reached Completed.
    InstallationCompleted {
        /// Session the event belongs to.
        session_id: String,
        /// When the event was emitted.
        at: DateTime<Utc>,
        /// Number of components the session applied.
        component_count: usize,
    },
    /// The session reached Failed.
    InstallationFailed {
        /// Session the event belongs to.
        session_id: String,
        /// When the event was emitted.
        at: DateTime<Utc>,
        /// Display-ready failure reason.
        reason: String,
        /// Whether a retry could plausibly succeed.
        recoverable: bool,
    },
    /// Snapshot restoration began.
    RollbackStarted {
        /// Session the event belongs to.
        session_id: String,
        /// When the event was emitted.
        at: DateTime<Utc>,
        /// Snapshot being restored.
        snapshot_id: String,
    },
    /// Snapshot restoration finished.
    RollbackCompleted {
        /// Session the event belongs to.
        session_id: String,
        /// When the event was emitted.
        at: DateTime<Utc>,
        /// Whether the restore succeeded.
        success: bool,
    },
    /// The conflict resolver reported a conflict.
    ConflictDetected {
        /// Session the event belongs to.
        session_id: String,
        /// When the event was emitted.
        at: DateTime<Utc>,
        /// The detected conflict.
        conflict: PackageConflict,
    },
    /// The pre-installation snapshot was captured and attached.
    BackupCreated {
        /// Session the event belongs to.
        session_id: String,
        /// When the event was emitted.
        at: DateTime<Utc>,
        /// Snapshot identity.
        snapshot_id: String,
        /// Snapshot manifest location.
        path: String,
    },
    /// Preflight found the install target short on disk space.
    DiskSpaceInsufficient {
        /// Session the event belongs to.
        session_id: String,
        /// When the event was emitted.
        at: DateTime<Utc>,
        /// Formatted observation from the preflight result.
        detail: String,
    },
    /// Preflight or a collaborator observed the network drop.
    NetworkInterruption {
        /// Session the event belongs to.
        session_id: String,
        /// When the event was emitted.
        at: DateTime<Utc>,
        /// Formatted observation from the preflight result.
        detail: String,
    },
}

impl DomainEvent {
    /// Session the event belongs to.
    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            DomainEvent::InstallationStarted { session_id, .. }
            | DomainEvent::ProgressUpdated { session_id, .. }
            | DomainEvent::PhaseCompleted { session_id, .. }
            | DomainEvent::ComponentInstalled { session_id, .. }
            | DomainEvent::InstallationCompleted { session_id, .. }
            | DomainEvent::InstallationFailed { session_id, .. }
            | DomainEvent::RollbackStarted { session_id, .. }
            | DomainEvent::RollbackCompleted { session_id, .. }
            | DomainEvent::ConflictDetected { session_id, .. }
            | DomainEvent::BackupCreated { session_id, .. }
            | DomainEvent::DiskSpaceInsufficient { session_id, .. }
            | DomainEvent::NetworkInterruption { session_id, .. } => session_id,
        }
    }

    /// When the event was emitted.
    #[must_use]
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::InstallationStarted { at, .. }
            | DomainEvent::ProgressUpdated { at, .. }
            | DomainEvent::PhaseCompleted { at, .. }
            | DomainEvent::ComponentInstalled { at, .. }
            | DomainEvent::InstallationCompleted { at, .. }
            | DomainEvent::InstallationFailed { at, .. }
            | DomainEvent::RollbackStarted { at, .. }
            | DomainEvent::RollbackCompleted { at, .. }
            | DomainEvent::ConflictDetected { at, .. }
            | DomainEvent::BackupCreated { at, .. }
            | DomainEvent::DiskSpaceInsufficient { at, .. }
            | DomainEvent::NetworkInterruption { at, .. } => *at,
        }
    }
}
