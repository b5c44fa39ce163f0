//! The installation orchestrator.
//!
//! `execute` drives one session through preflight → snapshot → conflict
//! resolution → apply → configure → verify → complete, persisting the
//! aggregate after every mutation and fanning progress out to an optional
//! sink. Collaborator failures never bubble out as panics or errors; they
//! are converted to a failure reason on the session and surfaced in the
//! returned progress response. The two exceptions are an unknown session id
//! and a preflight block, which the caller must be able to distinguish.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::deploy::ConfigDeployer;
use crate::domain::error::Error;
use crate::domain::event::DomainEvent;
use crate::domain::package::ResolutionAction;
use crate::domain::session::{InstallationSession, InstalledComponent, Status};
use crate::history::HistoryRecorder;
use crate::install::conflict::ConflictResolver;
use crate::install::mapping;
use crate::install::progress::{
    InstallationProgress, ProgressNotice, ProgressSender, PHASE_COMPLETE, PHASE_CONFIGURE,
    PHASE_CONFLICTS, PHASE_INSTALL, PHASE_PREFLIGHT, PHASE_ROLLBACK, PHASE_SNAPSHOT,
    PHASE_VERIFY,
};
use crate::pm::PackageManager;
use crate::preflight::{PreflightChecker, Requirement};
use crate::repo::SessionRepository;
use crate::snapshot::SnapshotStore;

/// Failure reason recorded when the cancellation token fires mid-pipeline.
const CANCELLED_REASON: &str = "installation cancelled by user";

/// Coordinates one installation session across the collaborators.
pub struct Orchestrator {
    /// Session persistence; saved after every mutation.
    repository: Arc<dyn SessionRepository>,
    /// Host package manager driver.
    package_manager: Arc<dyn PackageManager>,
    /// Host validation run before anything is touched.
    preflight: Arc<dyn PreflightChecker>,
    /// Conflict detection and disposal.
    conflicts: Arc<dyn ConflictResolver>,
    /// Snapshot capture and restore.
    snapshots: Arc<dyn SnapshotStore>,
    /// Append-only outcome log; best-effort.
    history: Arc<dyn HistoryRecorder>,
    /// Configuration deployment; when absent the Configure phase only
    /// records the transition.
    config_deploy: Option<Arc<dyn ConfigDeployer>>,
    /// Optional domain-event fan-out.
    events: Option<mpsc::UnboundedSender<DomainEvent>>,
}

impl Orchestrator {
    /// Assemble an orchestrator over the given collaborators.
    #[must_use]
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        package_manager: Arc<dyn PackageManager>,
        preflight: Arc<dyn PreflightChecker>,
        conflicts: Arc<dyn ConflictResolver>,
        snapshots: Arc<dyn SnapshotStore>,
        history: Arc<dyn HistoryRecorder>,
    ) -> Self {
        Self {
            repository,
            package_manager,
            preflight,
            conflicts,
            snapshots,
            history,
            config_deploy: None,
            events: None,
        }
    }

    /// Attach a domain-event channel.
    #[must_use]
    pub fn with_events(mut self, events: mpsc::UnboundedSender<DomainEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Attach a configuration deployer for the Configure phase.
    #[must_use]
    pub fn with_config_deployer(mut self, deployer: Arc<dyn ConfigDeployer>) -> Self {
        self.config_deploy = Some(deployer);
        self
    }

    /// Send one event if a channel is attached; receivers may be gone.
    fn emit(&self, event: DomainEvent) {
        if let Some(events) = self.events.as_ref() {
            let _ = events.send(event);
        }
    }

    /// Push one notice to the sink if the caller supplied one.
    fn notify(
        sink: Option<&ProgressSender>,
        phase: &str,
        percent: u8,
        message: &str,
        components_installed: usize,
        components_total: usize,
    ) {
        if let Some(sink) = sink {
            let _ = sink.send(ProgressNotice {
                phase: phase.to_string(),
                percent,
                message: message.to_string(),
                components_installed,
                components_total,
            });
        }
    }

    /// Display-ready reason for a collaborator failure.
    fn reason_for(err: &Error) -> String {
        if matches!(err, Error::Cancelled) {
            CANCELLED_REASON.to_string()
        } else {
            err.to_string()
        }
    }

    /// What: Route a failure through the session and return the failed
    /// response.
    ///
    /// Input: The session, the display-ready reason, whether a retry could
    /// succeed, the phase label the pipeline died in, and the sink.
    ///
    /// Output: The terminal "failed" progress response.
    ///
    /// Details:
    /// - Marks the session failed, persists it, emits `InstallationFailed`,
    ///   notifies the sink, and records history, in that order, atomically
    ///   from the caller's point of view.
    /// - Runs persistence and history on a fresh token so a fired
    ///   cancellation cannot also wipe out the failure bookkeeping.
    async fn fail_session(
        &self,
        session: &mut InstallationSession,
        reason: String,
        recoverable: bool,
        phase: &str,
        sink: Option<&ProgressSender>,
    ) -> InstallationProgress {
        tracing::error!(session = %session.id(), reason = %reason, phase, "installation failed");
        let shutdown_ctx = CancellationToken::new();
        if let Err(err) = session.fail(&reason) {
            tracing::warn!(session = %session.id(), error = %err, "could not mark session failed");
        }
        if let Err(err) = self.repository.save(&shutdown_ctx, session).await {
            tracing::error!(session = %session.id(), error = %err, "could not persist failed session");
        }
        self.emit(DomainEvent::InstallationFailed {
            session_id: session.id().to_string(),
            at: Utc::now(),
            reason: reason.clone(),
            recoverable,
        });
        let total = session.configuration().components().len();
        let installed = session.installed_components().len();
        Self::notify(sink, phase, 0, &reason, installed, total);
        if let Err(err) = self.history.record(&shutdown_ctx, session).await {
            tracing::warn!(session = %session.id(), error = %err, "history record dropped");
        }
        InstallationProgress {
            session_id: session.id().to_string(),
            status: Status::Failed.as_str().to_string(),
            phase: phase.to_string(),
            percent_complete: 0,
            message: "installation failed".to_string(),
            components_installed: installed,
            components_total: total,
            failure_reason: Some(reason),
        }
    }

    /// Persist after a mutation, or explain what was being persisted.
    async fn persist(
        &self,
        ctx: &CancellationToken,
        session: &InstallationSession,
        step: &str,
    ) -> Result<(), Error> {
        self.repository.save(ctx, session).await.map_err(|err| {
            tracing::error!(session = %session.id(), error = %err, step, "persist failed");
            err
        })
    }

    /// Treat "already in the target phase" as a no-op; used when a restart
    /// re-runs the pipeline against a mid-flight session.
    fn advance(
        session: &InstallationSession,
        target: Status,
        attempt: Result<(), Error>,
    ) -> Result<(), Error> {
        match attempt {
            Err(Error::InvalidStateTransition { .. }) if session.status() == target => {
                tracing::debug!(session = %session.id(), status = %target, "phase already entered");
                Ok(())
            }
            other => other,
        }
    }

    /// What: Drive one session through the full installation pipeline.
    ///
    /// Input:
    /// - `ctx`: Cancellation token observed at every collaborator boundary.
    /// - `session_id`: Session to execute; must exist in the repository.
    /// - `sink`: Optional channel for progress notices.
    ///
    /// Output:
    /// - `Ok` with a terminal progress response; collaborator failures are
    ///   modeled in the response (`status == "failed"`), not as errors.
    /// - `Err(Error::SessionNotFound)` when the id is unknown (no state is
    ///   mutated).
    /// - `Err(Error::PreflightBlocked)` when host validation blocks; the
    ///   error carries both the aggregated blocker message and the failed
    ///   response.
    ///
    /// # Errors
    /// See above; all other failures are folded into the response.
    pub async fn execute(
        &self,
        ctx: &CancellationToken,
        session_id: &str,
        sink: Option<ProgressSender>,
    ) -> Result<InstallationProgress, Error> {
        let mut session = self.repository.find_by_id(ctx, session_id).await?;
        let sink = sink.as_ref();
        let total = session.configuration().components().len();
        tracing::info!(session = %session.id(), components = total, "starting installation");
        self.emit(DomainEvent::InstallationStarted {
            session_id: session.id().to_string(),
            at: Utc::now(),
            component_count: total,
        });

        // Preflight. The checker runs on this task; a spawned consumer
        // forwards its stream to the sink until the checker drops the
        // sender, so the stream is fully drained before the validation
        // session is inspected.
        Self::notify(sink, PHASE_PREFLIGHT, 0, "running preflight checks", 0, total);
        let (updates_tx, mut updates_rx) =
            mpsc::unbounded_channel::<crate::preflight::ProgressUpdate>();
        let forward_sink = sink.cloned();
        let forward = tokio::spawn(async move {
            while let Some(update) = updates_rx.recv().await {
                if let Some(sink) = forward_sink.as_ref() {
                    let _ = sink.send(ProgressNotice {
                        phase: PHASE_PREFLIGHT.to_string(),
                        percent: 10,
                        message: update.message,
                        components_installed: 0,
                        components_total: total,
                    });
                }
            }
        });
        let run_result = self.preflight.run(ctx, updates_tx).await;
        let _ = forward.await;
        let validation = match run_result {
            Ok(validation) => validation,
            Err(err) => {
                let reason = Self::reason_for(&err);
                return Ok(self
                    .fail_session(&mut session, reason, true, PHASE_PREFLIGHT, sink)
                    .await);
            }
        };
        if !validation.can_proceed() {
            let mut lines = Vec::new();
            for blocker in validation.blocking_results() {
                lines.push(format!(
                    "{}. Fix: {}",
                    blocker.format_message(),
                    blocker.guidance().message()
                ));
                match blocker.requirement {
                    Requirement::DiskSpace => self.emit(DomainEvent::DiskSpaceInsufficient {
                        session_id: session.id().to_string(),
                        at: Utc::now(),
                        detail: blocker.format_message(),
                    }),
                    Requirement::Network => self.emit(DomainEvent::NetworkInterruption {
                        session_id: session.id().to_string(),
                        at: Utc::now(),
                        detail: blocker.format_message(),
                    }),
                    _ => {}
                }
            }
            let reason = format!("preflight checks failed:\n{}", lines.join("\n"));
            let response = self
                .fail_session(&mut session, reason.clone(), true, PHASE_PREFLIGHT, sink)
                .await;
            return Err(Error::PreflightBlocked {
                reason,
                response: Box::new(response),
            });
        }
        for warning in validation.warning_results() {
            Self::notify(
                sink,
                PHASE_PREFLIGHT,
                12,
                &format!("warning: {}", warning.format_message()),
                0,
                total,
            );
        }
        Self::notify(sink, PHASE_PREFLIGHT, 15, "preflight checks passed", 0, total);
        self.emit(DomainEvent::PhaseCompleted {
            session_id: session.id().to_string(),
            at: Utc::now(),
            phase: PHASE_PREFLIGHT.to_string(),
        });

        // Snapshot.
        if ctx.is_cancelled() {
            return Ok(self
                .fail_session(
                    &mut session,
                    CANCELLED_REASON.to_string(),
                    true,
                    PHASE_SNAPSHOT,
                    sink,
                )
                .await);
        }
        Self::notify(sink, PHASE_SNAPSHOT, 15, "capturing system snapshot", 0, total);
        let snapshot = match self.snapshots.capture(ctx, &session).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                let reason = Self::reason_for(&err);
                return Ok(self
                    .fail_session(&mut session, reason, true, PHASE_SNAPSHOT, sink)
                    .await);
            }
        };
        let snapshot_id = snapshot.id().to_string();
        let snapshot_path = snapshot.path().to_string();
        let attempt = session.start_preparation(snapshot);
        if let Err(err) = Self::advance(&session, Status::Preparation, attempt) {
            let reason = Self::reason_for(&err);
            return Ok(self
                .fail_session(&mut session, reason, true, PHASE_SNAPSHOT, sink)
                .await);
        }
        if let Err(err) = self.persist(ctx, &session, "snapshot attached").await {
            let reason = Self::reason_for(&err);
            return Ok(self
                .fail_session(&mut session, reason, true, PHASE_SNAPSHOT, sink)
                .await);
        }
        self.emit(DomainEvent::BackupCreated {
            session_id: session.id().to_string(),
            at: Utc::now(),
            snapshot_id,
            path: snapshot_path,
        });
        Self::notify(sink, PHASE_SNAPSHOT, 25, "snapshot captured", 0, total);

        // Conflict detection and the default disposal policy: remove every
        // conflicting host package.
        Self::notify(sink, PHASE_CONFLICTS, 25, "detecting package conflicts", 0, total);
        let selections = session.configuration().components().to_vec();
        match self.conflicts.detect(ctx, &selections).await {
            Ok(found) => {
                for conflict in found {
                    self.emit(DomainEvent::ConflictDetected {
                        session_id: session.id().to_string(),
                        at: Utc::now(),
                        conflict: conflict.clone(),
                    });
                    Self::notify(
                        sink,
                        PHASE_CONFLICTS,
                        28,
                        &format!("resolving conflict: {conflict}"),
                        0,
                        total,
                    );
                    if let Err(err) = self
                        .conflicts
                        .resolve(ctx, &conflict, ResolutionAction::Remove)
                        .await
                    {
                        let reason = Self::reason_for(&err);
                        return Ok(self
                            .fail_session(&mut session, reason, true, PHASE_CONFLICTS, sink)
                            .await);
                    }
                }
            }
            Err(err) => {
                let reason = Self::reason_for(&err);
                return Ok(self
                    .fail_session(&mut session, reason, true, PHASE_CONFLICTS, sink)
                    .await);
            }
        }

        // Apply.
        if let Err(err) = {
            let attempt = session.start_installing();
            Self::advance(&session, Status::Installing, attempt)
        } {
            let reason = Self::reason_for(&err);
            return Ok(self
                .fail_session(&mut session, reason, true, PHASE_INSTALL, sink)
                .await);
        }
        if let Err(err) = self.persist(ctx, &session, "installing").await {
            let reason = Self::reason_for(&err);
            return Ok(self
                .fail_session(&mut session, reason, true, PHASE_INSTALL, sink)
                .await);
        }
        Self::notify(sink, PHASE_INSTALL, 30, "installing packages", 0, total);
        for (index, selection) in selections.iter().enumerate() {
            if ctx.is_cancelled() {
                return Ok(self
                    .fail_session(
                        &mut session,
                        CANCELLED_REASON.to_string(),
                        true,
                        PHASE_INSTALL,
                        sink,
                    )
                    .await);
            }
            let package = mapping::package_for(selection.component());
            if let Err(err) = self
                .package_manager
                .install(ctx, &package, selection.version())
                .await
            {
                let reason = match &err {
                    Error::Cancelled => CANCELLED_REASON.to_string(),
                    other => format!("failed to install {package}: {other}"),
                };
                return Ok(self
                    .fail_session(&mut session, reason, true, PHASE_INSTALL, sink)
                    .await);
            }
            let component = match InstalledComponent::new(
                selection.component().clone(),
                selection.version(),
                selection.package_info().cloned(),
            ) {
                Ok(component) => component,
                Err(err) => {
                    let reason = Self::reason_for(&err);
                    return Ok(self
                        .fail_session(&mut session, reason, false, PHASE_INSTALL, sink)
                        .await);
                }
            };
            if let Err(err) = session.add_installed_component(component) {
                let reason = Self::reason_for(&err);
                return Ok(self
                    .fail_session(&mut session, reason, false, PHASE_INSTALL, sink)
                    .await);
            }
            if let Err(err) = self.persist(ctx, &session, "component installed").await {
                let reason = Self::reason_for(&err);
                return Ok(self
                    .fail_session(&mut session, reason, true, PHASE_INSTALL, sink)
                    .await);
            }
            let done = index + 1;
            let percent = u8::try_from(30 + (45 * done) / total).unwrap_or(75);
            let message = format!("installed {package} {}", selection.version());
            self.emit(DomainEvent::ComponentInstalled {
                session_id: session.id().to_string(),
                at: Utc::now(),
                component: selection.component().clone(),
                version: selection.version().to_string(),
            });
            self.emit(DomainEvent::ProgressUpdated {
                session_id: session.id().to_string(),
                at: Utc::now(),
                phase: PHASE_INSTALL.to_string(),
                percent,
                message: message.clone(),
            });
            Self::notify(sink, PHASE_INSTALL, percent, &message, done, total);
        }
        self.emit(DomainEvent::PhaseCompleted {
            session_id: session.id().to_string(),
            at: Utc::now(),
            phase: PHASE_INSTALL.to_string(),
        });

        // Configure. File deployment is the config engine's concern; the
        // session only records that the phase was entered.
        if let Err(err) = {
            let attempt = session.start_configuring();
            Self::advance(&session, Status::Configuring, attempt)
        } {
            let reason = Self::reason_for(&err);
            return Ok(self
                .fail_session(&mut session, reason, true, PHASE_CONFIGURE, sink)
                .await);
        }
        if let Err(err) = self.persist(ctx, &session, "configuring").await {
            let reason = Self::reason_for(&err);
            return Ok(self
                .fail_session(&mut session, reason, true, PHASE_CONFIGURE, sink)
                .await);
        }
        let installed = session.installed_components().len();
        Self::notify(sink, PHASE_CONFIGURE, 85, "deploying configuration", installed, total);
        if let Some(deployer) = self.config_deploy.as_ref() {
            if let Err(err) = deployer.deploy(ctx, &session).await {
                let reason = Self::reason_for(&err);
                return Ok(self
                    .fail_session(&mut session, reason, true, PHASE_CONFIGURE, sink)
                    .await);
            }
        }
        self.emit(DomainEvent::PhaseCompleted {
            session_id: session.id().to_string(),
            at: Utc::now(),
            phase: PHASE_CONFIGURE.to_string(),
        });

        // Verify. Best-effort probe per component; probe failures log and
        // move on, cancellation takes the failure path.
        if let Err(err) = {
            let attempt = session.start_verifying();
            Self::advance(&session, Status::Verifying, attempt)
        } {
            let reason = Self::reason_for(&err);
            return Ok(self
                .fail_session(&mut session, reason, true, PHASE_VERIFY, sink)
                .await);
        }
        if let Err(err) = self.persist(ctx, &session, "verifying").await {
            let reason = Self::reason_for(&err);
            return Ok(self
                .fail_session(&mut session, reason, true, PHASE_VERIFY, sink)
                .await);
        }
        Self::notify(sink, PHASE_VERIFY, 90, "verifying installed components", installed, total);
        let probes: Vec<(String, String)> = session
            .installed_components()
            .iter()
            .map(|component| {
                (
                    component.id().to_string(),
                    mapping::package_for(component.component()),
                )
            })
            .collect();
        for (component_id, package) in probes {
            match self.package_manager.is_installed(ctx, &package).await {
                Ok(true) => {
                    if let Err(err) = session.verify_component(&component_id) {
                        tracing::warn!(package = %package, error = %err, "verification mark skipped");
                    } else if let Err(err) =
                        self.persist(ctx, &session, "component verified").await
                    {
                        let reason = Self::reason_for(&err);
                        return Ok(self
                            .fail_session(&mut session, reason, true, PHASE_VERIFY, sink)
                            .await);
                    }
                }
                Ok(false) => {
                    tracing::warn!(package = %package, "package missing during verification");
                }
                Err(Error::Cancelled) => {
                    return Ok(self
                        .fail_session(
                            &mut session,
                            CANCELLED_REASON.to_string(),
                            true,
                            PHASE_VERIFY,
                            sink,
                        )
                        .await);
                }
                Err(err) => {
                    tracing::warn!(package = %package, error = %err, "verification probe failed");
                }
            }
        }
        if let Err(err) = self.persist(ctx, &session, "verified").await {
            let reason = Self::reason_for(&err);
            return Ok(self
                .fail_session(&mut session, reason, true, PHASE_VERIFY, sink)
                .await);
        }

        // Complete.
        if let Err(err) = {
            let attempt = session.complete();
            Self::advance(&session, Status::Completed, attempt)
        } {
            let reason = Self::reason_for(&err);
            return Ok(self
                .fail_session(&mut session, reason, false, PHASE_COMPLETE, sink)
                .await);
        }
        if let Err(err) = self.persist(ctx, &session, "completed").await {
            let reason = Self::reason_for(&err);
            return Ok(self
                .fail_session(&mut session, reason, true, PHASE_COMPLETE, sink)
                .await);
        }
        self.emit(DomainEvent::InstallationCompleted {
            session_id: session.id().to_string(),
            at: Utc::now(),
            component_count: session.installed_components().len(),
        });
        Self::notify(sink, PHASE_COMPLETE, 100, "installation completed", installed, total);
        if let Err(err) = self.history.record(ctx, &session).await {
            tracing::warn!(session = %session.id(), error = %err, "history record dropped");
        }
        tracing::info!(session = %session.id(), components = installed, "installation completed");
        Ok(InstallationProgress {
            session_id: session.id().to_string(),
            status: Status::Completed.as_str().to_string(),
            phase: PHASE_COMPLETE.to_string(),
            percent_complete: 100,
            message: "installation completed".to_string(),
            components_installed: installed,
            components_total: total,
            failure_reason: None,
        })
    }

    /// What: Restore a session's host state from its snapshot.
    ///
    /// Input:
    /// - `ctx`: Cancellation token.
    /// - `session_id`: Session to roll back; must be non-terminal and carry
    ///   a valid snapshot.
    /// - `sink`: Optional channel for progress notices.
    ///
    /// Output:
    /// - `Ok` with a "rolled_back" response on success.
    ///
    /// # Errors
    /// - `Error::SessionNotFound` / `Error::SnapshotNotFound` /
    ///   `Error::SnapshotInvalid` when the rollback cannot start;
    ///   `Error::InvalidStateTransition` for terminal sessions.
    /// - `Error::RollbackFailed` when the restore itself fails; the session
    ///   is marked failed and its snapshot corrupted.
    pub async fn rollback(
        &self,
        ctx: &CancellationToken,
        session_id: &str,
        sink: Option<ProgressSender>,
    ) -> Result<InstallationProgress, Error> {
        let mut session = self.repository.find_by_id(ctx, session_id).await?;
        let sink = sink.as_ref();
        let Some(snapshot) = session.snapshot().cloned() else {
            return Err(Error::SnapshotNotFound(session_id.to_string()));
        };
        if !snapshot.is_valid() {
            return Err(Error::SnapshotInvalid(format!(
                "snapshot {} is marked corrupted",
                snapshot.id()
            )));
        }
        session.start_rollback()?;
        self.persist(ctx, &session, "rolling back").await?;
        tracing::info!(session = %session.id(), snapshot = %snapshot.id(), "rollback started");
        self.emit(DomainEvent::RollbackStarted {
            session_id: session.id().to_string(),
            at: Utc::now(),
            snapshot_id: snapshot.id().to_string(),
        });
        let total = session.configuration().components().len();
        let installed = session.installed_components().len();
        Self::notify(sink, PHASE_ROLLBACK, 10, "restoring system snapshot", installed, total);

        match self.snapshots.restore(ctx, &snapshot).await {
            Ok(()) => {
                if let Err(err) = session.complete_rollback() {
                    let reason = Self::reason_for(&err);
                    let _ = self
                        .fail_session(&mut session, reason.clone(), false, PHASE_ROLLBACK, sink)
                        .await;
                    return Err(Error::RollbackFailed {
                        reason,
                        source: Some(Box::new(err)),
                    });
                }
                if let Err(err) = self.persist(ctx, &session, "rolled back").await {
                    tracing::error!(session = %session.id(), error = %err, "could not persist rollback");
                }
                self.emit(DomainEvent::RollbackCompleted {
                    session_id: session.id().to_string(),
                    at: Utc::now(),
                    success: true,
                });
                Self::notify(sink, PHASE_ROLLBACK, 100, "rollback completed", installed, total);
                if let Err(err) = self.history.record(ctx, &session).await {
                    tracing::warn!(session = %session.id(), error = %err, "history record dropped");
                }
                Ok(InstallationProgress {
                    session_id: session.id().to_string(),
                    status: Status::RolledBack.as_str().to_string(),
                    phase: PHASE_ROLLBACK.to_string(),
                    percent_complete: 100,
                    message: "rollback completed".to_string(),
                    components_installed: installed,
                    components_total: total,
                    failure_reason: None,
                })
            }
            Err(err) => {
                let reason = match &err {
                    Error::Cancelled => CANCELLED_REASON.to_string(),
                    other => format!("snapshot restore failed: {other}"),
                };
                if let Err(mark_err) = session.mark_snapshot_corrupted(&reason) {
                    tracing::warn!(session = %session.id(), error = %mark_err, "could not mark snapshot corrupted");
                }
                self.emit(DomainEvent::RollbackCompleted {
                    session_id: session.id().to_string(),
                    at: Utc::now(),
                    success: false,
                });
                let _ = self
                    .fail_session(&mut session, reason.clone(), false, PHASE_ROLLBACK, sink)
                    .await;
                Err(Error::RollbackFailed {
                    reason,
                    source: Some(Box::new(err)),
                })
            }
        }
    }
}
