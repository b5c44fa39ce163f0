//! End-to-end orchestrator scenarios over mock collaborators.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use gohan::domain::{
    DomainEvent, Error, InstallationSession, PackageConflict, ResolutionAction, Status,
};
use gohan::history::MemoryHistoryRecorder;
use gohan::install::orchestrator::Orchestrator;
use gohan::install::progress::ProgressNotice;
use gohan::install::ConflictResolver;
use gohan::pm::PackageManager;
use gohan::preflight::PreflightChecker;
use gohan::repo::{InMemorySessionRepository, SessionRepository};
use gohan::snapshot::SnapshotStore;

use super::support::{
    hyprland_session, session_with, BrokenConfigDeployer, FakeSnapshotStore, MockPackageManager,
    StaticPreflight, StaticResolver,
};

/// Everything one scenario needs, with handles kept for assertions.
struct Fixture {
    repository: Arc<InMemorySessionRepository>,
    package_manager: Arc<MockPackageManager>,
    resolver: Arc<StaticResolver>,
    snapshots: Arc<FakeSnapshotStore>,
    history: Arc<MemoryHistoryRecorder>,
    orchestrator: Orchestrator,
    events: mpsc::UnboundedReceiver<DomainEvent>,
}

impl Fixture {
    fn assemble(
        package_manager: Arc<MockPackageManager>,
        preflight: Arc<StaticPreflight>,
        resolver: Arc<StaticResolver>,
        snapshots: Arc<FakeSnapshotStore>,
    ) -> Self {
        let repository = Arc::new(InMemorySessionRepository::new());
        let history = Arc::new(MemoryHistoryRecorder::new());
        let (events_tx, events) = mpsc::unbounded_channel();
        let orchestrator = Orchestrator::new(
            Arc::clone(&repository) as Arc<dyn SessionRepository>,
            Arc::clone(&package_manager) as Arc<dyn PackageManager>,
            preflight as Arc<dyn PreflightChecker>,
            Arc::clone(&resolver) as Arc<dyn ConflictResolver>,
            Arc::clone(&snapshots) as Arc<dyn SnapshotStore>,
            Arc::clone(&history) as Arc<dyn gohan::history::HistoryRecorder>,
        )
        .with_events(events_tx);
        Self {
            repository,
            package_manager,
            resolver,
            snapshots,
            history,
            orchestrator,
            events,
        }
    }

    fn happy() -> Self {
        Self::assemble(
            MockPackageManager::succeeding(),
            StaticPreflight::passing(),
            StaticResolver::clean(),
            FakeSnapshotStore::reliable(),
        )
    }

    async fn seed(&self, session: &InstallationSession) {
        let ctx = CancellationToken::new();
        self.repository.save(&ctx, session).await.expect("seed session");
    }

    async fn stored(&self, id: &str) -> InstallationSession {
        let ctx = CancellationToken::new();
        self.repository.find_by_id(&ctx, id).await.expect("stored session")
    }

    fn drain_events(&mut self) -> Vec<DomainEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}

/// Collect every notice pushed to a progress channel.
fn drain_notices(rx: &mut mpsc::UnboundedReceiver<ProgressNotice>) -> Vec<ProgressNotice> {
    let mut drained = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        drained.push(notice);
    }
    drained
}

#[tokio::test]
/// What: Happy path for a single component reaches Completed.
///
/// Inputs:
/// - hyprland 0.35.0 session, all collaborators succeeding.
///
/// Output:
/// - Completed response at 100%, one installed component, one history
///   record, snapshot attached, completion event emitted.
///
/// Details:
/// - Also checks the progress anchors: preflight ends at 15, the single
///   component lands at 75, completion at 100.
async fn single_component_happy_path() {
    let mut fixture = Fixture::happy();
    let session = hyprland_session();
    fixture.seed(&session).await;
    let ctx = CancellationToken::new();
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();

    let response = fixture
        .orchestrator
        .execute(&ctx, session.id(), Some(progress_tx))
        .await
        .expect("execute succeeds");

    assert_eq!(response.status, "completed");
    assert_eq!(response.percent_complete, 100);
    assert_eq!(response.components_installed, 1);
    assert_eq!(response.components_total, 1);
    assert!(response.failure_reason.is_none());

    let stored = fixture.stored(session.id()).await;
    assert_eq!(stored.status(), Status::Completed);
    assert_eq!(stored.installed_components().len(), 1);
    assert!(stored.snapshot().is_some());
    assert!(stored.completed_at().is_some());
    assert!(stored.installed_components()[0].is_verified());

    assert_eq!(fixture.package_manager.installed_names(), ["hyprland"]);
    assert_eq!(fixture.history.records().len(), 1);
    assert_eq!(fixture.history.records()[0].status, "completed");

    let notices = drain_notices(&mut progress_rx);
    assert!(notices.iter().any(|n| n.phase == "Preflight Checks" && n.percent == 15));
    assert!(notices
        .iter()
        .any(|n| n.phase == "Installing Packages" && n.percent == 75 && n.components_installed == 1));
    assert_eq!(notices.last().expect("final notice").percent, 100);

    let events = fixture.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, DomainEvent::InstallationStarted { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, DomainEvent::BackupCreated { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, DomainEvent::ComponentInstalled { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, DomainEvent::InstallationCompleted { .. })));
    assert!(!events
        .iter()
        .any(|e| matches!(e, DomainEvent::InstallationFailed { .. })));
}

#[tokio::test]
/// What: Components apply in declaration order with the mapped packages.
///
/// Inputs:
/// - hyprland, fuzzel, and default_config pins.
///
/// Output:
/// - apt sees hyprland, rofi, gohan-default-config in order; three
///   installed components recorded.
async fn components_apply_in_declaration_order() {
    let fixture = Fixture::happy();
    let session = session_with(&[
        ("hyprland", "0.35.0"),
        ("fuzzel", "1.9.2"),
        ("default_config", "latest"),
    ]);
    fixture.seed(&session).await;
    let ctx = CancellationToken::new();

    let response = fixture
        .orchestrator
        .execute(&ctx, session.id(), None)
        .await
        .expect("execute succeeds");
    assert_eq!(response.components_installed, 3);
    assert_eq!(
        fixture.package_manager.installed_names(),
        ["hyprland", "rofi", "gohan-default-config"]
    );
    let stored = fixture.stored(session.id()).await;
    assert_eq!(stored.installed_components().len(), 3);
}

#[tokio::test]
/// What: A detected conflict is resolved with Remove and the install
/// proceeds to Completed.
///
/// Inputs:
/// - Resolver reporting hyprland-git conflicting with hyprland.
///
/// Output:
/// - Resolve called once with Remove; conflict event emitted; session
///   Completed.
async fn conflict_is_resolved_then_install_completes() {
    let conflict = PackageConflict::new("hyprland", "hyprland-git", "conflicting package versions")
        .expect("valid conflict");
    let mut fixture = Fixture::assemble(
        MockPackageManager::succeeding(),
        StaticPreflight::passing(),
        StaticResolver::with_conflicts(vec![conflict]),
        FakeSnapshotStore::reliable(),
    );
    let session = hyprland_session();
    fixture.seed(&session).await;
    let ctx = CancellationToken::new();

    let response = fixture
        .orchestrator
        .execute(&ctx, session.id(), None)
        .await
        .expect("execute succeeds");
    assert_eq!(response.status, "completed");

    let resolved = fixture.resolver.resolved.lock().expect("lock").clone();
    assert_eq!(
        resolved,
        [("hyprland-git".to_string(), ResolutionAction::Remove)]
    );
    let events = fixture.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, DomainEvent::ConflictDetected { .. })));
    assert_eq!(fixture.stored(session.id()).await.status(), Status::Completed);
}

#[tokio::test]
/// What: A package-manager failure is modeled in the response, not as an
/// error.
///
/// Inputs:
/// - apt mock failing on hyprland.
///
/// Output:
/// - `Ok` response with status failed, percent 0, reason naming the
///   package; session persisted as Failed; history records the failure; no
///   completion event.
async fn install_failure_is_modeled_in_response() {
    let mut fixture = Fixture::assemble(
        MockPackageManager::failing_on("hyprland"),
        StaticPreflight::passing(),
        StaticResolver::clean(),
        FakeSnapshotStore::reliable(),
    );
    let session = hyprland_session();
    fixture.seed(&session).await;
    let ctx = CancellationToken::new();

    let response = fixture
        .orchestrator
        .execute(&ctx, session.id(), None)
        .await
        .expect("failure is a successful observation");
    assert_eq!(response.status, "failed");
    assert_eq!(response.percent_complete, 0);
    let reason = response.failure_reason.expect("failure reason");
    assert!(reason.contains("failed to install hyprland"), "reason: {reason}");

    let stored = fixture.stored(session.id()).await;
    assert_eq!(stored.status(), Status::Failed);
    assert!(stored.failure_reason().contains("failed to install hyprland"));
    assert!(stored.completed_at().is_some());

    assert_eq!(fixture.history.records().len(), 1);
    assert_eq!(fixture.history.records()[0].status, "failed");
    let events = fixture.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, DomainEvent::InstallationFailed { .. })));
    assert!(!events
        .iter()
        .any(|e| matches!(e, DomainEvent::InstallationCompleted { .. })));
}

#[tokio::test]
/// What: Preflight blockers fail the session AND return an error.
///
/// Inputs:
/// - Preflight blocked on the Debian release (noble vs sid/trixie).
///
/// Output:
/// - `Err(PreflightBlocked)` whose message names the failure and whose
///   response carries phase "Preflight Checks"; session persisted Failed
///   with guidance in the reason; one history record.
async fn preflight_blocker_returns_error_and_failed_response() {
    let fixture = Fixture::assemble(
        MockPackageManager::succeeding(),
        StaticPreflight::blocked_on_release(),
        StaticResolver::clean(),
        FakeSnapshotStore::reliable(),
    );
    let session = hyprland_session();
    fixture.seed(&session).await;
    let ctx = CancellationToken::new();

    let err = fixture
        .orchestrator
        .execute(&ctx, session.id(), None)
        .await
        .expect_err("blockers must surface as an error");
    match &err {
        Error::PreflightBlocked { reason, response } => {
            assert!(reason.contains("preflight checks failed"), "reason: {reason}");
            assert!(reason.contains("noble"));
            assert!(reason.contains("Fix:"));
            assert_eq!(response.status, "failed");
            assert_eq!(response.phase, "Preflight Checks");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("preflight checks failed"));

    let stored = fixture.stored(session.id()).await;
    assert_eq!(stored.status(), Status::Failed);
    assert!(stored.failure_reason().contains("sid or trixie"));
    assert_eq!(fixture.history.records().len(), 1);
    assert!(fixture.package_manager.installed_names().is_empty());
}

#[tokio::test]
/// What: A configuration deployment failure fails the session in the
/// Configure phase.
///
/// Inputs:
/// - Deployer that reports a backup failure.
///
/// Output:
/// - Failed response with phase "Configuring" and a backup reason; the
///   installed components stay recorded on the failed session.
async fn config_deploy_failure_fails_in_configure_phase() {
    let repository = Arc::new(InMemorySessionRepository::new());
    let history = Arc::new(MemoryHistoryRecorder::new());
    let orchestrator = Orchestrator::new(
        Arc::clone(&repository) as Arc<dyn SessionRepository>,
        MockPackageManager::succeeding() as Arc<dyn PackageManager>,
        StaticPreflight::passing() as Arc<dyn PreflightChecker>,
        StaticResolver::clean() as Arc<dyn ConflictResolver>,
        FakeSnapshotStore::reliable() as Arc<dyn SnapshotStore>,
        Arc::clone(&history) as Arc<dyn gohan::history::HistoryRecorder>,
    )
    .with_config_deployer(Arc::new(BrokenConfigDeployer));
    let session = hyprland_session();
    let ctx = CancellationToken::new();
    repository.save(&ctx, &session).await.expect("seed");

    let response = orchestrator
        .execute(&ctx, session.id(), None)
        .await
        .expect("deploy failure is modeled in the response");
    assert_eq!(response.status, "failed");
    assert_eq!(response.phase, "Configuring");
    assert!(response
        .failure_reason
        .expect("failure reason")
        .contains("configuration backup failed"));
    let stored = repository
        .find_by_id(&ctx, session.id())
        .await
        .expect("stored");
    assert_eq!(stored.status(), Status::Failed);
    assert_eq!(stored.installed_components().len(), 1);
}

#[tokio::test]
/// What: Executing an unknown session id mutates nothing.
///
/// Inputs:
/// - Empty repository.
///
/// Output:
/// - `Err(SessionNotFound)`; no history records; no package operations.
async fn unknown_session_id_is_an_error() {
    let fixture = Fixture::happy();
    let ctx = CancellationToken::new();
    let err = fixture
        .orchestrator
        .execute(&ctx, "nonexistent", None)
        .await
        .expect_err("unknown id");
    assert!(matches!(err, Error::SessionNotFound(_)));
    assert!(fixture.history.records().is_empty());
    assert!(fixture.package_manager.installed_names().is_empty());
}

#[tokio::test]
/// What: Cancellation observed mid-pipeline takes the failure path with
/// the canonical reason.
///
/// Inputs:
/// - Preflight that fires the caller's token before returning.
///
/// Output:
/// - Failed response with reason "installation cancelled by user";
///   session persisted Failed; nothing installed.
async fn cancellation_fails_the_session() {
    let ctx = CancellationToken::new();
    let fixture = Fixture::assemble(
        MockPackageManager::succeeding(),
        StaticPreflight::cancelling(ctx.clone()),
        StaticResolver::clean(),
        FakeSnapshotStore::reliable(),
    );
    let session = hyprland_session();
    fixture.seed(&session).await;

    let response = fixture
        .orchestrator
        .execute(&ctx, session.id(), None)
        .await
        .expect("cancellation is modeled in the response");
    assert_eq!(response.status, "failed");
    assert_eq!(
        response.failure_reason.as_deref(),
        Some("installation cancelled by user")
    );
    let stored = fixture.stored(session.id()).await;
    assert_eq!(stored.status(), Status::Failed);
    assert_eq!(stored.failure_reason(), "installation cancelled by user");
    assert!(fixture.package_manager.installed_names().is_empty());
}

#[tokio::test]
/// What: Re-executing a session already in Preparation resumes instead of
/// failing on the repeated transition.
///
/// Inputs:
/// - Session seeded mid-Preparation with a snapshot attached (as left by a
///   process that died right after the snapshot step).
///
/// Output:
/// - Pipeline completes; the originally attached snapshot is retained.
async fn resume_from_preparation_is_a_no_op_transition() {
    let fixture = Fixture::happy();
    let mut session = hyprland_session();
    let original = FakeSnapshotStore::sample_snapshot();
    let original_id = original.id().to_string();
    session.start_preparation(original).expect("prepare");
    fixture.seed(&session).await;
    let ctx = CancellationToken::new();

    let response = fixture
        .orchestrator
        .execute(&ctx, session.id(), None)
        .await
        .expect("resume succeeds");
    assert_eq!(response.status, "completed");
    let stored = fixture.stored(session.id()).await;
    assert_eq!(stored.status(), Status::Completed);
    assert_eq!(stored.snapshot().expect("snapshot").id(), original_id);
}

#[tokio::test]
/// What: Rolling back a mid-flight session restores and reaches
/// RolledBack.
///
/// Inputs:
/// - Session advanced to Installing with a snapshot attached.
///
/// Output:
/// - "rolled_back" response; one restore call; rollback events with
///   success; history record appended.
async fn rollback_restores_mid_flight_session() {
    let mut fixture = Fixture::happy();
    let mut session = hyprland_session();
    session
        .start_preparation(FakeSnapshotStore::sample_snapshot())
        .expect("prepare");
    session.start_installing().expect("install");
    fixture.seed(&session).await;
    let ctx = CancellationToken::new();

    let response = fixture
        .orchestrator
        .rollback(&ctx, session.id(), None)
        .await
        .expect("rollback succeeds");
    assert_eq!(response.status, "rolled_back");
    assert_eq!(response.percent_complete, 100);

    assert_eq!(*fixture.snapshots.restores.lock().expect("lock"), 1);
    let stored = fixture.stored(session.id()).await;
    assert_eq!(stored.status(), Status::RolledBack);
    assert!(stored.completed_at().is_some());
    let events = fixture.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, DomainEvent::RollbackStarted { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, DomainEvent::RollbackCompleted { success: true, .. })));
    assert_eq!(fixture.history.records().len(), 1);
    assert_eq!(fixture.history.records()[0].status, "rolled_back");
}

#[tokio::test]
/// What: A failed restore marks the snapshot corrupted and fails the
/// session.
///
/// Inputs:
/// - Snapshot store whose restore fails.
///
/// Output:
/// - `Err(RollbackFailed)`; session persisted Failed with a corrupted
///   snapshot; failure rollback event emitted.
async fn failed_restore_corrupts_snapshot_and_fails() {
    let mut fixture = Fixture::assemble(
        MockPackageManager::succeeding(),
        StaticPreflight::passing(),
        StaticResolver::clean(),
        FakeSnapshotStore::broken_restore(),
    );
    let mut session = hyprland_session();
    session
        .start_preparation(FakeSnapshotStore::sample_snapshot())
        .expect("prepare");
    fixture.seed(&session).await;
    let ctx = CancellationToken::new();

    let err = fixture
        .orchestrator
        .rollback(&ctx, session.id(), None)
        .await
        .expect_err("restore failure");
    assert!(matches!(err, Error::RollbackFailed { .. }));

    let stored = fixture.stored(session.id()).await;
    assert_eq!(stored.status(), Status::Failed);
    assert!(!stored.snapshot().expect("snapshot").is_valid());
    let events = fixture.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, DomainEvent::RollbackCompleted { success: false, .. })));
}

#[tokio::test]
/// What: Terminal sessions refuse rollback.
///
/// Inputs:
/// - Session already Failed (via a failing install).
///
/// Output:
/// - `Err(InvalidStateTransition)`; no restore attempted.
async fn terminal_session_refuses_rollback() {
    let fixture = Fixture::assemble(
        MockPackageManager::failing_on("hyprland"),
        StaticPreflight::passing(),
        StaticResolver::clean(),
        FakeSnapshotStore::reliable(),
    );
    let session = hyprland_session();
    fixture.seed(&session).await;
    let ctx = CancellationToken::new();
    let response = fixture
        .orchestrator
        .execute(&ctx, session.id(), None)
        .await
        .expect("failure response");
    assert_eq!(response.status, "failed");

    let err = fixture
        .orchestrator
        .rollback(&ctx, session.id(), None)
        .await
        .expect_err("terminal refuses rollback");
    assert!(matches!(err, Error::InvalidStateTransition { .. }));
    assert_eq!(*fixture.snapshots.restores.lock().expect("lock"), 0);
}
