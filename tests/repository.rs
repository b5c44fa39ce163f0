//! Integration tests for the durable session repository: reconstruction
//! across a close/reopen cycle and field-level round-trip fidelity.

use tokio_util::sync::CancellationToken;

use gohan::domain::{
    ComponentName, ComponentSelection, DiskSpace, Error, GpuSupport, InstallationConfiguration,
    InstallationSession, InstalledComponent, PackageInfo, Status, SystemSnapshot,
};
use gohan::repo::{SessionRepository, SqliteSessionRepository};
use gohan::util::GB;

/// Build a configuration exercising every optional field.
fn full_configuration() -> InstallationConfiguration {
    let info = PackageInfo::new("hyprland", "0.35.0", 64 * 1024 * 1024, &["libwayland".into()])
        .expect("valid package info");
    let selections = [
        ComponentSelection::new(ComponentName::Hyprland, "0.35.0", Some(info)).expect("valid"),
        ComponentSelection::new(ComponentName::Waybar, "0.10.0", None).expect("valid"),
        ComponentSelection::new(ComponentName::AmdDriver, "latest", None).expect("valid"),
    ];
    let gpu = GpuSupport::new("amd", true, Some(ComponentName::AmdDriver)).expect("valid gpu");
    InstallationConfiguration::new(
        &selections,
        Some(gpu),
        DiskSpace::new(200 * GB, 12 * GB).expect("valid disk space"),
        true,
    )
    .expect("valid configuration")
}

/// Advance a fresh session to Installing with one applied component.
fn mid_flight_session() -> InstallationSession {
    let mut session = InstallationSession::new(full_configuration());
    let snapshot = SystemSnapshot::new(
        "/var/lib/gohan/snapshots/snapshot-test.json",
        DiskSpace::new(200 * GB, 12 * GB).expect("valid disk space"),
        &["hyprland=0.34.0".to_string(), "kitty=0.31.0".to_string()],
    )
    .expect("valid snapshot");
    session.start_preparation(snapshot).expect("prepare");
    session.start_installing().expect("install");
    session
        .add_installed_component(
            InstalledComponent::new(ComponentName::Hyprland, "0.35.0", None).expect("valid"),
        )
        .expect("add");
    session
}

#[tokio::test]
/// What: A mid-flight session survives a close/reopen cycle.
///
/// Inputs:
/// - Session saved, repository closed, reopened, session loaded by id.
///
/// Output:
/// - Identical id, status, installed-component count, epoch-second start
///   time, and snapshot id.
async fn session_survives_process_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("sessions.db");
    let ctx = CancellationToken::new();
    let session = mid_flight_session();
    let snapshot_id = session.snapshot().expect("snapshot").id().to_string();

    let repo = SqliteSessionRepository::open(&db).expect("open");
    repo.save(&ctx, &session).await.expect("save");
    repo.close().expect("close");

    let repo = SqliteSessionRepository::open(&db).expect("reopen");
    let loaded = repo.find_by_id(&ctx, session.id()).await.expect("load");
    assert_eq!(loaded.id(), session.id());
    assert_eq!(loaded.status(), Status::Installing);
    assert_eq!(loaded.installed_components().len(), 1);
    assert_eq!(
        loaded.started_at().timestamp(),
        session.started_at().timestamp()
    );
    assert_eq!(loaded.snapshot().expect("snapshot").id(), snapshot_id);
}

#[tokio::test]
/// What: Every publicly exposed field round-trips through storage.
///
/// Inputs:
/// - Session with GPU support, package metadata, snapshot, and a verified
///   component.
///
/// Output:
/// - Loaded aggregate equal on configuration, snapshot, component, and
///   lifecycle accessors.
async fn round_trip_preserves_every_field() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = SqliteSessionRepository::open(dir.path().join("sessions.db")).expect("open");
    let ctx = CancellationToken::new();

    let mut session = mid_flight_session();
    let component_id = session.installed_components()[0].id().to_string();
    session.start_configuring().expect("configure");
    session.start_verifying().expect("verify");
    session.verify_component(&component_id).expect("mark verified");
    repo.save(&ctx, &session).await.expect("save");

    let loaded = repo.find_by_id(&ctx, session.id()).await.expect("load");
    assert_eq!(loaded.status(), Status::Verifying);
    assert_eq!(
        loaded.configuration().components(),
        session.configuration().components()
    );
    assert_eq!(loaded.configuration().gpu(), session.configuration().gpu());
    assert_eq!(
        loaded.configuration().disk_space(),
        session.configuration().disk_space()
    );
    assert_eq!(
        loaded.configuration().merge_existing_config(),
        session.configuration().merge_existing_config()
    );
    let (left, right) = (
        loaded.snapshot().expect("snapshot"),
        session.snapshot().expect("snapshot"),
    );
    assert_eq!(left.id(), right.id());
    assert_eq!(left.path(), right.path());
    assert_eq!(left.packages(), right.packages());
    assert_eq!(left.is_corrupted(), right.is_corrupted());
    let component = &loaded.installed_components()[0];
    assert_eq!(component.id(), component_id);
    assert!(component.is_verified());
    assert!(component.verified_at().is_some());
    assert_eq!(loaded.failure_reason(), "");
}

#[tokio::test]
/// What: Failed sessions reconstruct with their reason and timestamps.
///
/// Inputs:
/// - Session failed mid-install, saved and reloaded.
///
/// Output:
/// - Failed status, non-empty reason, completion timestamp present.
async fn failed_session_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = SqliteSessionRepository::open(dir.path().join("sessions.db")).expect("open");
    let ctx = CancellationToken::new();
    let mut session = mid_flight_session();
    session
        .fail("failed to install hyprland: exit status 100")
        .expect("fail");
    repo.save(&ctx, &session).await.expect("save");

    let loaded = repo.find_by_id(&ctx, session.id()).await.expect("load");
    assert_eq!(loaded.status(), Status::Failed);
    assert_eq!(
        loaded.failure_reason(),
        "failed to install hyprland: exit status 100"
    );
    assert!(loaded.completed_at().is_some());
    assert_eq!(
        loaded.duration().num_seconds(),
        session.duration().num_seconds()
    );
}

#[tokio::test]
/// What: Listing spans a reopen and keeps newest-first ordering.
///
/// Inputs:
/// - Two sessions saved before a reopen, one after.
///
/// Output:
/// - Three sessions, ordered by start time descending.
async fn list_spans_reopen_and_orders() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("sessions.db");
    let ctx = CancellationToken::new();

    let repo = SqliteSessionRepository::open(&db).expect("open");
    let first = InstallationSession::new(full_configuration());
    repo.save(&ctx, &first).await.expect("save");
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    let second = InstallationSession::new(full_configuration());
    repo.save(&ctx, &second).await.expect("save");
    repo.close().expect("close");

    let repo = SqliteSessionRepository::open(&db).expect("reopen");
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    let third = InstallationSession::new(full_configuration());
    repo.save(&ctx, &third).await.expect("save");

    let all = repo.list(&ctx).await.expect("list");
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].id(), third.id());
    assert_eq!(all[1].id(), second.id());
    assert_eq!(all[2].id(), first.id());
    assert!(matches!(
        repo.find_by_id(&ctx, "nonexistent").await,
        Err(Error::SessionNotFound(_))
    ));
}
