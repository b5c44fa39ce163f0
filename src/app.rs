//! Application runtime: logging setup, collaborator wiring, and command
//! dispatch for the binary.

pub mod request;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::args::{Args, Command};
use crate::deploy::FsConfigDeployer;
use crate::domain::error::Error;
use crate::domain::session::{InstallationSession, Status};
use crate::history::{read_history, FileHistoryRecorder};
use crate::install::conflict::AptConflictResolver;
use crate::install::orchestrator::Orchestrator;
use crate::install::progress::ProgressNotice;
use crate::pm::{AptPackageManager, DryRunPackageManager, PackageManager};
use crate::preflight::{HostPreflight, PreflightOptions};
use crate::repo::{SessionRepository, SqliteSessionRepository};
use crate::settings::Settings;
use crate::snapshot::DpkgSnapshotStore;
use crate::util::{format_bytes, CommandRunner, SystemCommandRunner};

/// What: Initialize tracing with a daily rolling file under the log dir.
///
/// Input:
/// - `level`: Default filter directive (overridable via `RUST_LOG`).
/// - `log_dir`: Directory for the rolling log file.
///
/// Output:
/// - The appender worker guard; dropping it flushes buffered lines, so the
///   caller keeps it alive for the process lifetime. `None` when the log
///   directory cannot be created (diagnostics fall back to stderr).
fn init_logging(level: &str, log_dir: &std::path::Path) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    if std::fs::create_dir_all(log_dir).is_ok() {
        let appender = tracing_appender::rolling::daily(log_dir, "gohan.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        None
    }
}

/// The user's configuration root, following the XDG convention.
fn user_config_root() -> std::path::PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(std::path::PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME")
                .map(|home| std::path::PathBuf::from(home).join(".config"))
        })
        .unwrap_or_else(|| std::path::PathBuf::from("/root/.config"))
}

/// Everything the commands need, wired once per invocation.
struct Runtime {
    /// Durable session repository.
    repository: Arc<SqliteSessionRepository>,
    /// The assembled orchestrator.
    orchestrator: Orchestrator,
    /// Loaded settings.
    settings: Settings,
}

impl Runtime {
    /// Wire the collaborators for the given settings and dry-run flag.
    fn assemble(settings: Settings, dry_run: bool) -> Result<Self, Error> {
        let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner);
        let package_manager: Arc<dyn PackageManager> = if dry_run {
            Arc::new(DryRunPackageManager)
        } else {
            Arc::new(AptPackageManager::new(Arc::clone(&runner)))
        };
        let repository = Arc::new(SqliteSessionRepository::open(settings.database_file())?);
        let preflight = Arc::new(HostPreflight::new(
            Arc::clone(&runner),
            PreflightOptions {
                install_root: settings.install_root.clone(),
                mirror_host: settings.mirror_host.clone(),
                required_bytes: settings.required_bytes,
                ..PreflightOptions::default()
            },
        ));
        let conflicts = Arc::new(AptConflictResolver::new(
            Arc::clone(&runner),
            Arc::clone(&package_manager),
        ));
        let snapshots = Arc::new(DpkgSnapshotStore::new(
            settings.snapshot_dir(),
            Arc::clone(&runner),
            Arc::clone(&package_manager),
        ));
        let history = Arc::new(FileHistoryRecorder::new(settings.history_file()));
        let config_deployer = Arc::new(FsConfigDeployer::new(
            std::path::PathBuf::from("/usr/share/gohan/config"),
            user_config_root(),
            settings.state_dir.join("config-backups"),
        ));
        let orchestrator = Orchestrator::new(
            Arc::clone(&repository) as Arc<dyn SessionRepository>,
            package_manager,
            preflight,
            conflicts,
            snapshots,
            history,
        )
        .with_config_deployer(config_deployer);
        Ok(Self {
            repository,
            orchestrator,
            settings,
        })
    }
}

/// Spawn a task printing progress notices to stdout.
fn spawn_progress_printer(
    mut rx: mpsc::UnboundedReceiver<ProgressNotice>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(notice) = rx.recv().await {
            println!(
                "[{:>3}%] {}: {} ({}/{})",
                notice.percent,
                notice.phase,
                notice.message,
                notice.components_installed,
                notice.components_total
            );
        }
    })
}

/// Cancel the token on Ctrl-C.
fn spawn_ctrl_c_handler(ctx: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            ctx.cancel();
        }
    });
}

/// What: Run the CLI to completion.
///
/// Input:
/// - `args`: Parsed command line.
///
/// Output:
/// - `Ok(())` on success; the binary maps errors to a nonzero exit.
///
/// # Errors
/// - Settings, wiring, and command errors; a failed installation surfaces
///   as `Error::InstallationFailed` carrying the session's failure reason.
pub async fn run(args: Args) -> Result<(), Error> {
    let settings = Settings::load(args.config.as_deref())?;
    let _log_guard = init_logging(&args.log_level, &settings.log_dir());
    match args.command {
        Command::Install {
            ref components,
            merge_config,
            required_bytes,
        } => run_install(settings, args.dry_run, components, merge_config, required_bytes).await,
        Command::Sessions => run_sessions(settings).await,
        Command::History => run_history(&settings),
        Command::Rollback { ref session_id } => run_rollback(settings, session_id).await,
    }
}

/// Create a session from the CLI request and execute it.
async fn run_install(
    mut settings: Settings,
    dry_run: bool,
    specs: &[String],
    merge_config: bool,
    required_bytes: Option<u64>,
) -> Result<(), Error> {
    if let Some(required) = required_bytes {
        settings.required_bytes = required;
    }
    let runtime = Runtime::assemble(settings, dry_run)?;
    let ctx = CancellationToken::new();
    spawn_ctrl_c_handler(ctx.clone());

    let mut selections = Vec::with_capacity(specs.len());
    for spec in specs {
        selections.push(request::parse_selection(spec)?);
    }
    let disk_space = request::probe_disk(
        &runtime.settings.install_root,
        runtime.settings.required_bytes,
    )?;
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner);
    let gpu = request::probe_gpu(&ctx, &runner, &selections).await;
    let configuration = request::build_configuration(&selections, merge_config, gpu, disk_space)?;

    let session = InstallationSession::new(configuration);
    runtime.repository.save(&ctx, &session).await?;
    println!(
        "session {} created ({} components, {} free)",
        session.id(),
        session.configuration().components().len(),
        format_bytes(session.configuration().disk_space().available_bytes())
    );

    let (progress_tx, progress_rx) = mpsc::unbounded_channel();
    let printer = spawn_progress_printer(progress_rx);
    let result = runtime
        .orchestrator
        .execute(&ctx, session.id(), Some(progress_tx))
        .await;
    let _ = printer.await;

    let response = result?;
    if response.status == Status::Completed.as_str() {
        println!(
            "session {} completed: {} components installed",
            response.session_id, response.components_installed
        );
        Ok(())
    } else {
        let reason = response
            .failure_reason
            .unwrap_or_else(|| "installation failed".to_string());
        Err(Error::InstallationFailed {
            reason,
            source: None,
        })
    }
}

/// Print the recorded sessions, newest first.
async fn run_sessions(settings: Settings) -> Result<(), Error> {
    let repository = SqliteSessionRepository::open(settings.database_file())?;
    let ctx = CancellationToken::new();
    let sessions = repository.list(&ctx).await?;
    if sessions.is_empty() {
        println!("no sessions recorded");
        return Ok(());
    }
    for session in sessions {
        println!(
            "{}  {}  started {}  components {}  {}",
            session.id(),
            session.status(),
            session.started_at().to_rfc3339(),
            session.installed_components().len(),
            session.failure_reason()
        );
    }
    Ok(())
}

/// Print the history log.
fn run_history(settings: &Settings) -> Result<(), Error> {
    let records = read_history(&settings.history_file())?;
    if records.is_empty() {
        println!("no history recorded");
        return Ok(());
    }
    for record in records {
        println!(
            "{}  session {}  {}  [{}]  {}",
            record.recorded_at.to_rfc3339(),
            record.session_id,
            record.status,
            record.components.join(", "),
            record.failure_reason
        );
    }
    Ok(())
}

/// Roll a session back from its snapshot.
async fn run_rollback(settings: Settings, session_id: &str) -> Result<(), Error> {
    let runtime = Runtime::assemble(settings, false)?;
    let ctx = CancellationToken::new();
    spawn_ctrl_c_handler(ctx.clone());
    let (progress_tx, progress_rx) = mpsc::unbounded_channel();
    let printer = spawn_progress_printer(progress_rx);
    let result = runtime
        .orchestrator
        .rollback(&ctx, session_id, Some(progress_tx))
        .await;
    let _ = printer.await;
    let response = result?;
    println!("session {} rolled back", response.session_id);
    Ok(())
}
