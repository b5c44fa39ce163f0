//! Append-only installation history.
//!
//! The orchestrator records one entry per terminal outcome (and one when
//! preflight blocks). Recording is best-effort by contract: the pipeline
//! logs and swallows recorder failures, so implementations should stay
//! simple and fast.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::error::Error;
use crate::domain::session::InstallationSession;

/// One recorded installation outcome.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HistoryRecord {
    /// Record identity.
    pub id: String,
    /// Session the record describes.
    pub session_id: String,
    /// Session status at record time.
    pub status: String,
    /// Component names the session was asked to install.
    pub components: Vec<String>,
    /// Failure reason; empty for successful outcomes.
    pub failure_reason: String,
    /// When the session started.
    pub started_at: DateTime<Utc>,
    /// When the session reached a terminal status, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// When this record was written.
    pub recorded_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// Build a record from the session's current state.
    fn from_session(session: &InstallationSession) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session.id().to_string(),
            status: session.status().as_str().to_string(),
            components: session
                .configuration()
                .components()
                .iter()
                .map(|selection| selection.component().to_string())
                .collect(),
            failure_reason: session.failure_reason().to_string(),
            started_at: session.started_at(),
            completed_at: session.completed_at(),
            recorded_at: Utc::now(),
        }
    }
}

/// What: Append-only outcome log the orchestrator records into.
///
/// Inputs: The session at a decision point (terminal, or preflight-blocked).
///
/// Output: The id of the appended record.
///
/// Details:
/// - Called at most twice per session. Callers treat failures as non-fatal.
#[async_trait]
pub trait HistoryRecorder: Send + Sync {
    /// Append one outcome record for the session.
    async fn record(
        &self,
        ctx: &CancellationToken,
        session: &InstallationSession,
    ) -> Result<String, Error>;
}

/// History recorder appending one JSON line per record.
pub struct FileHistoryRecorder {
    /// File the records are appended to.
    path: PathBuf,
}

impl FileHistoryRecorder {
    /// Build a recorder appending to `path`.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Map an I/O failure onto the repository error kind.
    fn io_error(&self, err: std::io::Error) -> Error {
        Error::Repository {
            context: format!("history append to {}", self.path.display()),
            source: Some(Box::new(err)),
        }
    }
}

#[async_trait]
impl HistoryRecorder for FileHistoryRecorder {
    async fn record(
        &self,
        ctx: &CancellationToken,
        session: &InstallationSession,
    ) -> Result<String, Error> {
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let record = HistoryRecord::from_session(session);
        let line = serde_json::to_string(&record)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| self.io_error(err))?;
        writeln!(file, "{line}").map_err(|err| self.io_error(err))?;
        tracing::debug!(record = %record.id, session = %record.session_id, "history appended");
        Ok(record.id)
    }
}

/// In-memory history recorder for tests and embedded callers.
#[derive(Debug, Default)]
pub struct MemoryHistoryRecorder {
    /// Records in append order.
    records: Mutex<Vec<HistoryRecord>>,
}

impl MemoryHistoryRecorder {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records appended so far.
    ///
    /// # Panics
    /// Panics if a previous caller panicked while holding the lock.
    #[must_use]
    pub fn records(&self) -> Vec<HistoryRecord> {
        self.records.lock().expect("history lock").clone()
    }
}

#[async_trait]
impl HistoryRecorder for MemoryHistoryRecorder {
    async fn record(
        &self,
        _ctx: &CancellationToken,
        session: &InstallationSession,
    ) -> Result<String, Error> {
        let record = HistoryRecord::from_session(session);
        let id = record.id.clone();
        self.records.lock().expect("history lock").push(record);
        Ok(id)
    }
}

/// What: Read every record from a JSONL history file.
///
/// Input:
/// - `path`: History file written by [`FileHistoryRecorder`].
///
/// Output:
/// - Records in append order; an empty vector when the file does not exist.
///
/// Details:
/// - Damaged lines are skipped with a warning rather than failing the read;
///   the log is an audit trail, not a source of truth.
pub fn read_history(path: &std::path::Path) -> Result<Vec<HistoryRecord>, Error> {
    let body = match std::fs::read_to_string(path) {
        Ok(body) => body,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(Error::Repository {
                context: format!("history read from {}", path.display()),
                source: Some(Box::new(err)),
            });
        }
    };
    let mut records = Vec::new();
    for line in body.lines().filter(|line| !line.trim().is_empty()) {
        match serde_json::from_str::<HistoryRecord>(line) {
            Ok(record) => records.push(record),
            Err(err) => tracing::warn!(error = %err, "skipping damaged history line"),
        }
    }
    Ok(records)
}
