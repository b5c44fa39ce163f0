//! Durable session repository backed by a single SQLite file.
//!
//! One row per session holding the JSON document from [`crate::repo::dto`],
//! keyed by id, with the start timestamp denormalized for ordering. The
//! database runs in write-ahead journaling mode so a crash mid-save leaves
//! the previous document intact.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tokio_util::sync::CancellationToken;

use crate::domain::error::Error;
use crate::domain::session::InstallationSession;
use crate::repo::dto::SessionDto;
use crate::repo::SessionRepository;

/// Session repository persisting to one SQLite file.
pub struct SqliteSessionRepository {
    /// Connection guarded for exclusive use; rusqlite connections are not
    /// Sync on their own.
    conn: Mutex<Connection>,
}

impl SqliteSessionRepository {
    /// What: Open (or create) the repository file and prepare the schema.
    ///
    /// Input:
    /// - `path`: Database file location; parent directories are created.
    ///
    /// Output:
    /// - An open repository, or `Err(Error::Repository)` when the file
    ///   cannot be opened or migrated.
    ///
    /// Details:
    /// - Enables WAL journaling for crash safety.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| Error::Repository {
                context: format!("could not create {}", parent.display()),
                source: Some(Box::new(err)),
            })?;
        }
        let conn = Connection::open(path).map_err(|err| Error::Repository {
            context: format!("could not open {}", path.display()),
            source: Some(Box::new(err)),
        })?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                started_at INTEGER NOT NULL,
                body TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_started ON sessions(started_at);
            ",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Map a poisoned lock onto the repository error kind.
    fn poisoned() -> Error {
        Error::Repository {
            context: "sqlite connection lock poisoned".into(),
            source: None,
        }
    }

    /// What: Close the repository, releasing the file handle.
    ///
    /// Input: Consumes the repository.
    /// Output: `Ok(())`, or the close-time error reported by SQLite.
    pub fn close(self) -> Result<(), Error> {
        let conn = self.conn.into_inner().map_err(|_| Self::poisoned())?;
        conn.close().map_err(|(_conn, err)| Error::Repository {
            context: "could not close the session database".into(),
            source: Some(Box::new(err)),
        })
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn save(
        &self,
        ctx: &CancellationToken,
        session: &InstallationSession,
    ) -> Result<(), Error> {
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let dto = SessionDto::from_session(session);
        let body = serde_json::to_string(&dto)?;
        let conn = self.conn.lock().map_err(|_| Self::poisoned())?;
        conn.execute(
            "INSERT OR REPLACE INTO sessions (id, started_at, body) VALUES (?1, ?2, ?3)",
            params![session.id(), session.started_at().timestamp(), body],
        )?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        ctx: &CancellationToken,
        id: &str,
    ) -> Result<InstallationSession, Error> {
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let body: Option<String> = {
            let conn = self.conn.lock().map_err(|_| Self::poisoned())?;
            conn.query_row(
                "SELECT body FROM sessions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?
        };
        let Some(body) = body else {
            return Err(Error::SessionNotFound(id.to_string()));
        };
        let dto: SessionDto = serde_json::from_str(&body)?;
        dto.into_session()
    }

    async fn list(&self, ctx: &CancellationToken) -> Result<Vec<InstallationSession>, Error> {
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let bodies: Vec<String> = {
            let conn = self.conn.lock().map_err(|_| Self::poisoned())?;
            let mut stmt =
                conn.prepare("SELECT body FROM sessions ORDER BY started_at DESC")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<_, _>>()?
        };
        let mut sessions = Vec::with_capacity(bodies.len());
        for body in bodies {
            let dto: SessionDto = serde_json::from_str(&body)?;
            sessions.push(dto.into_session()?);
        }
        Ok(sessions)
    }
}
