//! In-memory session repository.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::error::Error;
use crate::domain::session::InstallationSession;
use crate::repo::SessionRepository;

/// Repository holding live aggregates in a shared map.
///
/// Suitable for tests and single-process embedding; sessions do not survive
/// a restart.
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    /// Sessions keyed by id.
    sessions: RwLock<HashMap<String, InstallationSession>>,
}

impl InMemorySessionRepository {
    /// Empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a poisoned lock onto the repository error kind.
    fn poisoned() -> Error {
        Error::Repository {
            context: "session map lock poisoned".into(),
            source: None,
        }
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn save(
        &self,
        ctx: &CancellationToken,
        session: &InstallationSession,
    ) -> Result<(), Error> {
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let mut sessions = self.sessions.write().map_err(|_| Self::poisoned())?;
        sessions.insert(session.id().to_string(), session.clone());
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
        let sessions = self.sessions.read().map_err(|_| Self::poisoned())?;
        sessions
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    async fn list(&self, ctx: &CancellationToken) -> Result<Vec<InstallationSession>, Error> {
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let sessions = self.sessions.read().map_err(|_| Self::poisoned())?;
        let mut all: Vec<InstallationSession> = sessions.values().cloned().collect();
        all.sort_by(|a, b| b.started_at().cmp(&a.started_at()));
        Ok(all)
    }
}
