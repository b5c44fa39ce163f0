//! Session persistence: the repository contract plus the in-memory and
//! durable (single-file SQLite) implementations and their DTO mapping.

pub mod dto;
pub mod durable;
pub mod memory;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::error::Error;
use crate::domain::session::InstallationSession;

pub use durable::SqliteSessionRepository;
pub use memory::InMemorySessionRepository;

/// What: Persistence operations for installation sessions.
///
/// Inputs: Sessions are saved whole after every mutation; lookups go by
/// session id.
///
/// Output: Aggregates rebuilt field-for-field from storage; `list` orders by
/// start time, newest first.
///
/// Details:
/// - `find_by_id` reports an unknown id as [`Error::SessionNotFound`].
/// - Implementations must be safe under concurrent readers and writers;
///   concurrent mutation of the same session id is caller error.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist the session's current state.
    async fn save(
        &self,
        ctx: &CancellationToken,
        session: &InstallationSession,
    ) -> Result<(), Error>;

    /// Load one session by id.
    async fn find_by_id(
        &self,
        ctx: &CancellationToken,
        id: &str,
    ) -> Result<InstallationSession, Error>;

    /// Load every session, newest started first.
    async fn list(&self, ctx: &CancellationToken) -> Result<Vec<InstallationSession>, Error>;
}
