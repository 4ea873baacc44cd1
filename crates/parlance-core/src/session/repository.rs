//! Persistence traits for sessions and the last-session pointer.

use anyhow::Result;
use async_trait::async_trait;

use super::model::Session;

/// An abstract repository for session metadata persistence.
///
/// Decouples the core logic from the storage mechanism (TOML files, a
/// database, a remote API). Missing sessions are reported as `Ok(None)`, not
/// as errors.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Finds a session by its id.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Session))`: session found
    /// - `Ok(None)`: session not found
    /// - `Err(_)`: storage failure
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>>;

    /// Saves session metadata, overwriting any previous record.
    async fn save(&self, session: &Session) -> Result<()>;

    /// Deletes a session. Deleting a missing session is not an error.
    async fn delete(&self, session_id: &str) -> Result<()>;

    /// Lists all stored sessions, most recently active first.
    async fn list_all(&self) -> Result<Vec<Session>>;
}

/// Best-effort storage for the "last active session" convenience pointer.
///
/// Remembering the last session is a convenience, not a correctness
/// requirement: `get_last_session` is infallible by contract (implementations
/// swallow and log read failures), and callers of the setters log failures
/// without surfacing them.
#[async_trait]
pub trait LastSessionStore: Send + Sync {
    async fn get_last_session(&self) -> Option<String>;

    async fn set_last_session(&self, session_id: String) -> Result<()>;

    async fn clear_last_session(&self) -> Result<()>;
}
