//! Message repository trait.

use anyhow::Result;
use async_trait::async_trait;

use crate::session::Message;

/// Paginated, write-through storage for a session's messages.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Fetches a page of messages, most recent first.
    ///
    /// `before` is an exclusive RFC 3339 cursor: only messages strictly older
    /// than it are returned. The fetch is idempotent for the same cursor.
    ///
    /// # Arguments
    ///
    /// * `session_id` - The session whose messages to fetch
    /// * `limit` - Maximum number of messages to return
    /// * `before` - Optional exclusive upper timestamp bound
    async fn fetch_page(
        &self,
        session_id: &str,
        limit: usize,
        before: Option<&str>,
    ) -> Result<Vec<Message>>;

    /// Appends a message, returning the stored record.
    ///
    /// The returned message may carry a corrected id or timestamp when the
    /// store reconciles it against a backend-issued record.
    async fn append(&self, session_id: &str, message: &Message) -> Result<Message>;

    /// Updates an existing message in place, matched by id.
    ///
    /// Used for flag mutations (favorite, FAQ) and status reconciliation.
    async fn update(&self, session_id: &str, message: &Message) -> Result<()>;
}
