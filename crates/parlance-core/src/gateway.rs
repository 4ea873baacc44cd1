//! Backend gateway trait.
//!
//! Single RPC-style boundary to the chat backend. Request and response
//! shapes are opaque to this core beyond the fields modeled here. Every
//! operation is fallible with a distinguishable failure kind; the state
//! machine treats [`Network`](crate::error::ParlanceError::Network) failures
//! as retryable/queueable and the rest as terminal for that action.

use async_trait::async_trait;

use crate::error::Result;
use crate::session::{Message, PersonalizedSuggestions, Session, UserContext};

/// Result of a successful message send.
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    /// The session the message landed in. For a lazy send (no current
    /// session) this is the id of the session the backend just created.
    pub session_id: String,
    /// Backend-issued id for the user message, replacing the optimistic
    /// client id when present.
    pub confirmed_message_id: Option<String>,
    /// The assistant's reply, including any follow-up suggestions.
    pub assistant_message: Message,
}

/// The backend RPC boundary.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Sends a message.
    ///
    /// With `session_id = None` the backend creates a session as part of the
    /// send; the new id comes back in the outcome. The gateway never
    /// pre-creates sessions.
    async fn send(
        &self,
        session_id: Option<&str>,
        text: &str,
        context: &UserContext,
    ) -> Result<SendOutcome>;

    /// Eagerly creates a session (explicit "new chat").
    async fn create_session(&self, title: Option<&str>) -> Result<Session>;

    /// Fetches session metadata for a switch.
    ///
    /// # Errors
    ///
    /// `NotFound` when the backend reports no such session.
    async fn switch_session(&self, session_id: &str) -> Result<Session>;

    /// Lists sessions, most recently active first.
    async fn list_sessions(&self, limit: usize) -> Result<Vec<Session>>;

    /// Fetches personalized quick suggestions for a session.
    async fn get_suggestions(&self, session_id: &str) -> Result<PersonalizedSuggestions>;

    /// Exports the session history to a file, returning its path.
    async fn export_history(&self, session_id: &str) -> Result<String>;

    /// Requests a backend-side history clear.
    ///
    /// Whether history is actually deleted is a backend policy decision;
    /// local state is cleared regardless.
    async fn clear_history(&self, session_id: &str) -> Result<()>;
}
