//! Chat message types.

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageSender {
    /// Message from the user.
    User,
    /// Message from the assistant.
    Assistant,
}

/// Delivery status of a message.
///
/// Optimistic local entries start as `Pending` and are reconciled to `Sent`
/// or `Failed` once the backend responds. A `Failed` message stays in the
/// list with its status visible; it is never silently removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageStatus {
    Pending,
    Sent,
    Failed,
}

/// A single message in a conversation.
///
/// `id` is client-generated for optimistic entries and replaced by the
/// backend-issued id once the send is confirmed. Messages within a session
/// are ordered by `timestamp` (RFC 3339 UTC), with insertion order preserved
/// for equal timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: MessageSender,
    pub timestamp: String,
    pub status: MessageStatus,
    /// Local path of the recorded audio, for voice messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<String>,
    /// Follow-up suggestions attached to an assistant reply, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub saved_as_faq: bool,
}

impl Message {
    /// Creates an optimistic user message with a client-generated id.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            sender: MessageSender::User,
            timestamp: chrono::Utc::now().to_rfc3339(),
            status: MessageStatus::Pending,
            audio_path: None,
            suggestions: Vec::new(),
            is_favorite: false,
            saved_as_faq: false,
        }
    }

    /// Creates a confirmed assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            sender: MessageSender::Assistant,
            timestamp: chrono::Utc::now().to_rfc3339(),
            status: MessageStatus::Sent,
            audio_path: None,
            suggestions: Vec::new(),
            is_favorite: false,
            saved_as_faq: false,
        }
    }

    /// Attaches a recorded audio path.
    pub fn with_audio_path(mut self, path: impl Into<String>) -> Self {
        self.audio_path = Some(path.into());
        self
    }

    /// Attaches ordered follow-up suggestions.
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }
}
