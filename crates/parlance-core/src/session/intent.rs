//! Intents accepted by the conversation state machine.

use serde::{Deserialize, Serialize};

/// An action requested by the presentation layer.
///
/// Intents are validated against the current state before any side effect
/// runs; an intent that fails validation is ignored (logged, never fatal).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ConversationIntent {
    /// Load a session and its message history.
    LoadSession { session_id: String },
    /// Explicitly create a backend session (eager path, "new chat").
    NewSession { title: Option<String> },
    /// Send a text message. Appends optimistically before the backend
    /// confirms.
    SendMessage { text: String },
    StartRecording,
    /// Finalize the capture and auto-send the result as a voice message.
    StopRecording,
    /// Abandon the capture without sending. Also issued on app backgrounding
    /// so the microphone is released on every exit path.
    CancelRecording,
    /// Play a voice message's recorded audio.
    PlayVoice { message_id: String },
    /// Read a message aloud via text-to-speech.
    SpeakMessage { message_id: String },
    StopPlayback,
    /// Filter the current session's messages.
    SearchMessages { query: String },
    ClearSearch,
    ToggleFavorite { message_id: String },
    SaveAsFaq { message_id: String },
    /// Export the session history; completion arrives as a one-shot signal.
    ExportHistory,
    /// Flush queued failed sends in FIFO order, stopping on the first entry
    /// that still fails.
    ProcessOfflineQueue,
    /// Clear in-memory messages and request a backend clear.
    ClearChat,
    /// Re-enter `Loading` after a failed load or switch.
    Retry,
}
