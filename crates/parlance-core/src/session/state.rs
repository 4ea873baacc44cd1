//! Conversation state variants rendered by the presentation layer.

use serde::{Deserialize, Serialize};

use super::message::Message;

/// The authoritative UI-facing state of one conversation.
///
/// Exactly one variant is active at a time. Consumers are expected to match
/// exhaustively; this enum deliberately replaces scattered boolean "is-a"
/// checks with a closed sum type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ConversationState {
    /// Initial state; no session resolved yet.
    Uninitialized,
    /// A session or message-history fetch is in flight.
    Loading {
        /// Target session, when the load was triggered by a switch.
        session_id: Option<String>,
    },
    /// Steady state rendered for normal chat.
    Ready(ReadyView),
    /// Voice capture in progress; mutually exclusive with text input.
    Recording(RecordingView),
    /// Terminal for the triggering operation only; a retry intent re-enters
    /// `Loading`.
    Failed { message: String, retryable: bool },
}

/// Payload of [`ConversationState::Ready`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyView {
    /// Messages in append order.
    pub messages: Vec<Message>,
    /// True while at least one send awaits its assistant reply.
    pub is_typing: bool,
    pub is_recording: bool,
    pub is_playing_voice: bool,
    pub is_playing_tts: bool,
    /// Personalized quick suggestions for the current session, in order.
    pub quick_suggestions: Vec<String>,
    /// Populated while a message search is active.
    pub search_results: Option<Vec<Message>>,
    /// Language used for text-to-speech playback.
    pub language: String,
}

impl ReadyView {
    /// An empty view for a fresh conversation.
    pub fn empty(language: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            is_typing: false,
            is_recording: false,
            is_playing_voice: false,
            is_playing_tts: false,
            quick_suggestions: Vec::new(),
            search_results: None,
            language: language.into(),
        }
    }
}

/// Payload of [`ConversationState::Recording`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingView {
    /// Elapsed capture time in milliseconds.
    pub elapsed_ms: u64,
    /// Amplitude samples for the waveform display, in arrival order.
    pub waveform: Vec<f32>,
}

impl RecordingView {
    pub fn started() -> Self {
        Self {
            elapsed_ms: 0,
            waveform: Vec::new(),
        }
    }
}

impl ConversationState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording(_))
    }

    /// The ready view, when in the `Ready` state.
    pub fn as_ready(&self) -> Option<&ReadyView> {
        match self {
            Self::Ready(view) => Some(view),
            _ => None,
        }
    }
}
