//! Events processed by the conversation controller.

use parlance_core::error::ParlanceError;
use parlance_core::gateway::SendOutcome;
use parlance_core::session::{ConversationIntent, Message, PersonalizedSuggestions, Session};

/// Which playback surface finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackKind {
    Voice,
    Tts,
}

/// Everything the controller reacts to.
///
/// Intents arrive from the presentation layer; the completion variants are
/// fed back by the controller's own spawned tasks, so every mutation flows
/// through the same single-writer loop.
#[derive(Debug)]
pub enum ConversationEvent {
    Intent(ConversationIntent),
    /// A session load or switch finished. Stale generations are discarded.
    SessionLoaded {
        generation: u64,
        result: Result<(Session, Vec<Message>), ParlanceError>,
    },
    /// A gateway send resolved for the optimistic message with this id.
    SendCompleted {
        message_id: String,
        outcome: Result<SendOutcome, ParlanceError>,
    },
    /// Personalized suggestions arrived for the given load generation.
    SuggestionsLoaded {
        generation: u64,
        result: Result<PersonalizedSuggestions, ParlanceError>,
    },
    /// Capture progress from the audio layer.
    RecordingProgress { elapsed_ms: u64, level: f32 },
    /// Playback ended on its own.
    PlaybackFinished { kind: PlaybackKind },
}
