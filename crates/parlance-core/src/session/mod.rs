//! Session domain module.
//!
//! Contains the session and message models, conversation state machine
//! vocabulary, the offline queue entry, and the persistence traits.
//!
//! # Module Structure
//!
//! - `model`: Core session metadata model (`Session`)
//! - `message`: Chat message types (`Message`, `MessageSender`, `MessageStatus`)
//! - `state`: Conversation state variants rendered by the presentation layer
//! - `intent`: Intents accepted by the state machine
//! - `signal`: One-shot side signals emitted alongside state
//! - `queue`: Offline queue entry for failed sends
//! - `context`: Per-session user context and personalized suggestions
//! - `repository`: Persistence traits for sessions and the last-session pointer

mod context;
mod intent;
mod message;
mod model;
mod queue;
mod repository;
mod signal;
mod state;

// Re-export public API
pub use context::{PersonalizedSuggestions, UserContext};
pub use intent::ConversationIntent;
pub use message::{Message, MessageSender, MessageStatus};
pub use model::Session;
pub use queue::OfflineQueueEntry;
pub use repository::{LastSessionStore, SessionRepository};
pub use signal::ConversationSignal;
pub use state::{ConversationState, ReadyView, RecordingView};
