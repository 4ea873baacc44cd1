//! Domain layer for Parlance, the conversation session controller.
//!
//! This crate is I/O free. It defines the session and message models, the
//! conversation state machine's vocabulary (states, intents, one-shot
//! signals), the shared error type, and the traits behind which the
//! collaborators live: session and message persistence, the backend RPC
//! gateway, and the audio/TTS engine.
//!
//! The application layer (`parlance-application`) drives these pieces; the
//! infrastructure layer (`parlance-infrastructure`) implements the traits.

pub mod audio;
pub mod error;
pub mod gateway;
pub mod message_repository;
pub mod session;

// Re-export common error type
pub use error::{ParlanceError, Result};
