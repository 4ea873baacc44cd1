//! The conversation state machine.
//!
//! # Module Structure
//!
//! - `controller`: the single-writer [`ConversationController`]
//! - `event`: the event type funnelling intents and async completions
//!   through one mutation point

mod controller;
mod event;

pub use controller::ConversationController;
pub use event::{ConversationEvent, PlaybackKind};
