//! Application layer for Parlance.
//!
//! This crate coordinates the domain traits from `parlance-core` into the
//! conversation session controller proper: the [`SessionLifecycleManager`]
//! owns the current session and the lazy-creation rule, and the
//! [`ConversationController`] is the single-writer state machine the
//! presentation layer drives with intents and renders from state snapshots.

pub mod conversation;
pub mod lifecycle;

#[cfg(test)]
pub(crate) mod testutil;

pub use conversation::{ConversationController, ConversationEvent, PlaybackKind};
pub use lifecycle::{FlushedSend, SendTarget, SessionLifecycleManager};
