//! One-shot signals emitted alongside conversation state.

use serde::{Deserialize, Serialize};

/// A side signal delivered at most once per occurrence.
///
/// Signals travel on their own channel, separate from the state snapshot, so
/// a state re-render never replays them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ConversationSignal {
    /// A history export finished and the file is ready at `path`.
    ExportSuccess { path: String },
    /// An offline-queue pass finished; `count` entries were sent.
    OfflineQueueProcessed { count: usize },
}
