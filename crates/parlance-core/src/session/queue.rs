//! Offline queue entry for failed sends.

use serde::{Deserialize, Serialize};

use super::message::Message;

/// A message awaiting redelivery, with retry metadata.
///
/// Entries are owned by the lifecycle manager until successfully flushed or
/// abandoned. Queue order is send order; flushing never skips ahead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineQueueEntry {
    pub message: Message,
    /// Delivery attempts so far, the original send included.
    pub attempts: u32,
    /// The most recent failure, if any.
    pub last_error: Option<String>,
}

impl OfflineQueueEntry {
    pub fn new(message: Message, error: impl Into<String>) -> Self {
        Self {
            message,
            attempts: 1,
            last_error: Some(error.into()),
        }
    }

    /// Records another failed delivery attempt.
    pub fn note_failure(&mut self, error: impl Into<String>) {
        self.attempts += 1;
        self.last_error = Some(error.into());
    }
}
