//! Session domain model.

use serde::{Deserialize, Serialize};

/// Metadata for one chat session.
///
/// A session with a real `id` exists in the backend only after at least one
/// message has been sent through it, unless it was created explicitly via the
/// "new chat" action. The lazy-creation rule itself lives in the lifecycle
/// manager; this model only carries the confirmed metadata.
///
/// Timestamps are RFC 3339 UTC strings, which order lexicographically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier, issued by the backend.
    pub id: String,
    /// Human-readable session title.
    pub title: String,
    /// Timestamp when the session was created.
    pub created_at: String,
    /// Timestamp of the most recent activity in the session.
    pub last_activity_at: String,
    /// Number of messages sent through this session.
    #[serde(default)]
    pub message_count: u64,
}

impl Session {
    /// Creates session metadata for a freshly issued id.
    ///
    /// When no title is given, one is derived from the id prefix.
    pub fn new(id: impl Into<String>, title: Option<String>) -> Self {
        let id = id.into();
        let title = title.unwrap_or_else(|| default_title(&id));
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id,
            title,
            created_at: now.clone(),
            last_activity_at: now,
            message_count: 0,
        }
    }

    /// Records message activity: bumps the counter and the activity timestamp.
    pub fn note_activity(&mut self, appended: u64) {
        self.message_count += appended;
        self.last_activity_at = chrono::Utc::now().to_rfc3339();
    }
}

fn default_title(id: &str) -> String {
    let prefix: String = id.chars().take(8).collect();
    format!("Session {}", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_title_uses_id_prefix() {
        let session = Session::new("abcdef1234567890", None);
        assert_eq!(session.title, "Session abcdef12");
    }

    #[test]
    fn default_title_tolerates_short_ids() {
        let session = Session::new("s1", None);
        assert_eq!(session.title, "Session s1");
    }

    #[test]
    fn note_activity_bumps_count_and_timestamp() {
        let mut session = Session::new("s-1", Some("Chat".into()));
        let before = session.last_activity_at.clone();
        session.note_activity(2);
        assert_eq!(session.message_count, 2);
        assert!(session.last_activity_at >= before);
    }
}
