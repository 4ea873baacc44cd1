//! Per-session user context and personalized suggestions.

use serde::{Deserialize, Serialize};

/// Read-mostly user data passed along with each send.
///
/// Owned by the state machine for the lifetime of the current session and
/// discarded on session switch. The profile payload is opaque to this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    /// BCP 47 language tag, also used for text-to-speech.
    pub language: String,
    /// Opaque profile data forwarded to the backend.
    #[serde(default)]
    pub profile: serde_json::Value,
}

impl Default for UserContext {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            profile: serde_json::Value::Null,
        }
    }
}

/// Ordered quick suggestions fetched per session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersonalizedSuggestions {
    pub suggestions: Vec<String>,
}
