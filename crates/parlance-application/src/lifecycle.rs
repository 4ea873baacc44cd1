//! Session lifecycle management.
//!
//! The [`SessionLifecycleManager`] owns the "current session" pointer and the
//! lazy-creation rule: no backend session exists until the first message is
//! actually sent, except when the user explicitly asks for a new chat. It
//! also owns the offline queue of failed sends until they are flushed or
//! abandoned.

use std::collections::VecDeque;
use std::sync::Arc;

use parlance_core::error::{ParlanceError, Result};
use parlance_core::gateway::BackendGateway;
use parlance_core::session::{
    LastSessionStore, Message, MessageStatus, OfflineQueueEntry, Session, SessionRepository,
    UserContext,
};

/// Where an outgoing message should be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendTarget {
    /// A current session exists; send into it.
    Existing(String),
    /// No session yet. The gateway send itself creates one; its id arrives in
    /// the send outcome.
    CreateOnSend,
}

/// A user message delivered by an offline-queue flush, paired with the
/// assistant reply it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushedSend {
    pub user_message: Message,
    pub assistant_message: Message,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CreationState {
    Idle,
    InProgress,
}

/// Owns the current session, the lazy-creation rule, and the offline queue.
///
/// At most one session is current at a time. Switching is atomic from the
/// state machine's perspective: either the switch fully succeeds and the new
/// session becomes current, or the previous session stays current and the
/// error is reported.
pub struct SessionLifecycleManager {
    /// The current session's metadata, when one is resolved.
    current: Option<Session>,
    creation: CreationState,
    gateway: Arc<dyn BackendGateway>,
    /// Local metadata store, kept fresh best-effort.
    session_repository: Arc<dyn SessionRepository>,
    /// Best-effort "last active session" pointer.
    last_session_store: Arc<dyn LastSessionStore>,
    /// Failed sends awaiting redelivery, in original send order.
    offline_queue: VecDeque<OfflineQueueEntry>,
}

impl SessionLifecycleManager {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        session_repository: Arc<dyn SessionRepository>,
        last_session_store: Arc<dyn LastSessionStore>,
    ) -> Self {
        Self {
            current: None,
            creation: CreationState::Idle,
            gateway,
            session_repository,
            last_session_store,
            offline_queue: VecDeque::new(),
        }
    }

    /// The current session's metadata, if any.
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// The current session id, if any.
    pub fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.id.as_str())
    }

    /// True while a lazy-create send is in flight.
    pub fn creation_in_progress(&self) -> bool {
        self.creation == CreationState::InProgress
    }

    /// Resolves the delivery target for an outgoing message.
    ///
    /// Never pre-creates a session. When no session exists, the first caller
    /// wins the creation slot and gets [`SendTarget::CreateOnSend`]; until
    /// that send resolves, further calls fail with a `Validation` error so a
    /// burst of sends cannot create more than one backend session.
    pub fn resolve_for_send(&mut self) -> Result<SendTarget> {
        if let Some(session) = &self.current {
            return Ok(SendTarget::Existing(session.id.clone()));
        }
        match self.creation {
            CreationState::InProgress => Err(ParlanceError::validation(
                "session creation already in progress",
            )),
            CreationState::Idle => {
                self.creation = CreationState::InProgress;
                Ok(SendTarget::CreateOnSend)
            }
        }
    }

    /// Completes the lazy path: the gateway send succeeded and reported the
    /// freshly created session.
    pub async fn adopt_created(&mut self, session: Session) {
        self.creation = CreationState::Idle;
        self.activate(session).await;
    }

    /// Rolls the lazy path back after the creating send failed, freeing the
    /// creation slot for the next attempt.
    pub fn abort_creation(&mut self) {
        self.creation = CreationState::Idle;
    }

    /// Makes `session` current, persisting the last-session pointer and the
    /// local metadata copy best-effort.
    pub async fn activate(&mut self, session: Session) {
        if let Err(e) = self.session_repository.save(&session).await {
            tracing::warn!(target: "session", "Failed to save session metadata: {}", e);
        }
        self.persist_last_session(&session.id).await;
        self.current = Some(session);
    }

    /// Fetches session metadata for a switch, without changing anything.
    pub async fn fetch_session(&self, session_id: &str) -> Result<Session> {
        self.gateway.switch_session(session_id).await
    }

    /// Switches to another session.
    ///
    /// The previous session stays current unless the fetch succeeds.
    ///
    /// # Errors
    ///
    /// `NotFound` when the backend reports no such id.
    pub async fn switch_to(&mut self, session_id: &str) -> Result<Session> {
        let session = self.fetch_session(session_id).await?;
        self.activate(session.clone()).await;
        Ok(session)
    }

    /// Eagerly creates a backend session (explicit "new chat") and makes it
    /// current. Failure is reported, not retried automatically.
    pub async fn create_explicitly(&mut self, title: Option<&str>) -> Result<Session> {
        let session = self.gateway.create_session(title).await?;
        self.creation = CreationState::Idle;
        self.activate(session.clone()).await;
        Ok(session)
    }

    /// Lists sessions from the backend, most recently active first.
    pub async fn list_sessions(&self, limit: usize) -> Result<Vec<Session>> {
        self.gateway.list_sessions(limit).await
    }

    /// Persists the last-session pointer. Best-effort: failures are logged
    /// and swallowed.
    pub async fn persist_last_session(&self, session_id: &str) {
        if let Err(e) = self
            .last_session_store
            .set_last_session(session_id.to_string())
            .await
        {
            tracing::warn!(target: "session", "Failed to persist last session id: {}", e);
        }
    }

    /// Loads the last-session pointer, if one was stored.
    pub async fn load_last_session(&self) -> Option<String> {
        self.last_session_store.get_last_session().await
    }

    /// Records message activity on the current session and saves the
    /// metadata best-effort.
    pub async fn note_activity(&mut self, appended: u64) {
        if let Some(session) = &mut self.current {
            session.note_activity(appended);
            if let Err(e) = self.session_repository.save(session).await {
                tracing::warn!(target: "session", "Failed to save session metadata: {}", e);
            }
        }
    }

    /// Queues a message whose send failed with a retryable error.
    pub fn enqueue_offline(&mut self, message: Message, error: &ParlanceError) {
        tracing::debug!(
            target: "offline_queue",
            "Queueing message {} after send failure: {}",
            message.id,
            error
        );
        self.offline_queue
            .push_back(OfflineQueueEntry::new(message, error.to_string()));
    }

    /// Number of messages awaiting redelivery.
    pub fn offline_len(&self) -> usize {
        self.offline_queue.len()
    }

    /// The queued entries, in send order.
    pub fn offline_entries(&self) -> impl Iterator<Item = &OfflineQueueEntry> {
        self.offline_queue.iter()
    }

    /// Flushes the offline queue: FIFO, one entry at a time, stopping on the
    /// first entry that still fails so backend-visible order is preserved.
    ///
    /// Returns the delivered sends in order. The failed head, if any, stays
    /// queued with its attempt count bumped.
    pub async fn flush_offline_queue(&mut self, context: &UserContext) -> Vec<FlushedSend> {
        // A lazy-create send may be in flight; flushing now would race it for
        // the session id.
        if self.creation_in_progress() {
            tracing::debug!(
                target: "offline_queue",
                "Skipping flush: session creation in progress"
            );
            return Vec::new();
        }

        let mut delivered = Vec::new();

        while let Some(entry) = self.offline_queue.front() {
            let text = entry.message.text.clone();
            let target = self.current_id().map(str::to_string);
            match self.gateway.send(target.as_deref(), &text, context).await {
                Ok(outcome) => {
                    let mut entry = match self.offline_queue.pop_front() {
                        Some(entry) => entry,
                        None => break,
                    };
                    if self.current.is_none() {
                        self.adopt_created(Session::new(outcome.session_id.clone(), None))
                            .await;
                    }
                    // The client id is kept even when the backend confirms its
                    // own: the optimistic entry still in the view is matched
                    // by it during reconciliation.
                    entry.message.status = MessageStatus::Sent;
                    self.note_activity(2).await;
                    delivered.push(FlushedSend {
                        user_message: entry.message,
                        assistant_message: outcome.assistant_message,
                    });
                }
                Err(e) => {
                    tracing::debug!(
                        target: "offline_queue",
                        "Flush stopped at head entry: {}",
                        e
                    );
                    if let Some(entry) = self.offline_queue.front_mut() {
                        entry.note_failure(e.to_string());
                    }
                    break;
                }
            }
        }

        delivered
    }
}

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod tests;
