//! Shared mock collaborators for controller and lifecycle tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use parlance_core::audio::{AudioPort, RecordedAudio};
use parlance_core::error::ParlanceError;
use parlance_core::gateway::{BackendGateway, SendOutcome};
use parlance_core::message_repository::MessageRepository;
use parlance_core::session::{
    LastSessionStore, Message, PersonalizedSuggestions, Session, SessionRepository, UserContext,
};

/// One scripted reply for `MockGateway::send`, applied in FIFO order.
pub struct ScriptedSend {
    pub delay_ms: u64,
    pub result: parlance_core::Result<SendOutcome>,
}

impl ScriptedSend {
    pub fn ok(delay_ms: u64, outcome: SendOutcome) -> Self {
        Self {
            delay_ms,
            result: Ok(outcome),
        }
    }

    pub fn err(delay_ms: u64, error: ParlanceError) -> Self {
        Self {
            delay_ms,
            result: Err(error),
        }
    }
}

pub fn outcome(session_id: &str, reply: &str) -> SendOutcome {
    SendOutcome {
        session_id: session_id.to_string(),
        confirmed_message_id: None,
        assistant_message: Message::assistant(reply),
    }
}

#[derive(Default)]
pub struct MockGateway {
    pub send_script: Mutex<VecDeque<ScriptedSend>>,
    /// Session id passed to each send call, in call order.
    pub send_calls: Mutex<Vec<Option<String>>>,
    /// Text passed to each send call, in call order.
    pub sent_texts: Mutex<Vec<String>>,
    /// Sessions known to `switch_session`.
    pub sessions: Mutex<HashMap<String, Session>>,
    /// Per-session artificial switch latency.
    pub switch_delays: Mutex<HashMap<String, u64>>,
    pub created: Mutex<Vec<Session>>,
    pub create_calls: Mutex<usize>,
    pub create_error: Mutex<Option<ParlanceError>>,
    pub suggestions: Mutex<HashMap<String, Vec<String>>>,
    pub cleared: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_send(&self, scripted: ScriptedSend) {
        self.send_script.lock().unwrap().push_back(scripted);
    }

    pub fn insert_session(&self, session: Session) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
    }
}

#[async_trait]
impl BackendGateway for MockGateway {
    async fn send(
        &self,
        session_id: Option<&str>,
        text: &str,
        _context: &UserContext,
    ) -> parlance_core::Result<SendOutcome> {
        self.send_calls
            .lock()
            .unwrap()
            .push(session_id.map(str::to_string));
        self.sent_texts.lock().unwrap().push(text.to_string());
        let scripted = self.send_script.lock().unwrap().pop_front();
        match scripted {
            Some(scripted) => {
                if scripted.delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(scripted.delay_ms)).await;
                }
                scripted.result
            }
            None => Ok(outcome(
                session_id.unwrap_or("session-auto"),
                &format!("re: {text}"),
            )),
        }
    }

    async fn create_session(&self, title: Option<&str>) -> parlance_core::Result<Session> {
        *self.create_calls.lock().unwrap() += 1;
        if let Some(error) = self.create_error.lock().unwrap().take() {
            return Err(error);
        }
        let session = Session::new(
            uuid::Uuid::new_v4().to_string(),
            title.map(str::to_string),
        );
        self.created.lock().unwrap().push(session.clone());
        self.insert_session(session.clone());
        Ok(session)
    }

    async fn switch_session(&self, session_id: &str) -> parlance_core::Result<Session> {
        let delay = self
            .switch_delays
            .lock()
            .unwrap()
            .get(session_id)
            .copied()
            .unwrap_or(0);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| ParlanceError::not_found("Session", session_id))
    }

    async fn list_sessions(&self, limit: usize) -> parlance_core::Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self.sessions.lock().unwrap().values().cloned().collect();
        sessions.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        sessions.truncate(limit);
        Ok(sessions)
    }

    async fn get_suggestions(
        &self,
        session_id: &str,
    ) -> parlance_core::Result<PersonalizedSuggestions> {
        let suggestions = self
            .suggestions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_default();
        Ok(PersonalizedSuggestions { suggestions })
    }

    async fn export_history(&self, session_id: &str) -> parlance_core::Result<String> {
        Ok(format!("/tmp/{session_id}-export.json"))
    }

    async fn clear_history(&self, session_id: &str) -> parlance_core::Result<()> {
        self.cleared.lock().unwrap().push(session_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct MockSessionRepository {
    pub sessions: Mutex<HashMap<String, Session>>,
}

impl MockSessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for MockSessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.lock().unwrap().get(session_id).cloned())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.sessions.lock().unwrap().remove(session_id);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self.sessions.lock().unwrap().values().cloned().collect();
        sessions.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        Ok(sessions)
    }
}

#[derive(Default)]
pub struct MockLastSessionStore {
    pub last: Mutex<Option<String>>,
    /// When true, setters fail; reads still work.
    pub fail_writes: Mutex<bool>,
}

impl MockLastSessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LastSessionStore for MockLastSessionStore {
    async fn get_last_session(&self) -> Option<String> {
        self.last.lock().unwrap().clone()
    }

    async fn set_last_session(&self, session_id: String) -> Result<()> {
        if *self.fail_writes.lock().unwrap() {
            anyhow::bail!("state file unavailable");
        }
        *self.last.lock().unwrap() = Some(session_id);
        Ok(())
    }

    async fn clear_last_session(&self) -> Result<()> {
        *self.last.lock().unwrap() = None;
        Ok(())
    }
}

#[derive(Default)]
pub struct MockMessageRepository {
    pub messages: Mutex<HashMap<String, Vec<Message>>>,
    pub updates: Mutex<Vec<Message>>,
}

impl MockMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, session_id: &str, messages: Vec<Message>) {
        self.messages
            .lock()
            .unwrap()
            .insert(session_id.to_string(), messages);
    }
}

#[async_trait]
impl MessageRepository for MockMessageRepository {
    async fn fetch_page(
        &self,
        session_id: &str,
        limit: usize,
        before: Option<&str>,
    ) -> Result<Vec<Message>> {
        let mut messages: Vec<Message> = self
            .messages
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_default();
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        if let Some(before) = before {
            messages.retain(|m| m.timestamp.as_str() < before);
        }
        Ok(messages.into_iter().rev().take(limit).collect())
    }

    async fn append(&self, session_id: &str, message: &Message) -> Result<Message> {
        self.messages
            .lock()
            .unwrap()
            .entry(session_id.to_string())
            .or_default()
            .push(message.clone());
        Ok(message.clone())
    }

    async fn update(&self, session_id: &str, message: &Message) -> Result<()> {
        let mut map = self.messages.lock().unwrap();
        if let Some(messages) = map.get_mut(session_id) {
            if let Some(stored) = messages.iter_mut().find(|m| m.id == message.id) {
                *stored = message.clone();
            }
        }
        self.updates.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MockAudio {
    pub calls: Mutex<Vec<String>>,
    pub recording: Mutex<bool>,
}

impl MockAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioPort for MockAudio {
    async fn start_recording(&self) -> parlance_core::Result<()> {
        *self.recording.lock().unwrap() = true;
        self.calls.lock().unwrap().push("start".to_string());
        Ok(())
    }

    async fn stop_recording(&self) -> parlance_core::Result<RecordedAudio> {
        *self.recording.lock().unwrap() = false;
        self.calls.lock().unwrap().push("stop".to_string());
        Ok(RecordedAudio {
            path: "/tmp/voice-0.m4a".to_string(),
            duration_ms: 1200,
        })
    }

    async fn cancel_recording(&self) {
        *self.recording.lock().unwrap() = false;
        self.calls.lock().unwrap().push("cancel".to_string());
    }

    async fn play(&self, path: &str) -> parlance_core::Result<()> {
        self.calls.lock().unwrap().push(format!("play:{path}"));
        Ok(())
    }

    async fn play_text(&self, text: &str, language: &str) -> parlance_core::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("tts:{language}:{text}"));
        Ok(())
    }

    async fn stop_playback(&self) {
        self.calls.lock().unwrap().push("stop_playback".to_string());
    }
}
