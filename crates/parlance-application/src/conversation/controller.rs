//! The conversation controller.
//!
//! A single logical state machine per open conversation. All intents and
//! async completions are serialized through one mutation point,
//! [`ConversationController::handle_event`]; in-flight gateway calls run as
//! spawned tasks whose results are funnelled back as events. State snapshots
//! are published on a watch channel after every mutation, one-shot signals on
//! their own mpsc channel so re-renders never replay them.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use parlance_core::audio::AudioPort;
use parlance_core::error::ParlanceError;
use parlance_core::gateway::{BackendGateway, SendOutcome};
use parlance_core::message_repository::MessageRepository;
use parlance_core::session::{
    ConversationIntent, ConversationSignal, ConversationState, Message, MessageStatus,
    PersonalizedSuggestions, ReadyView, RecordingView, Session, UserContext,
};

use super::event::{ConversationEvent, PlaybackKind};
use crate::lifecycle::{SendTarget, SessionLifecycleManager};

/// Text marker carried by auto-sent voice messages.
const VOICE_MESSAGE_TEXT: &str = "[voice message]";

/// Messages fetched per history page.
const DEFAULT_PAGE_SIZE: usize = 50;

/// Which variant is active, minus the ready payload.
///
/// The ready view survives mode changes (a send completing mid-recording
/// still lands in the message list), so it lives beside the phase rather
/// than inside it.
#[derive(Debug, Clone)]
enum Phase {
    Uninitialized,
    Loading { target: Option<String> },
    Ready,
    Recording(RecordingView),
    Failed { message: String, retryable: bool },
}

/// The conversation state machine.
///
/// Not designed for concurrent mutation: exactly one task owns the
/// controller and drives [`run`](Self::run) (or calls
/// [`handle_event`](Self::handle_event) directly). Concurrency exists only
/// in the in-flight gateway calls, whose completions re-enter through the
/// internal event channel.
pub struct ConversationController {
    phase: Phase,
    view: ReadyView,
    lifecycle: SessionLifecycleManager,
    messages: Arc<dyn MessageRepository>,
    gateway: Arc<dyn BackendGateway>,
    audio: Arc<dyn AudioPort>,
    user_context: UserContext,

    events_tx: mpsc::UnboundedSender<ConversationEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<ConversationEvent>>,
    state_tx: watch::Sender<ConversationState>,
    // Keeps the watch channel open with no external subscribers.
    _state_rx: watch::Receiver<ConversationState>,
    signals_tx: mpsc::UnboundedSender<ConversationSignal>,
    signals_rx: Option<mpsc::UnboundedReceiver<ConversationSignal>>,

    /// Bumped on every load/switch; stale completions are discarded.
    load_generation: u64,
    /// Target of the most recent load, re-entered by the retry intent.
    last_load_target: Option<String>,
    /// Optimistic message id of the send that is lazily creating a session.
    pending_creator: Option<String>,
    in_flight_sends: usize,
    page_size: usize,
}

impl ConversationController {
    pub fn new(
        lifecycle: SessionLifecycleManager,
        messages: Arc<dyn MessageRepository>,
        gateway: Arc<dyn BackendGateway>,
        audio: Arc<dyn AudioPort>,
        user_context: UserContext,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConversationState::Uninitialized);
        let view = ReadyView::empty(user_context.language.clone());
        Self {
            phase: Phase::Uninitialized,
            view,
            lifecycle,
            messages,
            gateway,
            audio,
            user_context,
            events_tx,
            events_rx: Some(events_rx),
            state_tx,
            _state_rx: state_rx,
            signals_tx,
            signals_rx: Some(signals_rx),
            load_generation: 0,
            last_load_target: None,
            pending_creator: None,
            in_flight_sends: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Subscribes to state snapshots.
    pub fn subscribe_state(&self) -> watch::Receiver<ConversationState> {
        self.state_tx.subscribe()
    }

    /// Takes the one-shot signal receiver. Each signal is delivered at most
    /// once; there is exactly one receiver.
    pub fn take_signals(&mut self) -> Option<mpsc::UnboundedReceiver<ConversationSignal>> {
        self.signals_rx.take()
    }

    /// A sender for feeding external events (recording progress, playback
    /// completion) into the machine.
    pub fn event_sender(&self) -> mpsc::UnboundedSender<ConversationEvent> {
        self.events_tx.clone()
    }

    /// The current state snapshot.
    pub fn current_state(&self) -> ConversationState {
        match &self.phase {
            Phase::Uninitialized => ConversationState::Uninitialized,
            Phase::Loading { target } => ConversationState::Loading {
                session_id: target.clone(),
            },
            Phase::Ready => ConversationState::Ready(self.view.clone()),
            Phase::Recording(rec) => ConversationState::Recording(rec.clone()),
            Phase::Failed { message, retryable } => ConversationState::Failed {
                message: message.clone(),
                retryable: *retryable,
            },
        }
    }

    /// The lifecycle manager, for session listing and restore-on-startup.
    pub fn lifecycle(&self) -> &SessionLifecycleManager {
        &self.lifecycle
    }

    /// Drives the machine until the intent channel closes.
    ///
    /// Completion events are drained with priority so a burst of intents
    /// cannot starve reconciliation.
    pub async fn run(mut self, mut intents: mpsc::UnboundedReceiver<ConversationIntent>) {
        let Some(mut events) = self.events_rx.take() else {
            return;
        };
        loop {
            tokio::select! {
                biased;
                maybe_event = events.recv() => match maybe_event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
                maybe_intent = intents.recv() => match maybe_intent {
                    Some(intent) => self.handle_event(ConversationEvent::Intent(intent)).await,
                    None => break,
                },
            }
        }
    }

    /// The single mutation point. Every intent and completion passes through
    /// here, on one task.
    pub async fn handle_event(&mut self, event: ConversationEvent) {
        match event {
            ConversationEvent::Intent(intent) => self.handle_intent(intent).await,
            ConversationEvent::SessionLoaded { generation, result } => {
                self.on_session_loaded(generation, result).await;
            }
            ConversationEvent::SendCompleted {
                message_id,
                outcome,
            } => {
                self.on_send_completed(message_id, outcome).await;
            }
            ConversationEvent::SuggestionsLoaded { generation, result } => {
                self.on_suggestions_loaded(generation, result);
            }
            ConversationEvent::RecordingProgress { elapsed_ms, level } => {
                if let Phase::Recording(rec) = &mut self.phase {
                    rec.elapsed_ms = elapsed_ms;
                    rec.waveform.push(level);
                    self.emit();
                }
            }
            ConversationEvent::PlaybackFinished { kind } => {
                match kind {
                    PlaybackKind::Voice => self.view.is_playing_voice = false,
                    PlaybackKind::Tts => self.view.is_playing_tts = false,
                }
                self.emit();
            }
        }
    }

    async fn handle_intent(&mut self, intent: ConversationIntent) {
        match intent {
            ConversationIntent::LoadSession { session_id } => {
                self.begin_load(session_id).await;
            }
            ConversationIntent::NewSession { title } => self.create_session(title).await,
            ConversationIntent::SendMessage { text } => self.send_message(text),
            ConversationIntent::StartRecording => self.start_recording().await,
            ConversationIntent::StopRecording => self.stop_recording().await,
            ConversationIntent::CancelRecording => self.cancel_recording().await,
            ConversationIntent::PlayVoice { message_id } => self.play_voice(&message_id).await,
            ConversationIntent::SpeakMessage { message_id } => {
                self.speak_message(&message_id).await;
            }
            ConversationIntent::StopPlayback => {
                self.audio.stop_playback().await;
                self.view.is_playing_voice = false;
                self.view.is_playing_tts = false;
                self.emit();
            }
            ConversationIntent::SearchMessages { query } => self.search_messages(&query),
            ConversationIntent::ClearSearch => {
                if self.view.search_results.take().is_some() {
                    self.emit();
                }
            }
            ConversationIntent::ToggleFavorite { message_id } => {
                self.mutate_flag(&message_id, |m| m.is_favorite = !m.is_favorite)
                    .await;
            }
            ConversationIntent::SaveAsFaq { message_id } => {
                self.mutate_flag(&message_id, |m| m.saved_as_faq = true).await;
            }
            ConversationIntent::ExportHistory => self.export_history(),
            ConversationIntent::ProcessOfflineQueue => self.process_offline_queue().await,
            ConversationIntent::ClearChat => self.clear_chat(),
            ConversationIntent::Retry => {
                if matches!(self.phase, Phase::Failed { .. }) {
                    if let Some(target) = self.last_load_target.clone() {
                        self.begin_load(target).await;
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Load / switch
    // ------------------------------------------------------------------

    async fn begin_load(&mut self, session_id: String) {
        self.abandon_recording_if_active().await;
        self.load_generation += 1;
        let generation = self.load_generation;
        self.last_load_target = Some(session_id.clone());
        self.phase = Phase::Loading {
            target: Some(session_id.clone()),
        };
        self.emit();

        let gateway = self.gateway.clone();
        let messages = self.messages.clone();
        let events = self.events_tx.clone();
        let page_size = self.page_size;
        tokio::spawn(async move {
            let result = async {
                let session = gateway.switch_session(&session_id).await?;
                let page = messages
                    .fetch_page(&session_id, page_size, None)
                    .await
                    .map_err(|e| ParlanceError::persistence(e.to_string()))?;
                Ok((session, page))
            }
            .await;
            let _ = events.send(ConversationEvent::SessionLoaded { generation, result });
        });
    }

    async fn on_session_loaded(
        &mut self,
        generation: u64,
        result: Result<(Session, Vec<Message>), ParlanceError>,
    ) {
        if generation != self.load_generation {
            tracing::debug!(
                target: "conversation",
                "Discarding stale load completion (generation {} != {})",
                generation,
                self.load_generation
            );
            return;
        }
        match result {
            Ok((session, mut page)) => {
                self.lifecycle.activate(session).await;
                // Page arrives most-recent-first; the view renders in append
                // order.
                page.reverse();
                let mut view = ReadyView::empty(self.user_context.language.clone());
                view.messages = page;
                view.is_typing = self.in_flight_sends > 0;
                self.view = view;
                self.phase = Phase::Ready;
                self.spawn_suggestions_fetch();
            }
            Err(e) => {
                tracing::warn!(target: "conversation", "Session load failed: {}", e);
                self.phase = Phase::Failed {
                    message: e.to_string(),
                    retryable: !matches!(e, ParlanceError::Auth(_)),
                };
            }
        }
        self.emit();
    }

    async fn create_session(&mut self, title: Option<String>) {
        if self.lifecycle.creation_in_progress() {
            tracing::debug!(
                target: "conversation",
                "Ignoring explicit creation while a lazy-create send is in flight"
            );
            return;
        }
        self.abandon_recording_if_active().await;
        // A new session supersedes any in-flight load.
        self.load_generation += 1;
        self.phase = Phase::Loading { target: None };
        self.emit();
        match self.lifecycle.create_explicitly(title.as_deref()).await {
            Ok(session) => {
                self.last_load_target = Some(session.id);
                self.view = ReadyView::empty(self.user_context.language.clone());
                self.phase = Phase::Ready;
                self.spawn_suggestions_fetch();
            }
            Err(e) => {
                tracing::warn!(target: "conversation", "Explicit session creation failed: {}", e);
                self.phase = Phase::Failed {
                    message: e.to_string(),
                    retryable: !matches!(e, ParlanceError::Auth(_)),
                };
            }
        }
        self.emit();
    }

    // ------------------------------------------------------------------
    // Send pipeline
    // ------------------------------------------------------------------

    fn send_message(&mut self, text: String) {
        if matches!(self.phase, Phase::Recording(_)) {
            tracing::debug!(target: "conversation", "Rejected send while recording");
            return;
        }
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }
        match self.phase {
            Phase::Uninitialized => self.phase = Phase::Ready,
            Phase::Ready => {}
            _ => return,
        }
        let message = Message::user(text);
        if self.begin_send(message) {
            self.emit();
        }
    }

    /// Optimistically appends `message` and spawns the gateway send.
    ///
    /// Returns false when the send was rejected before any side effect.
    fn begin_send(&mut self, message: Message) -> bool {
        let target = match self.lifecycle.resolve_for_send() {
            Ok(target) => target,
            Err(e) => {
                tracing::debug!(target: "conversation", "Send rejected: {}", e);
                return false;
            }
        };
        if target == SendTarget::CreateOnSend {
            self.pending_creator = Some(message.id.clone());
        }
        self.view.messages.push(message.clone());
        self.in_flight_sends += 1;
        self.view.is_typing = true;

        let gateway = self.gateway.clone();
        let context = self.user_context.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let target_id = match &target {
                SendTarget::Existing(id) => Some(id.clone()),
                SendTarget::CreateOnSend => None,
            };
            let outcome = gateway
                .send(target_id.as_deref(), &message.text, &context)
                .await;
            let _ = events.send(ConversationEvent::SendCompleted {
                message_id: message.id,
                outcome,
            });
        });
        true
    }

    async fn on_send_completed(
        &mut self,
        message_id: String,
        outcome: Result<SendOutcome, ParlanceError>,
    ) {
        self.in_flight_sends = self.in_flight_sends.saturating_sub(1);
        self.view.is_typing = self.in_flight_sends > 0;

        match outcome {
            Ok(outcome) => {
                if self.pending_creator.as_deref() == Some(message_id.as_str()) {
                    self.pending_creator = None;
                    self.lifecycle
                        .adopt_created(Session::new(outcome.session_id.clone(), None))
                        .await;
                }
                // The send may have resolved after a switch away from its
                // session; the reply then belongs to the old session and must
                // not leak into the current view.
                let belongs_here =
                    self.lifecycle.current_id() == Some(outcome.session_id.as_str());

                let mut stored_user = None;
                if belongs_here {
                    if let Some(msg) = self.view.messages.iter_mut().find(|m| m.id == message_id)
                    {
                        msg.status = MessageStatus::Sent;
                        if let Some(confirmed) = &outcome.confirmed_message_id {
                            msg.id = confirmed.clone();
                        }
                        stored_user = Some(msg.clone());
                    }
                    self.view.messages.push(outcome.assistant_message.clone());
                    self.lifecycle.note_activity(2).await;
                }
                self.write_through(&outcome.session_id, stored_user, &outcome.assistant_message)
                    .await;
                if belongs_here {
                    self.spawn_suggestions_fetch();
                }
            }
            Err(e) => {
                if self.pending_creator.as_deref() == Some(message_id.as_str()) {
                    self.pending_creator = None;
                    self.lifecycle.abort_creation();
                }
                if let Some(msg) = self.view.messages.iter_mut().find(|m| m.id == message_id) {
                    msg.status = MessageStatus::Failed;
                    let failed = msg.clone();
                    if e.is_retryable() {
                        self.lifecycle.enqueue_offline(failed, &e);
                    }
                }
                tracing::warn!(
                    target: "conversation",
                    "Send failed for message {}: {}",
                    message_id,
                    e
                );
            }
        }
        self.emit();
    }

    async fn write_through(
        &self,
        session_id: &str,
        user: Option<Message>,
        assistant: &Message,
    ) {
        if let Some(user) = user {
            if let Err(e) = self.messages.append(session_id, &user).await {
                tracing::warn!(target: "conversation", "Failed to persist user message: {}", e);
            }
        }
        if let Err(e) = self.messages.append(session_id, assistant).await {
            tracing::warn!(
                target: "conversation",
                "Failed to persist assistant message: {}",
                e
            );
        }
    }

    fn spawn_suggestions_fetch(&self) {
        let Some(session_id) = self.lifecycle.current_id().map(str::to_string) else {
            return;
        };
        let gateway = self.gateway.clone();
        let events = self.events_tx.clone();
        let generation = self.load_generation;
        tokio::spawn(async move {
            let result = gateway.get_suggestions(&session_id).await;
            let _ = events.send(ConversationEvent::SuggestionsLoaded { generation, result });
        });
    }

    fn on_suggestions_loaded(
        &mut self,
        generation: u64,
        result: Result<PersonalizedSuggestions, ParlanceError>,
    ) {
        if generation != self.load_generation {
            return;
        }
        match result {
            Ok(suggestions) => {
                self.view.quick_suggestions = suggestions.suggestions;
                self.emit();
            }
            Err(e) => {
                tracing::debug!(target: "conversation", "Suggestions fetch failed: {}", e);
            }
        }
    }

    // ------------------------------------------------------------------
    // Recording and playback
    // ------------------------------------------------------------------

    async fn start_recording(&mut self) {
        if !matches!(self.phase, Phase::Ready) {
            return;
        }
        match self.audio.start_recording().await {
            Ok(()) => {
                self.view.is_recording = true;
                self.phase = Phase::Recording(RecordingView::started());
                self.emit();
            }
            Err(e) => {
                tracing::warn!(target: "conversation", "Failed to start recording: {}", e);
            }
        }
    }

    async fn stop_recording(&mut self) {
        if !matches!(self.phase, Phase::Recording(_)) {
            return;
        }
        self.view.is_recording = false;
        self.phase = Phase::Ready;
        match self.audio.stop_recording().await {
            Ok(audio) => {
                let message = Message::user(VOICE_MESSAGE_TEXT).with_audio_path(audio.path);
                if !self.begin_send(message) {
                    tracing::warn!(target: "conversation", "Voice message send rejected");
                }
            }
            Err(e) => {
                tracing::warn!(target: "conversation", "Failed to finalize recording: {}", e);
            }
        }
        self.emit();
    }

    async fn cancel_recording(&mut self) {
        if !matches!(self.phase, Phase::Recording(_)) {
            return;
        }
        self.audio.cancel_recording().await;
        self.view.is_recording = false;
        self.phase = Phase::Ready;
        self.emit();
    }

    /// The capture resource must be released on every exit path, including
    /// a load or switch arriving mid-recording.
    async fn abandon_recording_if_active(&mut self) {
        if matches!(self.phase, Phase::Recording(_)) {
            self.audio.cancel_recording().await;
            self.view.is_recording = false;
        }
    }

    async fn play_voice(&mut self, message_id: &str) {
        let Some(path) = self
            .view
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .and_then(|m| m.audio_path.clone())
        else {
            return;
        };
        match self.audio.play(&path).await {
            Ok(()) => {
                self.view.is_playing_voice = true;
                self.emit();
            }
            Err(e) => {
                tracing::warn!(target: "conversation", "Voice playback failed: {}", e);
            }
        }
    }

    async fn speak_message(&mut self, message_id: &str) {
        let Some(text) = self
            .view
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .map(|m| m.text.clone())
        else {
            return;
        };
        match self.audio.play_text(&text, &self.view.language).await {
            Ok(()) => {
                self.view.is_playing_tts = true;
                self.emit();
            }
            Err(e) => {
                tracing::warn!(target: "conversation", "TTS playback failed: {}", e);
            }
        }
    }

    // ------------------------------------------------------------------
    // Search, flags, export, queue, clear
    // ------------------------------------------------------------------

    fn search_messages(&mut self, query: &str) {
        if !matches!(self.phase, Phase::Ready) {
            return;
        }
        let query = query.trim().to_lowercase();
        self.view.search_results = if query.is_empty() {
            None
        } else {
            Some(
                self.view
                    .messages
                    .iter()
                    .filter(|m| m.text.to_lowercase().contains(&query))
                    .cloned()
                    .collect(),
            )
        };
        self.emit();
    }

    async fn mutate_flag(&mut self, message_id: &str, mutate: impl FnOnce(&mut Message)) {
        let Some(index) = self.view.messages.iter().position(|m| m.id == message_id) else {
            return;
        };
        mutate(&mut self.view.messages[index]);
        let updated = self.view.messages[index].clone();
        if let Some(session_id) = self.lifecycle.current_id() {
            if let Err(e) = self.messages.update(session_id, &updated).await {
                tracing::warn!(target: "conversation", "Failed to persist message flag: {}", e);
            }
        }
        self.emit();
    }

    fn export_history(&mut self) {
        let Some(session_id) = self.lifecycle.current_id().map(str::to_string) else {
            return;
        };
        let gateway = self.gateway.clone();
        let signals = self.signals_tx.clone();
        tokio::spawn(async move {
            match gateway.export_history(&session_id).await {
                Ok(path) => {
                    let _ = signals.send(ConversationSignal::ExportSuccess { path });
                }
                Err(e) => {
                    tracing::warn!(target: "conversation", "History export failed: {}", e);
                }
            }
        });
    }

    /// Flushes the offline queue inline, inside the event loop, so the pass
    /// cannot interleave with new user sends.
    async fn process_offline_queue(&mut self) {
        let delivered = self
            .lifecycle
            .flush_offline_queue(&self.user_context)
            .await;
        let count = delivered.len();
        for send in delivered {
            if let Some(msg) = self
                .view
                .messages
                .iter_mut()
                .find(|m| m.id == send.user_message.id)
            {
                *msg = send.user_message.clone();
            }
            self.view.messages.push(send.assistant_message.clone());
            if let Some(session_id) = self.lifecycle.current_id().map(str::to_string) {
                self.write_through(
                    &session_id,
                    Some(send.user_message),
                    &send.assistant_message,
                )
                .await;
            }
        }
        let _ = self
            .signals_tx
            .send(ConversationSignal::OfflineQueueProcessed { count });
        self.emit();
    }

    fn clear_chat(&mut self) {
        if !matches!(self.phase, Phase::Ready) {
            return;
        }
        self.view.messages.clear();
        self.view.search_results = None;
        if let Some(session_id) = self.lifecycle.current_id().map(str::to_string) {
            let gateway = self.gateway.clone();
            tokio::spawn(async move {
                if let Err(e) = gateway.clear_history(&session_id).await {
                    tracing::warn!(target: "conversation", "Backend history clear failed: {}", e);
                }
            });
        }
        self.emit();
    }

    fn emit(&self) {
        let _ = self.state_tx.send(self.current_state());
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
