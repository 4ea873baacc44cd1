//! Audio and text-to-speech boundary.
//!
//! The core only tracks boolean playing/recording flags plus elapsed and
//! waveform metadata; raw audio buffers never cross this boundary.

use async_trait::async_trait;

use crate::error::Result;

/// A finalized voice capture.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAudio {
    /// Local path of the recorded file.
    pub path: String,
    pub duration_ms: u64,
}

/// Narrow interface over the platform audio and TTS engines.
///
/// Implementations must release the capture resource on every exit path:
/// both [`stop_recording`](AudioPort::stop_recording) and
/// [`cancel_recording`](AudioPort::cancel_recording) leave the microphone
/// free, and cancel must be safe to call when no capture is active.
#[async_trait]
pub trait AudioPort: Send + Sync {
    /// Begins a voice capture.
    async fn start_recording(&self) -> Result<()>;

    /// Finalizes the capture and returns the recorded audio.
    async fn stop_recording(&self) -> Result<RecordedAudio>;

    /// Abandons the capture, releasing the microphone without producing
    /// audio.
    async fn cancel_recording(&self);

    /// Plays a recorded audio file.
    async fn play(&self, path: &str) -> Result<()>;

    /// Reads text aloud in the given language.
    async fn play_text(&self, text: &str, language: &str) -> Result<()>;

    /// Stops any active playback. Safe to call when idle.
    async fn stop_playback(&self);
}
