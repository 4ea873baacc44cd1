//! Last-session pointer storage.
//!
//! Persists the "last active session" convenience pointer to a small TOML
//! file and caches it in memory, so reads never touch the disk and never
//! fail. Remembering the last session is a convenience, not a correctness
//! requirement; write failures are surfaced to the caller, which logs and
//! swallows them.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use parlance_core::session::LastSessionStore;

use crate::paths::ParlancePaths;
use crate::storage::AtomicTomlFile;

/// Controller state persisted across launches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ControllerState {
    last_session_id: Option<String>,
}

/// File-backed [`LastSessionStore`] with an in-memory cache.
#[derive(Clone)]
pub struct TomlLastSessionStore {
    state: Arc<Mutex<ControllerState>>,
    file: Arc<AtomicTomlFile<ControllerState>>,
}

impl TomlLastSessionStore {
    /// Opens (or initializes) the store at `path`.
    pub fn new(path: PathBuf) -> parlance_core::Result<Self> {
        let file = AtomicTomlFile::new(path);
        let initial = file.load()?.unwrap_or_default();
        Ok(Self {
            state: Arc::new(Mutex::new(initial)),
            file: Arc::new(file),
        })
    }

    /// Opens the store at the default platform location.
    pub fn default_location() -> parlance_core::Result<Self> {
        Self::new(ParlancePaths::state_file()?)
    }

    async fn persist(&self, state: ControllerState) -> Result<()> {
        let file = self.file.clone();
        tokio::task::spawn_blocking(move || file.save(&state))
            .await
            .map_err(|e| anyhow::anyhow!("state save task failed: {e}"))??;
        Ok(())
    }
}

#[async_trait]
impl LastSessionStore for TomlLastSessionStore {
    async fn get_last_session(&self) -> Option<String> {
        self.state.lock().await.last_session_id.clone()
    }

    async fn set_last_session(&self, session_id: String) -> Result<()> {
        let snapshot = {
            let mut state = self.state.lock().await;
            state.last_session_id = Some(session_id);
            state.clone()
        };
        self.persist(snapshot).await
    }

    async fn clear_last_session(&self) -> Result<()> {
        let snapshot = {
            let mut state = self.state.lock().await;
            state.last_session_id = None;
            state.clone()
        };
        self.persist(snapshot).await
    }
}
