//! Directory-backed message repository.
//!
//! One TOML message log per session under a base directory. Appends and
//! updates are read-modify-write cycles under the atomic file's advisory
//! lock; pages are served most-recent-first with an exclusive timestamp
//! cursor, so re-fetching the same page is idempotent.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;

use parlance_core::message_repository::MessageRepository;
use parlance_core::session::Message;

use crate::paths::ParlancePaths;
use crate::storage::AtomicTomlFile;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MessageLog {
    #[serde(default)]
    messages: Vec<Message>,
}

fn validate_session_id(session_id: &str) -> Result<()> {
    if session_id.is_empty() {
        anyhow::bail!("session id cannot be empty");
    }
    if session_id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        anyhow::bail!("invalid session id: {session_id}")
    }
}

/// Stores one TOML message log per session.
pub struct DirMessageRepository {
    dir: PathBuf,
}

impl DirMessageRepository {
    pub async fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .await
            .context("failed to create messages directory")?;
        Ok(Self { dir })
    }

    pub async fn default_location() -> Result<Self> {
        Self::new(ParlancePaths::messages_dir()?).await
    }

    fn log_file(&self, session_id: &str) -> Result<Arc<AtomicTomlFile<MessageLog>>> {
        validate_session_id(session_id)?;
        Ok(Arc::new(AtomicTomlFile::new(
            self.dir.join(format!("{session_id}.toml")),
        )))
    }

    async fn load_log(&self, session_id: &str) -> Result<MessageLog> {
        let file = self.log_file(session_id)?;
        let log = tokio::task::spawn_blocking(move || file.load())
            .await
            .map_err(|e| anyhow::anyhow!("message load task failed: {e}"))?
            .context("failed to load message log")?;
        Ok(log.unwrap_or_default())
    }
}

#[async_trait]
impl MessageRepository for DirMessageRepository {
    async fn fetch_page(
        &self,
        session_id: &str,
        limit: usize,
        before: Option<&str>,
    ) -> Result<Vec<Message>> {
        let mut messages = self.load_log(session_id).await?.messages;
        // Stable sort: insertion order survives for equal timestamps.
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        if let Some(before) = before {
            messages.retain(|m| m.timestamp.as_str() < before);
        }
        Ok(messages.into_iter().rev().take(limit).collect())
    }

    async fn append(&self, session_id: &str, message: &Message) -> Result<Message> {
        let file = self.log_file(session_id)?;
        let message = message.clone();
        let stored = message.clone();
        tokio::task::spawn_blocking(move || {
            file.update(MessageLog::default(), |log| {
                log.messages.push(message);
                Ok(())
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("message append task failed: {e}"))?
        .context("failed to append message")?;
        Ok(stored)
    }

    async fn update(&self, session_id: &str, message: &Message) -> Result<()> {
        let file = self.log_file(session_id)?;
        let message = message.clone();
        let message_id = message.id.clone();
        let found = tokio::task::spawn_blocking(move || -> parlance_core::Result<bool> {
            let mut found = false;
            file.update(MessageLog::default(), |log| {
                if let Some(stored) = log.messages.iter_mut().find(|m| m.id == message.id) {
                    *stored = message.clone();
                    found = true;
                }
                Ok(())
            })?;
            Ok(found)
        })
        .await
        .map_err(|e| anyhow::anyhow!("message update task failed: {e}"))?
        .context("failed to update message")?;

        if !found {
            anyhow::bail!("message not found: {message_id}");
        }
        Ok(())
    }
}
