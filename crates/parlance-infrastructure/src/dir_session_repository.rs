//! Directory-backed session repository.
//!
//! One TOML file per session:
//!
//! ```text
//! base_dir/
//! ├── <session-id-1>.toml
//! └── <session-id-2>.toml
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;

use parlance_core::session::{Session, SessionRepository};

use crate::paths::ParlancePaths;
use crate::storage::AtomicTomlFile;

/// Session ids become file names; reject anything that could escape the
/// directory.
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

/// Stores one TOML file per session under a base directory.
pub struct DirSessionRepository {
    dir: PathBuf,
}

impl DirSessionRepository {
    /// Creates a repository rooted at `dir`, creating the directory if
    /// needed.
    pub async fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .await
            .context("failed to create sessions directory")?;
        Ok(Self { dir })
    }

    /// Creates the repository at the default platform location.
    pub async fn default_location() -> Result<Self> {
        Self::new(ParlancePaths::sessions_dir()?).await
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn session_path(&self, session_id: &str) -> Result<PathBuf> {
        validate_session_id(session_id)?;
        Ok(self.dir.join(format!("{session_id}.toml")))
    }
}

#[async_trait]
impl SessionRepository for DirSessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        let path = self.session_path(session_id)?;
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("failed to read session file"),
        };
        let session = toml::from_str(&content).context("failed to parse session file")?;
        Ok(Some(session))
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let path = self.session_path(&session.id)?;
        let file = Arc::new(AtomicTomlFile::<Session>::new(path));
        let session = session.clone();
        tokio::task::spawn_blocking(move || file.save(&session))
            .await
            .map_err(|e| anyhow::anyhow!("session save task failed: {e}"))?
            .context("failed to save session file")?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let path = self.session_path(session_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("failed to delete session file"),
        }
    }

    async fn list_all(&self) -> Result<Vec<Session>> {
        let mut sessions = Vec::new();
        let mut entries = fs::read_dir(&self.dir)
            .await
            .context("failed to read sessions directory")?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            let content = match fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(target: "storage", "Skipping unreadable session file {:?}: {}", path, e);
                    continue;
                }
            };
            match toml::from_str::<Session>(&content) {
                Ok(session) => sessions.push(session),
                Err(e) => {
                    tracing::warn!(target: "storage", "Skipping malformed session file {:?}: {}", path, e);
                }
            }
        }

        // Most recently active first.
        sessions.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn session(id: &str, last_activity_at: &str) -> Session {
        let mut session = Session::new(id, None);
        session.last_activity_at = last_activity_at.to_string();
        session
    }

    #[tokio::test]
    async fn save_and_find_round_trip() {
        let dir = TempDir::new().unwrap();
        let repo = DirSessionRepository::new(dir.path()).await.unwrap();

        let session = Session::new("session-1", Some("First".into()));
        repo.save(&session).await.unwrap();

        let loaded = repo.find_by_id("session-1").await.unwrap().unwrap();
        assert_eq!(loaded, session);
    }

    #[tokio::test]
    async fn missing_session_is_none() {
        let dir = TempDir::new().unwrap();
        let repo = DirSessionRepository::new(dir.path()).await.unwrap();
        assert!(repo.find_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_all_sorts_most_recent_first() {
        let dir = TempDir::new().unwrap();
        let repo = DirSessionRepository::new(dir.path()).await.unwrap();

        repo.save(&session("a", "2024-01-01T00:00:00Z")).await.unwrap();
        repo.save(&session("b", "2024-03-01T00:00:00Z")).await.unwrap();
        repo.save(&session("c", "2024-02-01T00:00:00Z")).await.unwrap();

        let all = repo.list_all().await.unwrap();
        let ids: Vec<&str> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let repo = DirSessionRepository::new(dir.path()).await.unwrap();

        repo.save(&Session::new("gone", None)).await.unwrap();
        repo.delete("gone").await.unwrap();
        repo.delete("gone").await.unwrap();
        assert!(repo.find_by_id("gone").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn path_traversal_ids_are_rejected() {
        let dir = TempDir::new().unwrap();
        let repo = DirSessionRepository::new(dir.path()).await.unwrap();
        assert!(repo.find_by_id("../escape").await.is_err());
        assert!(repo.find_by_id("").await.is_err());
    }
}
