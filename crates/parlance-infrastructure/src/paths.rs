//! Unified path management for Parlance data files.
//!
//! All controller state lives under the platform config directory:
//!
//! ```text
//! ~/.config/parlance/          # Linux; platform equivalent elsewhere
//! ├── state.toml               # last active session pointer
//! ├── sessions/                # one TOML file per session
//! └── messages/                # one TOML message log per session
//! ```

use std::path::PathBuf;

use parlance_core::error::{ParlanceError, Result};

/// Resolves Parlance's on-disk locations.
pub struct ParlancePaths;

impl ParlancePaths {
    /// Returns the Parlance configuration directory.
    ///
    /// # Errors
    ///
    /// Fails when the platform config directory cannot be determined.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("parlance"))
            .ok_or_else(|| ParlanceError::internal("cannot determine config directory"))
    }

    /// Directory holding one TOML file per session.
    pub fn sessions_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("sessions"))
    }

    /// Directory holding one TOML message log per session.
    pub fn messages_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("messages"))
    }

    /// The controller state file (last active session pointer).
    pub fn state_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("state.toml"))
    }
}
