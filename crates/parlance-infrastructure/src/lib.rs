//! Infrastructure layer for Parlance.
//!
//! File-backed implementations of the persistence traits from
//! `parlance-core` (TOML files under the platform config directory) and the
//! HTTP implementation of the backend gateway.

pub mod dir_message_repository;
pub mod dir_session_repository;
pub mod http_gateway;
pub mod paths;
pub mod state_store;
pub mod storage;

pub use dir_message_repository::DirMessageRepository;
pub use dir_session_repository::DirSessionRepository;
pub use http_gateway::HttpBackendGateway;
pub use paths::ParlancePaths;
pub use state_store::TomlLastSessionStore;
