//! Error types for Chorus
//!
//! `ChorusError` covers the failures raised by the shared model and by the
//! in-memory collaborators. Collaborator traits themselves return
//! `anyhow::Result` so implementations can surface their own error types.

/// Application-specific error types
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ChorusError {
    #[error("invalid channel: '{0}'")]
    InvalidChannel(String),

    #[error("invalid org scoped channel: '{0}'")]
    InvalidScopedChannel(String),

    #[error("user '{user_id}' not exist in org {org_id}")]
    UserNotExist { user_id: i64, org_id: i64 },

    #[error("no channel handler for '{0}'")]
    HandlerNotFound(String),
}
