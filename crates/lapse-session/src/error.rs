//! Error types for session store operations.

/// Error type for session store operations.
///
/// The in-memory store itself never fails; these variants cover invalid
/// configuration and failures reported by substitute [`SessionData`]
/// backends.
///
/// [`SessionData`]: crate::SessionData
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Store configuration is invalid or could not be parsed.
    #[error("Invalid store configuration: {0}")]
    Config(String),

    /// Error reported by a session data backend.
    #[error("Session backend error: {0}")]
    Backend(String),
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, Error>;
