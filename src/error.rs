//! Error types for the local store, the remote document store and configuration

/// Local key-value store failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Local store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Record serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Remote document store failure
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication required: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Remote service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Whether repeating the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Network(_) => true,
            RemoteError::Service { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}
