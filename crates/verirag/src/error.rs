//! Error types for the verification pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error, raised at construction time, never at solve time
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level failure of a generation call (timeout, auth,
    /// malformed response). Fatal for the current (query, solver) pair only.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Dataset loading or parsing error
    #[error("Dataset error in '{name}': {message}")]
    Dataset { name: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create a dataset error
    pub fn dataset(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Dataset {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this error is fatal for a single (query, solver) pair only.
    ///
    /// The batch loop uses this to decide between skip-and-continue and
    /// aborting the run: transport failures never abort the batch.
    pub fn is_per_item(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
