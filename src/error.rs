// src/error.rs
// Error types for the plexus core

use std::time::Duration;
use thiserror::Error;

use crate::llm::ProviderKind;

/// Main error type for the plexus library
#[derive(Error, Debug)]
pub enum PlexusError {
    #[error("{provider} API key is missing")]
    MissingCredential { provider: ProviderKind },

    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{provider} API error: {status} - {message}")]
    Status {
        provider: ProviderKind,
        status: u16,
        message: String,
    },

    /// No response headers within the configured wait; the body itself
    /// may stream for as long as it needs
    #[error("{provider} did not respond within {waited:?}")]
    Timeout { provider: ProviderKind, waited: Duration },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("stream read failed: {0}")]
    StreamRead(String),

    #[error("generation cancelled")]
    Cancelled,

    #[error("node already exists: {0}")]
    DuplicateNode(String),

    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// A session has exactly one `system` node
    #[error("invalid system root: {0}")]
    InvalidRoot(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Result using PlexusError
pub type Result<T> = std::result::Result<T, PlexusError>;

impl PlexusError {
    /// Detected before any network I/O
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            PlexusError::MissingCredential { .. }
                | PlexusError::UnknownModel(_)
                | PlexusError::Config(_)
        )
    }

    /// Upstream call failed after it was started
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            PlexusError::Status { .. }
                | PlexusError::Timeout { .. }
                | PlexusError::Http(_)
                | PlexusError::StreamRead(_)
                | PlexusError::Cancelled
        )
    }

    /// Caller broke a graph precondition
    pub fn is_graph_misuse(&self) -> bool {
        matches!(
            self,
            PlexusError::DuplicateNode(_) | PlexusError::UnknownNode(_) | PlexusError::InvalidRoot(_)
        )
    }
}
