//! Error types for bundle transport.

use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors raised while fetching or storing a bundle.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The location could not be parsed, or uses an unsupported scheme.
    #[error("invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Network, HTTP status or object store failure.
    #[error("{uri}: {message}")]
    Transport { uri: String, message: String },

    /// S3 credentials could not be loaded.
    #[error("credentials error: {message}")]
    Credentials { message: String },

    /// Local file I/O failure.
    #[error("{uri}: {source}")]
    Io {
        uri: String,
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    pub(crate) fn invalid_uri(uri: &str, reason: impl Into<String>) -> Self {
        Self::InvalidUri {
            uri: uri.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn transport(uri: impl std::fmt::Display, message: impl std::fmt::Display) -> Self {
        Self::Transport {
            uri: uri.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials {
            message: message.into(),
        }
    }

    /// Suggested exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidUri { .. } | Self::Credentials { .. } => 1,
            Self::Transport { .. } | Self::Io { .. } => 2,
        }
    }
}
