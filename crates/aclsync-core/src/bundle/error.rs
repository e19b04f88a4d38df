//! Error types for bundle packing and unpacking.

use thiserror::Error;

use super::Format;

/// Result type for bundle operations.
pub type BundleResult<T> = Result<T, BundleError>;

/// Structural errors raised by the bundle codec.
#[derive(Debug, Error)]
pub enum BundleError {
    /// More than one archive entry claimed the same role.
    #[error("duplicate '{role}' entry in bundle")]
    DuplicateEntry { role: String },

    /// A required role is absent from the archive.
    #[error("'{role}' entry missing from bundle")]
    MissingEntry { role: String },

    /// The gzip, tar or zip stream is corrupt or truncated.
    #[error("invalid {format} archive: {message}")]
    Archive { format: Format, message: String },

    /// A resource limit was hit while reading the archive.
    #[error("{limit} exceeded: {actual} > {max}")]
    LimitExceeded {
        limit: &'static str,
        actual: u64,
        max: u64,
    },

    /// The bundle cannot be encoded (bad entry name, identity too long, ...).
    #[error("cannot pack bundle: {message}")]
    Pack { message: String },

    /// I/O error while writing the archive.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BundleError {
    pub(crate) fn duplicate(role: impl Into<String>) -> Self {
        Self::DuplicateEntry { role: role.into() }
    }

    pub(crate) fn missing(role: impl Into<String>) -> Self {
        Self::MissingEntry { role: role.into() }
    }

    pub(crate) fn archive(format: Format, message: impl std::fmt::Display) -> Self {
        Self::Archive {
            format,
            message: message.to_string(),
        }
    }

    pub(crate) fn pack(message: impl Into<String>) -> Self {
        Self::Pack {
            message: message.into(),
        }
    }

    /// Returns true if this is a structural error (wrong set of entries).
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::DuplicateEntry { .. } | Self::MissingEntry { .. }
        )
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 2,
            _ => 3,
        }
    }
}
