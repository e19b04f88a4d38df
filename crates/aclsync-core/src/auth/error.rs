use std::path::PathBuf;

use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Key loading, signing and verification failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The private key file is unreadable, not PEM, wrongly labelled or not RSA.
    #[error("invalid key file {}: {reason}", path.display())]
    InvalidKeyFile { path: PathBuf, reason: String },

    /// No usable RSA public key for the signer identity.
    #[error("{identity}: no RSA public key ({reason})")]
    NoPublicKey { identity: String, reason: String },

    #[error("invalid signature from '{identity}'")]
    InvalidSignature { identity: String },

    #[error("signing failed: {reason}")]
    Signing { reason: String },
}

impl AuthError {
    pub(crate) fn invalid_key(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidKeyFile {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn no_public_key(identity: &str, reason: impl std::fmt::Display) -> Self {
        Self::NoPublicKey {
            identity: identity.to_string(),
            reason: reason.to_string(),
        }
    }
}
