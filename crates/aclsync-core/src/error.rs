use thiserror::Error;

use crate::auth::AuthError;
use crate::bundle::BundleError;
use crate::config::ConfigError;
use crate::report::TemplateError;
use crate::transport::TransportError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl Error {
    /// Exit code for CLI: 1 config/usage, 2 transport, 3 bundle structure, 4 authentication.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Template(_) => 1,
            Self::Transport(e) => e.exit_code(),
            Self::Bundle(e) => e.exit_code(),
            Self::Auth(_) => 4,
        }
    }
}
