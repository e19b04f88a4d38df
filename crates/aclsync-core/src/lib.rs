//! # aclsync-core
//!
//! Signed ACL bundles: RSA-PKCS1v15/SHA-256 detached signatures, a tar.gz / zip
//! bundle codec that carries the signer identity in archive metadata, and a
//! transport layer that fetches and stores bundles over HTTP(S), S3 or the
//! local filesystem.
//!
//! ```text
//! fetch:  Transport::fetch(uri) → Bundle::unpack → KeyStore::verify → payload
//! store:  payload → Signer::sign → Bundle::pack → Transport::store(uri)
//! ```

pub mod auth;
pub mod bundle;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod transport;

pub use auth::{AuthError, KeyStore, Signer};
pub use bundle::{Bundle, BundleError, Format, Identity, UnpackLimits, UnpackOptions};
pub use config::{load_settings, ConfigError, Settings};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, Verification};
pub use report::{Report, ReportTemplate, TemplateError};
pub use transport::{Locator, Scheme, Transport, TransportConfig, TransportError};
