//! Key loading and detached RSA signatures.
//!
//! Private keys are PKCS#8 PEM (`PRIVATE KEY`); public keys are PKIX PEM
//! (`PUBLIC KEY`) stored as `<keys-dir>/<identity>.pub`.

mod error;
mod keys;
mod signing;

pub use error::{AuthError, AuthResult};
pub use keys::{load_private_key, load_public_key, KeyStore, PUBLIC_KEY_EXTENSION};
pub use signing::{sign, sign_with_key, verify, verify_with_key, Signer};
