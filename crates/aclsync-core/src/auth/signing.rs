//! RSA-PKCS1v15 / SHA-256 signatures over raw payload bytes.

use std::path::Path;

use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::error::{AuthError, AuthResult};
use super::keys::{load_private_key, KeyStore};
use crate::bundle::Identity;

/// Sign `payload` with the private key at `private_key_path`.
pub fn sign(payload: &[u8], private_key_path: &Path) -> AuthResult<Vec<u8>> {
    let key = load_private_key(private_key_path)?;
    sign_with_key(&key, payload)
}

/// Verify `signature` over `payload` against `<keys_dir>/<identity>.pub`.
pub fn verify(
    identity: &Identity,
    payload: &[u8],
    signature: &[u8],
    keys_dir: &Path,
) -> AuthResult<()> {
    KeyStore::new(keys_dir).verify(identity, payload, signature)
}

pub fn sign_with_key(key: &RsaPrivateKey, payload: &[u8]) -> AuthResult<Vec<u8>> {
    let digest = Sha256::digest(payload);
    key.sign_with_rng(&mut rand::thread_rng(), Pkcs1v15Sign::new::<Sha256>(), &digest)
        .map_err(|e| AuthError::Signing {
            reason: e.to_string(),
        })
}

pub fn verify_with_key(
    key: &RsaPublicKey,
    identity: &Identity,
    payload: &[u8],
    signature: &[u8],
) -> AuthResult<()> {
    let digest = Sha256::digest(payload);
    key.verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
        .map_err(|_| AuthError::InvalidSignature {
            identity: identity.to_string(),
        })
}

impl KeyStore {
    /// Verify a detached signature made by `identity`.
    pub fn verify(&self, identity: &Identity, payload: &[u8], signature: &[u8]) -> AuthResult<()> {
        let key = self.public_key(identity)?;
        verify_with_key(&key, identity, payload, signature)?;
        debug!(identity = %identity, bytes = payload.len(), "signature verified");
        Ok(())
    }
}

/// A loaded private key bound to the identity it signs as.
pub struct Signer {
    key: RsaPrivateKey,
    identity: Identity,
}

impl Signer {
    pub fn new(key: RsaPrivateKey, identity: Identity) -> Self {
        Self { key, identity }
    }

    pub fn load(private_key_path: &Path, identity: Identity) -> AuthResult<Self> {
        Ok(Self::new(load_private_key(private_key_path)?, identity))
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn sign(&self, payload: &[u8]) -> AuthResult<Vec<u8>> {
        sign_with_key(&self.key, payload)
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
