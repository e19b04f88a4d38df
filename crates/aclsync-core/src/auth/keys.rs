//! RSA key material from PEM files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rsa::pkcs8::{PrivateKeyInfo, SubjectPublicKeyInfoRef};
use rsa::{pkcs1, RsaPrivateKey, RsaPublicKey};
use tracing::debug;

use super::error::{AuthError, AuthResult};
use crate::bundle::Identity;

const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";
const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";

/// Extension of public key files in the keys directory.
pub const PUBLIC_KEY_EXTENSION: &str = "pub";

/// Load a PKCS#8 RSA private key from a single-block PEM file.
pub fn load_private_key(path: &Path) -> AuthResult<RsaPrivateKey> {
    let text = fs::read_to_string(path).map_err(|e| AuthError::invalid_key(path, e))?;
    let der = decode_pem(&text, PRIVATE_KEY_LABEL).map_err(|e| AuthError::invalid_key(path, e))?;

    let info = PrivateKeyInfo::try_from(der.as_slice())
        .map_err(|e| AuthError::invalid_key(path, format!("PKCS#8: {e}")))?;
    if info.algorithm.oid != pkcs1::ALGORITHM_OID {
        return Err(AuthError::invalid_key(path, "not an RSA key"));
    }
    RsaPrivateKey::try_from(info).map_err(|e| AuthError::invalid_key(path, e))
}

/// Load the PKIX RSA public key `<dir>/<identity>.pub`.
pub fn load_public_key(dir: &Path, identity: &Identity) -> AuthResult<RsaPublicKey> {
    if !identity.is_valid() {
        return Err(AuthError::no_public_key(identity.as_str(), "invalid identity"));
    }
    read_public_key(&public_key_path(dir, identity), identity)
}

fn public_key_path(dir: &Path, identity: &Identity) -> PathBuf {
    dir.join(format!("{identity}.{PUBLIC_KEY_EXTENSION}"))
}

fn read_public_key(path: &Path, identity: &Identity) -> AuthResult<RsaPublicKey> {
    let no_key = |reason: String| AuthError::no_public_key(identity.as_str(), reason);

    let text = fs::read_to_string(path).map_err(|e| no_key(format!("{}: {e}", path.display())))?;
    let der = decode_pem(&text, PUBLIC_KEY_LABEL).map_err(no_key)?;

    let spki = SubjectPublicKeyInfoRef::try_from(der.as_slice())
        .map_err(|e| no_key(format!("PKIX: {e}")))?;
    if spki.algorithm.oid != pkcs1::ALGORITHM_OID {
        return Err(no_key("not an RSA key".to_string()));
    }
    RsaPublicKey::try_from(spki).map_err(|e| no_key(e.to_string()))
}

fn decode_pem(text: &str, label: &str) -> Result<Vec<u8>, String> {
    let block = pem::parse(text).map_err(|e| format!("PEM: {e}"))?;
    if block.tag() != label {
        return Err(format!("expected PEM block '{label}', found '{}'", block.tag()));
    }
    Ok(block.contents().to_vec())
}

/// Public keys resolved by signer identity from one keys directory.
///
/// Keys are read from disk on every lookup unless the cache is enabled, in
/// which case each absolute path is loaded once per process and never
/// invalidated.
#[derive(Debug, Clone)]
pub struct KeyStore {
    keys_dir: PathBuf,
    cache: Option<Arc<Mutex<HashMap<PathBuf, RsaPublicKey>>>>,
}

impl KeyStore {
    pub fn new(keys_dir: impl Into<PathBuf>) -> Self {
        Self {
            keys_dir: keys_dir.into(),
            cache: None,
        }
    }

    pub fn with_cache(mut self) -> Self {
        self.cache = Some(Arc::default());
        self
    }

    pub fn keys_dir(&self) -> &Path {
        &self.keys_dir
    }

    pub fn public_key_path(&self, identity: &Identity) -> PathBuf {
        public_key_path(&self.keys_dir, identity)
    }

    pub fn public_key(&self, identity: &Identity) -> AuthResult<RsaPublicKey> {
        if !identity.is_valid() {
            return Err(AuthError::no_public_key(identity.as_str(), "invalid identity"));
        }
        let path = self.public_key_path(identity);
        let Some(cache) = &self.cache else {
            return read_public_key(&path, identity);
        };

        let abs = std::path::absolute(&path).unwrap_or(path);
        let mut cache = cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(key) = cache.get(&abs) {
            return Ok(key.clone());
        }
        let key = read_public_key(&abs, identity)?;
        debug!(identity = %identity, path = %abs.display(), "cached public key");
        cache.insert(abs, key.clone());
        Ok(key)
    }
}
