#![allow(dead_code)]

use std::path::PathBuf;

use aclsync_core::{Identity, Signer};
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::RsaPrivateKey;
use tempfile::TempDir;

/// A throwaway signing identity: `<dir>/<name>.key` plus `<dir>/<name>.pub`.
pub struct TestKeys {
    pub dir: TempDir,
    pub name: String,
    pub key: RsaPrivateKey,
}

impl TestKeys {
    pub fn generate(name: &str) -> Self {
        let dir = TempDir::new().expect("tempdir");
        Self::generate_in(dir, name)
    }

    pub fn generate_in(dir: TempDir, name: &str) -> Self {
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("failed to generate key");
        let private = key.to_pkcs8_pem(LineEnding::LF).expect("encode private key");
        std::fs::write(dir.path().join(format!("{name}.key")), private.as_bytes()).unwrap();
        let public = key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .expect("encode public key");
        std::fs::write(dir.path().join(format!("{name}.pub")), public).unwrap();
        Self {
            dir,
            name: name.to_string(),
            key,
        }
    }

    pub fn keys_dir(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn private_key_path(&self) -> PathBuf {
        self.dir.path().join(format!("{}.key", self.name))
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.name.as_str()).unwrap()
    }

    pub fn signer(&self) -> Signer {
        Signer::new(self.key.clone(), self.identity())
    }
}
