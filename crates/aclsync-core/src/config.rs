//! Settings file (YAML) with built-in defaults.
//!
//! ```yaml
//! keys_dir: /etc/aclsync/keys
//! key_file: /etc/aclsync/keys/aclsync.key
//! identity: aclsync
//! credentials: /etc/aclsync/credentials
//! profile: default
//! region: eu-west-1   # default: AWS_REGION / AWS_DEFAULT_REGION
//! http_timeout_secs: 60
//! limits:
//!   max_entries: 16
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::auth::KeyStore;
use crate::bundle::{Identity, UnpackLimits, UnpackLimitsOverrides};
use crate::report::{ReportTemplate, DEFAULT_TEMPLATE};
use crate::transport::TransportConfig;

pub const DEFAULT_KEYS_DIR: &str = "/etc/aclsync/keys";
pub const DEFAULT_KEY_FILE: &str = "/etc/aclsync/keys/aclsync.key";
pub const DEFAULT_IDENTITY: &str = "aclsync";

#[derive(Debug, Error)]
#[error("config error: {0}")]
pub struct ConfigError(pub String);

/// Runtime settings. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directory holding `<identity>.pub` verification keys.
    pub keys_dir: PathBuf,
    /// PKCS#8 private key used for signing.
    pub key_file: PathBuf,
    /// Identity written into produced bundles.
    pub identity: String,
    /// AWS credentials file; unset means the process environment.
    pub credentials: Option<PathBuf>,
    pub profile: String,
    /// S3 region; unset means the process environment.
    pub region: Option<String>,
    /// Skip signature checks on fetch.
    pub no_verify: bool,
    pub http_timeout_secs: u64,
    pub report_template: String,
    /// Cache public keys for the lifetime of the process.
    pub cache_keys: bool,
    pub limits: UnpackLimitsOverrides,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            keys_dir: PathBuf::from(DEFAULT_KEYS_DIR),
            key_file: PathBuf::from(DEFAULT_KEY_FILE),
            identity: DEFAULT_IDENTITY.to_string(),
            credentials: None,
            profile: "default".to_string(),
            region: None,
            no_verify: false,
            http_timeout_secs: 60,
            report_template: DEFAULT_TEMPLATE.to_string(),
            cache_keys: false,
            limits: UnpackLimitsOverrides::default(),
        }
    }
}

pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    let settings = Settings::from_yaml(&raw)
        .map_err(|e| ConfigError(format!("{}: {}", path.display(), e.0)))?;
    Ok(settings)
}

impl Settings {
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        // an empty file deserializes as YAML null, not as an empty mapping
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(raw)
            .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.signing_identity()?;
        self.template()?;
        if self.http_timeout_secs == 0 {
            return Err(ConfigError("http_timeout_secs must be > 0".into()));
        }
        Ok(())
    }

    pub fn signing_identity(&self) -> Result<Identity, ConfigError> {
        Identity::new(self.identity.as_str()).map_err(|e| ConfigError(e.to_string()))
    }

    pub fn template(&self) -> Result<ReportTemplate, ConfigError> {
        ReportTemplate::new(self.report_template.as_str()).map_err(|e| ConfigError(e.to_string()))
    }

    pub fn unpack_limits(&self) -> UnpackLimits {
        UnpackLimits::default().apply(&self.limits)
    }

    pub fn key_store(&self) -> KeyStore {
        let store = KeyStore::new(&self.keys_dir);
        if self.cache_keys {
            store.with_cache()
        } else {
            store
        }
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            credentials: self.credentials.clone(),
            profile: self.profile.clone(),
            region: self.region.clone(),
            http_timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }
}
