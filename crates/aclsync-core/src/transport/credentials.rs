//! AWS-style credentials file with profile sections.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use super::error::{TransportError, TransportResult};

const ACCESS_KEY_ID: &str = "aws_access_key_id";
const SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
const SESSION_TOKEN: &str = "aws_session_token";

/// Static S3 credentials for one profile.
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

lazy_static! {
    /// `[name]` or `[profile name]`.
    static ref SECTION: Regex = Regex::new(r"^\s*\[\s*(?:profile\s+)?([^\]\s]+)\s*\]\s*$").unwrap();
    static ref ENTRY: Regex = Regex::new(
        r"^\s*(aws_access_key_id|aws_secret_access_key|aws_session_token)\s*=\s*(\S+)\s*$"
    )
    .unwrap();
}

impl AwsCredentials {
    /// Read `profile` from the credentials file at `path`.
    pub fn from_file(path: &Path, profile: &str) -> TransportResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TransportError::credentials(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&text, profile)
            .map_err(|e| TransportError::credentials(format!("{}: {e}", path.display())))
    }

    /// Parse credentials text. Lines before any section header belong to `default`.
    pub fn parse(text: &str, profile: &str) -> Result<Self, String> {
        let mut section = "default".to_string();
        let mut id = None;
        let mut secret = None;
        let mut token = None;

        for line in text.lines() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }
            if let Some(caps) = SECTION.captures(line) {
                section = caps[1].to_string();
                continue;
            }
            if section != profile {
                continue;
            }
            if let Some(caps) = ENTRY.captures(line) {
                let value = caps[2].to_string();
                match &caps[1] {
                    ACCESS_KEY_ID => id = Some(value),
                    SECRET_ACCESS_KEY => secret = Some(value),
                    SESSION_TOKEN => token = Some(value),
                    _ => {}
                }
            }
        }

        let access_key_id =
            id.ok_or_else(|| format!("profile '{profile}': missing '{ACCESS_KEY_ID}'"))?;
        let secret_access_key =
            secret.ok_or_else(|| format!("profile '{profile}': missing '{SECRET_ACCESS_KEY}'"))?;
        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: token,
        })
    }
}
