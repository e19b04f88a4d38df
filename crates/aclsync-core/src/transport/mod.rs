//! Fetch and store opaque bundle bytes by URI.
//!
//! The URI is parsed once into a [`Locator`], which picks the backend:
//!
//! ```text
//! http://host/path/acl.tar.gz     GET / PUT (binary/octet-stream)
//! https://host/path/acl.zip       GET / PUT
//! s3://bucket/key/with/slashes    object store GET / PUT
//! file:///var/lib/aclsync/acl.tar.gz
//! ```

pub mod credentials;
pub mod error;
pub mod file;
pub mod http;
pub mod s3;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;

pub use credentials::AwsCredentials;
pub use error::{TransportError, TransportResult};
pub use file::FileBackend;
pub use http::HttpBackend;
pub use s3::S3Backend;

lazy_static! {
    static ref S3_URI: Regex = Regex::new(r"^s3://([^/]+)/(.+)$").unwrap();
}

/// URI scheme of a bundle location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
    S3,
    File,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::S3 => "s3",
            Self::File => "file",
        })
    }
}

/// A parsed bundle location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Http { url: url::Url },
    S3 { bucket: String, key: String },
    File { path: PathBuf },
}

impl Locator {
    /// Parse a bundle URI. Unknown schemes are rejected.
    pub fn parse(uri: &str) -> TransportResult<Self> {
        if uri.starts_with("s3://") {
            let caps = S3_URI
                .captures(uri)
                .ok_or_else(|| TransportError::invalid_uri(uri, "expected s3://<bucket>/<key>"))?;
            return Ok(Self::S3 {
                bucket: caps[1].to_string(),
                key: caps[2].to_string(),
            });
        }

        if uri.starts_with("http://") || uri.starts_with("https://") {
            let url = url::Url::parse(uri)
                .map_err(|e| TransportError::invalid_uri(uri, e.to_string()))?;
            return Ok(Self::Http { url });
        }

        if let Some(path) = uri.strip_prefix("file://") {
            if path.is_empty() {
                return Err(TransportError::invalid_uri(uri, "empty file path"));
            }
            return Ok(Self::File {
                path: PathBuf::from(path),
            });
        }

        Err(TransportError::invalid_uri(uri, "unsupported scheme"))
    }

    pub fn scheme(&self) -> Scheme {
        match self {
            Self::Http { url } if url.scheme() == "https" => Scheme::Https,
            Self::Http { .. } => Scheme::Http,
            Self::S3 { .. } => Scheme::S3,
            Self::File { .. } => Scheme::File,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { url } => write!(f, "{url}"),
            Self::S3 { bucket, key } => write!(f, "s3://{bucket}/{key}"),
            Self::File { path } => write!(f, "file://{}", path.display()),
        }
    }
}

/// Transport settings shared by all backends.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// AWS credentials file; `None` uses the process environment.
    pub credentials: Option<PathBuf>,
    pub profile: String,
    /// S3 region; `None` leaves it to the environment.
    pub region: Option<String>,
    pub http_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            profile: "default".to_string(),
            region: None,
            http_timeout: Duration::from_secs(60),
        }
    }
}

/// A storage backend for one family of locators.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Read the whole object at `locator`.
    async fn fetch(&self, locator: &Locator) -> TransportResult<Bytes>;

    /// Create or overwrite the object at `locator`.
    async fn store(&self, locator: &Locator, data: Bytes) -> TransportResult<()>;
}

/// Scheme-dispatching transport.
#[derive(Clone)]
pub struct Transport {
    http: Arc<dyn Backend>,
    s3: Arc<dyn Backend>,
    file: Arc<dyn Backend>,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport").finish_non_exhaustive()
    }
}

impl Transport {
    pub fn new(config: &TransportConfig) -> TransportResult<Self> {
        Ok(Self {
            http: Arc::new(HttpBackend::new(config.http_timeout)?),
            s3: Arc::new(S3Backend::new(config.clone())),
            file: Arc::new(FileBackend),
        })
    }

    /// Replace the backend used for `s3://` locators.
    pub fn with_s3_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.s3 = backend;
        self
    }

    fn backend(&self, locator: &Locator) -> &dyn Backend {
        match locator.scheme() {
            Scheme::Http | Scheme::Https => self.http.as_ref(),
            Scheme::S3 => self.s3.as_ref(),
            Scheme::File => self.file.as_ref(),
        }
    }

    pub async fn fetch(&self, uri: &str) -> TransportResult<Bytes> {
        let locator = Locator::parse(uri)?;
        self.fetch_locator(&locator).await
    }

    pub async fn store(&self, uri: &str, data: Bytes) -> TransportResult<()> {
        let locator = Locator::parse(uri)?;
        self.store_locator(&locator, data).await
    }

    pub async fn fetch_locator(&self, locator: &Locator) -> TransportResult<Bytes> {
        let data = self.backend(locator).fetch(locator).await?;
        info!(uri = %locator, bytes = data.len(), "fetched");
        Ok(data)
    }

    pub async fn store_locator(&self, locator: &Locator, data: Bytes) -> TransportResult<()> {
        let len = data.len();
        self.backend(locator).store(locator, data).await?;
        info!(uri = %locator, bytes = len, "stored");
        Ok(())
    }
}
