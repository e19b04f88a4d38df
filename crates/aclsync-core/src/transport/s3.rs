//! S3 backend on top of `object_store`.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3Builder, AmazonS3ConfigKey};
use object_store::path::Path;
use object_store::{GetOptions, ObjectStore, PutOptions, PutPayload};
use tracing::debug;

use super::{AwsCredentials, Backend, Locator, TransportConfig, TransportError, TransportResult};

/// Bundle backend for `s3://bucket/key` locators.
///
/// A client is built per request because the bucket comes from the URI.
/// Tests can pin a single store (e.g. `InMemory`) with [`S3Backend::with_store`],
/// in which case the bucket name is ignored.
pub struct S3Backend {
    config: TransportConfig,
    store: Option<Arc<dyn ObjectStore>>,
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("config", &self.config)
            .field("pinned_store", &self.store.is_some())
            .finish()
    }
}

impl S3Backend {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            store: None,
        }
    }

    pub fn with_store(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            config: TransportConfig::default(),
            store: Some(store),
        }
    }

    fn client(&self, bucket: &str) -> TransportResult<Arc<dyn ObjectStore>> {
        if let Some(store) = &self.store {
            return Ok(Arc::clone(store));
        }
        let s3 = self
            .builder(bucket)?
            .build()
            .map_err(|e| TransportError::credentials(format!("S3 client for '{bucket}': {e}")))?;
        Ok(Arc::new(s3))
    }

    /// Client settings for `bucket`. Without an explicit region the one from
    /// `AWS_REGION` / `AWS_DEFAULT_REGION` is kept, also when keys come from a
    /// credentials file.
    fn builder(&self, bucket: &str) -> TransportResult<AmazonS3Builder> {
        let builder = match &self.config.credentials {
            Some(path) => {
                let creds = AwsCredentials::from_file(path, &self.config.profile)?;
                let mut builder = AmazonS3Builder::new()
                    .with_access_key_id(creds.access_key_id)
                    .with_secret_access_key(creds.secret_access_key);
                if let Some(token) = creds.session_token {
                    builder = builder.with_token(token);
                }
                match AmazonS3Builder::from_env().get_config_value(&AmazonS3ConfigKey::Region) {
                    Some(region) => builder.with_region(region),
                    None => builder,
                }
            }
            None => AmazonS3Builder::from_env(),
        };

        let builder = builder.with_bucket_name(bucket);
        Ok(match &self.config.region {
            Some(region) => builder.with_region(region),
            None => builder,
        })
    }

    fn target<'a>(locator: &'a Locator) -> TransportResult<(&'a str, Path)> {
        match locator {
            Locator::S3 { bucket, key } => {
                let path = Path::parse(key).map_err(|e| {
                    TransportError::invalid_uri(&locator.to_string(), e.to_string())
                })?;
                Ok((bucket.as_str(), path))
            }
            other => Err(TransportError::invalid_uri(
                &other.to_string(),
                "not an s3 location",
            )),
        }
    }
}

#[async_trait]
impl Backend for S3Backend {
    async fn fetch(&self, locator: &Locator) -> TransportResult<Bytes> {
        let (bucket, path) = Self::target(locator)?;
        let store = self.client(bucket)?;
        debug!(uri = %locator, region = ?self.config.region, "s3 get");
        let result = store
            .get_opts(&path, GetOptions::default())
            .await
            .map_err(|e| TransportError::transport(locator, e))?;
        result
            .bytes()
            .await
            .map_err(|e| TransportError::transport(locator, e))
    }

    async fn store(&self, locator: &Locator, data: Bytes) -> TransportResult<()> {
        let (bucket, path) = Self::target(locator)?;
        let store = self.client(bucket)?;
        debug!(uri = %locator, bytes = data.len(), "s3 put");
        store
            .put_opts(&path, PutPayload::from_bytes(data), PutOptions::default())
            .await
            .map_err(|e| TransportError::transport(locator, e))?;
        Ok(())
    }
}
