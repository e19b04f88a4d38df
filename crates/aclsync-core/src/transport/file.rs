//! Local filesystem backend for `file://` locators.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;

use super::{Backend, Locator, TransportError, TransportResult};

/// Permission bits for stored bundles on Unix.
pub const FILE_MODE: u32 = 0o660;

#[derive(Debug, Clone, Copy, Default)]
pub struct FileBackend;

fn path_of(locator: &Locator) -> TransportResult<&std::path::Path> {
    match locator {
        Locator::File { path } => Ok(path),
        other => Err(TransportError::invalid_uri(
            &other.to_string(),
            "not a file location",
        )),
    }
}

#[async_trait]
impl Backend for FileBackend {
    async fn fetch(&self, locator: &Locator) -> TransportResult<Bytes> {
        let path = path_of(locator)?;
        let data = tokio::fs::read(path).await.map_err(|source| TransportError::Io {
            uri: locator.to_string(),
            source,
        })?;
        Ok(Bytes::from(data))
    }

    async fn store(&self, locator: &Locator, data: Bytes) -> TransportResult<()> {
        let path = path_of(locator)?;
        let io_err = |source: std::io::Error| TransportError::Io {
            uri: locator.to_string(),
            source,
        };

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(FILE_MODE);

        let mut file = options.open(path).await.map_err(io_err)?;
        file.write_all(&data).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        // create mode is masked by umask and ignored on overwrite
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(FILE_MODE))
                .await
                .map_err(io_err)?;
        }
        Ok(())
    }
}
