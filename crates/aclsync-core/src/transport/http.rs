//! HTTP(S) backend: GET to fetch, PUT to store.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use super::{Backend, Locator, TransportError, TransportResult};

/// Content type sent with uploaded bundles.
pub const BUNDLE_CONTENT_TYPE: &str = "binary/octet-stream";

const MAX_ERROR_BODY_BYTES: usize = 4096;
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(timeout: Duration) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("aclsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                TransportError::transport("http", format!("failed to build client: {e}"))
            })?;
        Ok(Self { client })
    }

    fn url<'a>(locator: &'a Locator) -> TransportResult<&'a url::Url> {
        match locator {
            Locator::Http { url } => Ok(url),
            other => Err(TransportError::invalid_uri(
                &other.to_string(),
                "not an http(s) location",
            )),
        }
    }

    async fn check(response: reqwest::Response) -> TransportResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let uri = response.url().to_string();
        let body = body_prefix(response, MAX_ERROR_BODY_BYTES).await;
        let body = body.trim();
        let message = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {}", truncate(body, MAX_ERROR_BODY_CHARS))
        };
        Err(TransportError::transport(uri, message))
    }
}

/// First `max` bytes of an error response body; the rest is never read.
async fn body_prefix(mut response: reqwest::Response, max: usize) -> String {
    let mut body = Vec::new();
    while body.len() < max {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(max - body.len());
                body.extend_from_slice(&chunk[..take]);
            }
            Ok(None) | Err(_) => break,
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn fetch(&self, locator: &Locator) -> TransportResult<Bytes> {
        let url = Self::url(locator)?;
        debug!(uri = %url, "GET");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TransportError::transport(url, e))?;
        let response = Self::check(response).await?;
        response
            .bytes()
            .await
            .map_err(|e| TransportError::transport(url, e))
    }

    async fn store(&self, locator: &Locator, data: Bytes) -> TransportResult<()> {
        let url = Self::url(locator)?;
        debug!(uri = %url, bytes = data.len(), "PUT");
        let response = self
            .client
            .put(url.clone())
            .header(CONTENT_TYPE, BUNDLE_CONTENT_TYPE)
            .body(data)
            .send()
            .await
            .map_err(|e| TransportError::transport(url, e))?;
        Self::check(response).await?;
        Ok(())
    }
}
