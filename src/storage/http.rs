//! HTTP(S) storage backend adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use tokio::sync::Mutex;
use url::Url;

use crate::config::Config;
use crate::storage::{Layout, Storage, StorageError};

/// Fixed per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Keep-alive pool bounds.
const MAX_IDLE_PER_HOST: usize = 10;
const IDLE_CONN_TIMEOUT: Duration = Duration::from_secs(90);

const OCTET_STREAM: &str = "application/octet-stream";

/// Storage adapter speaking HTTP against the configured endpoint.
///
/// Owns one long-lived client whose connection pool is reused across
/// requests. All operations are serialized behind `op_lock`: at most one
/// HTTP call is in flight system-wide. This is the primary throughput
/// ceiling of the helper; local clients are few and ccache tolerates
/// single-request-at-a-time storage.
pub struct HttpStorage {
    client: reqwest::Client,
    base_url: Url,
    layout: Layout,
    bearer_token: Option<String>,
    extra_headers: Vec<(String, String)>,
    op_lock: Mutex<()>,
}

impl HttpStorage {
    /// Create the adapter from startup configuration.
    pub fn new(config: &Config) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .pool_idle_timeout(IDLE_CONN_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            layout: config.layout,
            bearer_token: config.bearer_token.clone(),
            extra_headers: config.headers.clone(),
            op_lock: Mutex::new(()),
        })
    }

    /// Join the base path and the layout path with exactly one `/`.
    fn object_url(&self, key: &[u8]) -> Url {
        let path = self.layout.key_path(key);
        let mut url = self.base_url.clone();
        let base_path = url.path();
        let joined = if base_path.ends_with('/') {
            format!("{base_path}{path}")
        } else {
            format!("{base_path}/{path}")
        };
        url.set_path(&joined);
        url
    }

    /// Headers for one outgoing request. Extra headers are inserted last so
    /// they can override the defaults, including the PUT content type.
    fn request_headers(&self, content_type: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        if let Some(token) = &self.bearer_token {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!("bearer token is not a valid header value, skipping"),
            }
        }
        for (name, value) in &self.extra_headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "skipping invalid extra header"),
            }
        }
        headers
    }

    /// HEAD probe used by the non-overwrite PUT pre-check. Caller holds the
    /// operation lock. Check-then-write is not atomic against writers in
    /// other helper processes; the backend contract accepts that.
    async fn exists(&self, url: Url) -> Result<bool, StorageError> {
        let resp = self
            .client
            .head(url)
            .headers(self.request_headers(None))
            .send()
            .await?;
        let status = resp.status();
        drain(resp).await;
        Ok(status.is_success())
    }
}

#[async_trait]
impl Storage for HttpStorage {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let _guard = self.op_lock.lock().await;
        let url = self.object_url(key);

        tracing::debug!(%url, "GET");
        let resp = self
            .client
            .get(url)
            .headers(self.request_headers(None))
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            drain(resp).await;
            return Ok(None);
        }
        if !status.is_success() {
            drain(resp).await;
            return Err(StorageError::Status(status.as_u16()));
        }

        Ok(Some(resp.bytes().await?.to_vec()))
    }

    async fn put(&self, key: &[u8], value: &[u8], overwrite: bool) -> Result<bool, StorageError> {
        let _guard = self.op_lock.lock().await;
        let url = self.object_url(key);

        if !overwrite && self.exists(url.clone()).await? {
            return Ok(false);
        }

        tracing::debug!(%url, bytes = value.len(), "PUT");
        let resp = self
            .client
            .put(url)
            .headers(self.request_headers(Some(OCTET_STREAM)))
            .body(value.to_vec())
            .send()
            .await?;

        let status = resp.status();
        drain(resp).await;
        if status.is_success() {
            Ok(true)
        } else {
            Err(StorageError::Status(status.as_u16()))
        }
    }

    async fn remove(&self, key: &[u8]) -> Result<bool, StorageError> {
        let _guard = self.op_lock.lock().await;
        let url = self.object_url(key);

        tracing::debug!(%url, "DELETE");
        let resp = self
            .client
            .delete(url)
            .headers(self.request_headers(None))
            .send()
            .await?;

        let status = resp.status();
        drain(resp).await;
        if status == StatusCode::NOT_FOUND {
            Ok(false)
        } else if status.is_success() {
            Ok(true)
        } else {
            Err(StorageError::Status(status.as_u16()))
        }
    }
}

/// Read and discard a response body so the connection can be reused.
async fn drain(resp: reqwest::Response) {
    let _ = resp.bytes().await;
}
