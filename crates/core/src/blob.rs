//! Blob store adapter.
//!
//! Wraps the external storage service behind the [`BlobStore`] trait:
//! one-time upload URLs, byte transfer, download-URL resolution, and
//! idempotent delete. The service is treated as an opaque content store;
//! once `put_bytes` returns a file id, that id is assumed durable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::error::{CoreError, CoreResult};

/// The storage service allows up to 5 minutes for a PUT to complete.
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for control-plane calls (URL generation, resolution, delete).
const CONTROL_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Generate a one-time upload URL. Valid for a bounded window; an
    /// expired or reused URL fails the subsequent transfer with a
    /// retryable error.
    async fn create_upload_url(&self) -> CoreResult<String>;

    /// Push bytes to an upload URL and return the stored file id.
    async fn put_bytes(
        &self,
        upload_url: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> CoreResult<String>;

    /// Resolve a file id to a downloadable URL, `None` if the object no
    /// longer exists.
    async fn resolve_download_url(&self, file_id: &str) -> CoreResult<Option<String>>;

    /// Delete a stored file. Idempotent: deleting an id that is already
    /// gone is not an error.
    async fn delete(&self, file_id: &str) -> CoreResult<()>;
}

#[derive(Deserialize)]
struct UploadUrlResponse {
    #[serde(rename = "uploadUrl")]
    upload_url: String,
}

#[derive(Deserialize)]
struct StoredFileResponse {
    #[serde(rename = "storageId")]
    storage_id: String,
}

#[derive(Deserialize)]
struct DownloadUrlResponse {
    url: String,
}

/// HTTP implementation of [`BlobStore`] against the storage service API.
#[derive(Clone)]
pub struct HttpBlobStore {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Map a non-success status: client errors are application failures,
    /// everything else is a retryable transport problem.
    fn status_error(operation: &'static str, status: StatusCode) -> CoreError {
        if status.is_client_error() {
            CoreError::Validation(format!("{operation} rejected with status {status}"))
        } else {
            CoreError::Transient {
                operation,
                message: format!("unexpected status {status}"),
            }
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn create_upload_url(&self) -> CoreResult<String> {
        let response = self
            .http
            .post(format!("{}/upload-urls", self.base_url))
            .timeout(CONTROL_TIMEOUT)
            .send()
            .await
            .map_err(|e| CoreError::transient("create_upload_url", e))?;

        if !response.status().is_success() {
            return Err(Self::status_error("create_upload_url", response.status()));
        }

        let body: UploadUrlResponse = response
            .json()
            .await
            .map_err(|e| CoreError::transient("create_upload_url", e))?;
        Ok(body.upload_url)
    }

    async fn put_bytes(
        &self,
        upload_url: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> CoreResult<String> {
        let content_length = bytes.len();
        let response = self
            .http
            .post(upload_url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::CONTENT_LENGTH, content_length)
            .body(bytes)
            .timeout(TRANSFER_TIMEOUT)
            .send()
            .await
            .map_err(|e| CoreError::transient("put_bytes", e))?;

        if !response.status().is_success() {
            // Expired/reused upload URLs land here; the caller may retry
            // with a fresh URL.
            return Err(CoreError::Transient {
                operation: "put_bytes",
                message: format!("upload failed with status {}", response.status()),
            });
        }

        let body: StoredFileResponse = response
            .json()
            .await
            .map_err(|e| CoreError::transient("put_bytes", e))?;

        tracing::debug!(
            file_id = %body.storage_id,
            bytes = content_length,
            "Stored blob"
        );
        Ok(body.storage_id)
    }

    async fn resolve_download_url(&self, file_id: &str) -> CoreResult<Option<String>> {
        let response = self
            .http
            .get(format!("{}/files/{}/url", self.base_url, file_id))
            .timeout(CONTROL_TIMEOUT)
            .send()
            .await
            .map_err(|e| CoreError::transient("resolve_download_url", e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::status_error(
                "resolve_download_url",
                response.status(),
            ));
        }

        let body: DownloadUrlResponse = response
            .json()
            .await
            .map_err(|e| CoreError::transient("resolve_download_url", e))?;
        Ok(Some(body.url))
    }

    async fn delete(&self, file_id: &str) -> CoreResult<()> {
        let response = self
            .http
            .delete(format!("{}/files/{}", self.base_url, file_id))
            .timeout(CONTROL_TIMEOUT)
            .send()
            .await
            .map_err(|e| CoreError::transient("delete_blob", e))?;

        // Already gone counts as deleted
        if response.status() == StatusCode::NOT_FOUND || response.status().is_success() {
            return Ok(());
        }

        Err(Self::status_error("delete_blob", response.status()))
    }
}

/// In-memory blob store with the same observable contract, used by the
/// core test suite.
#[derive(Default)]
pub struct MemoryBlobStore {
    files: RwLock<HashMap<String, Vec<u8>>>,
    next_id: AtomicU64,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs, for assertions.
    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn create_upload_url(&self) -> CoreResult<String> {
        let nonce = self.next_id.fetch_add(1, Ordering::Relaxed);
        Ok(format!("memory://upload/{nonce}"))
    }

    async fn put_bytes(
        &self,
        _upload_url: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> CoreResult<String> {
        let file_id = format!("file-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.files.write().await.insert(file_id.clone(), bytes);
        Ok(file_id)
    }

    async fn resolve_download_url(&self, file_id: &str) -> CoreResult<Option<String>> {
        Ok(self
            .files
            .read()
            .await
            .contains_key(file_id)
            .then(|| format!("memory://files/{file_id}")))
    }

    async fn delete(&self, file_id: &str) -> CoreResult<()> {
        self.files.write().await.remove(file_id);
        Ok(())
    }
}
