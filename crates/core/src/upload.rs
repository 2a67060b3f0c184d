//! Upload orchestrator.
//!
//! Sequences one logical "ingest a PDF batch" operation: structural
//! validation, a single entitlement check per batch, then per file an
//! upload URL, the byte transfer, record creation, and download-URL
//! resolution. Files are processed sequentially in submission order and
//! failures are isolated per file; only the quota gate rejects a whole
//! batch.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::blob::BlobStore;
use crate::entitlement::EntitlementGate;
use crate::error::{CoreError, CoreResult};
use crate::model::AccountId;
use crate::repository::ReceiptRepository;
use crate::store::NewReceipt;

/// One in-memory file payload submitted for ingestion.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Structural PDF check: declared MIME type mentions pdf, or the file
    /// name carries a .pdf extension. Runs before any network call.
    fn looks_like_pdf(&self) -> bool {
        self.mime_type.to_ascii_lowercase().contains("pdf")
            || self.name.to_ascii_lowercase().ends_with(".pdf")
    }
}

/// Per-file ingest result, in submission order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_id: Option<Uuid>,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadOutcome {
    fn success(file_name: String, receipt_id: Uuid, file_url: Option<String>) -> Self {
        Self {
            success: true,
            receipt_id: Some(receipt_id),
            file_name,
            file_url,
            error: None,
        }
    }

    fn failure(file_name: String, error: String) -> Self {
        Self {
            success: false,
            receipt_id: None,
            file_name,
            file_url: None,
            error: Some(error),
        }
    }
}

#[derive(Clone)]
pub struct UploadService {
    repository: ReceiptRepository,
    blobs: Arc<dyn BlobStore>,
    gate: Arc<dyn EntitlementGate>,
    feature_key: String,
}

impl UploadService {
    pub fn new(
        repository: ReceiptRepository,
        blobs: Arc<dyn BlobStore>,
        gate: Arc<dyn EntitlementGate>,
        feature_key: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            blobs,
            gate,
            feature_key: feature_key.into(),
        }
    }

    /// Ingest a batch of files for one account.
    ///
    /// The quota is checked exactly once per batch, before any bytes move;
    /// a disabled feature rejects the whole batch with the current
    /// allocation. After the gate, each file stands alone: a failure at
    /// upload or record creation produces a per-file failure outcome and
    /// never rolls back earlier files.
    pub async fn ingest(
        &self,
        account: &AccountId,
        files: Vec<UploadFile>,
    ) -> CoreResult<Vec<UploadOutcome>> {
        if files.is_empty() {
            return Err(CoreError::Validation("No file provided".to_string()));
        }

        let quota = self.gate.check_quota(account, &self.feature_key).await?;
        if !quota.enabled {
            tracing::warn!(
                account = %account,
                used = quota.used,
                allocation = quota.allocation,
                "Upload batch rejected by entitlement gate"
            );
            return Err(CoreError::QuotaExceeded {
                used: quota.used,
                allocation: quota.allocation,
            });
        }

        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            outcomes.push(self.ingest_one(account, file).await);
        }
        Ok(outcomes)
    }

    async fn ingest_one(&self, account: &AccountId, file: UploadFile) -> UploadOutcome {
        if file.name.is_empty() || file.bytes.is_empty() {
            return UploadOutcome::failure(file.name, "No file provided".to_string());
        }
        if !file.looks_like_pdf() {
            return UploadOutcome::failure(file.name, "Only PDF files are allowed".to_string());
        }

        match self.store_and_record(account, &file).await {
            Ok((receipt_id, file_url)) => {
                tracing::info!(
                    account = %account,
                    receipt_id = %receipt_id,
                    file_name = %file.name,
                    "File ingested"
                );
                UploadOutcome::success(file.name, receipt_id, file_url)
            }
            Err(e) => {
                tracing::warn!(
                    account = %account,
                    file_name = %file.name,
                    error = %e,
                    "File ingest failed"
                );
                UploadOutcome::failure(file.name, e.to_string())
            }
        }
    }

    async fn store_and_record(
        &self,
        account: &AccountId,
        file: &UploadFile,
    ) -> CoreResult<(Uuid, Option<String>)> {
        let upload_url = self.blobs.create_upload_url().await?;
        let file_id = self
            .blobs
            .put_bytes(&upload_url, file.bytes.clone(), &file.mime_type)
            .await?;

        let receipt = self
            .repository
            .create(NewReceipt {
                owner: account.clone(),
                file_id: file_id.clone(),
                file_name: file.name.clone(),
                mime_type: file.mime_type.clone(),
                size: file.bytes.len() as i64,
            })
            .await?;

        // TODO: hand the receipt off to the extraction pipeline once it
        // exists; it will call back through ExtractionSink.

        let file_url = self.blobs.resolve_download_url(&file_id).await?;
        Ok((receipt.id, file_url))
    }
}
