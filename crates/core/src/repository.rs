//! Receipt repository: ownership-gated record operations.
//!
//! Every user-facing operation takes the caller's account id and enforces
//! it against the record's owner. The checks are ordered deliberately:
//! existence first (`NotFound`), ownership second (`Unauthorized`), so a
//! caller probing a missing id always sees `NotFound`.
//!
//! Mutations carry the version read during the ownership check and execute
//! as compare-and-swap in the store; a lost race surfaces as `Conflict`
//! instead of silently overwriting.

use std::sync::Arc;

use uuid::Uuid;

use crate::blob::BlobStore;
use crate::error::{CoreError, CoreResult};
use crate::model::{AccountId, ExtractedData, Receipt, ReceiptStatus};
use crate::store::{NewReceipt, ReceiptStore};

#[derive(Clone)]
pub struct ReceiptRepository {
    store: Arc<dyn ReceiptStore>,
    blobs: Arc<dyn BlobStore>,
}

impl ReceiptRepository {
    pub fn new(store: Arc<dyn ReceiptStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    /// Create a record for a freshly stored file. Creation is always
    /// self-owned, so there is no ownership check; status starts at
    /// `pending` with no extracted fields.
    pub async fn create(&self, new: NewReceipt) -> CoreResult<Receipt> {
        if new.size < 0 {
            return Err(CoreError::Validation(
                "file size must be non-negative".to_string(),
            ));
        }

        let receipt = self.store.insert(new).await?;
        tracing::info!(
            receipt_id = %receipt.id,
            owner = %receipt.owner,
            file_id = %receipt.file_id,
            size = receipt.size,
            "Receipt created"
        );
        Ok(receipt)
    }

    /// All receipts owned by the caller, newest upload first. The owner
    /// filter is applied server-side and never trusted from client input.
    pub async fn list_by_owner(&self, caller: &AccountId) -> CoreResult<Vec<Receipt>> {
        self.store.list_by_owner(caller).await
    }

    /// Fetch one receipt, enforcing existence before ownership.
    pub async fn get_by_id(&self, id: Uuid, caller: &AccountId) -> CoreResult<Receipt> {
        let receipt = self.store.fetch(id).await?.ok_or(CoreError::NotFound)?;
        if &receipt.owner != caller {
            return Err(CoreError::Unauthorized);
        }
        Ok(receipt)
    }

    /// Set the status of a receipt, validating the transition against the
    /// closed state machine.
    pub async fn update_status(
        &self,
        id: Uuid,
        caller: &AccountId,
        new_status: ReceiptStatus,
    ) -> CoreResult<Receipt> {
        let receipt = self.get_by_id(id, caller).await?;

        if !receipt.status.can_transition_to(new_status) {
            return Err(CoreError::Validation(format!(
                "cannot move receipt from '{}' to '{}'",
                receipt.status, new_status
            )));
        }

        let updated = self
            .store
            .update_status(id, receipt.version, new_status)
            .await?;
        if !updated {
            return Err(CoreError::Conflict { receipt_id: id });
        }

        tracing::info!(
            receipt_id = %id,
            from = %receipt.status,
            to = %new_status,
            "Receipt status updated"
        );
        self.store.fetch(id).await?.ok_or(CoreError::NotFound)
    }

    /// Delete a receipt and its backing file as one logical operation.
    ///
    /// The blob goes first: if that fails, the record stays and the whole
    /// pair remains retryable. A record-delete failure after the blob is
    /// gone leaves an orphaned record, which is logged for reconciliation
    /// and reported as an error rather than success.
    pub async fn delete(&self, id: Uuid, caller: &AccountId) -> CoreResult<()> {
        let receipt = self.get_by_id(id, caller).await?;

        self.blobs.delete(&receipt.file_id).await?;

        match self.store.delete(id).await {
            Ok(_) => {
                tracing::info!(
                    receipt_id = %id,
                    file_id = %receipt.file_id,
                    "Receipt and file deleted"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    receipt_id = %id,
                    file_id = %receipt.file_id,
                    error = %e,
                    "Record deletion failed after its file was removed; needs reconciliation"
                );
                Err(CoreError::Orphaned {
                    receipt_id: id,
                    file_id: receipt.file_id,
                })
            }
        }
    }

    /// Resolve a download URL for a receipt's file. The caller must own
    /// the receipt; the file id alone is not treated as authorization.
    pub async fn download_url(&self, id: Uuid, caller: &AccountId) -> CoreResult<Option<String>> {
        let receipt = self.get_by_id(id, caller).await?;
        self.blobs.resolve_download_url(&receipt.file_id).await
    }
}

/// Privileged write path for the extraction pipeline.
///
/// Deliberately a separate capability from [`ReceiptRepository`]: the
/// extraction actor runs with system privilege and bypasses the owner
/// check, so this type must only be reachable from internal surfaces.
#[derive(Clone)]
pub struct ExtractionSink {
    store: Arc<dyn ReceiptStore>,
}

impl ExtractionSink {
    pub fn new(store: Arc<dyn ReceiptStore>) -> Self {
        Self { store }
    }

    /// Attach the full extracted-data set and mark the receipt
    /// `processed`. Returns the owner id so the caller knows who to
    /// notify.
    pub async fn attach_extracted_data(
        &self,
        id: Uuid,
        data: ExtractedData,
    ) -> CoreResult<AccountId> {
        let receipt = self.store.fetch(id).await?.ok_or(CoreError::NotFound)?;

        let applied = self
            .store
            .apply_extraction(id, receipt.version, &data)
            .await?;
        if !applied {
            return Err(CoreError::Conflict { receipt_id: id });
        }

        tracing::info!(
            receipt_id = %id,
            owner = %receipt.owner,
            merchant = %data.merchant_name,
            items = data.items.len(),
            "Extracted data attached"
        );
        Ok(receipt.owner)
    }
}
