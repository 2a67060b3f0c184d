// Test file - these are expected patterns in test code
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Edge case tests for the receipt lifecycle.
//!
//! Exercises the repository, extraction sink, and upload orchestrator
//! against the in-memory store and blob fakes:
//! - ownership isolation between accounts
//! - NotFound-before-Unauthorized error ordering
//! - the pending/processed/failed state machine
//! - batch ingestion ordering and per-file failure isolation
//! - quota gate rejection
//! - blob-first delete and orphan avoidance

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::blob::{BlobStore, MemoryBlobStore};
use crate::entitlement::{EntitlementGate, QuotaStatus};
use crate::error::{CoreError, CoreResult};
use crate::memory::MemoryReceiptStore;
use crate::model::{AccountId, ExtractedData, LineItem, Receipt, ReceiptStatus};
use crate::repository::{ExtractionSink, ReceiptRepository};
use crate::store::{NewReceipt, ReceiptStore};
use crate::upload::{UploadFile, UploadService};

/// Gate that always answers with a fixed quota status.
struct StaticGate(QuotaStatus);

#[async_trait]
impl EntitlementGate for StaticGate {
    async fn check_quota(&self, _account: &AccountId, _feature: &str) -> CoreResult<QuotaStatus> {
        Ok(self.0)
    }
}

/// Blob store whose delete always fails, for orphan-path tests.
struct BrokenDeleteBlobStore(MemoryBlobStore);

#[async_trait]
impl BlobStore for BrokenDeleteBlobStore {
    async fn create_upload_url(&self) -> CoreResult<String> {
        self.0.create_upload_url().await
    }

    async fn put_bytes(
        &self,
        upload_url: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> CoreResult<String> {
        self.0.put_bytes(upload_url, bytes, content_type).await
    }

    async fn resolve_download_url(&self, file_id: &str) -> CoreResult<Option<String>> {
        self.0.resolve_download_url(file_id).await
    }

    async fn delete(&self, _file_id: &str) -> CoreResult<()> {
        Err(CoreError::Transient {
            operation: "delete_blob",
            message: "storage service unavailable".to_string(),
        })
    }
}

/// Store where a rival write lands between the caller's read and its
/// compare-and-swap, so every versioned mutation loses its race.
struct ContendedStore {
    inner: MemoryReceiptStore,
}

#[async_trait]
impl ReceiptStore for ContendedStore {
    async fn insert(&self, new: NewReceipt) -> CoreResult<Receipt> {
        self.inner.insert(new).await
    }

    async fn fetch(&self, id: Uuid) -> CoreResult<Option<Receipt>> {
        self.inner.fetch(id).await
    }

    async fn list_by_owner(&self, owner: &AccountId) -> CoreResult<Vec<Receipt>> {
        self.inner.list_by_owner(owner).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected_version: i64,
        status: ReceiptStatus,
    ) -> CoreResult<bool> {
        // The rival wins with the same version the caller read
        self.inner
            .update_status(id, expected_version, ReceiptStatus::Failed)
            .await?;
        self.inner.update_status(id, expected_version, status).await
    }

    async fn apply_extraction(
        &self,
        id: Uuid,
        expected_version: i64,
        data: &ExtractedData,
    ) -> CoreResult<bool> {
        self.inner
            .update_status(id, expected_version, ReceiptStatus::Failed)
            .await?;
        self.inner.apply_extraction(id, expected_version, data).await
    }

    async fn delete(&self, id: Uuid) -> CoreResult<bool> {
        self.inner.delete(id).await
    }
}

struct Harness {
    store: Arc<MemoryReceiptStore>,
    blobs: Arc<MemoryBlobStore>,
    repo: ReceiptRepository,
    uploads: UploadService,
    extraction: ExtractionSink,
}

fn harness_with_gate(gate: QuotaStatus) -> Harness {
    let store = Arc::new(MemoryReceiptStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let repo = ReceiptRepository::new(store.clone(), blobs.clone());
    let uploads = UploadService::new(
        repo.clone(),
        blobs.clone(),
        Arc::new(StaticGate(gate)),
        "scans",
    );
    let extraction = ExtractionSink::new(store.clone());
    Harness {
        store,
        blobs,
        repo,
        uploads,
        extraction,
    }
}

fn harness() -> Harness {
    harness_with_gate(QuotaStatus {
        enabled: true,
        used: 3,
        allocation: 50,
    })
}

fn pdf(name: &str) -> UploadFile {
    UploadFile {
        name: name.to_string(),
        mime_type: "application/pdf".to_string(),
        bytes: b"%PDF-1.4 test".to_vec(),
    }
}

fn sample_extraction() -> ExtractedData {
    ExtractedData {
        file_display_name: "Grocery run".to_string(),
        merchant_name: "Corner Market".to_string(),
        merchant_address: "1 Main St".to_string(),
        merchant_contact: "+1 555 0100".to_string(),
        transaction_date: "2026-08-20".to_string(),
        transaction_amount: "23.50".to_string(),
        currency: "USD".to_string(),
        receipt_summary: "Groceries".to_string(),
        items: vec![LineItem {
            name: "Apples".to_string(),
            quantity: 3.0,
            unit_price: 1.5,
            total_price: 4.5,
        }],
    }
}

async fn ingest_one(h: &Harness, account: &AccountId, name: &str) -> Uuid {
    let outcomes = h.uploads.ingest(account, vec![pdf(name)]).await.unwrap();
    assert!(outcomes[0].success, "ingest failed: {:?}", outcomes[0].error);
    outcomes[0].receipt_id.unwrap()
}

// =========================================================================
// Ownership isolation: a receipt owned by A is invisible and immutable to B
// =========================================================================
#[tokio::test]
async fn other_accounts_cannot_see_or_touch_a_receipt() {
    let h = harness();
    let alice = AccountId::new("acct_alice");
    let bob = AccountId::new("acct_bob");

    let id = ingest_one(&h, &alice, "lunch.pdf").await;

    assert!(h.repo.list_by_owner(&bob).await.unwrap().is_empty());

    assert!(matches!(
        h.repo.get_by_id(id, &bob).await.unwrap_err(),
        CoreError::Unauthorized
    ));
    assert!(matches!(
        h.repo
            .update_status(id, &bob, ReceiptStatus::Failed)
            .await
            .unwrap_err(),
        CoreError::Unauthorized
    ));
    assert!(matches!(
        h.repo.delete(id, &bob).await.unwrap_err(),
        CoreError::Unauthorized
    ));
    assert!(matches!(
        h.repo.download_url(id, &bob).await.unwrap_err(),
        CoreError::Unauthorized
    ));

    // The record is untouched for its owner
    let receipt = h.repo.get_by_id(id, &alice).await.unwrap();
    assert_eq!(receipt.status, ReceiptStatus::Pending);
}

// =========================================================================
// Probing a non-existent id yields NotFound, never Unauthorized
// =========================================================================
#[tokio::test]
async fn missing_receipt_is_not_found_before_any_ownership_check() {
    let h = harness();
    let bob = AccountId::new("acct_bob");
    let missing = Uuid::new_v4();

    assert!(matches!(
        h.repo.get_by_id(missing, &bob).await.unwrap_err(),
        CoreError::NotFound
    ));
    assert!(matches!(
        h.repo
            .update_status(missing, &bob, ReceiptStatus::Processed)
            .await
            .unwrap_err(),
        CoreError::NotFound
    ));
    assert!(matches!(
        h.repo.delete(missing, &bob).await.unwrap_err(),
        CoreError::NotFound
    ));
}

// =========================================================================
// create then get: pending status, no extracted fields
// =========================================================================
#[tokio::test]
async fn fresh_receipt_is_pending_with_no_extracted_fields() {
    let h = harness();
    let alice = AccountId::new("acct_alice");

    let id = ingest_one(&h, &alice, "receipt.pdf").await;
    let receipt = h.repo.get_by_id(id, &alice).await.unwrap();

    assert_eq!(receipt.status, ReceiptStatus::Pending);
    assert_eq!(receipt.version, 0);
    assert!(receipt.extracted.is_none());
    assert_eq!(receipt.file_name, "receipt.pdf");
    assert_eq!(receipt.mime_type, "application/pdf");
    assert!(receipt.size > 0);
}

// =========================================================================
// attach_extracted_data: processed status, all fields present, owner back
// =========================================================================
#[tokio::test]
async fn extraction_attaches_fields_and_reports_owner() {
    let h = harness();
    let alice = AccountId::new("acct_alice");
    let id = ingest_one(&h, &alice, "market.pdf").await;

    let owner = h
        .extraction
        .attach_extracted_data(id, sample_extraction())
        .await
        .unwrap();
    assert_eq!(owner, alice);

    let receipt = h.repo.get_by_id(id, &alice).await.unwrap();
    assert_eq!(receipt.status, ReceiptStatus::Processed);
    assert_eq!(receipt.extracted, Some(sample_extraction()));
}

#[tokio::test]
async fn extraction_on_missing_receipt_is_not_found() {
    let h = harness();
    let err = h
        .extraction
        .attach_extracted_data(Uuid::new_v4(), sample_extraction())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound));
}

// =========================================================================
// delete: record and file go together; second delete is NotFound
// =========================================================================
#[tokio::test]
async fn delete_removes_record_and_file() {
    let h = harness();
    let alice = AccountId::new("acct_alice");
    let id = ingest_one(&h, &alice, "old.pdf").await;
    let file_id = h.repo.get_by_id(id, &alice).await.unwrap().file_id;

    h.repo.delete(id, &alice).await.unwrap();

    assert!(matches!(
        h.repo.get_by_id(id, &alice).await.unwrap_err(),
        CoreError::NotFound
    ));
    assert_eq!(h.blobs.resolve_download_url(&file_id).await.unwrap(), None);

    // Idempotence from the caller's view: the second delete reports the
    // record gone instead of crashing
    assert!(matches!(
        h.repo.delete(id, &alice).await.unwrap_err(),
        CoreError::NotFound
    ));
}

#[tokio::test]
async fn failed_blob_delete_leaves_the_pair_intact() {
    let store = Arc::new(MemoryReceiptStore::new());
    let blobs = Arc::new(BrokenDeleteBlobStore(MemoryBlobStore::new()));
    let repo = ReceiptRepository::new(store.clone(), blobs.clone());
    let alice = AccountId::new("acct_alice");

    let receipt = repo
        .create(NewReceipt {
            owner: alice.clone(),
            file_id: "file-kept".to_string(),
            file_name: "kept.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size: 10,
        })
        .await
        .unwrap();

    let err = repo.delete(receipt.id, &alice).await.unwrap_err();
    assert!(matches!(err, CoreError::Transient { .. }));

    // Record still there, so the delete is retryable as a whole
    assert!(repo.get_by_id(receipt.id, &alice).await.is_ok());
}

// =========================================================================
// Status state machine through the repository
// =========================================================================
#[tokio::test]
async fn status_moves_forward_only() {
    let h = harness();
    let alice = AccountId::new("acct_alice");
    let id = ingest_one(&h, &alice, "walk.pdf").await;

    let updated = h
        .repo
        .update_status(id, &alice, ReceiptStatus::Processed)
        .await
        .unwrap();
    assert_eq!(updated.status, ReceiptStatus::Processed);
    assert_eq!(updated.version, 1);

    // processed is terminal
    for next in [
        ReceiptStatus::Pending,
        ReceiptStatus::Processed,
        ReceiptStatus::Failed,
    ] {
        assert!(matches!(
            h.repo.update_status(id, &alice, next).await.unwrap_err(),
            CoreError::Validation(_)
        ));
    }
}

#[tokio::test]
async fn pending_can_be_marked_failed() {
    let h = harness();
    let alice = AccountId::new("acct_alice");
    let id = ingest_one(&h, &alice, "blurry.pdf").await;

    let updated = h
        .repo
        .update_status(id, &alice, ReceiptStatus::Failed)
        .await
        .unwrap();
    assert_eq!(updated.status, ReceiptStatus::Failed);
}

// =========================================================================
// Lost compare-and-swap races surface as Conflict, never a silent overwrite
// =========================================================================
#[tokio::test]
async fn lost_status_race_is_reported_as_conflict() {
    let store = Arc::new(ContendedStore {
        inner: MemoryReceiptStore::new(),
    });
    let repo = ReceiptRepository::new(store.clone(), Arc::new(MemoryBlobStore::new()));
    let alice = AccountId::new("acct_alice");

    let receipt = repo
        .create(NewReceipt {
            owner: alice.clone(),
            file_id: "file-raced".to_string(),
            file_name: "raced.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size: 10,
        })
        .await
        .unwrap();

    let err = repo
        .update_status(receipt.id, &alice, ReceiptStatus::Processed)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict { receipt_id } if receipt_id == receipt.id));

    // The rival's write stands, untouched by the losing caller
    let current = store.fetch(receipt.id).await.unwrap().unwrap();
    assert_eq!(current.status, ReceiptStatus::Failed);
    assert_eq!(current.version, receipt.version + 1);
}

#[tokio::test]
async fn lost_extraction_race_is_reported_as_conflict() {
    let store = Arc::new(ContendedStore {
        inner: MemoryReceiptStore::new(),
    });
    let repo = ReceiptRepository::new(store.clone(), Arc::new(MemoryBlobStore::new()));
    let extraction = ExtractionSink::new(store.clone());
    let alice = AccountId::new("acct_alice");

    let receipt = repo
        .create(NewReceipt {
            owner: alice.clone(),
            file_id: "file-raced".to_string(),
            file_name: "raced.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size: 10,
        })
        .await
        .unwrap();

    let err = extraction
        .attach_extracted_data(receipt.id, sample_extraction())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict { receipt_id } if receipt_id == receipt.id));

    let current = store.fetch(receipt.id).await.unwrap().unwrap();
    assert!(current.extracted.is_none());
}

// =========================================================================
// Batch ingestion: order preserved, per-file failures isolated
// =========================================================================
#[tokio::test]
async fn mixed_batch_keeps_order_and_isolates_the_bad_file() {
    let h = harness();
    let alice = AccountId::new("acct_alice");

    let files = vec![
        pdf("january.pdf"),
        UploadFile {
            name: "notes.txt".to_string(),
            mime_type: "text/plain".to_string(),
            bytes: b"not a pdf".to_vec(),
        },
        pdf("february.pdf"),
    ];

    let outcomes = h.uploads.ingest(&alice, files).await.unwrap();

    assert_eq!(outcomes.len(), 3);
    assert_eq!(
        outcomes.iter().map(|o| o.file_name.as_str()).collect::<Vec<_>>(),
        vec!["january.pdf", "notes.txt", "february.pdf"]
    );
    assert!(outcomes[0].success);
    assert!(!outcomes[1].success);
    assert!(outcomes[2].success);
    assert_eq!(
        outcomes[1].error.as_deref(),
        Some("Only PDF files are allowed")
    );

    // Exactly the two good files became records
    assert_eq!(h.repo.list_by_owner(&alice).await.unwrap().len(), 2);
    assert_eq!(h.blobs.len().await, 2);
}

#[tokio::test]
async fn pdf_extension_is_accepted_despite_generic_mime_type() {
    let h = harness();
    let alice = AccountId::new("acct_alice");

    let outcomes = h
        .uploads
        .ingest(
            &alice,
            vec![UploadFile {
                name: "Scan_0042.PDF".to_string(),
                mime_type: "application/octet-stream".to_string(),
                bytes: b"%PDF-1.7".to_vec(),
            }],
        )
        .await
        .unwrap();

    assert!(outcomes[0].success);
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let h = harness();
    let alice = AccountId::new("acct_alice");

    let err = h.uploads.ingest(&alice, vec![]).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(msg) if msg == "No file provided"));
}

#[tokio::test]
async fn successful_ingest_returns_a_download_url() {
    let h = harness();
    let alice = AccountId::new("acct_alice");

    let outcomes = h
        .uploads
        .ingest(&alice, vec![pdf("with-url.pdf")])
        .await
        .unwrap();
    assert!(outcomes[0].file_url.is_some());
}

// =========================================================================
// Quota gate: disabled feature rejects the whole batch before any upload
// =========================================================================
#[tokio::test]
async fn disabled_quota_rejects_whole_batch_with_allocation() {
    let h = harness_with_gate(QuotaStatus {
        enabled: false,
        used: 50,
        allocation: 50,
    });
    let alice = AccountId::new("acct_alice");

    let err = h
        .uploads
        .ingest(&alice, vec![pdf("a.pdf"), pdf("b.pdf"), pdf("c.pdf")])
        .await
        .unwrap_err();

    match err {
        CoreError::QuotaExceeded { used, allocation } => {
            assert_eq!(used, 50);
            assert_eq!(allocation, 50);
        }
        other => panic!("expected QuotaExceeded, got {other:?}"),
    }

    // Nothing was persisted anywhere
    assert!(h.repo.list_by_owner(&alice).await.unwrap().is_empty());
    assert!(h.blobs.is_empty().await);
    assert!(h.store.fetch(Uuid::new_v4()).await.unwrap().is_none());
}
