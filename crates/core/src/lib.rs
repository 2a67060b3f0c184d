// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Recibo receipt lifecycle core.
//!
//! Owns receipt records, their storage-backed files, the status state
//! machine, and the access-control rules that gate every read and write by
//! account ownership and usage entitlement.
//!
//! ## Components
//!
//! - **Receipt repository**: create, list, get, update-status, delete;
//!   every operation ownership-checked, mutations versioned
//! - **Extraction sink**: the privileged path the extraction pipeline uses
//!   to attach structured data
//! - **Upload orchestrator**: batch PDF ingestion behind the quota gate
//! - **Entitlement gate**: enabled/used/allocation queries against the
//!   external entitlement service
//! - **Temporary access issuer**: short-lived tokens for the embedded
//!   entitlement UI
//! - **Blob store adapter**: one-time upload URLs, transfers, download
//!   URLs, deletes

pub mod access_token;
pub mod blob;
pub mod entitlement;
pub mod error;
pub mod memory;
pub mod model;
pub mod repository;
pub mod store;
pub mod upload;

#[cfg(test)]
mod edge_case_tests;

pub use access_token::TokenIssuer;
pub use blob::{BlobStore, HttpBlobStore, MemoryBlobStore};
pub use entitlement::{EntitlementClient, EntitlementConfig, EntitlementGate, QuotaStatus};
pub use error::{CoreError, CoreResult};
pub use memory::MemoryReceiptStore;
pub use model::{AccountId, ExtractedData, LineItem, Receipt, ReceiptStatus};
pub use repository::{ExtractionSink, ReceiptRepository};
pub use store::{NewReceipt, PgReceiptStore, ReceiptStore};
pub use upload::{UploadFile, UploadOutcome, UploadService};

use std::sync::Arc;

use sqlx::PgPool;

/// Configuration for the core's external collaborators.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Base URL of the blob storage service.
    pub blob_base_url: String,
    /// Entitlement service endpoint and API key.
    pub entitlement: EntitlementConfig,
    /// Metered feature gating uploads (e.g. "scans").
    pub feature_key: String,
}

/// Main entry point combining the receipt lifecycle services.
pub struct ReceiptCore {
    pub receipts: ReceiptRepository,
    pub uploads: UploadService,
    pub extraction: ExtractionSink,
    pub tokens: TokenIssuer,
}

impl ReceiptCore {
    /// Wire the production services: Postgres records, HTTP blob store,
    /// HTTP entitlement client. Fails fast on a missing entitlement key.
    pub fn new(config: CoreConfig, pool: PgPool) -> CoreResult<Self> {
        let store: Arc<dyn ReceiptStore> = Arc::new(PgReceiptStore::new(pool));
        let blobs: Arc<dyn BlobStore> = Arc::new(HttpBlobStore::new(&config.blob_base_url));
        let entitlements = Arc::new(EntitlementClient::new(config.entitlement)?);

        let receipts = ReceiptRepository::new(store.clone(), blobs.clone());
        let uploads = UploadService::new(
            receipts.clone(),
            blobs,
            entitlements.clone(),
            config.feature_key,
        );
        let extraction = ExtractionSink::new(store);
        let tokens = TokenIssuer::new(entitlements);

        Ok(Self {
            receipts,
            uploads,
            extraction,
            tokens,
        })
    }
}
