//! In-memory receipt store.
//!
//! Backs the core test suite; same observable semantics as
//! [`PgReceiptStore`](crate::store::PgReceiptStore), including the
//! compare-and-swap version checks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::model::{AccountId, ExtractedData, Receipt, ReceiptStatus};
use crate::store::{NewReceipt, ReceiptStore};

#[derive(Default)]
pub struct MemoryReceiptStore {
    // Insertion sequence breaks ties when uploads land in the same instant
    records: RwLock<HashMap<Uuid, (u64, Receipt)>>,
    seq: AtomicU64,
}

impl MemoryReceiptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReceiptStore for MemoryReceiptStore {
    async fn insert(&self, new: NewReceipt) -> CoreResult<Receipt> {
        let receipt = Receipt {
            id: Uuid::new_v4(),
            owner: new.owner,
            file_id: new.file_id,
            file_name: new.file_name,
            mime_type: new.mime_type,
            size: new.size,
            status: ReceiptStatus::Pending,
            version: 0,
            uploaded_at: OffsetDateTime::now_utc(),
            extracted: None,
        };

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.records
            .write()
            .await
            .insert(receipt.id, (seq, receipt.clone()));
        Ok(receipt)
    }

    async fn fetch(&self, id: Uuid) -> CoreResult<Option<Receipt>> {
        Ok(self
            .records
            .read()
            .await
            .get(&id)
            .map(|(_, r)| r.clone()))
    }

    async fn list_by_owner(&self, owner: &AccountId) -> CoreResult<Vec<Receipt>> {
        let records = self.records.read().await;
        let mut matching: Vec<(u64, Receipt)> = records
            .values()
            .filter(|(_, r)| &r.owner == owner)
            .cloned()
            .collect();
        matching.sort_by(|(sa, a), (sb, b)| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| sb.cmp(sa))
        });
        Ok(matching.into_iter().map(|(_, r)| r).collect())
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected_version: i64,
        status: ReceiptStatus,
    ) -> CoreResult<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(&id) {
            Some((_, r)) if r.version == expected_version => {
                r.status = status;
                r.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn apply_extraction(
        &self,
        id: Uuid,
        expected_version: i64,
        data: &ExtractedData,
    ) -> CoreResult<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(&id) {
            Some((_, r)) if r.version == expected_version => {
                r.extracted = Some(data.clone());
                r.status = ReceiptStatus::Processed;
                r.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> CoreResult<bool> {
        Ok(self.records.write().await.remove(&id).is_some())
    }
}
