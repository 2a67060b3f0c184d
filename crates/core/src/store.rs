//! Receipt record persistence.
//!
//! The [`ReceiptStore`] trait is the seam between the repository's
//! ownership/state-machine rules and the backing record store. The store
//! itself is intentionally dumb: misses come back as `None`/`false`, never
//! as authorization errors. Ownership is the repository's job.
//!
//! Mutations are compare-and-swap on `(id, version)` so concurrent writers
//! surface as a lost race instead of silently overwriting each other.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::model::{AccountId, ExtractedData, LineItem, Receipt, ReceiptStatus};

/// Fields required to create a receipt record.
#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub owner: AccountId,
    pub file_id: String,
    pub file_name: String,
    pub mime_type: String,
    pub size: i64,
}

/// Record store for receipts.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    /// Insert a new record in `pending` status and return it.
    async fn insert(&self, new: NewReceipt) -> CoreResult<Receipt>;

    /// Fetch a record by id, `None` if it does not exist.
    async fn fetch(&self, id: Uuid) -> CoreResult<Option<Receipt>>;

    /// All records for one owner, newest upload first.
    async fn list_by_owner(&self, owner: &AccountId) -> CoreResult<Vec<Receipt>>;

    /// Set the status if the record still has `expected_version`.
    /// Returns `false` when the version check lost the race.
    async fn update_status(
        &self,
        id: Uuid,
        expected_version: i64,
        status: ReceiptStatus,
    ) -> CoreResult<bool>;

    /// Attach the full extracted-data set and flip status to `processed`,
    /// if the record still has `expected_version`.
    async fn apply_extraction(
        &self,
        id: Uuid,
        expected_version: i64,
        data: &ExtractedData,
    ) -> CoreResult<bool>;

    /// Delete the record. Returns `false` if it was already gone.
    async fn delete(&self, id: Uuid) -> CoreResult<bool>;
}

/// Row type for the `receipts` table.
#[derive(Debug, sqlx::FromRow)]
struct ReceiptRow {
    id: Uuid,
    owner_id: String,
    file_id: String,
    file_name: String,
    mime_type: String,
    size: i64,
    status: String,
    version: i64,
    uploaded_at: OffsetDateTime,
    file_display_name: Option<String>,
    merchant_name: Option<String>,
    merchant_address: Option<String>,
    merchant_contact: Option<String>,
    transaction_date: Option<String>,
    transaction_amount: Option<String>,
    currency: Option<String>,
    receipt_summary: Option<String>,
    items: Option<Json<Vec<LineItem>>>,
}

impl ReceiptRow {
    fn into_receipt(self) -> CoreResult<Receipt> {
        let status: ReceiptStatus = self
            .status
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;

        // Extraction sets every field at once, so the display name doubles
        // as the presence marker for the whole set.
        let extracted = self.file_display_name.map(|file_display_name| ExtractedData {
            file_display_name,
            merchant_name: self.merchant_name.unwrap_or_default(),
            merchant_address: self.merchant_address.unwrap_or_default(),
            merchant_contact: self.merchant_contact.unwrap_or_default(),
            transaction_date: self.transaction_date.unwrap_or_default(),
            transaction_amount: self.transaction_amount.unwrap_or_default(),
            currency: self.currency.unwrap_or_default(),
            receipt_summary: self.receipt_summary.unwrap_or_default(),
            items: self.items.map(|j| j.0).unwrap_or_default(),
        });

        Ok(Receipt {
            id: self.id,
            owner: AccountId::new(self.owner_id),
            file_id: self.file_id,
            file_name: self.file_name,
            mime_type: self.mime_type,
            size: self.size,
            status,
            version: self.version,
            uploaded_at: self.uploaded_at,
            extracted,
        })
    }
}

/// Postgres-backed receipt store.
#[derive(Clone)]
pub struct PgReceiptStore {
    pool: PgPool,
}

impl PgReceiptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReceiptStore for PgReceiptStore {
    async fn insert(&self, new: NewReceipt) -> CoreResult<Receipt> {
        let row: ReceiptRow = sqlx::query_as(
            r#"
            INSERT INTO receipts (owner_id, file_id, file_name, mime_type, size, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            RETURNING *
            "#,
        )
        .bind(new.owner.as_str())
        .bind(&new.file_id)
        .bind(&new.file_name)
        .bind(&new.mime_type)
        .bind(new.size)
        .fetch_one(&self.pool)
        .await?;

        row.into_receipt()
    }

    async fn fetch(&self, id: Uuid) -> CoreResult<Option<Receipt>> {
        let row: Option<ReceiptRow> = sqlx::query_as("SELECT * FROM receipts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ReceiptRow::into_receipt).transpose()
    }

    async fn list_by_owner(&self, owner: &AccountId) -> CoreResult<Vec<Receipt>> {
        let rows: Vec<ReceiptRow> = sqlx::query_as(
            r#"
            SELECT * FROM receipts
            WHERE owner_id = $1
            ORDER BY uploaded_at DESC
            "#,
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ReceiptRow::into_receipt).collect()
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected_version: i64,
        status: ReceiptStatus,
    ) -> CoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE receipts
            SET status = $3,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn apply_extraction(
        &self,
        id: Uuid,
        expected_version: i64,
        data: &ExtractedData,
    ) -> CoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE receipts
            SET file_display_name = $3,
                merchant_name = $4,
                merchant_address = $5,
                merchant_contact = $6,
                transaction_date = $7,
                transaction_amount = $8,
                currency = $9,
                receipt_summary = $10,
                items = $11,
                status = 'processed',
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(&data.file_display_name)
        .bind(&data.merchant_name)
        .bind(&data.merchant_address)
        .bind(&data.merchant_contact)
        .bind(&data.transaction_date)
        .bind(&data.transaction_amount)
        .bind(&data.currency)
        .bind(&data.receipt_summary)
        .bind(Json(&data.items))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM receipts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
