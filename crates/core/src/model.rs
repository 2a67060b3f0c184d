//! Receipt data model and status state machine.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Opaque account identifier issued by the external identity provider.
///
/// The core trusts this value as-is; it never inspects or derives anything
/// from its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Lifecycle state of a receipt.
///
/// Transitions are forward-only: `pending` moves to `processed` when the
/// extraction actor attaches data, or to `failed` if extraction is given
/// up on. `processed` and `failed` are terminal; re-extraction would be a
/// new explicit operation, never a status revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Pending,
    Processed,
    Failed,
}

impl ReceiptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptStatus::Pending => "pending",
            ReceiptStatus::Processed => "processed",
            ReceiptStatus::Failed => "failed",
        }
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(&self, next: ReceiptStatus) -> bool {
        matches!(
            (self, next),
            (ReceiptStatus::Pending, ReceiptStatus::Processed)
                | (ReceiptStatus::Pending, ReceiptStatus::Failed)
        )
    }
}

impl std::fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReceiptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReceiptStatus::Pending),
            "processed" => Ok(ReceiptStatus::Processed),
            "failed" => Ok(ReceiptStatus::Failed),
            other => Err(format!("unknown receipt status '{other}'")),
        }
    }
}

/// One line item on a receipt, as reported by the extraction actor.
///
/// `total_price` is not validated against `quantity * unit_price`; the
/// extraction actor is trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
}

/// Structured fields the extraction actor attaches to a receipt.
///
/// All fields are set in one shot; a receipt either has the full set or
/// none of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedData {
    pub file_display_name: String,
    pub merchant_name: String,
    pub merchant_address: String,
    pub merchant_contact: String,
    pub transaction_date: String,
    pub transaction_amount: String,
    pub currency: String,
    pub receipt_summary: String,
    pub items: Vec<LineItem>,
}

/// The central entity: one uploaded PDF and its lifecycle state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: Uuid,
    /// Owning account; every access and mutation is checked against it.
    pub owner: AccountId,
    /// Opaque handle into the blob store.
    pub file_id: String,
    pub file_name: String,
    pub mime_type: String,
    /// Declared size in bytes, non-negative.
    pub size: i64,
    pub status: ReceiptStatus,
    /// Optimistic-concurrency counter, incremented on every mutation.
    pub version: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
    /// Absent until the extraction actor attaches data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted: Option<ExtractedData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            ReceiptStatus::Pending,
            ReceiptStatus::Processed,
            ReceiptStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<ReceiptStatus>(), Ok(status));
        }
        assert!("shredded".parse::<ReceiptStatus>().is_err());
    }

    #[test]
    fn transitions_are_forward_only() {
        use ReceiptStatus::*;

        assert!(Pending.can_transition_to(Processed));
        assert!(Pending.can_transition_to(Failed));

        // Terminal states and self-transitions are all rejected
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Processed.can_transition_to(Pending));
        assert!(!Processed.can_transition_to(Processed));
        assert!(!Processed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Pending));
        assert!(!Failed.can_transition_to(Processed));
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&ReceiptStatus::Processed).unwrap();
        assert_eq!(json, "\"processed\"");
        let back: ReceiptStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(back, ReceiptStatus::Pending);
    }
}
