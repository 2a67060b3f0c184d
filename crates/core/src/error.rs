//! Error taxonomy for the receipt lifecycle core.
//!
//! Validation and quota errors are resolved locally; I/O failures against
//! the blob store or entitlement service are wrapped with the operation
//! name so callers can decide whether to retry. The core never retries on
//! its own.

use uuid::Uuid;

/// Result alias used throughout the core crate.
pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// No caller identity present.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Caller identity present but does not own the target record.
    #[error("Not authorized")]
    Unauthorized,

    /// Target record id does not resolve.
    #[error("Receipt not found")]
    NotFound,

    /// Malformed input, detected before any external call.
    #[error("{0}")]
    Validation(String),

    /// Entitlement gate denied the operation. Carries the numeric
    /// allocation so the caller can render "exceeded limit of N".
    #[error("Usage limit reached ({used} of {allocation} scans used)")]
    QuotaExceeded { used: i64, allocation: i64 },

    /// A versioned mutation lost a race; the caller saw stale state.
    #[error("Receipt {receipt_id} was modified concurrently")]
    Conflict { receipt_id: Uuid },

    /// Retryable failure talking to an external service.
    #[error("{operation} failed: {message}")]
    Transient {
        operation: &'static str,
        message: String,
    },

    /// The record/file pair is now inconsistent and needs reconciliation.
    #[error("Receipt {receipt_id} deleted its file {file_id} but the record remains")]
    Orphaned { receipt_id: Uuid, file_id: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CoreError {
    /// Wrap a reqwest failure with the name of the operation that issued it.
    pub(crate) fn transient(operation: &'static str, err: reqwest::Error) -> Self {
        Self::Transient {
            operation,
            message: err.to_string(),
        }
    }
}
