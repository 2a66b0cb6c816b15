//! Record-level error types for listing-audit
//!
//! Per-check failures never reach this level (see `types::CheckError`);
//! an `AuditError` aborts exactly one record and nothing else.

use thiserror::Error;

/// Record-level failure
#[derive(Debug, Error)]
pub enum AuditError {
    /// Listing identifier missing or blank
    #[error("Invalid listing data: missing gmb_id")]
    MissingIdentifier,

    /// Message body is not a listing object
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Evaluation abandoned before all checks finished
    #[error("Evaluation cancelled for listing {listing_id}")]
    Cancelled { listing_id: String },

    /// Persistence collaborator failure
    #[error("Store error: {0}")]
    Store(#[from] listing_common::Error),
}

/// Result type for record-level operations
pub type AuditResult<T> = Result<T, AuditError>;
