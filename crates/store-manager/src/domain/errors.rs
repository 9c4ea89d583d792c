//! # Domain Errors
//!
//! Error types for the store manager.

use shared_types::{PlatformError, ProductId, SubscriptionGroupId, TransactionId, VerificationFailure};
use thiserror::Error;

/// Store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Catalog lookup failed (network or unknown identifiers). Not retried.
    #[error("Catalog fetch failed: {0}")]
    CatalogFetch(#[source] PlatformError),

    /// A transaction failed platform verification.
    #[error("Transaction {transaction_id} for {product_id} failed verification: {reason}")]
    Verification {
        /// Transaction that failed.
        transaction_id: TransactionId,
        /// Product it was for.
        product_id: ProductId,
        /// Platform-reported reason.
        reason: VerificationFailure,
    },

    /// Renewal status lookup failed for one subscription group.
    #[error("Subscription status lookup failed for group {group_id}: {source}")]
    SubscriptionStatus {
        /// Group whose lookup failed.
        group_id: SubscriptionGroupId,
        /// Underlying platform error.
        #[source]
        source: PlatformError,
    },

    /// Any other platform call failed.
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Local persistence failed.
    #[error("Persistence error: {0}")]
    Persistence(#[from] KVStoreError),

    /// The item is not part of the current catalog.
    #[error("Product not in catalog: {0}")]
    ProductNotInCatalog(ProductId),

    /// The service was used before `start_service`.
    #[error("Store service not started")]
    NotStarted,
}

impl StoreError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::CatalogFetch(_) => "catalog_fetch",
            StoreError::Verification { .. } => "verification",
            StoreError::SubscriptionStatus { .. } => "subscription_status",
            StoreError::Platform(_) => "platform",
            StoreError::Persistence(_) => "persistence",
            StoreError::ProductNotInCatalog(_) => "product_not_in_catalog",
            StoreError::NotStarted => "not_started",
        }
    }
}

/// Key-value store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KVStoreError {
    /// Filesystem error.
    #[error("I/O error: {message}")]
    IOError {
        /// Error description.
        message: String,
    },

    /// Stored bytes could not be decoded.
    #[error("Corrupted value for key {key}: {message}")]
    Corrupted {
        /// Key that failed to decode.
        key: String,
        /// Decoder error.
        message: String,
    },
}
