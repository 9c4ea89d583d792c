//! # Outbound Ports
//!
//! Traits for external dependencies (commerce platform, local storage).

use crate::domain::KVStoreError;
use async_trait::async_trait;
use shared_types::{
    CatalogItem, PlatformError, PlatformPurchaseResult, ProductId, RenewalState,
    SubscriptionGroupId, Transaction, VerificationResult,
};
use std::pin::Pin;
use tokio_stream::Stream;

/// Stream of transactions as the platform delivers them.
pub type TransactionStream =
    Pin<Box<dyn Stream<Item = VerificationResult<Transaction>> + Send + 'static>>;

/// Commerce platform - outbound port.
///
/// The platform owns verification, the transaction ledger and billing. The
/// store only reads from it and acknowledges what it processed.
#[async_trait]
pub trait CommercePlatform: Send + Sync {
    /// Look up catalog items by identifier.
    async fn products(&self, identifiers: &[ProductId]) -> Result<Vec<CatalogItem>, PlatformError>;

    /// Enumerate what the customer currently owns.
    fn current_entitlements(&self) -> TransactionStream;

    /// Long-lived feed of new and updated transactions.
    fn transaction_updates(&self) -> TransactionStream;

    /// Start a purchase.
    async fn purchase(&self, item: &CatalogItem) -> Result<PlatformPurchaseResult, PlatformError>;

    /// Acknowledge a processed transaction so it is not replayed.
    async fn finish(&self, transaction: &Transaction) -> Result<(), PlatformError>;

    /// Renewal state of a subscription group. `None` if the group has no status.
    async fn subscription_status(
        &self,
        group_id: &SubscriptionGroupId,
    ) -> Result<Option<RenewalState>, PlatformError>;

    /// Sync the transaction ledger with the platform (restore purchases).
    async fn sync(&self) -> Result<(), PlatformError>;
}

/// Abstract key-value store interface.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError>;

    /// Put a single key-value pair.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError>;

    /// Delete a key.
    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError>;
}
