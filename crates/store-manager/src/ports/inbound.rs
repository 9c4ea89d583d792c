//! # Inbound Ports
//!
//! API trait defining what the store manager can do.

use crate::domain::{PurchaseOutcome, Reconciliation, StoreError};
use crate::service::StoreState;
use async_trait::async_trait;
use shared_types::{CatalogItem, ProductId};

/// Store API - inbound port.
#[async_trait]
pub trait StoreApi: Send + Sync {
    /// Start the listener, fetch the catalog, then reconcile entitlements.
    async fn start_service(&self, identifiers: &[ProductId]) -> Result<(), StoreError>;

    /// Fetch the catalog and replace every partition.
    async fn request_products(&self, identifiers: &[ProductId]) -> Result<(), StoreError>;

    /// Recompute owned items and subscription group status.
    async fn refresh(&self) -> Result<Reconciliation, StoreError>;

    /// Purchase a catalog item.
    async fn purchase(&self, item: &CatalogItem) -> Result<PurchaseOutcome, StoreError>;

    /// Sync with the platform, then reconcile.
    async fn restore(&self) -> Result<Reconciliation, StoreError>;

    /// Cancel the listener. Safe to call more than once.
    async fn shutdown(&self);

    /// Published state.
    fn state(&self) -> &StoreState;
}
