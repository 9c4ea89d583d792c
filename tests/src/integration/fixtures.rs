//! # Test Fixtures
//!
//! Catalog, transaction builders and a platform whose entitlement
//! enumeration can be held open to force refresh interleavings.

use async_trait::async_trait;
use shared_types::{
    CatalogItem, PlatformError, PlatformPurchaseResult, ProductId, ProductKind, RenewalState,
    SubscriptionGroupId, Transaction, VerificationResult,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use store_manager::{CommercePlatform, SimulatedPlatform, TransactionStream};
use tokio::sync::{mpsc, Semaphore};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

/// Consumable `A` and auto-renewable `B` in group `group.b`, plus one of
/// each remaining kind and an unrecognized bundle.
pub fn catalog() -> Vec<CatalogItem> {
    vec![
        CatalogItem::new("A", ProductKind::Consumable),
        CatalogItem::new("B", ProductKind::AutoRenewable).with_group("group.b"),
        CatalogItem::new("no_ads", ProductKind::NonConsumable),
        CatalogItem::new("season", ProductKind::NonRenewable),
        CatalogItem::new("bundle", ProductKind::Unknown("bundle".to_string())),
    ]
}

/// Identifiers of every fixture product.
pub fn product_ids() -> Vec<ProductId> {
    catalog().into_iter().map(|item| item.id).collect()
}

/// Fixture item by identifier.
pub fn item(id: &str) -> CatalogItem {
    catalog()
        .into_iter()
        .find(|item| item.id.as_str() == id)
        .unwrap_or_else(|| panic!("no fixture item {id}"))
}

/// Group of the `B` subscription.
pub fn group_b() -> SubscriptionGroupId {
    SubscriptionGroupId::new("group.b")
}

/// Poll `condition` until it holds, failing after five seconds.
pub async fn eventually<F: Fn() -> bool>(what: &str, condition: F) {
    let reached = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "timed out waiting for {what}");
}

/// Platform whose entitlement streams stay empty until the gate opens.
///
/// The ledger snapshot is taken when the stream is requested, so a refresh
/// holding a stream sees the ledger as it was at that moment.
pub struct GatedPlatform {
    inner: Arc<SimulatedPlatform>,
    gate: Arc<Semaphore>,
    requested: AtomicU64,
}

impl GatedPlatform {
    /// Wrap a simulated platform with a closed gate.
    pub fn new(inner: Arc<SimulatedPlatform>) -> Self {
        Self {
            inner,
            gate: Arc::new(Semaphore::new(0)),
            requested: AtomicU64::new(0),
        }
    }

    /// Release every pending and future entitlement stream.
    pub fn open(&self) {
        self.gate.add_permits(1_000);
    }

    /// Entitlement streams requested so far.
    pub fn requested(&self) -> u64 {
        self.requested.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommercePlatform for GatedPlatform {
    async fn products(&self, identifiers: &[ProductId]) -> Result<Vec<CatalogItem>, PlatformError> {
        self.inner.products(identifiers).await
    }

    fn current_entitlements(&self) -> TransactionStream {
        self.requested.fetch_add(1, Ordering::SeqCst);
        let mut snapshot = self.inner.current_entitlements();
        let gate = Arc::clone(&self.gate);
        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            let Ok(permit) = gate.acquire().await else {
                return;
            };
            drop(permit);
            while let Some(entry) = snapshot.next().await {
                if tx.send(entry).await.is_err() {
                    return;
                }
            }
        });

        Box::pin(ReceiverStream::new(rx))
    }

    fn transaction_updates(&self) -> TransactionStream {
        self.inner.transaction_updates()
    }

    async fn purchase(&self, item: &CatalogItem) -> Result<PlatformPurchaseResult, PlatformError> {
        self.inner.purchase(item).await
    }

    async fn finish(&self, transaction: &Transaction) -> Result<(), PlatformError> {
        self.inner.finish(transaction).await
    }

    async fn subscription_status(
        &self,
        group_id: &SubscriptionGroupId,
    ) -> Result<Option<RenewalState>, PlatformError> {
        self.inner.subscription_status(group_id).await
    }

    async fn sync(&self) -> Result<(), PlatformError> {
        self.inner.sync().await
    }
}

/// Grant a verified entitlement for a fixture item. Returns the transaction.
pub fn grant_verified(platform: &SimulatedPlatform, id: &str) -> Transaction {
    let transaction = platform.new_transaction(&item(id));
    platform.grant(VerificationResult::Verified(transaction.clone()));
    transaction
}
