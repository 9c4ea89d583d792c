//! Simulated Commerce Platform
//!
//! Implements `CommercePlatform` entirely in memory: a seeded catalog, an
//! entitlement ledger, scripted purchase results and an update feed.

use crate::ports::outbound::{CommercePlatform, TransactionStream};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use shared_types::{
    CatalogItem, PlatformError, PlatformPurchaseResult, ProductId, ProductKind, RenewalState,
    SubscriptionGroupId, Transaction, TransactionId, VerificationFailure, VerificationResult,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, info};

const UPDATE_FEED_CAPACITY: usize = 64;

/// Scripted response for the next purchase call.
#[derive(Clone, Debug)]
pub enum ScriptedPurchase {
    /// Succeed with a new verified transaction.
    Verified,
    /// Succeed with a transaction that fails verification.
    Unverified(VerificationFailure),
    /// Customer dismissed the sheet.
    UserCancelled,
    /// Awaiting approval.
    Pending,
    /// The platform call itself fails.
    Fail(PlatformError),
}

/// In-memory commerce platform.
///
/// Without a script, purchases succeed with a verified transaction. Verified
/// purchases of entitlement-backed products are added to the ledger and
/// auto-renewables mark their group as subscribed.
pub struct SimulatedPlatform {
    catalog: RwLock<Vec<CatalogItem>>,
    entitlements: RwLock<Vec<VerificationResult<Transaction>>>,
    statuses: RwLock<HashMap<SubscriptionGroupId, Result<Option<RenewalState>, PlatformError>>>,
    purchase_script: Mutex<VecDeque<ScriptedPurchase>>,
    catalog_failure: Mutex<Option<PlatformError>>,
    finish_failure: Mutex<Option<PlatformError>>,
    finished: Mutex<Vec<TransactionId>>,
    updates: Mutex<Option<broadcast::Sender<VerificationResult<Transaction>>>>,
    next_id: AtomicU64,
    entitlement_queries: AtomicU64,
    purchase_calls: AtomicU64,
    sync_calls: AtomicU64,
}

impl SimulatedPlatform {
    /// Create a platform offering `catalog`.
    pub fn new(catalog: Vec<CatalogItem>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_FEED_CAPACITY);
        Self {
            catalog: RwLock::new(catalog),
            entitlements: RwLock::new(Vec::new()),
            statuses: RwLock::new(HashMap::new()),
            purchase_script: Mutex::new(VecDeque::new()),
            catalog_failure: Mutex::new(None),
            finish_failure: Mutex::new(None),
            finished: Mutex::new(Vec::new()),
            updates: Mutex::new(Some(updates)),
            next_id: AtomicU64::new(1000),
            entitlement_queries: AtomicU64::new(0),
            purchase_calls: AtomicU64::new(0),
            sync_calls: AtomicU64::new(0),
        }
    }

    /// Replace the offered catalog.
    pub fn set_catalog(&self, catalog: Vec<CatalogItem>) {
        *self.catalog.write() = catalog;
    }

    /// Make the next catalog lookup fail.
    pub fn fail_next_catalog(&self, error: PlatformError) {
        *self.catalog_failure.lock() = Some(error);
    }

    /// Make every `finish` call fail until cleared.
    pub fn set_finish_failure(&self, error: Option<PlatformError>) {
        *self.finish_failure.lock() = error;
    }

    /// Add an entry to the entitlement ledger.
    pub fn grant(&self, entitlement: VerificationResult<Transaction>) {
        self.entitlements.write().push(entitlement);
    }

    /// Remove every ledger entry for a product.
    pub fn revoke_all(&self, product_id: &ProductId) {
        self.entitlements
            .write()
            .retain(|entry| &entry.payload().product_id != product_id);
    }

    /// Set the status lookup result for a group.
    pub fn set_status(
        &self,
        group_id: SubscriptionGroupId,
        status: Result<Option<RenewalState>, PlatformError>,
    ) {
        self.statuses.write().insert(group_id, status);
    }

    /// Queue a scripted purchase response.
    pub fn script_purchase(&self, response: ScriptedPurchase) {
        self.purchase_script.lock().push_back(response);
    }

    /// Deliver a transaction on the update feed. Returns the number of
    /// listeners that received it.
    pub fn push_update(&self, update: VerificationResult<Transaction>) -> usize {
        self.updates
            .lock()
            .as_ref()
            .map_or(0, |updates| updates.send(update).unwrap_or(0))
    }

    /// End the update feed. Open feeds finish and later feeds are empty.
    pub fn close_update_feed(&self) {
        if self.updates.lock().take().is_some() {
            info!("[platform] Update feed closed");
        }
    }

    /// Transactions acknowledged so far, in order.
    pub fn finished(&self) -> Vec<TransactionId> {
        self.finished.lock().clone()
    }

    /// Number of entitlement enumerations served.
    pub fn entitlement_queries(&self) -> u64 {
        self.entitlement_queries.load(Ordering::Relaxed)
    }

    /// Number of purchase calls received.
    pub fn purchase_calls(&self) -> u64 {
        self.purchase_calls.load(Ordering::Relaxed)
    }

    /// Number of sync calls received.
    pub fn sync_calls(&self) -> u64 {
        self.sync_calls.load(Ordering::Relaxed)
    }

    /// Build a transaction for `item` with a fresh identifier.
    pub fn new_transaction(&self, item: &CatalogItem) -> Transaction {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();
        Transaction {
            id,
            original_id: id,
            product_id: item.id.clone(),
            product_kind: item.kind.clone(),
            purchase_date: now,
            original_purchase_date: now,
            expiration_date: None,
            revocation_date: None,
            is_upgraded: false,
            purchased_quantity: 1,
        }
    }

    fn record_verified_purchase(&self, item: &CatalogItem, transaction: &Transaction) {
        if !item.kind.is_entitlement_backed() {
            return;
        }
        self.grant(VerificationResult::Verified(transaction.clone()));
        if item.kind == ProductKind::AutoRenewable {
            if let Some(group) = item.group_id() {
                self.set_status(group.clone(), Ok(Some(RenewalState::Subscribed)));
            }
        }
    }
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl CommercePlatform for SimulatedPlatform {
    async fn products(&self, identifiers: &[ProductId]) -> Result<Vec<CatalogItem>, PlatformError> {
        if let Some(error) = self.catalog_failure.lock().take() {
            return Err(error);
        }

        let catalog = self.catalog.read();
        let items: Vec<CatalogItem> = identifiers
            .iter()
            .filter_map(|id| catalog.iter().find(|item| &item.id == id).cloned())
            .collect();

        debug!(
            requested = identifiers.len(),
            found = items.len(),
            "[platform] Catalog lookup"
        );
        Ok(items)
    }

    fn current_entitlements(&self) -> TransactionStream {
        self.entitlement_queries.fetch_add(1, Ordering::Relaxed);
        let snapshot = self.entitlements.read().clone();
        Box::pin(tokio_stream::iter(snapshot))
    }

    fn transaction_updates(&self) -> TransactionStream {
        match self.updates.lock().as_ref() {
            Some(updates) => {
                let receiver = updates.subscribe();
                Box::pin(BroadcastStream::new(receiver).filter_map(|update| update.ok()))
            }
            None => Box::pin(tokio_stream::empty()),
        }
    }

    async fn purchase(&self, item: &CatalogItem) -> Result<PlatformPurchaseResult, PlatformError> {
        self.purchase_calls.fetch_add(1, Ordering::Relaxed);
        let scripted = self
            .purchase_script
            .lock()
            .pop_front()
            .unwrap_or(ScriptedPurchase::Verified);

        info!(product_id = %item.id, response = ?scripted, "[platform] Purchase requested");

        match scripted {
            ScriptedPurchase::Verified => {
                let transaction = self.new_transaction(item);
                self.record_verified_purchase(item, &transaction);
                Ok(PlatformPurchaseResult::Success(VerificationResult::Verified(
                    transaction,
                )))
            }
            ScriptedPurchase::Unverified(reason) => {
                let transaction = self.new_transaction(item);
                Ok(PlatformPurchaseResult::Success(
                    VerificationResult::Unverified(transaction, reason),
                ))
            }
            ScriptedPurchase::UserCancelled => Ok(PlatformPurchaseResult::UserCancelled),
            ScriptedPurchase::Pending => Ok(PlatformPurchaseResult::Pending),
            ScriptedPurchase::Fail(error) => Err(error),
        }
    }

    async fn finish(&self, transaction: &Transaction) -> Result<(), PlatformError> {
        if let Some(error) = self.finish_failure.lock().clone() {
            return Err(error);
        }
        self.finished.lock().push(transaction.id);
        Ok(())
    }

    async fn subscription_status(
        &self,
        group_id: &SubscriptionGroupId,
    ) -> Result<Option<RenewalState>, PlatformError> {
        self.statuses
            .read()
            .get(group_id)
            .cloned()
            .unwrap_or(Ok(None))
    }

    async fn sync(&self) -> Result<(), PlatformError> {
        self.sync_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
