//! # Store Manager Service
//!
//! Wires the catalog store, entitlement reconciler, transaction listener and
//! purchase flow behind `StoreApi`.

use super::listener::TransactionListener;
use super::reconciler::EntitlementReconciler;
use super::state::StoreState;
use crate::adapters::{ConsumableLogStore, FileBackedKVStore, InMemoryKVStore};
use crate::algorithms::check_verified;
use crate::config::StoreConfig;
use crate::domain::{PurchaseOutcome, Reconciliation, StoreError, TransactionSource};
use crate::ports::inbound::StoreApi;
use crate::ports::outbound::{CommercePlatform, KeyValueStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{CatalogItem, PlatformPurchaseResult, ProductId, ProductKind, Transaction};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use store_telemetry::{
    log_tx_event, CONSUMABLE_LOG_SIZE, PURCHASES, STORE_ERRORS, TRANSACTIONS_FINISHED,
    VERIFICATION_FAILURES,
};
use tracing::{debug, info, warn};

/// The store manager.
///
/// Constructed explicitly and shared by handle (`Arc<StoreManager>`). The
/// listener starts in `start_service` and stops in `shutdown` or on drop.
pub struct StoreManager {
    platform: Arc<dyn CommercePlatform>,
    reconciler: Arc<EntitlementReconciler>,
    consumable_log: ConsumableLogStore,
    listener: Mutex<Option<TransactionListener>>,
    started: AtomicBool,
    config: StoreConfig,
}

impl StoreManager {
    /// Create a store manager, opening local storage as configured.
    pub fn new(platform: Arc<dyn CommercePlatform>, config: StoreConfig) -> Result<Self, StoreError> {
        let storage: Box<dyn KeyValueStore> = match config.storage_path() {
            Some(path) => {
                info!("[store] Using persistent storage at {}", path.display());
                Box::new(FileBackedKVStore::open(path)?)
            }
            None => {
                debug!("[store] Using in-memory storage");
                Box::new(InMemoryKVStore::new())
            }
        };
        Self::with_storage(platform, config, storage)
    }

    /// Create a store manager over an explicit key-value store.
    pub fn with_storage(
        platform: Arc<dyn CommercePlatform>,
        config: StoreConfig,
        storage: Box<dyn KeyValueStore>,
    ) -> Result<Self, StoreError> {
        let consumable_log = ConsumableLogStore::new(storage, config.consumable_log_key.clone());
        let log = consumable_log.load()?;
        CONSUMABLE_LOG_SIZE.set(log.len() as f64);
        debug!(
            key = consumable_log.key(),
            entries = log.len(),
            "[store] Consumable log loaded"
        );

        let state = StoreState::new(log);
        let reconciler = Arc::new(EntitlementReconciler::new(platform.clone(), state));

        Ok(Self {
            platform,
            reconciler,
            consumable_log,
            listener: Mutex::new(None),
            started: AtomicBool::new(false),
            config,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Whether `start_service` ran and `shutdown` has not.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Whether the transaction listener is running.
    pub fn is_listening(&self) -> bool {
        self.listener
            .lock()
            .as_ref()
            .is_some_and(TransactionListener::is_running)
    }

    /// Updates the listener has handled since it started.
    pub fn listener_processed(&self) -> u64 {
        self.listener
            .lock()
            .as_ref()
            .map_or(0, TransactionListener::processed)
    }

    fn start_listener(&self) {
        let mut slot = self.listener.lock();
        if slot.as_ref().is_some_and(TransactionListener::is_running) {
            debug!("[store] Listener already running");
            return;
        }
        *slot = Some(TransactionListener::spawn(
            self.platform.transaction_updates(),
            self.platform.clone(),
            self.reconciler.clone(),
        ));
    }

    fn record_consumable(&self, transaction: &Transaction) -> Result<(), StoreError> {
        let log = self.consumable_log.append(transaction.original_id)?;
        CONSUMABLE_LOG_SIZE.set(log.len() as f64);
        self.state().consumable_log.set(log);
        Ok(())
    }

    async fn finish(&self, transaction: &Transaction) {
        match self.platform.finish(transaction).await {
            Ok(()) => TRANSACTIONS_FINISHED.with_label_values(&["success"]).inc(),
            Err(e) => {
                TRANSACTIONS_FINISHED.with_label_values(&["failure"]).inc();
                log_tx_event!(
                    warn,
                    "purchase",
                    "[store] Failed to finish purchase transaction",
                    transaction.id,
                    transaction.product_id,
                    error = %e
                );
            }
        }
    }

    fn purchase_failed(&self, e: StoreError) -> StoreError {
        PURCHASES.with_label_values(&["failed"]).inc();
        STORE_ERRORS.with_label_values(&["purchase", e.kind()]).inc();
        e
    }
}

#[async_trait]
impl StoreApi for StoreManager {
    async fn start_service(&self, identifiers: &[ProductId]) -> Result<(), StoreError> {
        info!(products = identifiers.len(), "[store] Starting store service");
        self.start_listener();
        self.started.store(true, Ordering::Release);
        self.request_products(identifiers).await?;
        self.refresh().await?;
        Ok(())
    }

    async fn request_products(&self, identifiers: &[ProductId]) -> Result<(), StoreError> {
        self.reconciler.request_products(identifiers).await
    }

    async fn refresh(&self) -> Result<Reconciliation, StoreError> {
        self.reconciler.refresh().await
    }

    async fn purchase(&self, item: &CatalogItem) -> Result<PurchaseOutcome, StoreError> {
        if !self.is_started() {
            return Err(self.purchase_failed(StoreError::NotStarted));
        }
        if self.state().catalog().find(&item.kind, &item.id).is_none() {
            return Err(self.purchase_failed(StoreError::ProductNotInCatalog(item.id.clone())));
        }

        info!(product_id = %item.id, kind = %item.kind, "[store] Purchase started");
        let result = self
            .platform
            .purchase(item)
            .await
            .map_err(|e| self.purchase_failed(e.into()))?;

        let outcome = match result {
            PlatformPurchaseResult::Success(verification) => {
                let transaction = check_verified(verification).map_err(|e| {
                    VERIFICATION_FAILURES
                        .with_label_values(&[TransactionSource::Purchase.as_str()])
                        .inc();
                    warn!(error = %e, "[store] Purchase failed verification");
                    self.purchase_failed(e)
                })?;

                if transaction.product_kind == ProductKind::Consumable {
                    self.record_consumable(&transaction)
                        .map_err(|e| self.purchase_failed(e))?;
                }
                self.finish(&transaction).await;
                self.refresh().await?;
                PurchaseOutcome::Success(transaction)
            }
            PlatformPurchaseResult::UserCancelled => PurchaseOutcome::UserCancelled,
            PlatformPurchaseResult::Pending => PurchaseOutcome::Pending,
        };

        PURCHASES.with_label_values(&[outcome.label()]).inc();
        info!(
            product_id = %item.id,
            outcome = outcome.label(),
            "[store] Purchase completed"
        );
        Ok(outcome)
    }

    async fn restore(&self) -> Result<Reconciliation, StoreError> {
        info!("[store] Restoring purchases");
        self.platform.sync().await?;
        self.refresh().await
    }

    async fn shutdown(&self) {
        self.started.store(false, Ordering::Release);
        let listener = self.listener.lock().take();
        match listener {
            Some(listener) => listener.cancel(),
            None => debug!("[store] Shutdown with no listener running"),
        }
    }

    fn state(&self) -> &StoreState {
        self.reconciler.state()
    }
}
