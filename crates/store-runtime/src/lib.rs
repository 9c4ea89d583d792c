//! # Store Runtime Library
//!
//! Wires a `StoreManager` to a commerce platform and a view layer. The main
//! entry point is the `main.rs` binary.
//!
//! ## Lifecycle
//!
//! 1. `StoreRuntime::new`: open storage, start the delivery context
//! 2. `start`: bind the view, start the store service, start the
//!    foreground refresh ticker
//! 3. `shutdown`: stop the ticker, cancel the listener, stop delivery

#![warn(missing_docs)]

pub mod config;
pub mod demo;
pub mod observer;

pub use config::{ConfigError, RuntimeConfig};
pub use observer::{StoreView, ViewSnapshot};

use parking_lot::Mutex;
use shared_bus::{CancellableBag, MainContext};
use std::sync::Arc;
use std::time::Duration;
use store_manager::{
    CommercePlatform, PurchaseOutcome, Reconciliation, StoreApi, StoreError, StoreManager,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// The runtime owning the store, its observers and background tasks.
pub struct StoreRuntime {
    store: Arc<StoreManager>,
    config: RuntimeConfig,
    context: MainContext,
    view: StoreView,
    observers: Mutex<CancellableBag>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    shutdown_tx: watch::Sender<bool>,
}

impl StoreRuntime {
    /// Create a runtime over `platform`. Must be called inside a tokio runtime.
    pub fn new(
        config: RuntimeConfig,
        platform: Arc<dyn CommercePlatform>,
    ) -> Result<Self, StoreError> {
        let store = Arc::new(StoreManager::new(platform, config.store.clone())?);
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            store,
            config,
            context: MainContext::start("view"),
            view: StoreView::new(),
            observers: Mutex::new(CancellableBag::new()),
            ticker: Mutex::new(None),
            shutdown_tx,
        })
    }

    /// Shared handle to the store.
    pub fn store(&self) -> Arc<StoreManager> {
        Arc::clone(&self.store)
    }

    /// The view-layer mirror.
    pub fn view(&self) -> &StoreView {
        &self.view
    }

    /// The delivery context observers run on.
    pub fn context(&self) -> &MainContext {
        &self.context
    }

    /// Start observers, the store service and the refresh ticker.
    pub async fn start(&self) -> Result<(), StoreError> {
        info!("===========================================");
        info!("  Storefront Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        *self.observers.lock() = self.view.bind(self.store.state(), &self.context);

        let identifiers = self.config.store.product_ids();
        self.store.start_service(&identifiers).await?;

        self.start_ticker();
        info!(
            products = identifiers.len(),
            refresh_secs = self.config.foreground_refresh_secs,
            "Store runtime started"
        );
        Ok(())
    }

    /// The host became active: reconcile entitlements.
    pub async fn foreground(&self) -> Result<Reconciliation, StoreError> {
        debug!("Foreground refresh");
        self.store.refresh().await
    }

    /// Purchase each configured demo product in turn.
    pub async fn run_demo_purchases(&self) -> Vec<Result<PurchaseOutcome, StoreError>> {
        let catalog = self.store.state().catalog();
        let mut results = Vec::new();

        for id in &self.config.demo_purchases {
            let product_id = shared_types::ProductId::new(id.as_str());
            let result = match catalog.find_any(&product_id) {
                Some(item) => self.store.purchase(item).await,
                None => Err(StoreError::ProductNotInCatalog(product_id)),
            };
            match &result {
                Ok(outcome) => info!(product_id = %id, outcome = outcome.label(), "Demo purchase"),
                Err(e) => warn!(product_id = %id, error = %e, "Demo purchase failed"),
            }
            results.push(result);
        }

        results
    }

    fn start_ticker(&self) {
        let secs = self.config.foreground_refresh_secs;
        if secs == 0 {
            debug!("Foreground refresh disabled");
            return;
        }

        let store = Arc::clone(&self.store);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(secs));
            // The first tick completes immediately; startup already refreshed.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = store.refresh().await {
                            error!(error = %e, "Foreground refresh failed");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        info!("Refresh ticker shutdown signal received");
                        break;
                    }
                }
            }
        });
        *self.ticker.lock() = Some(handle);
    }

    /// Shut down gracefully. Safe to call more than once.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        let _ = self.shutdown_tx.send(true);
        let ticker = self.ticker.lock().take();
        if let Some(ticker) = ticker {
            if let Err(e) = ticker.await {
                if !e.is_cancelled() {
                    error!("Refresh ticker ended abnormally: {}", e);
                }
            }
        }

        self.store.shutdown().await;
        self.observers.lock().cancel_all();
        self.context.stop();

        info!("Shutdown complete");
    }
}
