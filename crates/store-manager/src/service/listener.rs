//! # Transaction Listener
//!
//! Background worker draining the platform's transaction update feed.
//!
//! Each verified update triggers a full reconciliation and is then
//! acknowledged. Unverified updates are logged and dropped. No single event
//! can stop the worker; only cancellation or the end of the feed does.

use super::reconciler::EntitlementReconciler;
use crate::algorithms::check_verified;
use crate::domain::TransactionSource;
use crate::ports::outbound::{CommercePlatform, TransactionStream};
use parking_lot::Mutex;
use shared_types::{Transaction, VerificationResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use store_telemetry::{
    component_span, log_tx_event, metric_inc, LISTENER_EVENTS, STORE_ERRORS,
    TRANSACTIONS_FINISHED, VERIFICATION_FAILURES,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn, Instrument};

/// Handle to the running listener task.
pub struct TransactionListener {
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
    processed: Arc<AtomicU64>,
}

impl TransactionListener {
    /// Spawn the worker over `updates`.
    pub fn spawn(
        updates: TransactionStream,
        platform: Arc<dyn CommercePlatform>,
        reconciler: Arc<EntitlementReconciler>,
    ) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let processed = Arc::new(AtomicU64::new(0));

        let worker = ListenerWorker {
            platform,
            reconciler,
            processed: Arc::clone(&processed),
        };
        let span = component_span!("listener", feed = "transaction_updates");
        let handle = tokio::spawn(worker.run(updates, shutdown_rx).instrument(span));
        info!("[listener] Transaction listener started");

        Self {
            shutdown,
            handle: Mutex::new(Some(handle)),
            processed,
        }
    }

    /// Stop the worker. Calling again, or after the feed ended, does nothing.
    pub fn cancel(&self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        let _ = self.shutdown.send(true);
        handle.abort();
        info!("[listener] Transaction listener cancelled");
    }

    /// Whether the worker is still draining the feed.
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Updates handled so far, verified or not.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }
}

impl Drop for TransactionListener {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct ListenerWorker {
    platform: Arc<dyn CommercePlatform>,
    reconciler: Arc<EntitlementReconciler>,
    processed: Arc<AtomicU64>,
}

impl ListenerWorker {
    async fn run(self, mut updates: TransactionStream, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    debug!("[listener] Shutdown signal received");
                    break;
                }
                next = updates.next() => match next {
                    Some(update) => {
                        self.handle_update(update).await;
                        self.processed.fetch_add(1, Ordering::Relaxed);
                    }
                    None => {
                        info!("[listener] Update feed closed");
                        break;
                    }
                }
            }
        }
    }

    async fn handle_update(&self, update: VerificationResult<Transaction>) {
        metric_inc!(LISTENER_EVENTS);

        let transaction = match check_verified(update) {
            Ok(transaction) => transaction,
            Err(e) => {
                VERIFICATION_FAILURES
                    .with_label_values(&[TransactionSource::Listener.as_str()])
                    .inc();
                STORE_ERRORS.with_label_values(&["listener", e.kind()]).inc();
                warn!(error = %e, "[listener] Discarding unverified update");
                return;
            }
        };

        log_tx_event!(
            debug,
            "listener",
            "[listener] Verified update received",
            transaction.id,
            transaction.product_id
        );

        if let Err(e) = self.reconciler.refresh().await {
            STORE_ERRORS.with_label_values(&["listener", e.kind()]).inc();
            error!(error = %e, "[listener] Refresh after update failed");
        }

        match self.platform.finish(&transaction).await {
            Ok(()) => {
                metric_inc!(TRANSACTIONS_FINISHED, &["success"]);
            }
            Err(e) => {
                // Unacknowledged transactions are redelivered by the platform.
                metric_inc!(TRANSACTIONS_FINISHED, &["failure"]);
                log_tx_event!(
                    warn,
                    "listener",
                    "[listener] Failed to finish transaction",
                    transaction.id,
                    transaction.product_id,
                    error = %e
                );
            }
        }
    }
}
