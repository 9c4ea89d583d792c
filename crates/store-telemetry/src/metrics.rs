//! Prometheus metrics for the store.
//!
//! All metrics follow the naming convention: `store_<component>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., refreshes_total)
//! - **Gauge**: Value that can go up or down (e.g., owned_items)
//! - **Histogram**: Distribution of values (e.g., refresh_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, GaugeVec, Histogram, Opts,
    Registry, TextEncoder,
};
use std::sync::{Arc, OnceLock};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // CATALOG METRICS
    // =========================================================================

    /// Catalog fetches by outcome
    pub static ref CATALOG_FETCHES: CounterVec = CounterVec::new(
        Opts::new("store_catalog_fetches_total", "Catalog lookups against the platform"),
        &["outcome"]  // outcome: success/failure
    ).expect("metric creation failed");

    /// Catalog items per kind after the last fetch
    pub static ref CATALOG_ITEMS: GaugeVec = GaugeVec::new(
        Opts::new("store_catalog_items", "Catalog items per product kind"),
        &["kind"]
    ).expect("metric creation failed");

    /// Catalog items dropped for an unrecognized kind
    pub static ref CATALOG_ITEMS_DROPPED: Counter = Counter::new(
        "store_catalog_items_dropped_total",
        "Catalog items ignored because their kind is not recognized"
    ).expect("metric creation failed");

    // =========================================================================
    // RECONCILER METRICS
    // =========================================================================

    /// Entitlement refresh passes
    pub static ref ENTITLEMENT_REFRESHES: Counter = Counter::new(
        "store_entitlement_refreshes_total",
        "Total entitlement reconciliation passes"
    ).expect("metric creation failed");

    /// Refresh duration
    pub static ref REFRESH_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "store_entitlement_refresh_duration_seconds",
            "Time spent reconciling entitlements"
        ).buckets(exponential_buckets(0.0001, 2.0, 14).unwrap())
    ).expect("metric creation failed");

    /// Owned items per kind after the last refresh
    pub static ref OWNED_ITEMS: GaugeVec = GaugeVec::new(
        Opts::new("store_owned_items", "Owned items per product kind"),
        &["kind"]
    ).expect("metric creation failed");

    /// Subscription status lookups that failed
    pub static ref SUBSCRIPTION_STATUS_FAILURES: Counter = Counter::new(
        "store_subscription_status_failures_total",
        "Subscription group status lookups that failed"
    ).expect("metric creation failed");

    // =========================================================================
    // TRANSACTION METRICS
    // =========================================================================

    /// Verification failures by source
    pub static ref VERIFICATION_FAILURES: CounterVec = CounterVec::new(
        Opts::new("store_verification_failures_total", "Transactions that failed verification"),
        &["source"]  // source: listener/purchase/entitlements
    ).expect("metric creation failed");

    /// Transaction updates received by the listener
    pub static ref LISTENER_EVENTS: Counter = Counter::new(
        "store_listener_events_total",
        "Transaction updates received from the platform"
    ).expect("metric creation failed");

    /// Finish (acknowledge) calls by outcome
    pub static ref TRANSACTIONS_FINISHED: CounterVec = CounterVec::new(
        Opts::new("store_transactions_finished_total", "Transactions acknowledged with the platform"),
        &["outcome"]  // outcome: success/failure
    ).expect("metric creation failed");

    // =========================================================================
    // PURCHASE METRICS
    // =========================================================================

    /// Purchases by outcome
    pub static ref PURCHASES: CounterVec = CounterVec::new(
        Opts::new("store_purchases_total", "Purchase attempts by outcome"),
        &["outcome"]  // outcome: success/user_cancelled/pending/failed
    ).expect("metric creation failed");

    /// Entries in the consumable transaction log
    pub static ref CONSUMABLE_LOG_SIZE: Gauge = Gauge::new(
        "store_consumable_log_entries",
        "Transaction ids in the persisted consumable log"
    ).expect("metric creation failed");

    // =========================================================================
    // ERROR METRICS
    // =========================================================================

    /// Errors by component and type
    pub static ref STORE_ERRORS: CounterVec = CounterVec::new(
        Opts::new("store_errors_total", "Errors by component and type"),
        &["component", "error_type"]
    ).expect("metric creation failed");
}

static REGISTERED: OnceLock<Result<(), String>> = OnceLock::new();

/// Handle for the registered metrics
pub struct MetricsHandle {
    registry: Arc<Registry>,
}

impl MetricsHandle {
    /// Render all metrics in Prometheus text format.
    pub fn gather(&self) -> Result<String, TelemetryError> {
        encode_registry(&self.registry)
    }
}

/// Register all metrics with the global registry.
///
/// Registration happens once per process; later calls return a handle to
/// the same registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    REGISTERED
        .get_or_init(|| {
            let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
                // Catalog
                Box::new(CATALOG_FETCHES.clone()),
                Box::new(CATALOG_ITEMS.clone()),
                Box::new(CATALOG_ITEMS_DROPPED.clone()),
                // Reconciler
                Box::new(ENTITLEMENT_REFRESHES.clone()),
                Box::new(REFRESH_DURATION.clone()),
                Box::new(OWNED_ITEMS.clone()),
                Box::new(SUBSCRIPTION_STATUS_FAILURES.clone()),
                // Transactions
                Box::new(VERIFICATION_FAILURES.clone()),
                Box::new(LISTENER_EVENTS.clone()),
                Box::new(TRANSACTIONS_FINISHED.clone()),
                // Purchases
                Box::new(PURCHASES.clone()),
                Box::new(CONSUMABLE_LOG_SIZE.clone()),
                // Errors
                Box::new(STORE_ERRORS.clone()),
            ];

            metrics
                .into_iter()
                .try_for_each(|metric| REGISTRY.register(metric))
                .map_err(|e| e.to_string())
        })
        .clone()
        .map_err(TelemetryError::MetricsInit)?;

    Ok(MetricsHandle {
        registry: Arc::new(REGISTRY.clone()),
    })
}

fn encode_registry(registry: &Registry) -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
