//! # Storefront Runtime
//!
//! Runs the store manager against the simulated commerce platform.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (logs, metrics)
//! 2. Load configuration (TOML file, then environment)
//! 3. Start the store: listener, catalog fetch, initial reconciliation
//! 4. Run configured demo purchases
//! 5. Wait for Ctrl+C, then shut down

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use store_manager::SimulatedPlatform;
use store_runtime::{demo, RuntimeConfig, StoreRuntime};
use store_telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = init_telemetry(TelemetryConfig::from_env())
        .context("Failed to initialize telemetry")?;

    let mut config = RuntimeConfig::from_env().context("Failed to load configuration")?;
    if config.store.product_identifiers.is_empty() {
        info!("No product identifiers configured, using the demo catalog");
        config.store.product_identifiers = demo::demo_product_identifiers();
    }

    let platform = Arc::new(SimulatedPlatform::new(demo::demo_catalog()));
    let runtime =
        StoreRuntime::new(config, platform).context("Failed to create store runtime")?;
    runtime
        .start()
        .await
        .context("Failed to start store service")?;

    runtime.run_demo_purchases().await;

    info!("Store is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    runtime.shutdown().await;

    if let Some(metrics) = telemetry.metrics() {
        match metrics.gather() {
            Ok(text) => debug!("Final metrics:\n{}", text),
            Err(e) => debug!("Metrics unavailable: {}", e),
        }
    }

    Ok(())
}
