//! # Store Manager
//!
//! In-app purchase reconciliation: fetches the catalog, listens for
//! transaction updates, derives what the customer owns and publishes it to
//! observers.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Components
//!
//! | Component | Role |
//! |-----------|------|
//! | Catalog store | Partitions fetched products into four kinds |
//! | Transaction listener | Background worker over the update feed |
//! | Entitlement reconciler | Rebuilds owned items and group status |
//! | Purchase initiator | Purchases, verifies, acknowledges, reconciles |
//! | State bridge | Replay-latest `Published` values in `StoreState` |
//!
//! The commerce platform owns verification, billing and the transaction
//! ledger. This crate only reads from it and acknowledges what it processed.
//!
//! ## Module Structure
//!
//! ```text
//! store-manager/
//! ├── domain/          # Catalog, EntitlementSet, errors, invariants
//! ├── algorithms/      # Partitioning, classification, verification
//! ├── ports/           # StoreApi, CommercePlatform, KeyValueStore
//! ├── adapters/        # SimulatedPlatform, KV stores, consumable log
//! └── service/         # StoreManager, listener, reconciler, state
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{
    ConsumableLogStore, FileBackedKVStore, InMemoryKVStore, ScriptedPurchase, SimulatedPlatform,
};
pub use algorithms::{check_verified, classify_entitlements, partition_catalog};
pub use config::{StoreConfig, DEFAULT_CONSUMABLE_LOG_KEY};
pub use domain::{
    invariant_catalog_partitioned, invariant_owned_in_catalog, Catalog, ConsumableTransactionLog,
    EntitlementSet, KVStoreError, PurchaseOutcome, Reconciliation, StoreError,
    SubscriptionGroupStatus, TransactionSource,
};
pub use ports::{CommercePlatform, KeyValueStore, StoreApi, TransactionStream};
pub use service::{EntitlementReconciler, StoreManager, StoreState, TransactionListener};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
