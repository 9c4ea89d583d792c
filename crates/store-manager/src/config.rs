//! # Store Configuration

use serde::{Deserialize, Serialize};
use shared_types::ProductId;
use std::path::PathBuf;

/// Default key for the persisted consumable log.
pub const DEFAULT_CONSUMABLE_LOG_KEY: &str = "store.consumableTransactionIDs";

/// File name of the key-value store inside `data_dir`.
pub const STORAGE_FILE_NAME: &str = "store.kv";

/// Store manager configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Product identifiers requested from the platform at startup.
    pub product_identifiers: Vec<String>,
    /// Key the consumable log is persisted under.
    pub consumable_log_key: String,
    /// Directory for local storage. `None` keeps the log in memory only.
    pub data_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            product_identifiers: Vec::new(),
            consumable_log_key: DEFAULT_CONSUMABLE_LOG_KEY.to_string(),
            data_dir: None,
        }
    }
}

impl StoreConfig {
    /// Configured identifiers as `ProductId`s, blanks removed.
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.product_identifiers
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(ProductId::new)
            .collect()
    }

    /// Path of the key-value file, if persistence is enabled.
    pub fn storage_path(&self) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(STORAGE_FILE_NAME))
    }
}
