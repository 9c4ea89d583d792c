//! # Value Objects
//!
//! The consumable transaction log and transaction provenance.

use serde::{Deserialize, Serialize};
use shared_types::TransactionId;
use std::fmt;

/// Where a transaction entered the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransactionSource {
    /// Background update feed.
    Listener,
    /// Direct purchase.
    Purchase,
    /// Current-entitlements enumeration during a refresh.
    Entitlements,
}

impl TransactionSource {
    /// Label used for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionSource::Listener => "listener",
            TransactionSource::Purchase => "purchase",
            TransactionSource::Entitlements => "entitlements",
        }
    }
}

impl fmt::Display for TransactionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered, append-only list of consumable transaction identifiers.
///
/// The only state persisted locally; everything else is rebuilt from the
/// platform.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsumableTransactionLog(Vec<TransactionId>);

impl ConsumableTransactionLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an identifier.
    pub fn append(&mut self, id: TransactionId) {
        self.0.push(id);
    }

    /// Identifiers in append order.
    pub fn ids(&self) -> &[TransactionId] {
        &self.0
    }

    /// Whether an identifier is present.
    pub fn contains(&self, id: TransactionId) -> bool {
        self.0.contains(&id)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<TransactionId>> for ConsumableTransactionLog {
    fn from(ids: Vec<TransactionId>) -> Self {
        Self(ids)
    }
}
