//! # Catalog Partitioning
//!
//! Splits a platform product lookup into the four kind partitions.

use crate::domain::Catalog;
use shared_types::CatalogItem;
use std::collections::HashSet;
use tracing::warn;

/// Result of partitioning one catalog fetch.
#[derive(Clone, Debug, Default)]
pub struct PartitionOutcome {
    /// The new catalog.
    pub catalog: Catalog,
    /// Items left out: unknown kinds and repeated identifiers.
    pub dropped: Vec<CatalogItem>,
}

/// Partition fetched items by kind.
///
/// Items of an unrecognized kind are dropped with a warning. If the platform
/// returns the same identifier twice, the first occurrence wins. Platform
/// order is preserved within each partition.
pub fn partition_catalog(items: Vec<CatalogItem>) -> PartitionOutcome {
    let mut outcome = PartitionOutcome::default();
    let mut seen = HashSet::new();

    for item in items {
        if !seen.insert(item.id.clone()) {
            warn!(product_id = %item.id, "[store] Duplicate catalog item dropped");
            outcome.dropped.push(item);
            continue;
        }

        let kind = item.kind.clone();
        match outcome.catalog.partition_mut(&kind) {
            Some(partition) => partition.push(item),
            None => {
                warn!(product_id = %item.id, kind = %kind, "[store] Unknown product kind");
                outcome.dropped.push(item);
            }
        }
    }

    outcome
}
