//! # Domain Invariants
//!
//! Rules every published catalog and entitlement set must satisfy.

use super::entities::{Catalog, EntitlementSet};
use shared_types::ProductKind;

/// Invariant: catalog partitioning.
///
/// Every item sits in the partition matching its kind and no item is
/// listed twice.
pub fn invariant_catalog_partitioned(catalog: &Catalog) -> bool {
    let kinds_match = ProductKind::KNOWN.iter().all(|kind| {
        catalog
            .partition(kind)
            .iter()
            .all(|item| &item.kind == kind)
    });

    let mut seen = std::collections::HashSet::new();
    kinds_match && catalog.iter().all(|item| seen.insert(&item.id))
}

/// Invariant: no orphaned ownership.
///
/// Every owned item is present in the catalog partition of the same kind.
pub fn invariant_owned_in_catalog(entitlements: &EntitlementSet, catalog: &Catalog) -> bool {
    [
        ProductKind::NonConsumable,
        ProductKind::NonRenewable,
        ProductKind::AutoRenewable,
    ]
    .iter()
    .all(|kind| {
        entitlements
            .owned(kind)
            .iter()
            .all(|item| catalog.find(kind, &item.id).is_some())
    })
}
