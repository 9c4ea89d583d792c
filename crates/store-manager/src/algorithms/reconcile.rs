//! # Entitlement Classification
//!
//! Turns the platform's current entitlements into owned-item lists.
//!
//! Status lookups for subscription groups need the platform and live in the
//! service; this module only decides which groups to look up.

use super::verification::check_verified;
use crate::domain::{Catalog, EntitlementSet};
use shared_types::{ProductKind, SubscriptionGroupId, Transaction, VerificationResult};
use tracing::{debug, warn};

/// Owned items derived from one entitlement enumeration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassifiedEntitlements {
    /// Owned items, cross-referenced against the catalog.
    pub entitlements: EntitlementSet,
    /// Subscription groups of owned auto-renewables, without repeats.
    pub groups: Vec<SubscriptionGroupId>,
    /// Entitlements that failed verification.
    pub discarded_unverified: usize,
    /// Verified entitlements that were revoked.
    pub skipped_revoked: usize,
    /// Verified entitlements with no matching catalog item.
    pub dropped_uncatalogued: usize,
}

/// Classify entitlements against the current catalog.
///
/// Unverified and revoked entitlements never become owned. An entitlement is
/// owned only if the catalog partition for its kind lists the product.
/// Consumables are never entitlement-backed and are ignored.
pub fn classify_entitlements<I>(catalog: &Catalog, entitlements: I) -> ClassifiedEntitlements
where
    I: IntoIterator<Item = VerificationResult<Transaction>>,
{
    let mut classified = ClassifiedEntitlements::default();

    for result in entitlements {
        let transaction = match check_verified(result) {
            Ok(transaction) => transaction,
            Err(e) => {
                warn!(error = %e, "[store] Discarding unverified entitlement");
                classified.discarded_unverified += 1;
                continue;
            }
        };

        if transaction.is_revoked() {
            debug!(
                transaction_id = transaction.id,
                product_id = %transaction.product_id,
                "[store] Entitlement revoked, not owned"
            );
            classified.skipped_revoked += 1;
            continue;
        }

        if transaction.is_renewal() {
            debug!(
                transaction_id = transaction.id,
                original_id = transaction.original_id,
                product_id = %transaction.product_id,
                "[store] Entitlement is a renewal"
            );
        }

        let kind = &transaction.product_kind;
        if !kind.is_entitlement_backed() {
            continue;
        }

        let Some(item) = catalog.find(kind, &transaction.product_id) else {
            debug!(
                product_id = %transaction.product_id,
                kind = %kind,
                "[store] Entitlement not in catalog"
            );
            classified.dropped_uncatalogued += 1;
            continue;
        };

        if classified.entitlements.contains(&item.id) {
            continue;
        }

        let owned = &mut classified.entitlements;
        match kind {
            ProductKind::NonConsumable => owned.non_consumables.push(item.clone()),
            ProductKind::NonRenewable => owned.non_renewables.push(item.clone()),
            ProductKind::AutoRenewable => {
                if let Some(group) = item.group_id() {
                    if !classified.groups.contains(group) {
                        classified.groups.push(group.clone());
                    }
                }
                owned.auto_renewables.push(item.clone());
            }
            ProductKind::Consumable | ProductKind::Unknown(_) => {}
        }
    }

    classified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::invariant_owned_in_catalog;
    use chrono::{Duration, Utc};
    use shared_types::{CatalogItem, ProductId, VerificationFailure};

    fn catalog() -> Catalog {
        Catalog {
            consumables: vec![CatalogItem::new("A", ProductKind::Consumable)],
            non_consumables: vec![CatalogItem::new("no_ads", ProductKind::NonConsumable)],
            auto_renewables: vec![
                CatalogItem::new("B", ProductKind::AutoRenewable).with_group("pro"),
                CatalogItem::new("B.yearly", ProductKind::AutoRenewable).with_group("pro"),
            ],
            non_renewables: vec![CatalogItem::new("season", ProductKind::NonRenewable)],
        }
    }

    fn tx(id: u64, product: &str, kind: ProductKind) -> Transaction {
        let now = Utc::now();
        Transaction {
            id,
            original_id: id,
            product_id: ProductId::new(product),
            product_kind: kind,
            purchase_date: now,
            original_purchase_date: now,
            expiration_date: None,
            revocation_date: None,
            is_upgraded: false,
            purchased_quantity: 1,
        }
    }

    #[test]
    fn test_verified_auto_renewable_owned() {
        let classified = classify_entitlements(
            &catalog(),
            vec![VerificationResult::Verified(tx(1, "B", ProductKind::AutoRenewable))],
        );
        let owned = &classified.entitlements;
        assert_eq!(owned.auto_renewables.len(), 1);
        assert_eq!(owned.auto_renewables[0].id.as_str(), "B");
        assert!(owned.non_consumables.is_empty());
        assert_eq!(classified.groups, vec![SubscriptionGroupId::new("pro")]);
    }

    #[test]
    fn test_unverified_never_owned() {
        let classified = classify_entitlements(
            &catalog(),
            vec![
                VerificationResult::Unverified(
                    tx(1, "no_ads", ProductKind::NonConsumable),
                    VerificationFailure::InvalidSignature,
                ),
                VerificationResult::Verified(tx(2, "season", ProductKind::NonRenewable)),
            ],
        );
        assert!(classified.entitlements.non_consumables.is_empty());
        assert_eq!(classified.entitlements.non_renewables.len(), 1);
        assert_eq!(classified.discarded_unverified, 1);
    }

    #[test]
    fn test_uncatalogued_dropped() {
        let classified = classify_entitlements(
            &catalog(),
            vec![
                VerificationResult::Verified(tx(1, "retired", ProductKind::NonConsumable)),
                // Listed in the catalog under a different kind.
                VerificationResult::Verified(tx(2, "B", ProductKind::NonConsumable)),
            ],
        );
        assert!(classified.entitlements.is_empty());
        assert_eq!(classified.dropped_uncatalogued, 2);
        assert!(invariant_owned_in_catalog(
            &classified.entitlements,
            &catalog()
        ));
    }

    #[test]
    fn test_revoked_not_owned() {
        let mut revoked = tx(1, "no_ads", ProductKind::NonConsumable);
        revoked.revocation_date = Some(Utc::now());
        let classified =
            classify_entitlements(&catalog(), vec![VerificationResult::Verified(revoked)]);
        assert!(classified.entitlements.is_empty());
        assert_eq!(classified.skipped_revoked, 1);
    }

    #[test]
    fn test_groups_deduplicated() {
        let classified = classify_entitlements(
            &catalog(),
            vec![
                VerificationResult::Verified(tx(1, "B", ProductKind::AutoRenewable)),
                VerificationResult::Verified(tx(2, "B.yearly", ProductKind::AutoRenewable)),
            ],
        );
        assert_eq!(classified.entitlements.auto_renewables.len(), 2);
        assert_eq!(classified.groups.len(), 1);
    }

    #[test]
    fn test_consumables_and_repeats_ignored() {
        let mut renewal = tx(5, "B", ProductKind::AutoRenewable);
        renewal.original_purchase_date = renewal.purchase_date - Duration::days(30);
        let classified = classify_entitlements(
            &catalog(),
            vec![
                VerificationResult::Verified(tx(1, "A", ProductKind::Consumable)),
                VerificationResult::Verified(tx(2, "B", ProductKind::AutoRenewable)),
                VerificationResult::Verified(renewal),
            ],
        );
        assert_eq!(classified.entitlements.len(), 1);
        assert_eq!(classified.dropped_uncatalogued, 0);
    }
}
