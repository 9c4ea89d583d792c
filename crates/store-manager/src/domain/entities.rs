//! # Domain Entities
//!
//! Catalog partitions, owned-item lists and the per-pass reconciliation
//! report.

use serde::{Deserialize, Serialize};
use shared_types::{
    CatalogItem, ProductId, ProductKind, RenewalState, SubscriptionGroupId, Transaction,
};
use std::collections::BTreeMap;

/// Catalog partitioned by product kind.
///
/// Replaced wholesale on every fetch. An item appears in exactly one
/// partition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Consumable products.
    pub consumables: Vec<CatalogItem>,
    /// Non-consumable products.
    pub non_consumables: Vec<CatalogItem>,
    /// Auto-renewable subscriptions.
    pub auto_renewables: Vec<CatalogItem>,
    /// Non-renewing subscriptions.
    pub non_renewables: Vec<CatalogItem>,
}

impl Catalog {
    /// Partition for a kind. `Unknown` has no partition.
    pub fn partition(&self, kind: &ProductKind) -> &[CatalogItem] {
        match kind {
            ProductKind::Consumable => &self.consumables,
            ProductKind::NonConsumable => &self.non_consumables,
            ProductKind::AutoRenewable => &self.auto_renewables,
            ProductKind::NonRenewable => &self.non_renewables,
            ProductKind::Unknown(_) => &[],
        }
    }

    pub(crate) fn partition_mut(&mut self, kind: &ProductKind) -> Option<&mut Vec<CatalogItem>> {
        match kind {
            ProductKind::Consumable => Some(&mut self.consumables),
            ProductKind::NonConsumable => Some(&mut self.non_consumables),
            ProductKind::AutoRenewable => Some(&mut self.auto_renewables),
            ProductKind::NonRenewable => Some(&mut self.non_renewables),
            ProductKind::Unknown(_) => None,
        }
    }

    /// Look up an item of the given kind by identifier.
    pub fn find(&self, kind: &ProductKind, id: &ProductId) -> Option<&CatalogItem> {
        self.partition(kind).iter().find(|item| &item.id == id)
    }

    /// Look up an item in any partition.
    pub fn find_any(&self, id: &ProductId) -> Option<&CatalogItem> {
        self.iter().find(|item| &item.id == id)
    }

    /// Iterate every item across partitions.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogItem> {
        self.consumables
            .iter()
            .chain(&self.non_consumables)
            .chain(&self.auto_renewables)
            .chain(&self.non_renewables)
    }

    /// Total number of items.
    pub fn len(&self) -> usize {
        self.consumables.len()
            + self.non_consumables.len()
            + self.auto_renewables.len()
            + self.non_renewables.len()
    }

    /// Whether the catalog has no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Items the customer currently owns, partitioned by kind.
///
/// Published as one value so observers never see a partial update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementSet {
    /// Owned non-consumables.
    pub non_consumables: Vec<CatalogItem>,
    /// Owned non-renewing subscriptions.
    pub non_renewables: Vec<CatalogItem>,
    /// Owned auto-renewable subscriptions.
    pub auto_renewables: Vec<CatalogItem>,
}

impl EntitlementSet {
    /// Owned list for a kind. Consumables are never owned.
    pub fn owned(&self, kind: &ProductKind) -> &[CatalogItem] {
        match kind {
            ProductKind::NonConsumable => &self.non_consumables,
            ProductKind::NonRenewable => &self.non_renewables,
            ProductKind::AutoRenewable => &self.auto_renewables,
            ProductKind::Consumable | ProductKind::Unknown(_) => &[],
        }
    }

    /// Whether a product is owned.
    pub fn contains(&self, id: &ProductId) -> bool {
        self.non_consumables
            .iter()
            .chain(&self.non_renewables)
            .chain(&self.auto_renewables)
            .any(|item| &item.id == id)
    }

    /// Total owned items.
    pub fn len(&self) -> usize {
        self.non_consumables.len() + self.non_renewables.len() + self.auto_renewables.len()
    }

    /// Whether nothing is owned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Renewal state per subscription group. Rebuilt from scratch each pass.
pub type SubscriptionGroupStatus = BTreeMap<SubscriptionGroupId, RenewalState>;

/// Outcome of a purchase, after verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// Verified, finished and reconciled.
    Success(Transaction),
    /// The customer dismissed the purchase.
    UserCancelled,
    /// Awaiting approval; the listener picks it up when it completes.
    Pending,
}

impl PurchaseOutcome {
    /// Label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            PurchaseOutcome::Success(_) => "success",
            PurchaseOutcome::UserCancelled => "user_cancelled",
            PurchaseOutcome::Pending => "pending",
        }
    }

    /// The transaction, if the purchase succeeded.
    pub fn transaction(&self) -> Option<&Transaction> {
        match self {
            PurchaseOutcome::Success(transaction) => Some(transaction),
            _ => None,
        }
    }
}

/// Report of one reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Owned items published by this pass.
    pub entitlements: EntitlementSet,
    /// Group status published by this pass.
    pub group_status: SubscriptionGroupStatus,
    /// Entitlements skipped because they failed verification.
    pub discarded_unverified: usize,
    /// Verified entitlements skipped because the platform revoked them.
    pub skipped_revoked: usize,
    /// Verified entitlements whose product is not in the catalog.
    pub dropped_uncatalogued: usize,
    /// Groups whose status lookup failed this pass.
    pub failed_groups: Vec<SubscriptionGroupId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog {
            consumables: vec![CatalogItem::new("gems.100", ProductKind::Consumable)],
            non_consumables: vec![CatalogItem::new("no_ads", ProductKind::NonConsumable)],
            auto_renewables: vec![
                CatalogItem::new("pro.monthly", ProductKind::AutoRenewable).with_group("pro")
            ],
            non_renewables: vec![],
        }
    }

    #[test]
    fn test_partition_lookup() {
        let catalog = catalog();
        assert_eq!(catalog.partition(&ProductKind::Consumable).len(), 1);
        assert!(catalog
            .partition(&ProductKind::Unknown("bundle".into()))
            .is_empty());
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_find_respects_kind() {
        let catalog = catalog();
        let id = ProductId::new("no_ads");
        assert!(catalog.find(&ProductKind::NonConsumable, &id).is_some());
        assert!(catalog.find(&ProductKind::Consumable, &id).is_none());
        assert!(catalog.find_any(&id).is_some());
    }

    #[test]
    fn test_entitlements_never_own_consumables() {
        let set = EntitlementSet {
            non_consumables: vec![CatalogItem::new("no_ads", ProductKind::NonConsumable)],
            ..Default::default()
        };
        assert!(set.owned(&ProductKind::Consumable).is_empty());
        assert!(set.contains(&ProductId::new("no_ads")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_purchase_outcome_labels() {
        assert_eq!(PurchaseOutcome::Pending.label(), "pending");
        assert!(PurchaseOutcome::UserCancelled.transaction().is_none());
    }
}
