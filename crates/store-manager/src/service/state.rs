//! # Published Store State
//!
//! Every value the store exposes to observers, each as a replay-latest
//! `Published` handle.

use crate::domain::{Catalog, ConsumableTransactionLog, EntitlementSet, SubscriptionGroupStatus};
use shared_bus::Published;
use shared_types::{CatalogItem, ProductKind};

/// Observable store state.
///
/// Cloning yields handles to the same values. Observers subscribe to a field
/// and, to receive on a single context, forward with `receive_on`.
#[derive(Clone)]
pub struct StoreState {
    /// Consumable catalog items.
    pub consumables: Published<Vec<CatalogItem>>,
    /// Non-consumable catalog items.
    pub non_consumables: Published<Vec<CatalogItem>>,
    /// Auto-renewable catalog items.
    pub auto_renewables: Published<Vec<CatalogItem>>,
    /// Non-renewable catalog items.
    pub non_renewables: Published<Vec<CatalogItem>>,
    /// Owned items, replaced as a unit.
    pub entitlements: Published<EntitlementSet>,
    /// Renewal state per subscription group.
    pub group_status: Published<SubscriptionGroupStatus>,
    /// Persisted consumable transaction identifiers.
    pub consumable_log: Published<ConsumableTransactionLog>,
}

impl StoreState {
    /// Empty catalog and entitlements, with `log` as the persisted log.
    pub fn new(log: ConsumableTransactionLog) -> Self {
        Self {
            consumables: Published::new("consumables", Vec::new()),
            non_consumables: Published::new("non_consumables", Vec::new()),
            auto_renewables: Published::new("auto_renewables", Vec::new()),
            non_renewables: Published::new("non_renewables", Vec::new()),
            entitlements: Published::new("entitlements", EntitlementSet::default()),
            group_status: Published::new("group_status", SubscriptionGroupStatus::new()),
            consumable_log: Published::new("consumable_log", log),
        }
    }

    /// Catalog partition for a kind. Empty for `Unknown`.
    pub fn products(&self, kind: &ProductKind) -> Vec<CatalogItem> {
        match kind {
            ProductKind::Consumable => self.consumables.get(),
            ProductKind::NonConsumable => self.non_consumables.get(),
            ProductKind::AutoRenewable => self.auto_renewables.get(),
            ProductKind::NonRenewable => self.non_renewables.get(),
            ProductKind::Unknown(_) => Vec::new(),
        }
    }

    /// Snapshot of the whole catalog.
    pub fn catalog(&self) -> Catalog {
        Catalog {
            consumables: self.consumables.get(),
            non_consumables: self.non_consumables.get(),
            auto_renewables: self.auto_renewables.get(),
            non_renewables: self.non_renewables.get(),
        }
    }

    /// Publish a new catalog. Each partition is published on its own, so an
    /// observer may briefly see new partitions next to old ones.
    pub(crate) fn publish_catalog(&self, catalog: Catalog) {
        let Catalog {
            consumables,
            non_consumables,
            auto_renewables,
            non_renewables,
        } = catalog;
        self.consumables.set(consumables);
        self.non_consumables.set(non_consumables);
        self.auto_renewables.set(auto_renewables);
        self.non_renewables.set(non_renewables);
    }
}

impl Default for StoreState {
    fn default() -> Self {
        Self::new(ConsumableTransactionLog::new())
    }
}
