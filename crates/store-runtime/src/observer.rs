//! # State Observers
//!
//! Mirrors the store's published state on the delivery context and logs
//! each change.

use parking_lot::Mutex;
use shared_bus::{CancellableBag, MainContext};
use shared_types::{CatalogItem, ProductKind};
use std::sync::Arc;
use store_manager::{
    ConsumableTransactionLog, EntitlementSet, StoreState, SubscriptionGroupStatus,
};
use tracing::info;

/// Latest values seen by the view layer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewSnapshot {
    /// Consumable catalog items.
    pub consumables: Vec<CatalogItem>,
    /// Non-consumable catalog items.
    pub non_consumables: Vec<CatalogItem>,
    /// Auto-renewable catalog items.
    pub auto_renewables: Vec<CatalogItem>,
    /// Non-renewable catalog items.
    pub non_renewables: Vec<CatalogItem>,
    /// Owned items.
    pub entitlements: EntitlementSet,
    /// Renewal state per group.
    pub group_status: SubscriptionGroupStatus,
    /// Consumable transaction identifiers.
    pub consumable_log: ConsumableTransactionLog,
}

impl ViewSnapshot {
    /// Catalog section for a kind. Empty for `Unknown`.
    pub fn products(&self, kind: &ProductKind) -> &[CatalogItem] {
        match kind {
            ProductKind::Consumable => &self.consumables,
            ProductKind::NonConsumable => &self.non_consumables,
            ProductKind::AutoRenewable => &self.auto_renewables,
            ProductKind::NonRenewable => &self.non_renewables,
            ProductKind::Unknown(_) => &[],
        }
    }
}

/// View-layer mirror of the store state.
///
/// Written only from the delivery context.
#[derive(Clone, Default)]
pub struct StoreView {
    snapshot: Arc<Mutex<ViewSnapshot>>,
}

impl StoreView {
    /// Create an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the latest values.
    pub fn snapshot(&self) -> ViewSnapshot {
        self.snapshot.lock().clone()
    }

    /// Subscribe to every published value, delivering on `context`.
    pub fn bind(&self, state: &StoreState, context: &MainContext) -> CancellableBag {
        let mut bag = CancellableBag::new();

        let catalog_fields: [(
            &shared_bus::Published<Vec<CatalogItem>>,
            fn(&mut ViewSnapshot) -> &mut Vec<CatalogItem>,
        ); 4] = [
            (&state.consumables, |s| &mut s.consumables),
            (&state.non_consumables, |s| &mut s.non_consumables),
            (&state.auto_renewables, |s| &mut s.auto_renewables),
            (&state.non_renewables, |s| &mut s.non_renewables),
        ];
        for (published, field) in catalog_fields {
            let view = self.snapshot.clone();
            let name = published.name();
            bag.store(published.subscribe().receive_on(context, move |items| {
                info!(section = name, items = items.len(), "[view] Catalog section updated");
                *field(&mut view.lock()) = items;
            }));
        }

        let view = self.snapshot.clone();
        bag.store(state.entitlements.subscribe().receive_on(context, move |owned| {
            info!(
                non_consumables = owned.non_consumables.len(),
                non_renewables = owned.non_renewables.len(),
                auto_renewables = owned.auto_renewables.len(),
                "[view] Owned items updated"
            );
            view.lock().entitlements = owned;
        }));

        let view = self.snapshot.clone();
        bag.store(state.group_status.subscribe().receive_on(context, move |status| {
            for (group, renewal) in &status {
                info!(group_id = %group, state = ?renewal, "[view] Subscription status");
            }
            view.lock().group_status = status;
        }));

        let view = self.snapshot.clone();
        bag.store(state.consumable_log.subscribe().receive_on(context, move |log| {
            info!(entries = log.len(), "[view] Consumable log updated");
            view.lock().consumable_log = log;
        }));

        bag
    }
}
