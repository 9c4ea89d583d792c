//! # Entitlement Reconciler
//!
//! Owns every write to the catalog and entitlement state. Catalog
//! replacement and reconciliation passes run one at a time.

use super::state::StoreState;
use crate::algorithms::{classify_entitlements, partition_catalog};
use crate::domain::{Reconciliation, StoreError, SubscriptionGroupStatus};
use crate::ports::outbound::CommercePlatform;
use shared_types::{ProductId, ProductKind};
use std::sync::Arc;
use store_telemetry::{
    log_event, time_histogram, CATALOG_FETCHES, CATALOG_ITEMS, CATALOG_ITEMS_DROPPED,
    ENTITLEMENT_REFRESHES, OWNED_ITEMS, REFRESH_DURATION, STORE_ERRORS,
    SUBSCRIPTION_STATUS_FAILURES, VERIFICATION_FAILURES,
};
use tokio::sync::Mutex;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// Catalog store and entitlement reconciler.
pub struct EntitlementReconciler {
    platform: Arc<dyn CommercePlatform>,
    state: StoreState,
    pass_lock: Mutex<()>,
}

impl EntitlementReconciler {
    /// Create a reconciler publishing into `state`.
    pub fn new(platform: Arc<dyn CommercePlatform>, state: StoreState) -> Self {
        Self {
            platform,
            state,
            pass_lock: Mutex::new(()),
        }
    }

    /// Published state.
    pub fn state(&self) -> &StoreState {
        &self.state
    }

    /// Fetch the catalog and replace every partition.
    ///
    /// On failure the previous catalog stays published.
    pub async fn request_products(&self, identifiers: &[ProductId]) -> Result<(), StoreError> {
        let items = match self.platform.products(identifiers).await {
            Ok(items) => {
                CATALOG_FETCHES.with_label_values(&["success"]).inc();
                items
            }
            Err(e) => {
                CATALOG_FETCHES.with_label_values(&["failure"]).inc();
                STORE_ERRORS
                    .with_label_values(&["catalog", "catalog_fetch"])
                    .inc();
                warn!(error = %e, "[store] Catalog fetch failed");
                return Err(StoreError::CatalogFetch(e));
            }
        };

        let outcome = partition_catalog(items);
        CATALOG_ITEMS_DROPPED.inc_by(outcome.dropped.len() as f64);
        for kind in &ProductKind::KNOWN {
            CATALOG_ITEMS
                .with_label_values(&[kind.to_string().as_str()])
                .set(outcome.catalog.partition(kind).len() as f64);
        }

        let _pass = self.pass_lock.lock().await;
        log_event!(
            info,
            "catalog",
            "[store] Catalog replaced",
            items = outcome.catalog.len(),
            dropped = outcome.dropped.len()
        );
        self.state.publish_catalog(outcome.catalog);
        Ok(())
    }

    /// Recompute owned items and subscription group status.
    ///
    /// Unverified, revoked and uncatalogued entitlements are skipped. A
    /// failing group status lookup drops only that group from the new
    /// mapping.
    pub async fn refresh(&self) -> Result<Reconciliation, StoreError> {
        let _pass = self.pass_lock.lock().await;
        let _timer = time_histogram!(REFRESH_DURATION);
        ENTITLEMENT_REFRESHES.inc();

        let catalog = self.state.catalog();
        let entitlements: Vec<_> = self.platform.current_entitlements().collect().await;
        let classified = classify_entitlements(&catalog, entitlements);

        if classified.discarded_unverified > 0 {
            VERIFICATION_FAILURES
                .with_label_values(&["entitlements"])
                .inc_by(classified.discarded_unverified as f64);
        }

        let owned = &classified.entitlements;
        for kind in [
            ProductKind::NonConsumable,
            ProductKind::NonRenewable,
            ProductKind::AutoRenewable,
        ] {
            OWNED_ITEMS
                .with_label_values(&[kind.to_string().as_str()])
                .set(owned.owned(&kind).len() as f64);
        }
        self.state.entitlements.set(owned.clone());

        let mut group_status = SubscriptionGroupStatus::new();
        let mut failed_groups = Vec::new();
        for group_id in &classified.groups {
            match self.platform.subscription_status(group_id).await {
                Ok(Some(renewal)) => {
                    group_status.insert(group_id.clone(), renewal);
                }
                Ok(None) => {
                    debug!(group_id = %group_id, "[store] No renewal status for group");
                }
                Err(source) => {
                    SUBSCRIPTION_STATUS_FAILURES.inc();
                    let e = StoreError::SubscriptionStatus {
                        group_id: group_id.clone(),
                        source,
                    };
                    STORE_ERRORS
                        .with_label_values(&["reconciler", e.kind()])
                        .inc();
                    warn!(error = %e, "[store] Skipping group for this pass");
                    failed_groups.push(group_id.clone());
                }
            }
        }
        self.state.group_status.set(group_status.clone());

        info!(
            owned = owned.len(),
            groups = group_status.len(),
            failed_groups = failed_groups.len(),
            discarded_unverified = classified.discarded_unverified,
            "[store] Entitlements reconciled"
        );

        Ok(Reconciliation {
            entitlements: classified.entitlements,
            group_status,
            discarded_unverified: classified.discarded_unverified,
            skipped_revoked: classified.skipped_revoked,
            dropped_uncatalogued: classified.dropped_uncatalogued,
            failed_groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SimulatedPlatform;
    use crate::domain::invariant_owned_in_catalog;
    use shared_types::{
        CatalogItem, PlatformError, RenewalState, SubscriptionGroupId, Transaction,
        VerificationFailure, VerificationResult,
    };

    fn catalog_items() -> Vec<CatalogItem> {
        vec![
            CatalogItem::new("A", ProductKind::Consumable),
            CatalogItem::new("B", ProductKind::AutoRenewable).with_group("group.b"),
            CatalogItem::new("C", ProductKind::AutoRenewable).with_group("group.c"),
            CatalogItem::new("no_ads", ProductKind::NonConsumable),
        ]
    }

    fn ids() -> Vec<ProductId> {
        catalog_items().into_iter().map(|item| item.id).collect()
    }

    fn setup() -> (Arc<SimulatedPlatform>, EntitlementReconciler) {
        let platform = Arc::new(SimulatedPlatform::new(catalog_items()));
        let reconciler = EntitlementReconciler::new(platform.clone(), StoreState::default());
        (platform, reconciler)
    }

    fn verified(platform: &SimulatedPlatform, id: &str, kind: ProductKind) -> Transaction {
        platform.new_transaction(&CatalogItem::new(id, kind))
    }

    #[tokio::test]
    async fn test_scenario_owned_auto_renewable() {
        let (platform, reconciler) = setup();
        reconciler.request_products(&ids()).await.unwrap();
        let tx = verified(&platform, "B", ProductKind::AutoRenewable);
        platform.grant(VerificationResult::Verified(tx));
        platform.set_status(
            SubscriptionGroupId::new("group.b"),
            Ok(Some(RenewalState::Subscribed)),
        );

        let report = reconciler.refresh().await.unwrap();
        let state = reconciler.state();
        let owned = state.entitlements.get();
        assert_eq!(owned.auto_renewables.len(), 1);
        assert_eq!(owned.auto_renewables[0].id.as_str(), "B");
        assert!(owned.non_consumables.is_empty());
        assert_eq!(
            state.group_status.get().get(&SubscriptionGroupId::new("group.b")),
            Some(&RenewalState::Subscribed)
        );
        assert_eq!(report.entitlements, owned);
    }

    #[tokio::test]
    async fn test_catalog_failure_keeps_previous_catalog() {
        let (platform, reconciler) = setup();
        reconciler.request_products(&ids()).await.unwrap();
        platform.fail_next_catalog(PlatformError::Network("offline".into()));

        let err = reconciler.request_products(&ids()).await.unwrap_err();
        assert!(matches!(err, StoreError::CatalogFetch(_)));
        assert_eq!(reconciler.state().catalog().len(), 4);
    }

    #[tokio::test]
    async fn test_unverified_entitlement_not_owned() {
        let (platform, reconciler) = setup();
        reconciler.request_products(&ids()).await.unwrap();
        let tx = verified(&platform, "no_ads", ProductKind::NonConsumable);
        platform.grant(VerificationResult::Unverified(
            tx,
            VerificationFailure::InvalidSignature,
        ));

        let report = reconciler.refresh().await.unwrap();
        assert!(reconciler.state().entitlements.get().is_empty());
        assert_eq!(report.discarded_unverified, 1);
    }

    #[tokio::test]
    async fn test_group_failure_isolated() {
        let (platform, reconciler) = setup();
        reconciler.request_products(&ids()).await.unwrap();
        for id in ["B", "C"] {
            let tx = verified(&platform, id, ProductKind::AutoRenewable);
            platform.grant(VerificationResult::Verified(tx));
        }
        platform.set_status(
            SubscriptionGroupId::new("group.b"),
            Err(PlatformError::StatusUnavailable("group.b".into())),
        );
        platform.set_status(
            SubscriptionGroupId::new("group.c"),
            Ok(Some(RenewalState::InGracePeriod)),
        );

        let report = reconciler.refresh().await.unwrap();
        assert_eq!(report.failed_groups, vec![SubscriptionGroupId::new("group.b")]);
        let status = reconciler.state().group_status.get();
        assert_eq!(status.len(), 1);
        assert_eq!(
            status.get(&SubscriptionGroupId::new("group.c")),
            Some(&RenewalState::InGracePeriod)
        );
        assert_eq!(reconciler.state().entitlements.get().auto_renewables.len(), 2);
    }

    #[tokio::test]
    async fn test_group_status_replaced_not_merged() {
        let (platform, reconciler) = setup();
        reconciler.request_products(&ids()).await.unwrap();
        let tx = verified(&platform, "B", ProductKind::AutoRenewable);
        platform.grant(VerificationResult::Verified(tx));
        platform.set_status(
            SubscriptionGroupId::new("group.b"),
            Ok(Some(RenewalState::Subscribed)),
        );
        reconciler.refresh().await.unwrap();
        assert_eq!(reconciler.state().group_status.get().len(), 1);

        platform.revoke_all(&ProductId::new("B"));
        reconciler.refresh().await.unwrap();
        assert!(reconciler.state().group_status.get().is_empty());
        assert!(reconciler.state().entitlements.get().is_empty());
    }

    #[tokio::test]
    async fn test_owned_items_follow_catalog() {
        let (platform, reconciler) = setup();
        reconciler.request_products(&ids()).await.unwrap();
        let tx = verified(&platform, "no_ads", ProductKind::NonConsumable);
        platform.grant(VerificationResult::Verified(tx));
        reconciler.refresh().await.unwrap();
        assert_eq!(reconciler.state().entitlements.get().len(), 1);

        // Product retired from the catalog.
        reconciler
            .request_products(&[ProductId::new("A"), ProductId::new("B")])
            .await
            .unwrap();
        let report = reconciler.refresh().await.unwrap();
        assert_eq!(report.dropped_uncatalogued, 1);
        let state = reconciler.state();
        assert!(invariant_owned_in_catalog(
            &state.entitlements.get(),
            &state.catalog()
        ));
    }
}
