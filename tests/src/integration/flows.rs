//! # Integration Test Flows
//!
//! End-to-end store behavior over the simulated platform:
//!
//! 1. **Bootstrap**: listener, catalog partitions, initial reconciliation
//! 2. **Purchases**: success, cancellation, verification failure
//! 3. **Listener**: verified and unverified updates, cancellation
//! 4. **Persistence**: consumable log across a restart
//! 5. **Concurrency**: serialized refreshes

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use shared_types::{ProductId, ProductKind, RenewalState, VerificationFailure, VerificationResult};
    use std::sync::Arc;
    use store_manager::{
        invariant_catalog_partitioned, invariant_owned_in_catalog, PurchaseOutcome,
        ScriptedPurchase, SimulatedPlatform, StoreApi, StoreConfig, StoreError, StoreManager,
    };
    use tempfile::tempdir;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    async fn started(platform: &Arc<SimulatedPlatform>) -> StoreManager {
        let store = StoreManager::new(platform.clone(), StoreConfig::default()).unwrap();
        store.start_service(&product_ids()).await.unwrap();
        store
    }

    // =============================================================================
    // BOOTSTRAP AND CATALOG
    // =============================================================================

    #[tokio::test]
    async fn test_catalog_items_land_in_exactly_one_partition() {
        let platform = Arc::new(SimulatedPlatform::new(catalog()));
        let store = started(&platform).await;

        let catalog = store.state().catalog();
        assert!(invariant_catalog_partitioned(&catalog));
        // The unrecognized bundle is dropped.
        assert_eq!(catalog.len(), 4);
        for kind in &ProductKind::KNOWN {
            assert_eq!(store.state().products(kind).len(), 1);
        }
        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_scenario_a_consumable_b_subscription() {
        let platform = Arc::new(SimulatedPlatform::new(vec![item("A"), item("B")]));
        grant_verified(&platform, "B");
        platform.set_status(group_b(), Ok(Some(RenewalState::Subscribed)));

        let store = started(&platform).await;
        let owned = store.state().entitlements.get();
        assert_eq!(owned.auto_renewables.len(), 1);
        assert_eq!(owned.auto_renewables[0].id.as_str(), "B");
        assert!(owned.non_consumables.is_empty());
        assert!(store.state().group_status.get().contains_key(&group_b()));
        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_retired_product_leaves_owned_lists() {
        let platform = Arc::new(SimulatedPlatform::new(catalog()));
        grant_verified(&platform, "no_ads");
        grant_verified(&platform, "season");
        let store = started(&platform).await;
        assert_eq!(store.state().entitlements.get().len(), 2);

        platform.set_catalog(
            catalog()
                .into_iter()
                .filter(|item| item.id.as_str() != "season")
                .collect(),
        );
        store.request_products(&product_ids()).await.unwrap();
        let report = store.restore().await.unwrap();

        assert_eq!(report.dropped_uncatalogued, 1);
        assert!(store.state().products(&ProductKind::NonRenewable).is_empty());
        assert!(invariant_owned_in_catalog(
            &store.state().entitlements.get(),
            &store.state().catalog()
        ));
        assert_eq!(platform.sync_calls(), 1);
        store.shutdown().await;
    }

    // =============================================================================
    // PURCHASES
    // =============================================================================

    #[tokio::test]
    async fn test_user_cancelled_leaves_state_untouched() {
        let platform = Arc::new(SimulatedPlatform::new(catalog()));
        grant_verified(&platform, "no_ads");
        let store = started(&platform).await;
        let before = store.state().entitlements.get();
        let queries = platform.entitlement_queries();

        platform.script_purchase(ScriptedPurchase::UserCancelled);
        let outcome = store.purchase(&item("A")).await.unwrap();

        assert_eq!(outcome, PurchaseOutcome::UserCancelled);
        assert_eq!(platform.entitlement_queries(), queries);
        assert_eq!(store.state().entitlements.get(), before);
        assert!(store.state().consumable_log.get().is_empty());
        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_consumable_purchase_appends_exactly_one_id() {
        let platform = Arc::new(SimulatedPlatform::new(catalog()));
        let store = started(&platform).await;

        let first = store.purchase(&item("A")).await.unwrap();
        let log = store.state().consumable_log.get();
        assert_eq!(log.len(), 1);
        assert_eq!(log.ids()[0], first.transaction().unwrap().original_id);

        store.purchase(&item("A")).await.unwrap();
        assert_eq!(store.state().consumable_log.get().len(), 2);
        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_unverified_purchase_never_owned_or_logged() {
        let platform = Arc::new(SimulatedPlatform::new(catalog()));
        let store = started(&platform).await;

        for id in ["A", "no_ads"] {
            platform.script_purchase(ScriptedPurchase::Unverified(
                VerificationFailure::InvalidDeviceVerification,
            ));
            let err = store.purchase(&item(id)).await.unwrap_err();
            assert!(matches!(err, StoreError::Verification { .. }));
        }

        assert!(store.state().consumable_log.get().is_empty());
        assert!(store.state().entitlements.get().is_empty());
        assert!(platform.finished().is_empty());
        store.shutdown().await;
    }

    // =============================================================================
    // TRANSACTION LISTENER
    // =============================================================================

    #[tokio::test]
    async fn test_listener_update_reconciles_and_finishes() {
        let platform = Arc::new(SimulatedPlatform::new(catalog()));
        let store = started(&platform).await;

        // Approved elsewhere (e.g. a pending purchase completing).
        let transaction = grant_verified(&platform, "season");
        platform.push_update(VerificationResult::Verified(transaction.clone()));

        eventually("listener to finish the update", || {
            platform.finished() == vec![transaction.id]
        })
        .await;
        assert!(store
            .state()
            .entitlements
            .get()
            .contains(&ProductId::new("season")));
        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_unverified_update_never_owned() {
        let platform = Arc::new(SimulatedPlatform::new(catalog()));
        let store = started(&platform).await;

        let transaction = platform.new_transaction(&item("no_ads"));
        platform.grant(VerificationResult::Unverified(
            transaction.clone(),
            VerificationFailure::InvalidSignature,
        ));
        platform.push_update(VerificationResult::Unverified(
            transaction,
            VerificationFailure::InvalidSignature,
        ));
        eventually("listener to handle the update", || store.listener_processed() == 1).await;

        // A later refresh still discards it.
        let report = store.refresh().await.unwrap();
        assert_eq!(report.discarded_unverified, 1);
        assert!(store.state().entitlements.get().is_empty());
        assert!(platform.finished().is_empty());
        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_cancelling_listener_twice_is_safe() {
        let platform = Arc::new(SimulatedPlatform::new(catalog()));
        let store = started(&platform).await;
        assert!(store.is_listening());

        store.shutdown().await;
        store.shutdown().await;
        assert!(!store.is_listening());

        let transaction = grant_verified(&platform, "no_ads");
        platform.push_update(VerificationResult::Verified(transaction));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(platform.finished().is_empty());
    }

    // =============================================================================
    // PERSISTENCE
    // =============================================================================

    #[tokio::test]
    async fn test_consumable_log_persists_across_restart() {
        let dir = tempdir().unwrap();
        let config = StoreConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        let original_id = {
            let platform = Arc::new(SimulatedPlatform::new(catalog()));
            let store = StoreManager::new(platform, config.clone()).unwrap();
            store.start_service(&product_ids()).await.unwrap();
            let outcome = store.purchase(&item("A")).await.unwrap();
            store.shutdown().await;
            outcome.transaction().unwrap().original_id
        };

        let platform = Arc::new(SimulatedPlatform::new(catalog()));
        let store = StoreManager::new(platform, config).unwrap();
        assert_eq!(store.state().consumable_log.get().ids(), &[original_id]);

        store.start_service(&product_ids()).await.unwrap();
        store.purchase(&item("A")).await.unwrap();
        assert_eq!(store.state().consumable_log.get().len(), 2);
        store.shutdown().await;
    }

    // =============================================================================
    // CONCURRENCY
    // =============================================================================

    #[tokio::test]
    async fn test_concurrent_refreshes_publish_last_output() {
        let simulated = Arc::new(SimulatedPlatform::new(catalog()));
        let gated = Arc::new(GatedPlatform::new(simulated.clone()));
        let store = Arc::new(StoreManager::new(gated.clone(), StoreConfig::default()).unwrap());
        store.request_products(&product_ids()).await.unwrap();

        grant_verified(&simulated, "no_ads");
        let first = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.refresh().await })
        };
        eventually("first refresh to enumerate", || gated.requested() == 1).await;

        let second = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.refresh().await })
        };
        grant_verified(&simulated, "season");
        tokio::task::yield_now().await;
        gated.open();

        let r1 = first.await.unwrap().unwrap();
        let r2 = second.await.unwrap().unwrap();

        assert_eq!(r1.entitlements.len(), 1);
        assert_eq!(r2.entitlements.len(), 2);
        assert_eq!(store.state().entitlements.get(), r2.entitlements);
        assert!(invariant_owned_in_catalog(
            &store.state().entitlements.get(),
            &store.state().catalog()
        ));
    }
}
