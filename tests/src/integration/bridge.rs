//! # State Bridge Tests
//!
//! Observers bound to the store's published state on a delivery context.

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use parking_lot::Mutex;
    use shared_bus::MainContext;
    use shared_types::{ProductId, ProductKind, VerificationResult};
    use std::sync::Arc;
    use store_manager::{EntitlementSet, SimulatedPlatform, StoreApi, StoreConfig, StoreManager};
    use store_runtime::{RuntimeConfig, StoreRuntime};

    fn runtime_config() -> RuntimeConfig {
        let mut config = RuntimeConfig::default();
        config.store.product_identifiers = product_ids()
            .into_iter()
            .map(|id| id.as_str().to_string())
            .collect();
        config
    }

    #[tokio::test]
    async fn test_late_subscriber_receives_current_value() {
        let platform = Arc::new(SimulatedPlatform::new(catalog()));
        grant_verified(&platform, "no_ads");
        let store = StoreManager::new(platform, StoreConfig::default()).unwrap();
        store.request_products(&product_ids()).await.unwrap();
        store.refresh().await.unwrap();

        let mut subscription = store.state().entitlements.subscribe();
        let replayed = subscription.recv().await.unwrap();
        assert!(replayed.contains(&ProductId::new("no_ads")));
    }

    #[tokio::test]
    async fn test_values_delivered_in_order_on_context() {
        let platform = Arc::new(SimulatedPlatform::new(catalog()));
        let store = StoreManager::new(platform.clone(), StoreConfig::default()).unwrap();
        store.request_products(&product_ids()).await.unwrap();

        let context = MainContext::start("test");
        let seen: Arc<Mutex<Vec<usize>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let _delivery = store
            .state()
            .entitlements
            .subscribe()
            .receive_on(&context, move |owned: EntitlementSet| sink.lock().push(owned.len()));

        for id in ["no_ads", "season", "B"] {
            grant_verified(&platform, id);
            store.refresh().await.unwrap();
        }

        eventually("four deliveries", || seen.lock().len() == 4).await;
        assert_eq!(*seen.lock(), vec![0, 1, 2, 3]);
        context.stop();
    }

    #[tokio::test]
    async fn test_cancelled_delivery_stops() {
        let platform = Arc::new(SimulatedPlatform::new(catalog()));
        let store = StoreManager::new(platform.clone(), StoreConfig::default()).unwrap();
        store.request_products(&product_ids()).await.unwrap();

        let context = MainContext::start("test");
        let seen: Arc<Mutex<Vec<usize>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let mut delivery = store
            .state()
            .entitlements
            .subscribe()
            .receive_on(&context, move |owned: EntitlementSet| sink.lock().push(owned.len()));
        eventually("replayed value", || seen.lock().len() == 1).await;

        delivery.cancel();
        assert!(delivery.is_cancelled());
        grant_verified(&platform, "no_ads");
        store.refresh().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(*seen.lock(), vec![0]);
        context.stop();
    }

    #[tokio::test]
    async fn test_listener_update_reaches_view() {
        let platform = Arc::new(SimulatedPlatform::new(catalog()));
        let runtime = StoreRuntime::new(runtime_config(), platform.clone()).unwrap();
        runtime.start().await.unwrap();

        eventually("catalog in view", || {
            runtime.view().snapshot().products(&ProductKind::Consumable).len() == 1
        })
        .await;

        let transaction = grant_verified(&platform, "B");
        platform.push_update(VerificationResult::Verified(transaction));

        eventually("subscription in view", || {
            runtime
                .view()
                .snapshot()
                .entitlements
                .contains(&ProductId::new("B"))
        })
        .await;
        assert!(runtime.view().snapshot().group_status.contains_key(&group_b()));
        runtime.shutdown().await;
    }
}
