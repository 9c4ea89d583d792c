//! # Demo Catalog
//!
//! Products offered by the simulated platform when the runtime runs without
//! a real commerce backend.

use shared_types::{CatalogItem, ProductKind};

/// Products the simulated platform offers.
pub fn demo_catalog() -> Vec<CatalogItem> {
    vec![
        CatalogItem::new("consumable.coins.100", ProductKind::Consumable).with_price("$0.99"),
        CatalogItem::new("consumable.coins.500", ProductKind::Consumable).with_price("$3.99"),
        CatalogItem::new("nonconsumable.premium", ProductKind::NonConsumable).with_price("$4.99"),
        CatalogItem::new("subscription.standard.monthly", ProductKind::AutoRenewable)
            .with_group("subscription.standard")
            .with_price("$1.99"),
        CatalogItem::new("subscription.standard.yearly", ProductKind::AutoRenewable)
            .with_group("subscription.standard")
            .with_price("$19.99"),
        CatalogItem::new("nonrenewing.season", ProductKind::NonRenewable).with_price("$2.99"),
        CatalogItem::new("bundle.starter", ProductKind::Unknown("bundle".to_string()))
            .with_price("$9.99"),
    ]
}

/// Identifiers of every demo product.
pub fn demo_product_identifiers() -> Vec<String> {
    demo_catalog()
        .into_iter()
        .map(|item| item.id.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_catalog_covers_every_kind() {
        let catalog = demo_catalog();
        for kind in &ProductKind::KNOWN {
            assert!(catalog.iter().any(|item| &item.kind == kind));
        }
        assert_eq!(demo_product_identifiers().len(), catalog.len());
    }
}
