#![allow(dead_code)]

use std::sync::Arc;
use storefront_core::pricing::{CouponBook, PricingConfig};
use storefront_service::{CartService, OrderService};
use storefront_testing::{InMemoryStore, test_clock};

pub fn store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new())
}

pub fn cart_service(store: &Arc<InMemoryStore>) -> CartService {
    CartService::new(
        store.clone(),
        store.clone(),
        Arc::new(test_clock()),
        PricingConfig::default(),
        CouponBook::builtin(),
    )
}

pub fn order_service(store: &Arc<InMemoryStore>) -> OrderService {
    OrderService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(test_clock()),
        PricingConfig::default(),
    )
}
