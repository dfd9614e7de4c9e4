//! Order lifecycle: reservation at creation, effects on transition, and
//! compensation when a multi-item reserve fails partway.

#![allow(clippy::unwrap_used)]

mod common;

use common::{cart_service, order_service, store};
use std::sync::Arc;
use storefront_core::error::Error;
use storefront_core::order::OrderStatus;
use storefront_core::pricing::PricingConfig;
use storefront_core::types::{Money, PaymentMethod, PaymentResult, Role, UserId};
use storefront_service::{Actor, CreateOrderRequest, NewOrderItem, OrderService};
use storefront_testing::fixtures::address;
use storefront_testing::{
    ContendedLedger, FlakyOrderStore, ProductBuilder, no_options, product, test_clock,
};

fn request(items: Vec<NewOrderItem>) -> CreateOrderRequest {
    CreateOrderRequest {
        items,
        shipping_address: address(),
        payment_method: PaymentMethod::Stripe,
    }
}

fn payment() -> PaymentResult {
    PaymentResult {
        id: "txn-1".to_string(),
        status: "COMPLETED".to_string(),
        update_time: "2025-01-01T00:00:00Z".to_string(),
        email_address: "buyer@example.com".to_string(),
    }
}

#[tokio::test]
async fn create_order_reserves_inventory() {
    let store = store();
    let service = order_service(&store);
    let actor = Actor::customer();

    let widget = product("widget", 1_000, 10);
    let widget_id = widget.id;
    store.seed_product(widget);

    let order = service
        .create_order(
            actor,
            request(vec![NewOrderItem {
                product_id: widget_id,
                quantity: 3,
            }]),
        )
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.order_number.starts_with("ORD-"));
    assert_eq!(order.status_history.len(), 1);
    assert_eq!(order.totals.subtotal, Money::from_dollars(30));

    let inv = store.inventory_of(widget_id).unwrap();
    assert_eq!(inv.quantity, 10);
    assert_eq!(inv.reserved, 3);
}

#[tokio::test]
async fn oversell_is_rejected_and_counters_unchanged() {
    let store = store();
    let service = order_service(&store);
    let actor = Actor::customer();

    let widget = ProductBuilder::new("widget", 1_000, 5).reserved(4).build();
    let widget_id = widget.id;
    store.seed_product(widget);

    let err = service
        .create_order(
            actor,
            request(vec![NewOrderItem {
                product_id: widget_id,
                quantity: 3,
            }]),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientInventory {
            requested: 3,
            available: 1,
            ..
        }
    ));

    let inv = store.inventory_of(widget_id).unwrap();
    assert_eq!(inv.reserved, 4);
    assert_eq!(inv.quantity, 5);
}

#[tokio::test]
async fn failed_second_line_releases_first_hold() {
    let store = store();
    let service = order_service(&store);
    let actor = Actor::customer();

    let plenty = product("plenty", 1_000, 5);
    let plenty_id = plenty.id;
    let scarce = ProductBuilder::new("scarce", 2_000, 1).reserved(1).build();
    let scarce_id = scarce.id;
    store.seed_product(plenty);
    store.seed_product(scarce);

    let err = service
        .create_order(
            actor,
            request(vec![
                NewOrderItem {
                    product_id: plenty_id,
                    quantity: 2,
                },
                NewOrderItem {
                    product_id: scarce_id,
                    quantity: 1,
                },
            ]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientInventory { .. }));

    // The hold on the first line was compensated away.
    assert_eq!(store.inventory_of(plenty_id).unwrap().reserved, 0);
    assert_eq!(store.inventory_of(scarce_id).unwrap().reserved, 1);
}

#[tokio::test]
async fn lost_reserve_race_is_retried_once() {
    let store = store();
    let ledger = Arc::new(ContendedLedger::new(store.clone(), 1));
    let service = OrderService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        ledger,
        Arc::new(test_clock()),
        PricingConfig::default(),
    );
    let actor = Actor::customer();

    let widget = product("widget", 1_000, 10);
    let widget_id = widget.id;
    store.seed_product(widget);

    // First attempt loses the atomic update; the retry from the top wins.
    let order = service
        .create_order(
            actor,
            request(vec![NewOrderItem {
                product_id: widget_id,
                quantity: 2,
            }]),
        )
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(store.inventory_of(widget_id).unwrap().reserved, 2);
}

#[tokio::test]
async fn second_consecutive_conflict_is_surfaced() {
    let store = store();
    let ledger = Arc::new(ContendedLedger::new(store.clone(), 2));
    let service = OrderService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        ledger,
        Arc::new(test_clock()),
        PricingConfig::default(),
    );

    let widget = product("widget", 1_000, 10);
    let widget_id = widget.id;
    store.seed_product(widget);

    let err = service
        .create_order(
            Actor::customer(),
            request(vec![NewOrderItem {
                product_id: widget_id,
                quantity: 2,
            }]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(store.inventory_of(widget_id).unwrap().reserved, 0);
}

#[tokio::test]
async fn failed_cancel_write_leaves_counters_for_retry() {
    let store = store();
    let orders = Arc::new(FlakyOrderStore::new(store.clone()));
    let service = OrderService::new(
        store.clone(),
        orders.clone(),
        store.clone(),
        store.clone(),
        Arc::new(test_clock()),
        PricingConfig::default(),
    );
    let actor = Actor::customer();

    let widget = product("widget", 1_000, 10);
    let widget_id = widget.id;
    store.seed_product(widget);

    let order = service
        .create_order(
            actor,
            request(vec![NewOrderItem {
                product_id: widget_id,
                quantity: 3,
            }]),
        )
        .await
        .unwrap();

    // Cancel whose order write fails: nothing moves, status stays pending.
    orders.fail_puts(1);
    let err = service.cancel_order(actor, order.id, None).await.unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
    assert_eq!(store.inventory_of(widget_id).unwrap().reserved, 3);
    let stored = service.get_order(actor, order.id).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);

    // The retry releases exactly once.
    let cancelled = service.cancel_order(actor, order.id, None).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    let inv = store.inventory_of(widget_id).unwrap();
    assert_eq!(inv.reserved, 0);
    assert_eq!(inv.quantity, 10);
}

#[tokio::test]
async fn empty_request_is_a_validation_error() {
    let store = store();
    let service = order_service(&store);
    let err = service
        .create_order(Actor::customer(), request(Vec::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn mark_paid_consumes_reservation_and_confirms() {
    let store = store();
    let service = order_service(&store);
    let actor = Actor::customer();

    let widget = product("widget", 1_000, 10);
    let widget_id = widget.id;
    store.seed_product(widget);

    let order = service
        .create_order(
            actor,
            request(vec![NewOrderItem {
                product_id: widget_id,
                quantity: 3,
            }]),
        )
        .await
        .unwrap();

    let paid = service.mark_paid(actor, order.id, payment()).await.unwrap();
    assert!(paid.is_paid);
    assert_eq!(paid.status, OrderStatus::Confirmed);
    assert_eq!(paid.status_history.len(), 2);

    let inv = store.inventory_of(widget_id).unwrap();
    assert_eq!(inv.quantity, 7);
    assert_eq!(inv.reserved, 0);

    // Idempotent: a second payment report changes nothing.
    let again = service.mark_paid(actor, order.id, payment()).await.unwrap();
    assert_eq!(again.status_history.len(), 2);
    assert_eq!(store.inventory_of(widget_id).unwrap().quantity, 7);
}

#[tokio::test]
async fn cancel_unpaid_releases_holds() {
    let store = store();
    let service = order_service(&store);
    let actor = Actor::customer();

    let widget = product("widget", 1_000, 10);
    let widget_id = widget.id;
    store.seed_product(widget);

    let order = service
        .create_order(
            actor,
            request(vec![NewOrderItem {
                product_id: widget_id,
                quantity: 3,
            }]),
        )
        .await
        .unwrap();

    let cancelled = service.cancel_order(actor, order.id, None).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let inv = store.inventory_of(widget_id).unwrap();
    assert_eq!(inv.quantity, 10);
    assert_eq!(inv.reserved, 0);

    // Cancelling again is a no-op, not a second release.
    let again = service.cancel_order(actor, order.id, None).await.unwrap();
    assert_eq!(again.status, OrderStatus::Cancelled);
    assert_eq!(store.inventory_of(widget_id).unwrap().quantity, 10);
    assert_eq!(store.inventory_of(widget_id).unwrap().reserved, 0);
}

#[tokio::test]
async fn cancel_paid_order_restocks() {
    let store = store();
    let service = order_service(&store);
    let actor = Actor::customer();

    let widget = product("widget", 1_000, 10);
    let widget_id = widget.id;
    store.seed_product(widget);

    let order = service
        .create_order(
            actor,
            request(vec![NewOrderItem {
                product_id: widget_id,
                quantity: 3,
            }]),
        )
        .await
        .unwrap();
    service.mark_paid(actor, order.id, payment()).await.unwrap();
    assert_eq!(store.inventory_of(widget_id).unwrap().quantity, 7);

    service.cancel_order(actor, order.id, None).await.unwrap();
    let inv = store.inventory_of(widget_id).unwrap();
    assert_eq!(inv.quantity, 10);
    assert_eq!(inv.reserved, 0);
}

#[tokio::test]
async fn shipped_order_cannot_be_cancelled() {
    let store = store();
    let service = order_service(&store);
    let customer = Actor::customer();
    let admin = Actor::new(UserId::new(), Role::Admin);

    let widget = product("widget", 1_000, 10);
    let widget_id = widget.id;
    store.seed_product(widget);

    let order = service
        .create_order(
            customer,
            request(vec![NewOrderItem {
                product_id: widget_id,
                quantity: 2,
            }]),
        )
        .await
        .unwrap();
    service
        .mark_paid(customer, order.id, payment())
        .await
        .unwrap();
    service
        .transition_status(
            admin,
            order.id,
            OrderStatus::Shipped,
            Some("TRACK-123".to_string()),
            None,
        )
        .await
        .unwrap();

    let err = service
        .cancel_order(customer, order.id, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidTransition {
            from: OrderStatus::Shipped,
            to: OrderStatus::Cancelled,
        }
    ));

    // Sale stays consumed.
    let inv = store.inventory_of(widget_id).unwrap();
    assert_eq!(inv.quantity, 8);
    assert_eq!(inv.reserved, 0);
}

#[tokio::test]
async fn shipped_order_carries_tracking_number() {
    let store = store();
    let service = order_service(&store);
    let customer = Actor::customer();
    let admin = Actor::new(UserId::new(), Role::Admin);

    let widget = product("widget", 1_000, 10);
    let widget_id = widget.id;
    store.seed_product(widget);

    let order = service
        .create_order(
            customer,
            request(vec![NewOrderItem {
                product_id: widget_id,
                quantity: 1,
            }]),
        )
        .await
        .unwrap();
    service
        .mark_paid(customer, order.id, payment())
        .await
        .unwrap();
    let shipped = service
        .transition_status(
            admin,
            order.id,
            OrderStatus::Shipped,
            Some("TRACK-123".to_string()),
            None,
        )
        .await
        .unwrap();
    assert_eq!(shipped.tracking_number.as_deref(), Some("TRACK-123"));

    let delivered = service.mark_delivered(admin, order.id, None).await.unwrap();
    assert!(delivered.is_delivered);
    assert!(delivered.delivered_at.is_some());
}

#[tokio::test]
async fn non_owner_access_is_denied() {
    let store = store();
    let service = order_service(&store);
    let owner = Actor::customer();
    let stranger = Actor::customer();

    let widget = product("widget", 1_000, 10);
    let widget_id = widget.id;
    store.seed_product(widget);

    let order = service
        .create_order(
            owner,
            request(vec![NewOrderItem {
                product_id: widget_id,
                quantity: 1,
            }]),
        )
        .await
        .unwrap();

    assert!(matches!(
        service.get_order(stranger, order.id).await.unwrap_err(),
        Error::NotAuthorized
    ));
    assert!(matches!(
        service.cancel_order(stranger, order.id, None).await.unwrap_err(),
        Error::NotAuthorized
    ));
    assert!(matches!(
        service
            .transition_status(owner, order.id, OrderStatus::Processing, None, None)
            .await
            .unwrap_err(),
        Error::NotAuthorized
    ));
}

#[tokio::test]
async fn checkout_snapshots_cart_and_clears_it() {
    let store = store();
    let carts = cart_service(&store);
    let orders = order_service(&store);
    let actor = Actor::customer();

    let widget = product("widget", 10_000, 10);
    let widget_id = widget.id;
    store.seed_product(widget);

    carts
        .add_item(actor, widget_id, 1, no_options())
        .await
        .unwrap();
    carts.apply_coupon(actor, "WELCOME10").await.unwrap();

    let order = orders
        .checkout_cart(actor, address(), PaymentMethod::PayPal)
        .await
        .unwrap();
    // $100 subtotal, free shipping, 8.5% tax, $10 coupon.
    assert_eq!(order.totals.subtotal, Money::from_dollars(100));
    assert_eq!(order.totals.discount, Money::from_dollars(10));
    assert_eq!(order.totals.total, Money::from_cents(9_850));
    assert_eq!(store.inventory_of(widget_id).unwrap().reserved, 1);

    let cart = carts.get_or_create(actor).await.unwrap();
    assert!(cart.is_empty());
    assert!(cart.applied_coupon.is_none());
    assert_eq!(cart.totals.total, Money::ZERO);
}

#[tokio::test]
async fn checkout_of_empty_cart_fails_and_keeps_cart() {
    let store = store();
    let carts = cart_service(&store);
    let orders = order_service(&store);
    let actor = Actor::customer();

    carts.get_or_create(actor).await.unwrap();
    let err = orders
        .checkout_cart(actor, address(), PaymentMethod::PayPal)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn my_orders_lists_only_own_orders() {
    let store = store();
    let service = order_service(&store);
    let alice = Actor::customer();
    let bob = Actor::customer();

    let widget = product("widget", 1_000, 10);
    let widget_id = widget.id;
    store.seed_product(widget);

    let mine = service
        .create_order(
            alice,
            request(vec![NewOrderItem {
                product_id: widget_id,
                quantity: 1,
            }]),
        )
        .await
        .unwrap();
    service
        .create_order(
            bob,
            request(vec![NewOrderItem {
                product_id: widget_id,
                quantity: 1,
            }]),
        )
        .await
        .unwrap();

    let orders = service.my_orders(alice).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, mine.id);
}

#[tokio::test]
async fn inactive_product_cannot_be_ordered() {
    let store = store();
    let service = order_service(&store);

    let widget = ProductBuilder::new("widget", 1_000, 10).inactive().build();
    let widget_id = widget.id;
    store.seed_product(widget);

    let err = service
        .create_order(
            Actor::customer(),
            request(vec![NewOrderItem {
                product_id: widget_id,
                quantity: 1,
            }]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(store.inventory_of(widget_id).unwrap().reserved, 0);
}
