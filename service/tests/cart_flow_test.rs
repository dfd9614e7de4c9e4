//! Cart service flows: mutations always reprice and persist together.

#![allow(clippy::unwrap_used)]

mod common;

use common::{cart_service, store};
use storefront_core::error::Error;
use storefront_core::types::Money;
use storefront_service::{Actor, CartOperation};
use storefront_testing::{ProductBuilder, no_options, product};

#[tokio::test]
async fn add_update_remove_recomputes_totals() {
    let store = store();
    let service = cart_service(&store);
    let actor = Actor::customer();

    let widget = product("widget", 1_000, 10);
    let widget_id = widget.id;
    store.seed_product(widget);

    // Two units at $10: $20 subtotal, 8.5% tax, $5.99 shipping.
    let cart = service
        .add_item(actor, widget_id, 2, no_options())
        .await
        .unwrap();
    assert_eq!(cart.totals.subtotal, Money::from_dollars(20));
    assert_eq!(cart.totals.tax, Money::from_cents(170));
    assert_eq!(cart.totals.shipping, Money::from_cents(599));
    assert_eq!(cart.totals.total, Money::from_cents(2_769));

    let cart = service
        .update_item_quantity(actor, widget_id, &no_options(), 3)
        .await
        .unwrap();
    assert_eq!(cart.items[0].quantity, 3);
    assert_eq!(cart.totals.subtotal, Money::from_dollars(30));

    let cart = service
        .remove_item(actor, widget_id, &no_options())
        .await
        .unwrap();
    assert!(cart.is_empty());
    assert_eq!(cart.totals.total, Money::ZERO);
    assert_eq!(cart.totals.shipping, Money::ZERO);
}

#[tokio::test]
async fn adding_same_line_twice_merges_quantities() {
    let store = store();
    let service = cart_service(&store);
    let actor = Actor::customer();

    let widget = product("widget", 1_000, 10);
    let widget_id = widget.id;
    store.seed_product(widget);

    service
        .add_item(actor, widget_id, 2, no_options())
        .await
        .unwrap();
    let cart = service
        .add_item(actor, widget_id, 3, no_options())
        .await
        .unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 5);
}

#[tokio::test]
async fn add_beyond_available_is_rejected_without_reserving() {
    let store = store();
    let service = cart_service(&store);
    let actor = Actor::customer();

    // Five in stock, four already reserved elsewhere: one available.
    let widget = ProductBuilder::new("widget", 1_000, 5).reserved(4).build();
    let widget_id = widget.id;
    store.seed_product(widget);

    let err = service
        .add_item(actor, widget_id, 3, no_options())
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

    // Advisory check only: counters untouched.
    let inv = store.inventory_of(widget_id).unwrap();
    assert_eq!(inv.reserved, 4);
    assert_eq!(inv.quantity, 5);
}

#[tokio::test]
async fn coupon_apply_and_remove() {
    let store = store();
    let service = cart_service(&store);
    let actor = Actor::customer();

    let widget = product("widget", 10_000, 10);
    let widget_id = widget.id;
    store.seed_product(widget);

    service
        .add_item(actor, widget_id, 1, no_options())
        .await
        .unwrap();

    // $100 subtotal, free shipping, WELCOME10 takes $10 off.
    let cart = service.apply_coupon(actor, "welcome10").await.unwrap();
    assert_eq!(cart.applied_coupon.as_ref().unwrap().code, "WELCOME10");
    assert_eq!(cart.totals.discount, Money::from_dollars(10));
    assert_eq!(cart.totals.total, Money::from_cents(9_850));

    let cart = service.remove_coupon(actor).await.unwrap();
    assert!(cart.applied_coupon.is_none());
    assert_eq!(cart.totals.discount, Money::ZERO);
}

#[tokio::test]
async fn unknown_coupon_is_rejected() {
    let store = store();
    let service = cart_service(&store);
    let actor = Actor::customer();

    let widget = product("widget", 1_000, 10);
    let widget_id = widget.id;
    store.seed_product(widget);
    service
        .add_item(actor, widget_id, 1, no_options())
        .await
        .unwrap();

    let err = service.apply_coupon(actor, "NOPE").await.unwrap_err();
    assert!(matches!(err, Error::InvalidCoupon(code) if code == "NOPE"));
}

#[tokio::test]
async fn mutating_a_missing_cart_fails() {
    let store = store();
    let service = cart_service(&store);
    let actor = Actor::customer();

    let widget = product("widget", 1_000, 10);
    let widget_id = widget.id;
    store.seed_product(widget);

    let err = service
        .update_item_quantity(actor, widget_id, &no_options(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CartNotFound(user) if user == actor.user_id));
}

#[tokio::test]
async fn zero_quantity_update_removes_line_for_deleted_product() {
    let store = store();
    let service = cart_service(&store);
    let actor = Actor::customer();

    let widget = product("widget", 1_000, 10);
    let widget_id = widget.id;
    store.seed_product(widget);
    service
        .add_item(actor, widget_id, 2, no_options())
        .await
        .unwrap();

    // The product vanishes from the catalog; its line must still be
    // removable.
    store.remove_product(widget_id);
    let cart = service
        .update_item_quantity(actor, widget_id, &no_options(), 0)
        .await
        .unwrap();
    assert!(cart.is_empty());
    assert_eq!(cart.totals.total, Money::ZERO);

    // Nonzero updates still require the catalog entry.
    let err = service
        .update_item_quantity(actor, widget_id, &no_options(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProductNotFound(_)));
}

#[tokio::test]
async fn clear_drops_items_and_coupon() {
    let store = store();
    let service = cart_service(&store);
    let actor = Actor::customer();

    let widget = product("widget", 10_000, 10);
    let widget_id = widget.id;
    store.seed_product(widget);

    service
        .add_item(actor, widget_id, 2, no_options())
        .await
        .unwrap();
    service.apply_coupon(actor, "SAVE50").await.unwrap();

    let cart = service.clear(actor).await.unwrap();
    assert!(cart.is_empty());
    assert!(cart.applied_coupon.is_none());
    assert_eq!(cart.totals.total, Money::ZERO);
}

#[tokio::test]
async fn mutate_dispatches_operations() {
    let store = store();
    let service = cart_service(&store);
    let actor = Actor::customer();

    let widget = product("widget", 1_000, 10);
    let widget_id = widget.id;
    store.seed_product(widget);

    let cart = service
        .mutate(
            actor,
            CartOperation::AddItem {
                product_id: widget_id,
                quantity: 2,
                options: no_options(),
            },
        )
        .await
        .unwrap();
    assert_eq!(cart.items[0].quantity, 2);

    let cart = service.mutate(actor, CartOperation::Clear).await.unwrap();
    assert!(cart.is_empty());
}

#[tokio::test]
async fn bulk_tier_reflected_in_cart_line() {
    let store = store();
    let service = cart_service(&store);
    let actor = Actor::customer();

    let widget = ProductBuilder::new("widget", 1_000, 20)
        .bulk_tier(5, 800)
        .build();
    let widget_id = widget.id;
    store.seed_product(widget);

    let cart = service
        .add_item(actor, widget_id, 5, no_options())
        .await
        .unwrap();
    assert_eq!(cart.items[0].applied_bulk_price, Some(Money::from_cents(800)));
    assert_eq!(cart.totals.subtotal, Money::from_dollars(40));
}
