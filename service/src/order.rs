//! Order service: creation, checkout and lifecycle transitions.
//!
//! Order creation is the only operation that takes ledger holds. Items are
//! reserved sequentially with an atomic conditional update each; any failure
//! releases the holds already taken and fails the whole operation. A lost
//! race (`Conflict`) is retried once from the top. All other lifecycle
//! operations run the pure state machine on the order document and then
//! execute whatever [`LedgerEffect`] it returns.

use crate::auth::Actor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_core::environment::Clock;
use storefront_core::error::{Error, Result};
use storefront_core::ledger::InventoryLedger;
use storefront_core::order::{LedgerEffect, Order, OrderItem, OrderStatus};
use storefront_core::pricing::{self, AppliedCoupon, PricingConfig, PricingLine, Totals};
use storefront_core::storage::{CartStore, OrderStore, ProductStore};
use storefront_core::types::{
    OrderId, PaymentMethod, PaymentResult, Product, ProductId, ShippingAddress,
};
use tracing::{info, instrument, warn};

/// One requested order line
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewOrderItem {
    /// Product to order
    pub product_id: ProductId,
    /// Units to reserve and purchase
    pub quantity: u32,
}

/// Input to [`OrderService::create_order`]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Requested lines
    pub items: Vec<NewOrderItem>,
    /// Shipping destination
    pub shipping_address: ShippingAddress,
    /// Payment method chosen at checkout
    pub payment_method: PaymentMethod,
}

/// Order operations service
pub struct OrderService {
    products: Arc<dyn ProductStore>,
    orders: Arc<dyn OrderStore>,
    carts: Arc<dyn CartStore>,
    ledger: Arc<dyn InventoryLedger>,
    clock: Arc<dyn Clock>,
    pricing: PricingConfig,
}

impl OrderService {
    /// Creates an order service over the given stores and ledger
    #[must_use]
    pub fn new(
        products: Arc<dyn ProductStore>,
        orders: Arc<dyn OrderStore>,
        carts: Arc<dyn CartStore>,
        ledger: Arc<dyn InventoryLedger>,
        clock: Arc<dyn Clock>,
        pricing: PricingConfig,
    ) -> Self {
        Self {
            products,
            orders,
            carts,
            ledger,
            clock,
            pricing,
        }
    }

    /// Creates an order from explicit lines, reserving inventory for every
    /// line or failing without any net ledger change.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for an empty or zero-quantity request,
    /// [`Error::ProductNotFound`], [`Error::InsufficientInventory`] when a
    /// reserve fails (holds already taken are released first), and
    /// [`Error::Conflict`] if a second attempt also loses its race.
    #[instrument(skip(self, request), fields(user_id = %actor.user_id))]
    pub async fn create_order(
        &self,
        actor: Actor,
        request: CreateOrderRequest,
    ) -> Result<Order> {
        self.create_with_retry(actor, &request, None).await
    }

    /// Creates an order from the actor's cart, then clears the cart.
    ///
    /// The cart's lines, coupon and role pricing are snapshotted before
    /// creation; the reserve path and failure semantics are identical to
    /// [`Self::create_order`]. The cart is cleared only after the order is
    /// persisted, so a failed checkout leaves the cart intact.
    ///
    /// # Errors
    ///
    /// [`Error::CartNotFound`] when no cart exists, [`Error::Validation`]
    /// for an empty cart, plus the creation errors of
    /// [`Self::create_order`].
    #[instrument(skip(self, shipping_address, payment_method), fields(user_id = %actor.user_id))]
    pub async fn checkout_cart(
        &self,
        actor: Actor,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Result<Order> {
        let mut cart = self
            .carts
            .load_cart(actor.user_id)
            .await?
            .ok_or(Error::CartNotFound(actor.user_id))?;
        if cart.is_empty() {
            return Err(Error::Validation("cart is empty".into()));
        }

        let request = CreateOrderRequest {
            items: cart
                .items
                .iter()
                .map(|item| NewOrderItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                })
                .collect(),
            shipping_address,
            payment_method,
        };
        let coupon = cart.applied_coupon.clone();
        let order = self.create_with_retry(actor, &request, coupon).await?;

        cart.clear();
        cart.totals = Totals::default();
        cart.updated_at = self.clock.now();
        self.carts.save_cart(cart).await?;

        Ok(order)
    }

    /// Explicit status transition (admin only). A tracking number, when
    /// given, is recorded before the transition so a `shipped` update
    /// carries it.
    ///
    /// # Errors
    ///
    /// [`Error::NotAuthorized`] for non-admins, [`Error::OrderNotFound`],
    /// and [`Error::InvalidTransition`] from the state machine.
    #[instrument(skip(self, note, tracking_number), fields(user_id = %actor.user_id, %order_id, %to))]
    pub async fn transition_status(
        &self,
        actor: Actor,
        order_id: OrderId,
        to: OrderStatus,
        tracking_number: Option<String>,
        note: Option<String>,
    ) -> Result<Order> {
        actor.ensure_admin()?;
        let mut order = self.require_order(order_id).await?;
        if let Some(tracking) = tracking_number {
            order.set_tracking_number(tracking);
        }
        let effect = order.transition(to, self.clock.now(), note, Some(actor.user_id))?;
        // Persist before the counters move: a failed write leaves the ledger
        // untouched, and a retry of the saved transition is a no-op rather
        // than a second effect.
        self.orders.put_order(order.clone()).await?;
        self.apply_ledger_effect(&order, effect).await?;
        info!(status = %order.status, "order status updated");
        Ok(order)
    }

    /// Records a successful payment, consuming the order's reservations.
    /// Idempotent: a second call on a paid order changes nothing.
    ///
    /// # Errors
    ///
    /// [`Error::NotAuthorized`] unless the caller owns the order or is an
    /// admin, [`Error::OrderNotFound`], and [`Error::InvalidTransition`]
    /// when the order is past `confirmed`.
    #[instrument(skip(self, payment), fields(user_id = %actor.user_id, %order_id))]
    pub async fn mark_paid(
        &self,
        actor: Actor,
        order_id: OrderId,
        payment: PaymentResult,
    ) -> Result<Order> {
        let mut order = self.require_order(order_id).await?;
        actor.ensure_owner_or_admin(order.user_id)?;
        let effect = order.mark_paid(payment, self.clock.now(), Some(actor.user_id))?;
        self.orders.put_order(order.clone()).await?;
        self.apply_ledger_effect(&order, effect).await?;
        info!("order marked paid");
        Ok(order)
    }

    /// Marks an order delivered (admin only).
    ///
    /// # Errors
    ///
    /// [`Error::NotAuthorized`], [`Error::OrderNotFound`],
    /// [`Error::InvalidTransition`].
    #[instrument(skip(self, note), fields(user_id = %actor.user_id, %order_id))]
    pub async fn mark_delivered(
        &self,
        actor: Actor,
        order_id: OrderId,
        note: Option<String>,
    ) -> Result<Order> {
        self.transition_status(actor, order_id, OrderStatus::Delivered, None, note)
            .await
    }

    /// Cancels an order, returning its units to the sellable pool. Unpaid
    /// orders release their holds; paid orders restock consumed units.
    /// Cancelling an already-cancelled order is a no-op.
    ///
    /// # Errors
    ///
    /// [`Error::NotAuthorized`] unless owner or admin,
    /// [`Error::OrderNotFound`], and [`Error::InvalidTransition`] once the
    /// order is `processing` or later.
    #[instrument(skip(self, note), fields(user_id = %actor.user_id, %order_id))]
    pub async fn cancel_order(
        &self,
        actor: Actor,
        order_id: OrderId,
        note: Option<String>,
    ) -> Result<Order> {
        let mut order = self.require_order(order_id).await?;
        actor.ensure_owner_or_admin(order.user_id)?;
        let effect = order.transition(
            OrderStatus::Cancelled,
            self.clock.now(),
            note,
            Some(actor.user_id),
        )?;
        self.orders.put_order(order.clone()).await?;
        self.apply_ledger_effect(&order, effect).await?;
        info!("order cancelled");
        Ok(order)
    }

    /// Fetches one order, enforcing owner-or-admin access.
    ///
    /// # Errors
    ///
    /// [`Error::OrderNotFound`], [`Error::NotAuthorized`].
    pub async fn get_order(
        &self,
        actor: Actor,
        order_id: OrderId,
    ) -> Result<Order> {
        let order = self.require_order(order_id).await?;
        actor.ensure_owner_or_admin(order.user_id)?;
        Ok(order)
    }

    /// Lists the actor's own orders, newest first.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    pub async fn my_orders(&self, actor: Actor) -> Result<Vec<Order>> {
        Ok(self.orders.orders_for_user(actor.user_id).await?)
    }

    async fn create_with_retry(
        &self,
        actor: Actor,
        request: &CreateOrderRequest,
        coupon: Option<AppliedCoupon>,
    ) -> Result<Order> {
        let mut retried = false;
        loop {
            match self.try_create(actor, request, coupon.as_ref()).await {
                Err(Error::Conflict(reason)) if !retried => {
                    warn!(%reason, "ledger conflict during order creation, retrying");
                    retried = true;
                }
                result => return result,
            }
        }
    }

    async fn try_create(
        &self,
        actor: Actor,
        request: &CreateOrderRequest,
        coupon: Option<&AppliedCoupon>,
    ) -> Result<Order> {
        if request.items.is_empty() {
            return Err(Error::Validation("no order items".into()));
        }
        if request.items.iter().any(|item| item.quantity == 0) {
            return Err(Error::Validation("order item quantity must be positive".into()));
        }

        let mut products = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let product = self.fetch_product(item.product_id).await?;
            if !product.is_active {
                return Err(Error::Validation(format!(
                    "product is not available: {}",
                    product.name
                )));
            }
            products.push(product);
        }

        let lines: Vec<PricingLine<'_>> = request
            .items
            .iter()
            .zip(&products)
            .map(|(item, product)| PricingLine {
                product,
                quantity: item.quantity,
            })
            .collect();
        let quote = pricing::quote(&lines, coupon, actor.role, &self.pricing);

        let order_items: Vec<OrderItem> = quote
            .lines
            .iter()
            .zip(&products)
            .map(|(line, product)| OrderItem {
                product_id: line.product_id,
                name: product.name.clone(),
                price: line.unit_price,
                quantity: line.quantity,
            })
            .collect();

        // Sequential holds; on any failure, compensate by releasing the
        // holds already taken so the operation has no net ledger change.
        let mut reserved: Vec<(ProductId, u32)> = Vec::with_capacity(order_items.len());
        for item in &order_items {
            if let Err(err) = self.ledger.reserve(item.product_id, item.quantity).await {
                self.release_holds(&reserved).await;
                return Err(err.into());
            }
            reserved.push((item.product_id, item.quantity));
        }

        let order = Order::new(
            actor.user_id,
            order_items,
            request.shipping_address.clone(),
            request.payment_method,
            quote.totals,
            self.clock.now(),
        );
        if let Err(err) = self.orders.put_order(order.clone()).await {
            self.release_holds(&reserved).await;
            return Err(err.into());
        }

        info!(order_id = %order.id, order_number = %order.order_number, "order created");
        Ok(order)
    }

    /// Best-effort compensation; a failed release is logged, not propagated,
    /// so the original error reaches the caller.
    async fn release_holds(&self, holds: &[(ProductId, u32)]) {
        for &(product_id, quantity) in holds {
            if let Err(err) = self.ledger.release(product_id, quantity).await {
                warn!(%product_id, quantity, error = %err, "failed to release hold during compensation");
            }
        }
    }

    async fn apply_ledger_effect(&self, order: &Order, effect: LedgerEffect) -> Result<()> {
        if matches!(effect, LedgerEffect::None) {
            return Ok(());
        }
        for (product_id, quantity) in order.item_quantities() {
            match effect {
                LedgerEffect::None => {}
                LedgerEffect::Release => self.ledger.release(product_id, quantity).await?,
                LedgerEffect::Consume => self.ledger.consume(product_id, quantity).await?,
                LedgerEffect::Restock => self.ledger.restock(product_id, quantity).await?,
            }
        }
        Ok(())
    }

    async fn fetch_product(&self, product_id: ProductId) -> Result<Product> {
        self.products
            .get_product(product_id)
            .await?
            .ok_or(Error::ProductNotFound(product_id))
    }

    async fn require_order(
        &self,
        order_id: OrderId,
    ) -> Result<Order> {
        self.orders
            .get_order(order_id)
            .await?
            .ok_or(Error::OrderNotFound(order_id))
    }
}
