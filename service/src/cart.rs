//! Cart service: the imperative shell around the cart aggregate.
//!
//! Every mutating operation follows the same shape: load (or lazily create)
//! the user's cart, apply the aggregate mutation, reprice with the pure
//! pricing engine, and persist the item list and recomputed totals together.
//! The recomputation is mandatory on every mutation; a cached total is
//! never trusted across a second mutation.

use crate::auth::Actor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_core::cart::Cart;
use storefront_core::environment::Clock;
use storefront_core::error::{Error, Result};
use storefront_core::pricing::{self, CouponBook, PricingConfig, PricingLine};
use storefront_core::storage::{CartStore, ProductStore};
use storefront_core::types::{Product, ProductId, Role, SelectedOptions};
use tracing::{debug, info, instrument};

/// A single cart mutation, as requested by the (external) HTTP layer
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartOperation {
    /// Add units of a product, merging into an existing line
    AddItem {
        /// Product to add
        product_id: ProductId,
        /// Units to add
        quantity: u32,
        /// Variant options; part of line identity
        options: SelectedOptions,
    },
    /// Set a line's absolute quantity; zero removes the line
    UpdateItemQuantity {
        /// Product of the line
        product_id: ProductId,
        /// Variant options of the line
        options: SelectedOptions,
        /// New absolute quantity
        quantity: u32,
    },
    /// Remove a line
    RemoveItem {
        /// Product of the line
        product_id: ProductId,
        /// Variant options of the line
        options: SelectedOptions,
    },
    /// Remove every line and any coupon
    Clear,
    /// Apply a coupon, replacing any active one
    ApplyCoupon {
        /// Coupon code
        code: String,
    },
    /// Remove the active coupon
    RemoveCoupon,
}

/// Cart operations service
pub struct CartService {
    products: Arc<dyn ProductStore>,
    carts: Arc<dyn CartStore>,
    clock: Arc<dyn Clock>,
    pricing: PricingConfig,
    coupons: CouponBook,
}

impl CartService {
    /// Creates a cart service over the given stores
    #[must_use]
    pub fn new(
        products: Arc<dyn ProductStore>,
        carts: Arc<dyn CartStore>,
        clock: Arc<dyn Clock>,
        pricing: PricingConfig,
        coupons: CouponBook,
    ) -> Self {
        Self {
            products,
            carts,
            clock,
            pricing,
            coupons,
        }
    }

    /// Dispatches a [`CartOperation`], returning the mutated cart.
    ///
    /// # Errors
    ///
    /// Propagates the operation's errors; see the individual methods.
    pub async fn mutate(&self, actor: Actor, operation: CartOperation) -> Result<Cart> {
        match operation {
            CartOperation::AddItem {
                product_id,
                quantity,
                options,
            } => self.add_item(actor, product_id, quantity, options).await,
            CartOperation::UpdateItemQuantity {
                product_id,
                options,
                quantity,
            } => {
                self.update_item_quantity(actor, product_id, &options, quantity)
                    .await
            }
            CartOperation::RemoveItem {
                product_id,
                options,
            } => self.remove_item(actor, product_id, &options).await,
            CartOperation::Clear => self.clear(actor).await,
            CartOperation::ApplyCoupon { code } => self.apply_coupon(actor, &code).await,
            CartOperation::RemoveCoupon => self.remove_coupon(actor).await,
        }
    }

    /// Returns the user's cart, creating an empty one on first access.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend fails.
    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn get_or_create(&self, actor: Actor) -> Result<Cart> {
        if let Some(cart) = self.carts.load_cart(actor.user_id).await? {
            return Ok(cart);
        }
        let cart = Cart::new(actor.user_id, self.clock.now());
        self.carts.save_cart(cart.clone()).await?;
        debug!("created empty cart");
        Ok(cart)
    }

    /// Adds `quantity` units of a product to the actor's cart.
    ///
    /// Availability is checked advisorily against `quantity - reserved`; no
    /// hold is taken. The atomic reserve at order creation re-validates.
    ///
    /// # Errors
    ///
    /// [`Error::ProductNotFound`], [`Error::Validation`] (inactive product
    /// or zero quantity), [`Error::InsufficientInventory`].
    #[instrument(skip(self, options), fields(user_id = %actor.user_id, %product_id))]
    pub async fn add_item(
        &self,
        actor: Actor,
        product_id: ProductId,
        quantity: u32,
        options: SelectedOptions,
    ) -> Result<Cart> {
        let product = self.fetch_product(product_id).await?;
        let mut cart = self.get_or_create(actor).await?;
        cart.add_item(&product, quantity, options)?;
        info!(quantity, "item added to cart");
        self.reprice_and_save(cart, actor.role).await
    }

    /// Sets a line's absolute quantity; zero removes the line.
    ///
    /// # Errors
    ///
    /// [`Error::CartNotFound`], [`Error::ProductNotFound`],
    /// [`Error::Validation`], [`Error::InsufficientInventory`].
    #[instrument(skip(self, options), fields(user_id = %actor.user_id, %product_id))]
    pub async fn update_item_quantity(
        &self,
        actor: Actor,
        product_id: ProductId,
        options: &SelectedOptions,
        quantity: u32,
    ) -> Result<Cart> {
        let mut cart = self.require_cart(actor).await?;
        // Removal needs no catalog entry; a line for a since-deleted product
        // must still be removable.
        if quantity == 0 {
            cart.remove_item(product_id, options);
            return self.reprice_and_save(cart, actor.role).await;
        }
        let product = self.fetch_product(product_id).await?;
        cart.update_item_quantity(&product, options, quantity)?;
        self.reprice_and_save(cart, actor.role).await
    }

    /// Removes a line from the actor's cart.
    ///
    /// # Errors
    ///
    /// [`Error::CartNotFound`]; storage failures.
    #[instrument(skip(self, options), fields(user_id = %actor.user_id, %product_id))]
    pub async fn remove_item(
        &self,
        actor: Actor,
        product_id: ProductId,
        options: &SelectedOptions,
    ) -> Result<Cart> {
        let mut cart = self.require_cart(actor).await?;
        cart.remove_item(product_id, options);
        self.reprice_and_save(cart, actor.role).await
    }

    /// Clears the actor's cart (items and coupon). The cart document itself
    /// survives.
    ///
    /// # Errors
    ///
    /// [`Error::CartNotFound`]; storage failures.
    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn clear(&self, actor: Actor) -> Result<Cart> {
        let mut cart = self.require_cart(actor).await?;
        cart.clear();
        self.reprice_and_save(cart, actor.role).await
    }

    /// Applies a coupon from the configured table, replacing any active one.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCoupon`] for unknown codes; [`Error::CartNotFound`].
    #[instrument(skip(self), fields(user_id = %actor.user_id, code))]
    pub async fn apply_coupon(&self, actor: Actor, code: &str) -> Result<Cart> {
        let coupon = self.coupons.lookup(code)?;
        let mut cart = self.require_cart(actor).await?;
        cart.apply_coupon(coupon);
        info!("coupon applied");
        self.reprice_and_save(cart, actor.role).await
    }

    /// Removes the active coupon, if any.
    ///
    /// # Errors
    ///
    /// [`Error::CartNotFound`]; storage failures.
    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn remove_coupon(&self, actor: Actor) -> Result<Cart> {
        let mut cart = self.require_cart(actor).await?;
        cart.remove_coupon();
        self.reprice_and_save(cart, actor.role).await
    }

    async fn fetch_product(&self, product_id: ProductId) -> Result<Product> {
        self.products
            .get_product(product_id)
            .await?
            .ok_or(Error::ProductNotFound(product_id))
    }

    async fn require_cart(&self, actor: Actor) -> Result<Cart> {
        self.carts
            .load_cart(actor.user_id)
            .await?
            .ok_or(Error::CartNotFound(actor.user_id))
    }

    /// Reprices the cart with the pure engine and persists totals atomically
    /// with the item-list mutation.
    async fn reprice_and_save(&self, mut cart: Cart, role: Role) -> Result<Cart> {
        let mut products = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            products.push(self.fetch_product(item.product_id).await?);
        }
        let lines: Vec<PricingLine<'_>> = cart
            .items
            .iter()
            .zip(&products)
            .map(|(item, product)| PricingLine {
                product,
                quantity: item.quantity,
            })
            .collect();
        let quote = pricing::quote(&lines, cart.applied_coupon.as_ref(), role, &self.pricing);
        cart.apply_quote(&quote, self.clock.now());
        self.carts.save_cart(cart.clone()).await?;
        Ok(cart)
    }
}
