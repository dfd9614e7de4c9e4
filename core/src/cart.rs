//! Cart aggregate.
//!
//! A mutable pre-order basket, one per user, holding an ordered sequence of
//! lines keyed by `(product, selected options)`. The cart checks
//! availability when lines are added or grown but **never** holds a
//! reservation; the check is advisory and is re-validated by the atomic
//! reserve at order-creation time.
//!
//! Derived totals are never independently settable: the service layer prices
//! the cart with [`crate::pricing::quote`] and applies the result via
//! [`Cart::apply_quote`] immediately before every persistence call.

use crate::error::{Error, Result};
use crate::pricing::{AppliedCoupon, Quote, Totals};
use crate::types::{Money, Product, ProductId, SelectedOptions, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One cart line.
///
/// Two lines with the same product but different options are distinct
/// entities. `price` is the base-price snapshot captured on add;
/// `applied_bulk_price` carries the resolved override (bulk tier or
/// distributor price) from the last repricing, when one applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product the line refers to
    pub product_id: ProductId,
    /// Product name snapshot
    pub name: String,
    /// Base unit price snapshot captured on add
    pub price: Money,
    /// Resolved override price from the last repricing, if one applied
    pub applied_bulk_price: Option<Money>,
    /// Line quantity (>= 1; zero removes the line)
    pub quantity: u32,
    /// Variant options; part of line identity
    pub selected_options: SelectedOptions,
}

/// Per-user cart document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    /// Owning user (unique; one cart per user)
    pub user_id: UserId,
    /// Ordered cart lines
    pub items: Vec<CartItem>,
    /// At most one active coupon
    pub applied_coupon: Option<AppliedCoupon>,
    /// Derived totals; recomputed by the pricing engine on every mutation
    pub totals: Totals,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart for a user
    #[must_use]
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            applied_coupon: None,
            totals: Totals::default(),
            updated_at: now,
        }
    }

    /// Whether the cart has no lines
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, product_id: ProductId, options: &SelectedOptions) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.product_id == product_id && item.selected_options == *options)
    }

    /// Adds `quantity` units of a product, merging into an existing line
    /// with identical `(product, options)` identity.
    ///
    /// The merged absolute quantity is validated against
    /// `available = quantity - reserved`; the check takes no hold.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for a zero quantity or an inactive product;
    /// [`Error::InsufficientInventory`] when the merged quantity exceeds
    /// availability.
    pub fn add_item(
        &mut self,
        product: &Product,
        quantity: u32,
        options: SelectedOptions,
    ) -> Result<()> {
        if quantity == 0 {
            return Err(Error::Validation("quantity must be at least 1".to_string()));
        }
        if !product.is_active {
            return Err(Error::Validation(format!(
                "product {} is not available",
                product.name
            )));
        }

        let merged = match self.position(product.id, &options) {
            Some(idx) => self.items[idx].quantity.saturating_add(quantity),
            None => quantity,
        };
        let available = product.inventory.available();
        if merged > available {
            return Err(Error::InsufficientInventory {
                product_id: product.id,
                requested: merged,
                available,
            });
        }

        match self.position(product.id, &options) {
            Some(idx) => self.items[idx].quantity = merged,
            None => self.items.push(CartItem {
                product_id: product.id,
                name: product.name.clone(),
                price: product.price,
                applied_bulk_price: None,
                quantity,
                selected_options: options,
            }),
        }
        Ok(())
    }

    /// Sets a line's absolute quantity. Zero removes the line; an increase
    /// re-validates the **new absolute** quantity against availability, not
    /// the delta.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] when the line is not in the cart;
    /// [`Error::InsufficientInventory`] when the new quantity exceeds
    /// availability.
    pub fn update_item_quantity(
        &mut self,
        product: &Product,
        options: &SelectedOptions,
        quantity: u32,
    ) -> Result<()> {
        let Some(idx) = self.position(product.id, options) else {
            return Err(Error::Validation(format!(
                "product {} is not in the cart",
                product.name
            )));
        };
        if quantity == 0 {
            self.items.remove(idx);
            return Ok(());
        }
        let available = product.inventory.available();
        if quantity > available {
            return Err(Error::InsufficientInventory {
                product_id: product.id,
                requested: quantity,
                available,
            });
        }
        self.items[idx].quantity = quantity;
        Ok(())
    }

    /// Removes a line, if present
    pub fn remove_item(&mut self, product_id: ProductId, options: &SelectedOptions) {
        if let Some(idx) = self.position(product_id, options) {
            self.items.remove(idx);
        }
    }

    /// Removes every line and any applied coupon
    pub fn clear(&mut self) {
        self.items.clear();
        self.applied_coupon = None;
    }

    /// Applies a coupon; a previously applied coupon is replaced
    pub fn apply_coupon(&mut self, coupon: AppliedCoupon) {
        self.applied_coupon = Some(coupon);
    }

    /// Removes the applied coupon, if any
    pub fn remove_coupon(&mut self) {
        self.applied_coupon = None;
    }

    /// Applies a fresh pricing quote: records per-line override prices and
    /// replaces the derived totals. Lines are matched positionally; the
    /// quote must have been computed from this cart's current lines.
    pub fn apply_quote(&mut self, quote: &Quote, now: DateTime<Utc>) {
        for (item, line) in self.items.iter_mut().zip(&quote.lines) {
            if item.product_id == line.product_id {
                item.applied_bulk_price = line.override_applied.then_some(line.unit_price);
            }
        }
        self.totals = quote.totals;
        self.updated_at = now;
    }
}
