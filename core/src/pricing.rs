//! Pricing engine.
//!
//! A pure function of (items, coupon, acting role) to totals. No side
//! effects, no I/O. The cart and order services invoke it immediately before
//! every persistence call; a cached total is never trusted across a second
//! mutation.
//!
//! Unit price resolution order, per item:
//! 1. distributor override, when the acting user is a distributor and the
//!    product defines one;
//! 2. the highest-`min_quantity` bulk tier with `min_quantity <= quantity`;
//! 3. the base price.

use crate::error::Error;
use crate::types::{Money, Product, ProductId, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration constants for the pricing engine.
///
/// Values are operator configuration, never user-supplied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Tax rate in basis points applied to the subtotal
    pub tax_rate_bps: u32,
    /// Subtotal at or above which shipping is free
    pub free_shipping_threshold: Money,
    /// Flat shipping fee below the threshold
    pub flat_shipping_fee: Money,
}

impl Default for PricingConfig {
    /// 8.5% tax, free shipping at $50, $5.99 flat fee otherwise
    fn default() -> Self {
        Self {
            tax_rate_bps: 850,
            free_shipping_threshold: Money::from_dollars(50),
            flat_shipping_fee: Money::from_cents(599),
        }
    }
}

/// Coupon discount kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Discount {
    /// Percentage of the subtotal (0..=100)
    Percentage(u8),
    /// Flat amount subtracted from the total, floored at zero
    Fixed(Money),
}

/// A coupon as applied to a cart or order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    /// Normalized (uppercase) coupon code
    pub code: String,
    /// Discount granted by the coupon
    pub discount: Discount,
}

/// Enumerated coupon table, validated at startup.
///
/// Unknown codes fail with [`Error::InvalidCoupon`]; percentage values above
/// 100 are rejected at construction.
#[derive(Clone, Debug, Default)]
pub struct CouponBook {
    codes: HashMap<String, Discount>,
}

impl CouponBook {
    /// Builds a coupon table, validating every entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if a percentage discount exceeds 100.
    pub fn new<I>(entries: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (String, Discount)>,
    {
        let mut codes = HashMap::new();
        for (code, discount) in entries {
            if let Discount::Percentage(p) = discount {
                if p > 100 {
                    return Err(Error::Validation(format!(
                        "coupon {code}: percentage discount {p} exceeds 100"
                    )));
                }
            }
            codes.insert(code.to_uppercase(), discount);
        }
        Ok(Self { codes })
    }

    /// The built-in coupon table carried over from the storefront
    #[must_use]
    pub fn builtin() -> Self {
        let mut codes = HashMap::new();
        codes.insert("WELCOME10".to_string(), Discount::Percentage(10));
        codes.insert("BULK20".to_string(), Discount::Percentage(20));
        codes.insert("SAVE50".to_string(), Discount::Fixed(Money::from_dollars(50)));
        Self { codes }
    }

    /// Looks up a code (case-insensitively), returning the coupon to apply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCoupon`] for unknown codes.
    pub fn lookup(&self, code: &str) -> Result<AppliedCoupon, Error> {
        let normalized = code.to_uppercase();
        self.codes
            .get(&normalized)
            .map(|discount| AppliedCoupon {
                code: normalized.clone(),
                discount: *discount,
            })
            .ok_or(Error::InvalidCoupon(normalized))
    }
}

/// One line of input to the pricing engine
#[derive(Clone, Copy, Debug)]
pub struct PricingLine<'a> {
    /// The product being priced
    pub product: &'a Product,
    /// Line quantity
    pub quantity: u32,
}

/// One priced line of a quote
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    /// Product the line refers to
    pub product_id: ProductId,
    /// Line quantity
    pub quantity: u32,
    /// Resolved unit price (override, tier, or base)
    pub unit_price: Money,
    /// `unit_price * quantity`
    pub line_total: Money,
    /// Whether a bulk tier or distributor override displaced the base price
    pub override_applied: bool,
}

/// Aggregate totals for a cart or order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of line quantities
    pub total_items: u32,
    /// Sum of resolved line totals
    pub subtotal: Money,
    /// Tax on the subtotal
    pub tax: Money,
    /// Shipping charge
    pub shipping: Money,
    /// Coupon discount actually applied (capped so the total stays >= 0)
    pub discount: Money,
    /// `subtotal + tax + shipping - discount`, clamped to >= 0
    pub total: Money,
}

/// A fully priced set of lines plus aggregate totals
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Per-line resolved prices, in input order
    pub lines: Vec<PricedLine>,
    /// Aggregate totals
    pub totals: Totals,
}

/// Resolves the unit price for a product at a given quantity and role.
///
/// Returns the price and whether an override (distributor price or bulk
/// tier) displaced the base price.
#[must_use]
pub fn resolve_unit_price(product: &Product, quantity: u32, role: Role) -> (Money, bool) {
    if role == Role::Distributor {
        if let Some(price) = product.distributor_price {
            return (price, true);
        }
    }
    // Highest min_quantity not exceeding the line quantity wins; ties are
    // not defensively excluded (tiers are assumed non-overlapping upstream).
    let tier = product
        .bulk_pricing
        .iter()
        .filter(|tier| tier.min_quantity <= quantity)
        .max_by_key(|tier| tier.min_quantity);
    match tier {
        Some(tier) => (tier.price, true),
        None => (product.price, false),
    }
}

/// Prices a set of lines with an optional coupon.
///
/// Empty input yields all-zero totals; shipping is only charged when there
/// is something to ship.
#[must_use]
pub fn quote(
    lines: &[PricingLine<'_>],
    coupon: Option<&AppliedCoupon>,
    role: Role,
    config: &PricingConfig,
) -> Quote {
    let mut priced = Vec::with_capacity(lines.len());
    let mut total_items: u32 = 0;
    let mut subtotal = Money::ZERO;

    for line in lines {
        let (unit_price, override_applied) = resolve_unit_price(line.product, line.quantity, role);
        let line_total = unit_price.saturating_mul(u64::from(line.quantity));
        total_items = total_items.saturating_add(line.quantity);
        subtotal = subtotal.saturating_add(line_total);
        priced.push(PricedLine {
            product_id: line.product.id,
            quantity: line.quantity,
            unit_price,
            line_total,
            override_applied,
        });
    }

    let tax = subtotal.basis_points(config.tax_rate_bps);
    let shipping = if priced.is_empty() || subtotal >= config.free_shipping_threshold {
        Money::ZERO
    } else {
        config.flat_shipping_fee
    };

    let requested_discount = match coupon.map(|c| c.discount) {
        Some(Discount::Percentage(p)) => subtotal.percentage(p),
        Some(Discount::Fixed(amount)) => amount,
        None => Money::ZERO,
    };
    let gross = subtotal.saturating_add(tax).saturating_add(shipping);
    // Cap the discount so the grand total never goes negative.
    let discount = requested_discount.min(gross);
    let total = gross.saturating_sub(discount);

    Quote {
        lines: priced,
        totals: Totals {
            total_items,
            subtotal,
            tax,
            shipping,
            discount,
            total,
        },
    }
}
