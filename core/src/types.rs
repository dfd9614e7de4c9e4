//! Domain types for the storefront order/inventory engine.
//!
//! Value objects and documents shared by the pricing engine, the cart
//! aggregate, and the order state machine. Monetary amounts are cents-based
//! to avoid floating-point arithmetic errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a product
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(Uuid);

impl ProductId {
    /// Creates a new random `ProductId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ProductId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Creates a new random `OrderId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `OrderId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole dollars, saturating on overflow
    #[must_use]
    pub const fn from_dollars(dollars: u64) -> Self {
        Self(dollars.saturating_mul(100))
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts, saturating at `u64::MAX`
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtracts an amount, floored at zero
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Multiplies the amount by a quantity, saturating at `u64::MAX`
    #[must_use]
    pub const fn saturating_mul(self, quantity: u64) -> Self {
        Self(self.0.saturating_mul(quantity))
    }

    /// Returns `percent`% of the amount, truncated toward zero
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn percentage(self, percent: u8) -> Self {
        Self((self.0 as u128 * percent as u128 / 100) as u64)
    }

    /// Returns the given basis points (1/100th of a percent) of the amount,
    /// truncated toward zero
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn basis_points(self, bps: u32) -> Self {
        Self((self.0 as u128 * bps as u128 / 10_000) as u64)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Users
// ============================================================================

/// Role of the acting user, as issued by the (external) auth layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular shopper
    Customer,
    /// Wholesale buyer eligible for per-product distributor prices
    Distributor,
    /// Back-office operator; may transition any order
    Admin,
}

// ============================================================================
// Inventory counters
// ============================================================================

/// Authoritative per-product inventory counters.
///
/// `quantity` is the total units physically available; `reserved` is the
/// portion currently allocated to unfulfilled orders. The sell decision
/// always reads `available = quantity - reserved`.
///
/// Invariant: `reserved <= quantity`. The counter arithmetic below preserves
/// it on every path, so a store that applies these methods under per-entry
/// atomicity never oversells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Total units physically available
    pub quantity: u32,
    /// Units currently allocated to unfulfilled orders
    pub reserved: u32,
}

impl Inventory {
    /// Creates counters with the given total quantity and nothing reserved
    #[must_use]
    pub const fn new(quantity: u32) -> Self {
        Self {
            quantity,
            reserved: 0,
        }
    }

    /// Units available for a sell decision
    #[must_use]
    pub const fn available(&self) -> u32 {
        self.quantity.saturating_sub(self.reserved)
    }

    /// Attempts to reserve `quantity` units.
    ///
    /// Succeeds iff `reserved + quantity <= self.quantity` at the moment of
    /// the call; the caller must invoke this under whatever atomicity the
    /// store provides for the entry.
    #[must_use]
    pub const fn try_reserve(&mut self, quantity: u32) -> bool {
        match self.reserved.checked_add(quantity) {
            Some(reserved) if reserved <= self.quantity => {
                self.reserved = reserved;
                true
            }
            _ => false,
        }
    }

    /// Releases `quantity` reserved units, floored at zero
    pub const fn release(&mut self, quantity: u32) {
        self.reserved = self.reserved.saturating_sub(quantity);
    }

    /// Converts `quantity` reserved units into a permanent stock reduction.
    ///
    /// The caller must only consume what it previously reserved.
    pub const fn consume(&mut self, quantity: u32) {
        self.quantity = self.quantity.saturating_sub(quantity);
        self.reserved = self.reserved.saturating_sub(quantity);
    }

    /// Returns `quantity` units to stock (cancellation of an already-paid
    /// order whose reservation was consumed)
    pub const fn restock(&mut self, quantity: u32) {
        self.quantity = self.quantity.saturating_add(quantity);
    }

    /// Whether the invariant `reserved <= quantity` currently holds
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.reserved <= self.quantity
    }
}

// ============================================================================
// Products
// ============================================================================

/// A quantity-threshold price override for a product.
///
/// Tiers are selected by the highest `min_quantity` not exceeding the line
/// quantity. The authoring path is assumed to keep tiers non-overlapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkPriceTier {
    /// Minimum line quantity for the tier to apply
    pub min_quantity: u32,
    /// Optional upper bound (informational; selection uses `min_quantity`)
    pub max_quantity: Option<u32>,
    /// Unit price when the tier applies
    pub price: Money,
}

/// Product document, as read from the (external) catalog store
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Stock-keeping unit
    pub sku: String,
    /// Base unit price
    pub price: Money,
    /// Per-product override for distributor-role buyers; takes precedence
    /// over bulk tiers
    pub distributor_price: Option<Money>,
    /// Quantity-threshold price overrides
    pub bulk_pricing: Vec<BulkPriceTier>,
    /// Authoritative inventory counters
    pub inventory: Inventory,
    /// Inactive products cannot be added to a cart or ordered
    pub is_active: bool,
}

// ============================================================================
// Cart line identity
// ============================================================================

/// Variant options selected for a cart line.
///
/// Two lines with the same product but different options are distinct
/// entities, so options participate in line identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectedOptions {
    /// Selected color, if the product has color variants
    pub color: Option<String>,
    /// Selected size
    pub size: Option<String>,
    /// Selected material
    pub material: Option<String>,
}

// ============================================================================
// Shipping and payment
// ============================================================================

/// Shipping destination captured at checkout
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    /// Recipient full name
    pub full_name: String,
    /// Street address
    pub address: String,
    /// City
    pub city: String,
    /// State or province
    pub state: String,
    /// Postal code
    pub zip_code: String,
    /// Country
    pub country: String,
    /// Contact phone number
    pub phone: String,
}

/// Accepted payment methods
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// PayPal
    PayPal,
    /// Stripe
    Stripe,
    /// Credit card
    CreditCard,
    /// Cash on delivery
    CashOnDelivery,
}

/// Result payload reported by the (external) payment gateway
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    /// Gateway transaction identifier
    pub id: String,
    /// Gateway-reported status
    pub status: String,
    /// Gateway-reported update time
    pub update_time: String,
    /// Payer email address
    pub email_address: String,
}
