//! Order aggregate and its state machine.
//!
//! An order is created once from a cart or explicit item list and owns an
//! immutable list of item snapshots; later product price changes never
//! retroactively affect it. The status machine drives every inventory ledger
//! transition:
//!
//! ```text
//! pending → confirmed → processing → shipped → delivered
//!     \         \
//!      `─────────`──→ cancelled            (release / restock)
//!                confirmed/processing/shipped → refunded
//! ```
//!
//! Transitions are validated here, purely; they return a [`LedgerEffect`]
//! describing the counter updates the caller must execute. The order's own
//! item quantities are the source of truth for "how much this order
//! reserved"; the ledger is never asked.

use crate::error::{Error, Result};
use crate::pricing::Totals;
use crate::types::{
    Money, OrderId, PaymentMethod, PaymentResult, ProductId, ShippingAddress, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created, holding reservations, awaiting confirmation/payment
    Pending,
    /// Confirmed (payment received or manually confirmed)
    Confirmed,
    /// Being prepared for shipment
    Processing,
    /// Handed to the carrier
    Shipped,
    /// Terminal success
    Delivered,
    /// Terminal: cancelled before fulfilment
    Cancelled,
    /// Terminal: paid order refunded
    Refunded,
}

impl OrderStatus {
    /// Whether no further transition is allowed from this status
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Refunded)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            other => Err(Error::Validation(format!("unknown order status: {other}"))),
        }
    }
}

/// Ledger counter update a transition requires, applied uniformly to every
/// order item quantity
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerEffect {
    /// No counter change
    None,
    /// Decrement `reserved` (cancellation of an unpaid order)
    Release,
    /// Decrement both `quantity` and `reserved` (payment confirmed)
    Consume,
    /// Increment `quantity` (cancellation of a paid order whose reservation
    /// was already consumed)
    Restock,
}

/// Immutable snapshot of one ordered line
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Product the line refers to
    pub product_id: ProductId,
    /// Product name captured at creation time
    pub name: String,
    /// Resolved unit price captured at creation time
    pub price: Money,
    /// Quantity reserved against the ledger for this line
    pub quantity: u32,
}

/// One entry of the append-only status history
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// Status entered
    pub status: OrderStatus,
    /// When the transition was applied
    pub at: DateTime<Utc>,
    /// Optional free-form note
    pub note: Option<String>,
    /// Acting user, when known
    pub by: Option<UserId>,
}

/// Order document: the owning aggregate for a committed purchase
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier
    pub id: OrderId,
    /// Human-readable order number (`ORD-...`), generated at creation
    pub order_number: String,
    /// Purchasing user; exclusively owns the record
    pub user_id: UserId,
    /// Immutable item snapshots
    pub items: Vec<OrderItem>,
    /// Shipping destination
    pub shipping_address: ShippingAddress,
    /// Payment method chosen at checkout
    pub payment_method: PaymentMethod,
    /// Gateway result, once paid
    pub payment_result: Option<PaymentResult>,
    /// Totals computed by the pricing engine at creation
    pub totals: Totals,
    /// Current lifecycle status
    pub status: OrderStatus,
    /// Whether payment has been received
    pub is_paid: bool,
    /// When payment was received
    pub paid_at: Option<DateTime<Utc>>,
    /// Whether the order has been delivered
    pub is_delivered: bool,
    /// When the order was delivered
    pub delivered_at: Option<DateTime<Utc>>,
    /// Carrier tracking number, once shipped
    pub tracking_number: Option<String>,
    /// Append-only log of every status transition
    pub status_history: Vec<StatusEntry>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Creates a pending order from item snapshots and priced totals.
    ///
    /// The creator is responsible for having reserved every item quantity
    /// against the ledger before persisting the order.
    #[must_use]
    pub fn new(
        user_id: UserId,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
        totals: Totals,
        now: DateTime<Utc>,
    ) -> Self {
        let id = OrderId::new();
        Self {
            id,
            order_number: order_number(now, id),
            user_id,
            items,
            shipping_address,
            payment_method,
            payment_result: None,
            totals,
            status: OrderStatus::Pending,
            is_paid: false,
            paid_at: None,
            is_delivered: false,
            delivered_at: None,
            tracking_number: None,
            status_history: vec![StatusEntry {
                status: OrderStatus::Pending,
                at: now,
                note: None,
                by: Some(user_id),
            }],
            created_at: now,
        }
    }

    /// `(product, quantity)` pairs this order holds or held against the
    /// ledger, the sole source of truth for its reservations
    #[must_use]
    pub fn item_quantities(&self) -> Vec<(ProductId, u32)> {
        self.items
            .iter()
            .map(|item| (item.product_id, item.quantity))
            .collect()
    }

    fn push_history(
        &mut self,
        status: OrderStatus,
        now: DateTime<Utc>,
        note: Option<String>,
        by: Option<UserId>,
    ) {
        self.status_history.push(StatusEntry {
            status,
            at: now,
            note,
            by,
        });
    }

    /// Attempts a status transition, returning the ledger effect the caller
    /// must execute.
    ///
    /// Transitioning into the current status is a no-op with no ledger
    /// effect: idempotence is decided from the **current** status, never
    /// inferred from the trigger alone.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTransition`] when the target is not reachable from
    /// the current status: terminal states admit no transition, `cancelled`
    /// is only reachable from `pending`/`confirmed`, `refunded` only from a
    /// paid non-terminal status, and nothing returns to `pending`.
    pub fn transition(
        &mut self,
        to: OrderStatus,
        now: DateTime<Utc>,
        note: Option<String>,
        by: Option<UserId>,
    ) -> Result<LedgerEffect> {
        let from = self.status;
        if to == from {
            return Ok(LedgerEffect::None);
        }
        if from.is_terminal() {
            return Err(Error::InvalidTransition { from, to });
        }

        let effect = match to {
            OrderStatus::Cancelled => {
                if !matches!(from, OrderStatus::Pending | OrderStatus::Confirmed) {
                    return Err(Error::InvalidTransition { from, to });
                }
                // A paid order already consumed its reservation; releasing
                // here would strip someone else's hold, so stock is restored
                // instead.
                if self.is_paid {
                    LedgerEffect::Restock
                } else {
                    LedgerEffect::Release
                }
            }
            OrderStatus::Refunded => {
                if !self.is_paid {
                    return Err(Error::InvalidTransition { from, to });
                }
                LedgerEffect::None
            }
            OrderStatus::Delivered => {
                self.is_delivered = true;
                self.delivered_at = Some(now);
                LedgerEffect::None
            }
            OrderStatus::Pending => {
                return Err(Error::InvalidTransition { from, to });
            }
            OrderStatus::Confirmed | OrderStatus::Processing | OrderStatus::Shipped => {
                LedgerEffect::None
            }
        };

        self.status = to;
        self.push_history(to, now, note, by);
        Ok(effect)
    }

    /// Records payment, consuming the order's reservations.
    ///
    /// Allowed from `pending` or `confirmed`; auto-advances a pending order
    /// to `confirmed`. Marking an already-paid order is a no-op with no
    /// ledger effect.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTransition`] from any other status.
    pub fn mark_paid(
        &mut self,
        payment: PaymentResult,
        now: DateTime<Utc>,
        by: Option<UserId>,
    ) -> Result<LedgerEffect> {
        if self.is_paid {
            return Ok(LedgerEffect::None);
        }
        if !matches!(self.status, OrderStatus::Pending | OrderStatus::Confirmed) {
            return Err(Error::InvalidTransition {
                from: self.status,
                to: OrderStatus::Confirmed,
            });
        }

        self.is_paid = true;
        self.paid_at = Some(now);
        self.payment_result = Some(payment);
        if self.status == OrderStatus::Pending {
            self.status = OrderStatus::Confirmed;
            self.push_history(
                OrderStatus::Confirmed,
                now,
                Some("payment received".to_string()),
                by,
            );
        }
        Ok(LedgerEffect::Consume)
    }

    /// Records the carrier tracking number
    pub fn set_tracking_number(&mut self, tracking_number: String) {
        self.tracking_number = Some(tracking_number);
    }
}

/// Generates a human-readable order number (`ORD-<ts36>-<id>`) from the
/// creation time and order id.
fn order_number(now: DateTime<Utc>, id: OrderId) -> String {
    let suffix: String = id
        .as_uuid()
        .simple()
        .to_string()
        .chars()
        .take(5)
        .collect::<String>()
        .to_uppercase();
    format!("ORD-{}-{}", to_base36(now.timestamp_millis().max(0).unsigned_abs()), suffix)
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        #[allow(clippy::cast_possible_truncation)]
        let d = (n % 36) as u32;
        if let Some(c) = char::from_digit(d, 36) {
            digits.push(c.to_ascii_uppercase());
        }
        n /= 36;
    }
    digits.iter().rev().collect()
}
