//! # Storefront Core
//!
//! Domain model and contracts for the storefront order/inventory
//! consistency engine: the rules that keep a product's sellable quantity,
//! its reserved-for-pending-orders quantity, a cart's computed price, and an
//! order's lifecycle status mutually consistent under concurrent,
//! out-of-order, and partially-failing requests.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐     advisory checks      ┌──────────────────┐
//! │ Cart Aggregate │ ───────────────────────► │ Inventory Ledger │
//! └───────┬────────┘                          └────────▲─────────┘
//!         │ checkout                                   │ reserve /
//!         ▼                                            │ release /
//! ┌────────────────┐     LedgerEffect                  │ consume /
//! │  Order State   │ ─────────────────────────────────►│ restock
//! │    Machine     │                                   │
//! └───────┬────────┘                          ┌────────┴─────────┐
//!         │ prices via                        │  atomic counter  │
//!         ▼                                   │     updates      │
//! ┌────────────────┐                          └──────────────────┘
//! │ Pricing Engine │  pure: (items, coupon, role) → totals
//! └────────────────┘
//! ```
//!
//! All ledger mutation happens exclusively through order transitions; the
//! cart never holds a reservation. No cross-aggregate transaction is
//! assumed: order creation that fails partway compensates explicitly by
//! releasing what it already reserved.
//!
//! The crate is pure domain logic plus trait seams: persistence
//! ([`storage`]) and the counter store behind the ledger ([`ledger`]) are
//! injected by the service layer.

pub mod cart;
pub mod error;
pub mod ledger;
pub mod order;
pub mod pricing;
pub mod storage;
pub mod types;

pub use cart::{Cart, CartItem};
pub use error::{Error, Result};
pub use ledger::{InventoryLedger, LedgerError};
pub use order::{LedgerEffect, Order, OrderItem, OrderStatus, StatusEntry};
pub use pricing::{AppliedCoupon, CouponBook, Discount, PricingConfig, Quote, Totals};
pub use storage::{CartStore, OrderStore, ProductStore, StorageError};
pub use types::{
    BulkPriceTier, Inventory, Money, OrderId, PaymentMethod, PaymentResult, Product, ProductId,
    Role, SelectedOptions, ShippingAddress, UserId,
};

/// Injected dependencies abstracted as traits for testability
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
