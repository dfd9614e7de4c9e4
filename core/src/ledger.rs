//! Inventory ledger contract.
//!
//! The ledger is the one shared mutable resource with a correctness
//! requirement: two concurrent order-creation requests for the last unit of
//! stock must not both succeed. Every mutating operation is therefore
//! specified as a **single atomic conditional update** against the stored
//! counters, never a read-modify-write at the application layer.
//!
//! The ledger tracks aggregate counters only; it has no notion of which
//! order holds which reservation. The order aggregate is solely responsible
//! for calling [`InventoryLedger::release`] / [`InventoryLedger::consume`]
//! with exactly the quantities it recorded at creation time.

use crate::types::ProductId;
use futures::future::BoxFuture;
use thiserror::Error;

/// Errors from ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The conditional reserve found fewer available units than requested
    #[error(
        "insufficient inventory for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientInventory {
        /// Product that could not cover the request
        product_id: ProductId,
        /// Units requested
        requested: u32,
        /// Units available at the moment of the atomic update
        available: u32,
    },

    /// No counters exist for the product
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// The atomic update lost a race and should be retried from the top
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend failure
    #[error("backend error: {0}")]
    Backend(String),
}

/// Atomic operations over a product's `(quantity, reserved)` counters.
///
/// `check_available` is advisory: a `true` result holds no units. Only
/// `reserve` grants a hold, and only at the moment of its atomic update.
pub trait InventoryLedger: Send + Sync {
    /// Read-only availability probe: `quantity <= available` at the instant
    /// of the read. Callers must not treat `true` as a held guarantee.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the product is unknown or the backend fails.
    fn check_available(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> BoxFuture<'_, Result<bool, LedgerError>>;

    /// Atomically increment `reserved` by `quantity` iff
    /// `reserved + quantity <= stock quantity` holds at the moment of the
    /// update.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientInventory`] when the condition
    /// fails, leaving the counters untouched.
    fn reserve(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> BoxFuture<'_, Result<(), LedgerError>>;

    /// Atomically decrement `reserved` by `quantity`, floored at zero.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the product is unknown or the backend fails.
    fn release(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> BoxFuture<'_, Result<(), LedgerError>>;

    /// Atomically decrement both stock `quantity` and `reserved` by
    /// `quantity`, converting a reservation into a fulfilled sale. Callers
    /// must only consume what they themselves reserved.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the product is unknown or the backend fails.
    fn consume(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> BoxFuture<'_, Result<(), LedgerError>>;

    /// Atomically increment stock `quantity` by `quantity`, returning
    /// consumed units to the sellable pool (cancellation of a paid order).
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the product is unknown or the backend fails.
    fn restock(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> BoxFuture<'_, Result<(), LedgerError>>;
}
