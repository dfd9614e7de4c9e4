//! Error taxonomy for the storefront core.
//!
//! Every operation exposed to the (external) HTTP layer resolves to one of
//! these variants; nothing is thrown past the public contract. Business-rule
//! failures (`InsufficientInventory`, `InvalidTransition`, `InvalidCoupon`)
//! are surfaced verbatim and never retried automatically; `Conflict` marks a
//! lost race on an atomic ledger update and is safe to retry once from the
//! top of the operation.

use crate::ledger::LedgerError;
use crate::order::OrderStatus;
use crate::storage::StorageError;
use crate::types::{OrderId, ProductId, UserId};
use thiserror::Error;

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced at the operation boundary
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input; never retried
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested quantity exceeds `quantity - reserved` for the product
    #[error(
        "insufficient inventory for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientInventory {
        /// Product that could not cover the request
        product_id: ProductId,
        /// Units requested
        requested: u32,
        /// Units available at the moment of the atomic check
        available: u32,
    },

    /// Order status transition not allowed by the state machine
    #[error("invalid order status transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status
        from: OrderStatus,
        /// Requested status
        to: OrderStatus,
    },

    /// Caller is neither the owning user nor an admin
    #[error("not authorized")]
    NotAuthorized,

    /// Product does not exist
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// Order does not exist
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// No cart exists for the user
    #[error("cart not found for user {0}")]
    CartNotFound(UserId),

    /// Coupon code is not in the configured coupon table
    #[error("invalid coupon code: {0}")]
    InvalidCoupon(String),

    /// An atomic update lost a race; the whole operation may be retried once
    #[error("persistence conflict: {0}")]
    Conflict(String),

    /// Persistence backend failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(msg) => Self::Conflict(msg),
            StorageError::Backend(msg) => Self::Storage(msg),
        }
    }
}

impl From<LedgerError> for Error {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientInventory {
                product_id,
                requested,
                available,
            } => Self::InsufficientInventory {
                product_id,
                requested,
                available,
            },
            LedgerError::ProductNotFound(id) => Self::ProductNotFound(id),
            LedgerError::Conflict(msg) => Self::Conflict(msg),
            LedgerError::Backend(msg) => Self::Storage(msg),
        }
    }
}
