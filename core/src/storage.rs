//! Persistence traits consumed by the service layer.
//!
//! The real deployment stores these documents in a document database with
//! per-document atomic updates; this crate only defines the seams. The
//! traits use explicit `Pin<Box<dyn Future>>` returns (via
//! [`futures::future::BoxFuture`]) instead of `async fn` so they stay
//! dyn-compatible and can be shared as `Arc<dyn Trait>`.
//!
//! Inventory counters are deliberately **not** writable through
//! [`ProductStore`]: all counter mutation goes through the
//! [`crate::ledger::InventoryLedger`] contract, which is where atomicity
//! matters.

use crate::cart::Cart;
use crate::order::Order;
use crate::types::{OrderId, Product, ProductId, UserId};
use futures::future::BoxFuture;
use thiserror::Error;

/// Errors from a persistence backend
#[derive(Debug, Error)]
pub enum StorageError {
    /// Optimistic write lost a race with a concurrent writer
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend failure (connection, serialization, ...)
    #[error("backend error: {0}")]
    Backend(String),
}

/// Read/write access to the product catalog
pub trait ProductStore: Send + Sync {
    /// Load a product by id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend fails.
    fn get_product(&self, id: ProductId) -> BoxFuture<'_, Result<Option<Product>, StorageError>>;

    /// Insert or replace a product document.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend fails.
    fn put_product(&self, product: Product) -> BoxFuture<'_, Result<(), StorageError>>;
}

/// Per-user cart persistence (one cart per user)
pub trait CartStore: Send + Sync {
    /// Load the cart for a user, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend fails.
    fn load_cart(&self, user_id: UserId) -> BoxFuture<'_, Result<Option<Cart>, StorageError>>;

    /// Persist a cart, item list and recomputed totals together.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend fails.
    fn save_cart(&self, cart: Cart) -> BoxFuture<'_, Result<(), StorageError>>;
}

/// Order persistence
pub trait OrderStore: Send + Sync {
    /// Load an order by id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend fails.
    fn get_order(&self, id: OrderId) -> BoxFuture<'_, Result<Option<Order>, StorageError>>;

    /// Insert or replace an order document.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend fails.
    fn put_order(&self, order: Order) -> BoxFuture<'_, Result<(), StorageError>>;

    /// All orders belonging to a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend fails.
    fn orders_for_user(&self, user_id: UserId) -> BoxFuture<'_, Result<Vec<Order>, StorageError>>;
}
