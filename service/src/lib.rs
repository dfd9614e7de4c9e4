//! Imperative shell for the storefront order/inventory engine.
//!
//! The core crate holds the pure domain (pricing, cart aggregate, order
//! state machine, ledger contract); this crate wires those pieces to the
//! trait-object stores and executes their effects:
//!
//! - [`cart::CartService`]: load, mutate, reprice, save
//! - [`order::OrderService`]: reserve-with-compensation creation, checkout,
//!   and lifecycle transitions that execute the state machine's
//!   [`storefront_core::order::LedgerEffect`]
//! - [`auth::Actor`]: the authenticated caller plus ownership/admin guards
//!
//! Everything here is storage-agnostic; any [`storefront_core::storage`]
//! and [`storefront_core::ledger::InventoryLedger`] implementation plugs in.

pub mod auth;
pub mod cart;
pub mod config;
pub mod order;
pub mod telemetry;

pub use auth::Actor;
pub use cart::{CartOperation, CartService};
pub use config::ServiceConfig;
pub use order::{CreateOrderRequest, NewOrderItem, OrderService};
