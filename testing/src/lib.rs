//! # Storefront Testing
//!
//! Testing utilities for the storefront engine:
//!
//! - [`mocks::FixedClock`]: deterministic time
//! - [`store::InMemoryStore`]: in-memory implementation of every persistence
//!   trait, with per-entry atomic conditional counter updates, the same
//!   guarantee the real document store provides
//! - [`faults`]: wrappers that inject lost races and write failures for
//!   exercising recovery paths
//! - [`fixtures`]: product builders for tests

pub mod mocks {
    //! Mock implementations of environment traits.

    use chrono::{DateTime, Utc};
    use storefront_core::environment::Clock;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    #[derive(Debug, Clone, Copy)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which should never
    /// happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

pub mod store {
    //! In-memory store double.

    use futures::future::BoxFuture;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use storefront_core::cart::Cart;
    use storefront_core::ledger::{InventoryLedger, LedgerError};
    use storefront_core::order::Order;
    use storefront_core::storage::{CartStore, OrderStore, ProductStore, StorageError};
    use storefront_core::types::{OrderId, Product, ProductId, UserId};

    /// In-memory document store implementing every persistence trait.
    ///
    /// Ledger operations take the product-map lock for the full
    /// check-and-update, so `reserve` is a single atomic conditional update
    /// exactly as the contract requires; concurrent reservations of the last
    /// unit cannot both succeed.
    #[derive(Debug, Default)]
    pub struct InMemoryStore {
        products: Mutex<HashMap<ProductId, Product>>,
        carts: Mutex<HashMap<UserId, Cart>>,
        orders: Mutex<HashMap<OrderId, Order>>,
    }

    impl InMemoryStore {
        /// Creates an empty store
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Seeds a product synchronously (test setup convenience)
        ///
        /// # Panics
        ///
        /// Panics if the internal lock is poisoned.
        #[allow(clippy::expect_used)]
        pub fn seed_product(&self, product: Product) {
            self.products
                .lock()
                .expect("product map lock poisoned")
                .insert(product.id, product);
        }

        /// Removes a product synchronously (test setup convenience)
        ///
        /// # Panics
        ///
        /// Panics if the internal lock is poisoned.
        #[allow(clippy::expect_used)]
        pub fn remove_product(&self, id: ProductId) {
            self.products
                .lock()
                .expect("product map lock poisoned")
                .remove(&id);
        }

        /// Reads a product's inventory counters synchronously (assertions)
        ///
        /// # Panics
        ///
        /// Panics if the internal lock is poisoned.
        #[must_use]
        #[allow(clippy::expect_used)]
        pub fn inventory_of(&self, id: ProductId) -> Option<storefront_core::types::Inventory> {
            self.products
                .lock()
                .expect("product map lock poisoned")
                .get(&id)
                .map(|p| p.inventory)
        }

        fn with_counters<T>(
            &self,
            id: ProductId,
            f: impl FnOnce(&mut Product) -> Result<T, LedgerError>,
        ) -> Result<T, LedgerError> {
            let mut products = self
                .products
                .lock()
                .map_err(|_| LedgerError::Backend("product map lock poisoned".to_string()))?;
            let product = products.get_mut(&id).ok_or(LedgerError::ProductNotFound(id))?;
            f(product)
        }
    }

    impl ProductStore for InMemoryStore {
        fn get_product(
            &self,
            id: ProductId,
        ) -> BoxFuture<'_, Result<Option<Product>, StorageError>> {
            Box::pin(async move {
                let products = self
                    .products
                    .lock()
                    .map_err(|_| StorageError::Backend("product map lock poisoned".to_string()))?;
                Ok(products.get(&id).cloned())
            })
        }

        fn put_product(&self, product: Product) -> BoxFuture<'_, Result<(), StorageError>> {
            Box::pin(async move {
                let mut products = self
                    .products
                    .lock()
                    .map_err(|_| StorageError::Backend("product map lock poisoned".to_string()))?;
                products.insert(product.id, product);
                Ok(())
            })
        }
    }

    impl CartStore for InMemoryStore {
        fn load_cart(&self, user_id: UserId) -> BoxFuture<'_, Result<Option<Cart>, StorageError>> {
            Box::pin(async move {
                let carts = self
                    .carts
                    .lock()
                    .map_err(|_| StorageError::Backend("cart map lock poisoned".to_string()))?;
                Ok(carts.get(&user_id).cloned())
            })
        }

        fn save_cart(&self, cart: Cart) -> BoxFuture<'_, Result<(), StorageError>> {
            Box::pin(async move {
                let mut carts = self
                    .carts
                    .lock()
                    .map_err(|_| StorageError::Backend("cart map lock poisoned".to_string()))?;
                carts.insert(cart.user_id, cart);
                Ok(())
            })
        }
    }

    impl OrderStore for InMemoryStore {
        fn get_order(&self, id: OrderId) -> BoxFuture<'_, Result<Option<Order>, StorageError>> {
            Box::pin(async move {
                let orders = self
                    .orders
                    .lock()
                    .map_err(|_| StorageError::Backend("order map lock poisoned".to_string()))?;
                Ok(orders.get(&id).cloned())
            })
        }

        fn put_order(&self, order: Order) -> BoxFuture<'_, Result<(), StorageError>> {
            Box::pin(async move {
                let mut orders = self
                    .orders
                    .lock()
                    .map_err(|_| StorageError::Backend("order map lock poisoned".to_string()))?;
                orders.insert(order.id, order);
                Ok(())
            })
        }

        fn orders_for_user(
            &self,
            user_id: UserId,
        ) -> BoxFuture<'_, Result<Vec<Order>, StorageError>> {
            Box::pin(async move {
                let orders = self
                    .orders
                    .lock()
                    .map_err(|_| StorageError::Backend("order map lock poisoned".to_string()))?;
                let mut result: Vec<Order> = orders
                    .values()
                    .filter(|order| order.user_id == user_id)
                    .cloned()
                    .collect();
                result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Ok(result)
            })
        }
    }

    impl InventoryLedger for InMemoryStore {
        fn check_available(
            &self,
            product_id: ProductId,
            quantity: u32,
        ) -> BoxFuture<'_, Result<bool, LedgerError>> {
            Box::pin(async move {
                self.with_counters(product_id, |product| {
                    Ok(quantity <= product.inventory.available())
                })
            })
        }

        fn reserve(
            &self,
            product_id: ProductId,
            quantity: u32,
        ) -> BoxFuture<'_, Result<(), LedgerError>> {
            Box::pin(async move {
                self.with_counters(product_id, |product| {
                    if product.inventory.try_reserve(quantity) {
                        Ok(())
                    } else {
                        Err(LedgerError::InsufficientInventory {
                            product_id,
                            requested: quantity,
                            available: product.inventory.available(),
                        })
                    }
                })
            })
        }

        fn release(
            &self,
            product_id: ProductId,
            quantity: u32,
        ) -> BoxFuture<'_, Result<(), LedgerError>> {
            Box::pin(async move {
                self.with_counters(product_id, |product| {
                    product.inventory.release(quantity);
                    Ok(())
                })
            })
        }

        fn consume(
            &self,
            product_id: ProductId,
            quantity: u32,
        ) -> BoxFuture<'_, Result<(), LedgerError>> {
            Box::pin(async move {
                self.with_counters(product_id, |product| {
                    product.inventory.consume(quantity);
                    Ok(())
                })
            })
        }

        fn restock(
            &self,
            product_id: ProductId,
            quantity: u32,
        ) -> BoxFuture<'_, Result<(), LedgerError>> {
            Box::pin(async move {
                self.with_counters(product_id, |product| {
                    product.inventory.restock(quantity);
                    Ok(())
                })
            })
        }
    }
}

pub mod faults {
    //! Fault-injecting wrappers for exercising recovery paths.

    use futures::future::BoxFuture;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use storefront_core::ledger::{InventoryLedger, LedgerError};
    use storefront_core::order::Order;
    use storefront_core::storage::{OrderStore, StorageError};
    use storefront_core::types::{OrderId, ProductId, UserId};

    /// Decrements the counter, returning whether a fault should fire
    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Ledger wrapper whose next `conflicts` reserve calls lose their atomic
    /// update with [`LedgerError::Conflict`], then delegate to the inner
    /// ledger. All other operations pass straight through.
    pub struct ContendedLedger {
        inner: Arc<dyn InventoryLedger>,
        conflicts: AtomicU32,
    }

    impl ContendedLedger {
        /// Wraps a ledger, injecting `conflicts` lost races on reserve
        #[must_use]
        pub fn new(inner: Arc<dyn InventoryLedger>, conflicts: u32) -> Self {
            Self {
                inner,
                conflicts: AtomicU32::new(conflicts),
            }
        }
    }

    impl InventoryLedger for ContendedLedger {
        fn check_available(
            &self,
            product_id: ProductId,
            quantity: u32,
        ) -> BoxFuture<'_, Result<bool, LedgerError>> {
            self.inner.check_available(product_id, quantity)
        }

        fn reserve(
            &self,
            product_id: ProductId,
            quantity: u32,
        ) -> BoxFuture<'_, Result<(), LedgerError>> {
            Box::pin(async move {
                if take(&self.conflicts) {
                    return Err(LedgerError::Conflict(
                        "reservation lost the race".to_string(),
                    ));
                }
                self.inner.reserve(product_id, quantity).await
            })
        }

        fn release(
            &self,
            product_id: ProductId,
            quantity: u32,
        ) -> BoxFuture<'_, Result<(), LedgerError>> {
            self.inner.release(product_id, quantity)
        }

        fn consume(
            &self,
            product_id: ProductId,
            quantity: u32,
        ) -> BoxFuture<'_, Result<(), LedgerError>> {
            self.inner.consume(product_id, quantity)
        }

        fn restock(
            &self,
            product_id: ProductId,
            quantity: u32,
        ) -> BoxFuture<'_, Result<(), LedgerError>> {
            self.inner.restock(product_id, quantity)
        }
    }

    /// Order-store wrapper whose armed `put_order` calls fail with a backend
    /// error, then delegate. Reads always pass through.
    pub struct FlakyOrderStore {
        inner: Arc<dyn OrderStore>,
        failures: AtomicU32,
    }

    impl FlakyOrderStore {
        /// Wraps an order store with no failures armed
        #[must_use]
        pub fn new(inner: Arc<dyn OrderStore>) -> Self {
            Self {
                inner,
                failures: AtomicU32::new(0),
            }
        }

        /// Arms the next `n` `put_order` calls to fail
        pub fn fail_puts(&self, n: u32) {
            self.failures.store(n, Ordering::SeqCst);
        }
    }

    impl OrderStore for FlakyOrderStore {
        fn get_order(&self, id: OrderId) -> BoxFuture<'_, Result<Option<Order>, StorageError>> {
            self.inner.get_order(id)
        }

        fn put_order(&self, order: Order) -> BoxFuture<'_, Result<(), StorageError>> {
            Box::pin(async move {
                if take(&self.failures) {
                    return Err(StorageError::Backend("injected write failure".to_string()));
                }
                self.inner.put_order(order).await
            })
        }

        fn orders_for_user(
            &self,
            user_id: UserId,
        ) -> BoxFuture<'_, Result<Vec<Order>, StorageError>> {
            self.inner.orders_for_user(user_id)
        }
    }
}

pub mod fixtures {
    //! Test data builders.

    use storefront_core::types::{
        BulkPriceTier, Inventory, Money, Product, ProductId, SelectedOptions, ShippingAddress,
    };

    /// Builder for product fixtures
    #[derive(Debug)]
    pub struct ProductBuilder {
        product: Product,
    }

    impl ProductBuilder {
        /// Starts a builder with the given name, base price (cents), and
        /// stock quantity
        #[must_use]
        pub fn new(name: &str, price_cents: u64, quantity: u32) -> Self {
            Self {
                product: Product {
                    id: ProductId::new(),
                    name: name.to_string(),
                    sku: format!("SKU-{}", name.to_uppercase()),
                    price: Money::from_cents(price_cents),
                    distributor_price: None,
                    bulk_pricing: Vec::new(),
                    inventory: Inventory::new(quantity),
                    is_active: true,
                },
            }
        }

        /// Sets the reserved counter
        #[must_use]
        pub fn reserved(mut self, reserved: u32) -> Self {
            self.product.inventory.reserved = reserved;
            self
        }

        /// Adds a bulk price tier
        #[must_use]
        pub fn bulk_tier(mut self, min_quantity: u32, price_cents: u64) -> Self {
            self.product.bulk_pricing.push(BulkPriceTier {
                min_quantity,
                max_quantity: None,
                price: Money::from_cents(price_cents),
            });
            self
        }

        /// Sets a distributor override price
        #[must_use]
        pub fn distributor_price(mut self, price_cents: u64) -> Self {
            self.product.distributor_price = Some(Money::from_cents(price_cents));
            self
        }

        /// Marks the product inactive
        #[must_use]
        pub fn inactive(mut self) -> Self {
            self.product.is_active = false;
            self
        }

        /// Finishes the builder
        #[must_use]
        pub fn build(self) -> Product {
            self.product
        }
    }

    /// A plain active product fixture
    #[must_use]
    pub fn product(name: &str, price_cents: u64, quantity: u32) -> Product {
        ProductBuilder::new(name, price_cents, quantity).build()
    }

    /// Empty variant options
    #[must_use]
    pub fn no_options() -> SelectedOptions {
        SelectedOptions::default()
    }

    /// A shipping address fixture
    #[must_use]
    pub fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Test Customer".to_string(),
            address: "123 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip_code: "62701".to_string(),
            country: "United States".to_string(),
            phone: "555-0100".to_string(),
        }
    }
}

pub use faults::{ContendedLedger, FlakyOrderStore};
pub use fixtures::{ProductBuilder, no_options, product};
pub use mocks::{FixedClock, test_clock};
pub use store::InMemoryStore;
