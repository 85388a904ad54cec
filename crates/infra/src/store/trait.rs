use std::sync::Arc;

use thiserror::Error;

use stockroom_core::{ExpectedVersion, OrderId, ProductId};
use stockroom_orders::Order;
use stockroom_products::Product;

/// Storage operation error.
///
/// Infrastructure failures only (version races, bad writes, unavailable
/// backends); domain failures such as insufficient stock never originate
/// here.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic concurrency check failed: the record's version moved
    /// between read and write. The write had no side effects.
    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    /// The write itself was malformed (e.g. duplicate product name).
    #[error("invalid write: {0}")]
    InvalidWrite(String),

    /// The storage collaborator is unreachable or broken.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Version-checked product persistence.
///
/// `save` is the compare-and-swap primitive the Stock Ledger builds on:
/// implementations must commit (and bump the version) only when the stored
/// version matches `expected`, and must return `Conflict` with no side
/// effects otherwise. A first insert matches `Exact(0)` or `Any`.
pub trait ProductStore: Send + Sync {
    fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Look a product up by its unique name.
    fn find_by_name(&self, name: &str) -> Result<Option<Product>, StoreError>;

    /// Compare-and-swap write. Returns the committed record with its newly
    /// assigned version.
    fn save(&self, product: Product, expected: ExpectedVersion) -> Result<Product, StoreError>;

    /// Remove a product. Returns whether a record existed.
    fn delete(&self, id: ProductId) -> Result<bool, StoreError>;
}

/// Order persistence. No version discipline here: orders are mutated only by
/// the coordinator, which serializes its own writes per order operation.
pub trait OrderStore: Send + Sync {
    fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    fn save(&self, order: Order) -> Result<(), StoreError>;

    /// Remove an order. Returns whether a record existed.
    fn delete(&self, id: OrderId) -> Result<bool, StoreError>;
}

impl<S> ProductStore for Arc<S>
where
    S: ProductStore + ?Sized,
{
    fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).find_by_id(id)
    }

    fn find_by_name(&self, name: &str) -> Result<Option<Product>, StoreError> {
        (**self).find_by_name(name)
    }

    fn save(&self, product: Product, expected: ExpectedVersion) -> Result<Product, StoreError> {
        (**self).save(product, expected)
    }

    fn delete(&self, id: ProductId) -> Result<bool, StoreError> {
        (**self).delete(id)
    }
}

impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        (**self).find_by_id(id)
    }

    fn save(&self, order: Order) -> Result<(), StoreError> {
        (**self).save(order)
    }

    fn delete(&self, id: OrderId) -> Result<bool, StoreError> {
        (**self).delete(id)
    }
}
