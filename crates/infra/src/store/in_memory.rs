use std::collections::HashMap;
use std::sync::RwLock;

use stockroom_core::{ExpectedVersion, OrderId, ProductId};
use stockroom_orders::Order;
use stockroom_products::Product;

use super::r#trait::{OrderStore, ProductStore, StoreError};

/// In-memory product store with compare-and-swap writes.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    records: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProductStore for InMemoryProductStore {
    fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(records.get(&id).cloned())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<Product>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(records.values().find(|p| p.name() == name).cloned())
    }

    fn save(&self, product: Product, expected: ExpectedVersion) -> Result<Product, StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        // Names are a human key and must stay unique.
        if records
            .values()
            .any(|p| p.id() != product.id() && p.name() == product.name())
        {
            return Err(StoreError::InvalidWrite(format!(
                "product name '{}' already in use",
                product.name()
            )));
        }

        let current = records.get(&product.id()).map(|p| p.version()).unwrap_or(0);
        if !expected.matches(current) {
            return Err(StoreError::Conflict(format!(
                "expected {expected:?}, found {current}"
            )));
        }

        let committed = product.at_version(current + 1);
        records.insert(committed.id(), committed.clone());
        Ok(committed)
    }

    fn delete(&self, id: ProductId) -> Result<bool, StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(records.remove(&id).is_some())
    }
}

/// In-memory order store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    records: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders (test observability).
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OrderStore for InMemoryOrderStore {
    fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(records.get(&id).cloned())
    }

    fn save(&self, order: Order) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        records.insert(order.id(), order);
        Ok(())
    }

    fn delete(&self, id: OrderId) -> Result<bool, StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(records.remove(&id).is_some())
    }
}
