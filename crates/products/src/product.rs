use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, Money, ProductId};

/// A product with its available stock.
///
/// The record is owned by the Stock Ledger: `available` and `version` change
/// only through the reserve/release transitions below, applied by a
/// version-checked store write. Transitions are pure; they return an updated
/// copy and never touch shared state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    description: Option<String>,
    category: Option<String>,
    unit_price: Money,
    available: i64,
    /// Bumped by the store on every committed write; read-only here.
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    /// Create a new product record at version 0 (not yet persisted).
    pub fn new(
        name: impl Into<String>,
        unit_price: Money,
        available: i64,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if unit_price.is_negative() {
            return Err(DomainError::validation("unit_price cannot be negative"));
        }
        if available < 0 {
            return Err(DomainError::validation("available stock cannot be negative"));
        }

        let now = Utc::now();
        Ok(Self {
            id: ProductId::new(),
            name,
            description: None,
            category: None,
            unit_price,
            available,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn available(&self) -> i64 {
        self.available
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Reserve `quantity` units: decrement available stock.
    ///
    /// Fails with `InsufficientStock` when the request exceeds what is
    /// available, carrying enough context for the caller to act.
    pub fn reserved(&self, quantity: i64) -> Result<Self, DomainError> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if self.available < quantity {
            return Err(DomainError::insufficient_stock(
                self.id,
                quantity,
                self.available,
            ));
        }

        let mut next = self.clone();
        next.available -= quantity;
        next.updated_at = Utc::now();
        Ok(next)
    }

    /// Release `quantity` units: increment available stock.
    ///
    /// Releasing restores previously reserved stock, so there is no upper
    /// bound beyond integer limits.
    pub fn released(&self, quantity: i64) -> Result<Self, DomainError> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        let available = self
            .available
            .checked_add(quantity)
            .ok_or_else(|| DomainError::validation("stock level overflow"))?;

        let mut next = self.clone();
        next.available = available;
        next.updated_at = Utc::now();
        Ok(next)
    }

    /// Change the unit price (catalog edit; does not touch past snapshots).
    pub fn repriced(&self, unit_price: Money) -> Result<Self, DomainError> {
        if unit_price.is_negative() {
            return Err(DomainError::validation("unit_price cannot be negative"));
        }
        let mut next = self.clone();
        next.unit_price = unit_price;
        next.updated_at = Utc::now();
        Ok(next)
    }

    /// Rename and re-describe the product (catalog edit).
    pub fn described(
        &self,
        name: impl Into<String>,
        description: Option<String>,
        category: Option<String>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        let mut next = self.clone();
        next.name = name;
        next.description = description;
        next.category = category;
        next.updated_at = Utc::now();
        Ok(next)
    }

    /// Store-side hook: stamp the version assigned by a committed write.
    ///
    /// Only storage implementations should call this.
    pub fn at_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product(available: i64) -> Product {
        Product::new("Widget", Money::from_minor_units(250), available).unwrap()
    }

    #[test]
    fn new_product_starts_at_version_zero() {
        let product = test_product(10);
        assert_eq!(product.version(), 0);
        assert_eq!(product.available(), 10);
        assert_eq!(product.unit_price(), Money::from_minor_units(250));
    }

    #[test]
    fn rejects_empty_name_and_negative_stock() {
        assert!(matches!(
            Product::new("  ", Money::ZERO, 1),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            Product::new("Widget", Money::ZERO, -1),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            Product::new("Widget", Money::from_minor_units(-1), 1),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn reserve_decrements_available() {
        let product = test_product(5);
        let reserved = product.reserved(3).unwrap();
        assert_eq!(reserved.available(), 2);
        // The original is untouched.
        assert_eq!(product.available(), 5);
    }

    #[test]
    fn reserve_beyond_available_reports_context() {
        let product = test_product(3);
        match product.reserved(5) {
            Err(DomainError::InsufficientStock {
                product_id,
                requested,
                available,
            }) => {
                assert_eq!(product_id, product.id());
                assert_eq!(requested, 5);
                assert_eq!(available, 3);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn reserve_rejects_non_positive_quantity() {
        let product = test_product(5);
        assert!(matches!(product.reserved(0), Err(DomainError::Validation(_))));
        assert!(matches!(product.reserved(-2), Err(DomainError::Validation(_))));
    }

    #[test]
    fn release_then_reserve_round_trips() {
        let product = test_product(5);
        let released = product.released(4).unwrap();
        assert_eq!(released.available(), 9);
        let back = released.reserved(4).unwrap();
        assert_eq!(back.available(), product.available());
    }

    #[test]
    fn release_guards_overflow() {
        let product = test_product(i64::MAX - 1);
        assert!(matches!(
            product.released(2),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn reprice_does_not_touch_stock() {
        let product = test_product(5);
        let repriced = product.repriced(Money::from_minor_units(999)).unwrap();
        assert_eq!(repriced.available(), 5);
        assert_eq!(repriced.unit_price(), Money::from_minor_units(999));
    }
}
