use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, Money, OrderId, ProductId};

/// Order status lifecycle. Opaque to the transactional core; carried through
/// create/update unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Cancelled,
}

/// Order line: product reference, quantity, price snapshot.
///
/// The unit price is snapshotted from the product at reservation time and is
/// immutable afterwards; later catalog repricing does not rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
}

impl LineItem {
    /// Build a line item from a resolved product price, computing the
    /// subtotal with checked arithmetic.
    pub fn resolve(
        product_id: ProductId,
        quantity: i64,
        unit_price: Money,
    ) -> Result<Self, DomainError> {
        if quantity <= 0 {
            return Err(DomainError::validation(format!(
                "quantity must be positive for product {product_id}"
            )));
        }
        let subtotal = unit_price
            .checked_mul(quantity)
            .ok_or_else(|| DomainError::validation("line subtotal overflow"))?;
        Ok(Self {
            product_id,
            quantity,
            unit_price,
            subtotal,
        })
    }
}

/// Reference to a product as supplied by a caller: either the opaque id or
/// the unique human-readable name, resolved at entry time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductRef {
    Id(ProductId),
    Name(String),
}

impl core::fmt::Display for ProductRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ProductRef::Id(id) => write!(f, "id {id}"),
            ProductRef::Name(name) => write!(f, "name '{name}'"),
        }
    }
}

/// One requested line of an order intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRequest {
    pub product: ProductRef,
    pub quantity: i64,
}

/// Desired order state as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub items: Vec<ItemRequest>,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub payment_method: String,
    pub notes: Option<String>,
}

impl OrderIntent {
    /// Entry validation: required fields and well-formed product references.
    ///
    /// Quantities and product existence are checked again during
    /// reconciliation; this catches caller mistakes before any stock moves.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.items.is_empty() {
            return Err(DomainError::validation(
                "order must contain at least one line item",
            ));
        }
        for item in &self.items {
            if item.quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "quantity must be positive for product {}",
                    item.product
                )));
            }
            if let ProductRef::Name(name) = &item.product {
                if name.trim().is_empty() {
                    return Err(DomainError::validation("product name cannot be empty"));
                }
            }
        }
        if self.shipping_address.trim().is_empty() {
            return Err(DomainError::validation("shipping_address cannot be empty"));
        }
        if self.payment_method.trim().is_empty() {
            return Err(DomainError::validation("payment_method cannot be empty"));
        }
        Ok(())
    }
}

/// An order with its resolved line items and computed total.
///
/// The total is computed from the items at construction and items are
/// replaced wholesale on update, so a stale total is never observable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    items: Vec<LineItem>,
    total_amount: Money,
    status: OrderStatus,
    shipping_address: String,
    payment_method: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Assemble a new order from resolved line items and intent fields.
    pub fn new(items: Vec<LineItem>, intent: &OrderIntent) -> Result<Self, DomainError> {
        let total_amount = Self::total_of(&items)?;
        let now = Utc::now();
        Ok(Self {
            id: OrderId::new(),
            items,
            total_amount,
            status: intent.status,
            shipping_address: intent.shipping_address.clone(),
            payment_method: intent.payment_method.clone(),
            notes: intent.notes.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Produce the updated order: same identity, new items and intent
    /// fields, total recomputed.
    pub fn replaced(&self, items: Vec<LineItem>, intent: &OrderIntent) -> Result<Self, DomainError> {
        let total_amount = Self::total_of(&items)?;
        Ok(Self {
            id: self.id,
            items,
            total_amount,
            status: intent.status,
            shipping_address: intent.shipping_address.clone(),
            payment_method: intent.payment_method.clone(),
            notes: intent.notes.clone(),
            created_at: self.created_at,
            updated_at: Utc::now(),
        })
    }

    fn total_of(items: &[LineItem]) -> Result<Money, DomainError> {
        if items.is_empty() {
            return Err(DomainError::validation(
                "order must contain at least one line item",
            ));
        }
        items.iter().try_fold(Money::ZERO, |acc, item| {
            acc.checked_add(item.subtotal)
                .ok_or_else(|| DomainError::validation("order total overflow"))
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn shipping_address(&self) -> &str {
        &self.shipping_address
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_intent(items: Vec<ItemRequest>) -> OrderIntent {
        OrderIntent {
            items,
            status: OrderStatus::Pending,
            shipping_address: "1 Main St".to_string(),
            payment_method: "card".to_string(),
            notes: None,
        }
    }

    fn test_item(quantity: i64, unit_price_minor: i64) -> LineItem {
        LineItem::resolve(
            ProductId::new(),
            quantity,
            Money::from_minor_units(unit_price_minor),
        )
        .unwrap()
    }

    #[test]
    fn line_item_computes_subtotal() {
        let item = test_item(3, 250);
        assert_eq!(item.subtotal, Money::from_minor_units(750));
    }

    #[test]
    fn line_item_rejects_non_positive_quantity() {
        let err = LineItem::resolve(ProductId::new(), 0, Money::ZERO).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn order_total_is_sum_of_subtotals() {
        let items = vec![test_item(2, 100), test_item(3, 250)];
        let intent = test_intent(vec![]);
        let order = Order::new(items.clone(), &intent).unwrap();
        let expected: Money = items.iter().map(|i| i.subtotal).sum();
        assert_eq!(order.total_amount(), expected);
    }

    #[test]
    fn order_rejects_empty_item_set() {
        let intent = test_intent(vec![]);
        let err = Order::new(vec![], &intent).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn replaced_keeps_identity_and_recomputes_total() {
        let intent = test_intent(vec![]);
        let order = Order::new(vec![test_item(2, 100)], &intent).unwrap();
        let updated = order.replaced(vec![test_item(5, 100)], &intent).unwrap();
        assert_eq!(updated.id(), order.id());
        assert_eq!(updated.created_at(), order.created_at());
        assert_eq!(updated.total_amount(), Money::from_minor_units(500));
    }

    #[test]
    fn intent_validation_catches_missing_fields() {
        let mut intent = test_intent(vec![ItemRequest {
            product: ProductRef::Name("Widget".to_string()),
            quantity: 1,
        }]);
        assert!(intent.validate().is_ok());

        intent.shipping_address = " ".to_string();
        assert!(matches!(
            intent.validate(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn intent_validation_rejects_empty_items_and_bad_quantities() {
        let empty = test_intent(vec![]);
        assert!(matches!(empty.validate(), Err(DomainError::Validation(_))));

        let bad_quantity = test_intent(vec![ItemRequest {
            product: ProductRef::Id(ProductId::new()),
            quantity: -1,
        }]);
        assert!(matches!(
            bad_quantity.validate(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn order_serializes_with_transparent_ids_and_amounts() {
        let intent = test_intent(vec![]);
        let order = Order::new(vec![test_item(2, 100)], &intent).unwrap();
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["total_amount"], serde_json::json!(200));
        assert_eq!(value["status"], serde_json::json!("pending"));
        assert!(value["items"][0]["product_id"].is_string());
    }
}
