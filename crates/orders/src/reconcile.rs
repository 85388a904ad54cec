//! Line-item reconciliation.
//!
//! Given the old and new line-item sets of an order, compute the stock
//! deltas to apply and the resolved items with their price snapshots and
//! totals. Pure: no IO, no shared mutable state; the caller resolves
//! products and supplies a price lookup.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, Money, ProductId};

use crate::order::LineItem;

/// A signed stock change for one product. Positive = release (stock comes
/// back), negative = reserve (stock goes out). Transient: produced by the
/// reconciler, consumed by the ledger, never persisted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDelta {
    pub product_id: ProductId,
    pub change: i64,
}

impl StockDelta {
    pub fn reserve(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            change: -quantity,
        }
    }

    pub fn release(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            change: quantity,
        }
    }

    pub fn is_reserve(&self) -> bool {
        self.change < 0
    }

    /// The unsigned quantity to pass to the ledger.
    pub fn quantity(&self) -> i64 {
        self.change.abs()
    }
}

/// Price lookup capability for resolved products.
pub trait PriceSource {
    fn unit_price(&self, product_id: ProductId) -> Option<Money>;
}

impl PriceSource for HashMap<ProductId, Money> {
    fn unit_price(&self, product_id: ProductId) -> Option<Money> {
        self.get(&product_id).copied()
    }
}

impl<P: PriceSource + ?Sized> PriceSource for &P {
    fn unit_price(&self, product_id: ProductId) -> Option<Money> {
        (**self).unit_price(product_id)
    }
}

/// The reconciler's output: deltas to drive through the ledger, the resolved
/// line items, and the recomputed order total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub deltas: Vec<StockDelta>,
    pub items: Vec<LineItem>,
    pub total_amount: Money,
}

/// Compute the stock deltas and resolved items for an order transition.
///
/// Every old item yields a full release of its quantity; every new item
/// yields a reserve of its requested quantity with the unit price
/// snapshotted from `prices`. Deltas for the same product are deliberately
/// not netted against each other: release and reserve must reach the ledger
/// as two operations so the reservation is checked against the product's
/// true current availability.
///
/// An empty `new_items` set is rejected: this domain does not allow empty
/// orders. Non-positive quantities are validation errors, never ignored.
pub fn reconcile(
    old_items: &[LineItem],
    new_items: &[(ProductId, i64)],
    prices: &impl PriceSource,
) -> Result<Reconciliation, DomainError> {
    if new_items.is_empty() {
        return Err(DomainError::validation(
            "order must contain at least one line item",
        ));
    }

    let mut deltas = Vec::with_capacity(old_items.len() + new_items.len());
    for old in old_items {
        deltas.push(StockDelta::release(old.product_id, old.quantity));
    }

    let mut items = Vec::with_capacity(new_items.len());
    let mut total_amount = Money::ZERO;
    for &(product_id, quantity) in new_items {
        let unit_price = prices
            .unit_price(product_id)
            .ok_or(DomainError::NotFound)?;
        let item = LineItem::resolve(product_id, quantity, unit_price)?;
        total_amount = total_amount
            .checked_add(item.subtotal)
            .ok_or_else(|| DomainError::validation("order total overflow"))?;
        deltas.push(StockDelta::reserve(product_id, quantity));
        items.push(item);
    }

    Ok(Reconciliation {
        deltas,
        items,
        total_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_prices(entries: &[(ProductId, i64)]) -> HashMap<ProductId, Money> {
        entries
            .iter()
            .map(|&(id, price)| (id, Money::from_minor_units(price)))
            .collect()
    }

    fn test_line_item(product_id: ProductId, quantity: i64, price: i64) -> LineItem {
        LineItem::resolve(product_id, quantity, Money::from_minor_units(price)).unwrap()
    }

    #[test]
    fn new_order_emits_only_reserves() {
        let p1 = ProductId::new();
        let p2 = ProductId::new();
        let prices = test_prices(&[(p1, 100), (p2, 250)]);

        let out = reconcile(&[], &[(p1, 2), (p2, 1)], &prices).unwrap();

        assert_eq!(
            out.deltas,
            vec![StockDelta::reserve(p1, 2), StockDelta::reserve(p2, 1)]
        );
        assert_eq!(out.total_amount, Money::from_minor_units(450));
        assert_eq!(out.items.len(), 2);
        assert_eq!(out.items[0].subtotal, Money::from_minor_units(200));
    }

    #[test]
    fn update_releases_old_in_full_before_reserving_new() {
        let p1 = ProductId::new();
        let prices = test_prices(&[(p1, 100)]);
        let old = vec![test_line_item(p1, 2, 80)];

        let out = reconcile(&old, &[(p1, 3)], &prices).unwrap();

        // Same product appears as both a release and a reserve; never netted.
        assert_eq!(
            out.deltas,
            vec![StockDelta::release(p1, 2), StockDelta::reserve(p1, 3)]
        );
        // Price snapshot comes from the current price, not the old item.
        assert_eq!(out.items[0].unit_price, Money::from_minor_units(100));
        assert_eq!(out.total_amount, Money::from_minor_units(300));
    }

    #[test]
    fn rejects_empty_new_items() {
        let prices = test_prices(&[]);
        let err = reconcile(&[], &[], &prices).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let p1 = ProductId::new();
        let prices = test_prices(&[(p1, 100)]);
        let err = reconcile(&[], &[(p1, 0)], &prices).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn unknown_product_is_not_found() {
        let prices = test_prices(&[]);
        let err = reconcile(&[], &[(ProductId::new(), 1)], &prices).unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
    }

    #[test]
    fn duplicate_products_each_get_their_own_delta() {
        let p1 = ProductId::new();
        let prices = test_prices(&[(p1, 50)]);

        let out = reconcile(&[], &[(p1, 1), (p1, 2)], &prices).unwrap();

        assert_eq!(
            out.deltas,
            vec![StockDelta::reserve(p1, 1), StockDelta::reserve(p1, 2)]
        );
        assert_eq!(out.total_amount, Money::from_minor_units(150));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: release deltas mirror old quantities, reserve deltas
            /// mirror new quantities, and the total equals Σ price × quantity.
            #[test]
            fn deltas_and_totals_balance(
                old_quantities in proptest::collection::vec(1i64..100, 0..5),
                new_entries in proptest::collection::vec((1i64..100, 1i64..10_000), 1..5),
            ) {
                let old: Vec<LineItem> = old_quantities
                    .iter()
                    .map(|&q| test_line_item(ProductId::new(), q, 100))
                    .collect();
                let new: Vec<(ProductId, i64)> = new_entries
                    .iter()
                    .map(|&(q, _)| (ProductId::new(), q))
                    .collect();
                let prices: HashMap<ProductId, Money> = new
                    .iter()
                    .zip(&new_entries)
                    .map(|(&(id, _), &(_, price))| (id, Money::from_minor_units(price)))
                    .collect();

                let out = reconcile(&old, &new, &prices).unwrap();

                let released: i64 = out.deltas.iter().filter(|d| !d.is_reserve()).map(|d| d.quantity()).sum();
                let reserved: i64 = out.deltas.iter().filter(|d| d.is_reserve()).map(|d| d.quantity()).sum();
                prop_assert_eq!(released, old_quantities.iter().sum::<i64>());
                prop_assert_eq!(reserved, new.iter().map(|&(_, q)| q).sum::<i64>());

                let expected_total: i64 = new_entries.iter().map(|&(q, price)| q * price).sum();
                prop_assert_eq!(out.total_amount, Money::from_minor_units(expected_total));

                let item_total: Money = out.items.iter().map(|i| i.subtotal).sum();
                prop_assert_eq!(out.total_amount, item_total);
            }
        }
    }
}
