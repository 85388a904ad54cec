//! Order transaction coordinator.
//!
//! Drives create/update/delete as an all-or-nothing unit across the
//! reconciler and the stock ledger. Each operation moves through the same
//! lifecycle: validate the intent, resolve products, reconcile line items,
//! apply reserve deltas (sorted by product id, conflict-retried), apply
//! release deltas, then commit the order record. A failure while reserving
//! rolls back every reservation applied in the same call.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use stockroom_core::{DomainError, Money, OrderId, ProductId};
use stockroom_orders::{reconcile, Order, OrderIntent, ProductRef, StockDelta};

use crate::ledger::{LedgerError, StockLedger};
use crate::store::{OrderStore, ProductStore, StoreError};

/// Error surfaced to callers of the coordinator.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("product not found: {0}")]
    ProductNotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// Concurrent modification persisted through the bounded retries.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage unavailable: {0}")]
    Storage(String),
}

impl From<LedgerError> for OrderError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::NotFound(id) => OrderError::ProductNotFound(format!("id {id}")),
            LedgerError::InsufficientStock {
                product_id,
                requested,
                available,
            } => OrderError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            LedgerError::Conflict(msg) => OrderError::Conflict(msg),
            LedgerError::Invalid(msg) => OrderError::Validation(msg),
            LedgerError::Storage(e) => OrderError::Storage(e.to_string()),
        }
    }
}

impl From<StoreError> for OrderError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => OrderError::Conflict(msg),
            other => OrderError::Storage(other.to_string()),
        }
    }
}

impl From<DomainError> for OrderError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                OrderError::Validation(msg)
            }
            DomainError::NotFound => {
                OrderError::ProductNotFound("product disappeared during reconciliation".to_string())
            }
            DomainError::InsufficientStock {
                product_id,
                requested,
                available,
            } => OrderError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            DomainError::Conflict(msg) => OrderError::Conflict(msg),
        }
    }
}

/// Bounded retry with exponential backoff for conflict-prone ledger calls.
#[derive(Debug, Copy, Clone)]
pub struct RetryPolicy {
    /// Total attempts per ledger mutation (first try included).
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles per further attempt.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(10),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Orchestrates order create/update/delete against the ledger and stores.
///
/// Reserve deltas are applied in product-id order so concurrent operations
/// over overlapping products contend in a fixed order. Conflicts are retried
/// per `RetryPolicy` and surfaced once the attempts are exhausted, never
/// silently dropped.
///
/// On update, new reservations are applied before the old items' stock is
/// released: a failed update leaves the prior reservation fully intact and
/// the order unmodified. The cost is that an update briefly holds old + new
/// quantities for overlapping products, so it can fail with
/// `InsufficientStock` even when the net change would have fit.
///
/// Per-order operations are not mutually serialized: two concurrent
/// deletes (or a delete racing an update) of the same order can both load
/// the record before either removes it and release its stock twice. Callers
/// that mutate the same order from multiple threads must serialize those
/// calls themselves.
///
/// There is no distributed transaction spanning the ledger and order
/// persistence. Persist failures are compensated best-effort; a crash
/// between "reservations committed" and "order persisted" leaves stock
/// reserved with no corresponding order, which an external audit pass must
/// remediate.
#[derive(Debug)]
pub struct OrderCoordinator<P, O> {
    products: P,
    orders: O,
    ledger: StockLedger<P>,
    retry: RetryPolicy,
}

impl<P, O> OrderCoordinator<P, O>
where
    P: ProductStore + Clone,
    O: OrderStore,
{
    pub fn new(products: P, orders: O) -> Self {
        let ledger = StockLedger::new(products.clone());
        Self {
            products,
            orders,
            ledger,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Create an order from an intent: resolve products, reserve stock,
    /// persist the order with snapshotted prices and computed total.
    pub fn create_order(&self, intent: &OrderIntent) -> Result<Order, OrderError> {
        intent.validate()?;
        let (requests, prices) = self.resolve_products(intent)?;
        let outcome = reconcile(&[], &requests, &prices)?;

        let reserved = self.apply_reserves(&outcome.deltas)?;

        let order = match Order::new(outcome.items, intent) {
            Ok(order) => order,
            Err(e) => {
                self.roll_back_reserves(&reserved);
                return Err(e.into());
            }
        };
        if let Err(e) = self.orders.save(order.clone()) {
            self.roll_back_reserves(&reserved);
            return Err(e.into());
        }

        info!(order_id = %order.id(), total = %order.total_amount(), "order created");
        Ok(order)
    }

    /// Replace an order's line items and fields with a new intent.
    ///
    /// New stock is reserved first; the old items' reservations are released
    /// only after every new reservation committed, so a failed update leaves
    /// the previous state untouched.
    pub fn update_order(&self, order_id: OrderId, intent: &OrderIntent) -> Result<Order, OrderError> {
        intent.validate()?;
        let existing = self
            .orders
            .find_by_id(order_id)?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        let (requests, prices) = self.resolve_products(intent)?;
        let outcome = reconcile(existing.items(), &requests, &prices)?;

        let reserved = self.apply_reserves(&outcome.deltas)?;
        let released = match self.apply_releases(&outcome.deltas) {
            Ok(released) => released,
            Err((released, e)) => {
                self.roll_back_reserves(&reserved);
                self.roll_back_releases(&released);
                return Err(e);
            }
        };

        let updated = match existing.replaced(outcome.items, intent) {
            Ok(updated) => updated,
            Err(e) => {
                self.roll_back_reserves(&reserved);
                self.roll_back_releases(&released);
                return Err(e.into());
            }
        };
        if let Err(e) = self.orders.save(updated.clone()) {
            self.roll_back_reserves(&reserved);
            self.roll_back_releases(&released);
            return Err(e.into());
        }

        info!(order_id = %updated.id(), total = %updated.total_amount(), "order updated");
        Ok(updated)
    }

    /// Delete an order, releasing every line item's reserved stock first.
    ///
    /// Products that no longer exist are skipped: their deletion must not
    /// block deleting the order.
    pub fn delete_order(&self, order_id: OrderId) -> Result<(), OrderError> {
        let existing = self
            .orders
            .find_by_id(order_id)?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        let mut releases: Vec<(ProductId, i64)> = existing
            .items()
            .iter()
            .map(|item| (item.product_id, item.quantity))
            .collect();
        releases.sort_by_key(|&(id, _)| id);

        for (product_id, quantity) in releases {
            self.release_with_retry(product_id, quantity)?;
        }

        self.orders.delete(order_id)?;
        info!(%order_id, "order deleted");
        Ok(())
    }

    /// Resolve every item reference to a product id and snapshot prices.
    fn resolve_products(
        &self,
        intent: &OrderIntent,
    ) -> Result<(Vec<(ProductId, i64)>, HashMap<ProductId, Money>), OrderError> {
        let mut requests = Vec::with_capacity(intent.items.len());
        let mut prices = HashMap::new();
        for item in &intent.items {
            let product = match &item.product {
                ProductRef::Id(id) => self.products.find_by_id(*id)?,
                ProductRef::Name(name) => self.products.find_by_name(name)?,
            }
            .ok_or_else(|| OrderError::ProductNotFound(item.product.to_string()))?;

            prices.insert(product.id(), product.unit_price());
            requests.push((product.id(), item.quantity));
        }
        Ok((requests, prices))
    }

    /// Apply the reserve deltas in product-id order, rolling back every
    /// reservation applied in this call if one fails. Returns the applied
    /// reservations for later compensation.
    fn apply_reserves(&self, deltas: &[StockDelta]) -> Result<Vec<(ProductId, i64)>, OrderError> {
        let mut reserves: Vec<&StockDelta> = deltas.iter().filter(|d| d.is_reserve()).collect();
        reserves.sort_by_key(|d| d.product_id);

        let mut applied: Vec<(ProductId, i64)> = Vec::with_capacity(reserves.len());
        for delta in reserves {
            match self.reserve_with_retry(delta.product_id, delta.quantity()) {
                Ok(()) => applied.push((delta.product_id, delta.quantity())),
                Err(e) => {
                    self.roll_back_reserves(&applied);
                    return Err(e);
                }
            }
        }
        Ok(applied)
    }

    /// Apply the release deltas in product-id order. Missing products are
    /// skipped (explicit policy); on any other failure, the releases already
    /// applied are returned alongside the error for compensation.
    #[allow(clippy::type_complexity)]
    fn apply_releases(
        &self,
        deltas: &[StockDelta],
    ) -> Result<Vec<(ProductId, i64)>, (Vec<(ProductId, i64)>, OrderError)> {
        let mut releases: Vec<&StockDelta> = deltas.iter().filter(|d| !d.is_reserve()).collect();
        releases.sort_by_key(|d| d.product_id);

        let mut applied: Vec<(ProductId, i64)> = Vec::with_capacity(releases.len());
        for delta in releases {
            match self.release_with_retry(delta.product_id, delta.quantity()) {
                Ok(()) => applied.push((delta.product_id, delta.quantity())),
                Err(e) => return Err((applied, e)),
            }
        }
        Ok(applied)
    }

    fn reserve_with_retry(&self, product_id: ProductId, quantity: i64) -> Result<(), OrderError> {
        let mut attempt = 1;
        loop {
            match self.ledger.reserve(product_id, quantity) {
                Err(LedgerError::Conflict(msg)) if attempt < self.retry.max_attempts => {
                    warn!(%product_id, attempt, "reservation conflict, retrying: {msg}");
                    thread::sleep(self.retry.backoff(attempt));
                    attempt += 1;
                }
                other => return other.map_err(OrderError::from),
            }
        }
    }

    fn release_with_retry(&self, product_id: ProductId, quantity: i64) -> Result<(), OrderError> {
        let mut attempt = 1;
        loop {
            match self.ledger.release(product_id, quantity) {
                Err(LedgerError::Conflict(msg)) if attempt < self.retry.max_attempts => {
                    warn!(%product_id, attempt, "release conflict, retrying: {msg}");
                    thread::sleep(self.retry.backoff(attempt));
                    attempt += 1;
                }
                Err(LedgerError::NotFound(_)) => {
                    // Product deleted out from under the order; its stock no
                    // longer exists to restore.
                    warn!(%product_id, quantity, "skipping release of missing product");
                    return Ok(());
                }
                other => return other.map_err(OrderError::from),
            }
        }
    }

    /// Best-effort compensation: release reservations applied earlier in a
    /// failed call. A release that itself fails is logged and left to the
    /// external audit pass.
    fn roll_back_reserves(&self, applied: &[(ProductId, i64)]) {
        for &(product_id, quantity) in applied {
            if let Err(e) = self.release_with_retry(product_id, quantity) {
                error!(%product_id, quantity, "rollback release failed: {e}");
            }
        }
    }

    /// Best-effort compensation: re-reserve stock released earlier in a
    /// failed call.
    fn roll_back_releases(&self, applied: &[(ProductId, i64)]) {
        for &(product_id, quantity) in applied {
            if let Err(e) = self.reserve_with_retry(product_id, quantity) {
                error!(%product_id, quantity, "rollback re-reserve failed: {e}");
            }
        }
    }
}
