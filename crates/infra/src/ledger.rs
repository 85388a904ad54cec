//! Stock ledger: atomic reserve/release over a version-checked store.

use thiserror::Error;
use tracing::debug;

use stockroom_core::{DomainError, ExpectedVersion, ProductId};

use crate::store::{ProductStore, StoreError};

/// Stock mutation error.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The product does not exist (it may have been deleted concurrently).
    #[error("product {0} not found")]
    NotFound(ProductId),

    /// The reservation asked for more than is available. No side effects.
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// A concurrent writer committed between our read and write. No side
    /// effects; the caller should retry with freshly read state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request itself was malformed (e.g. non-positive quantity).
    #[error("invalid stock operation: {0}")]
    Invalid(String),

    /// The storage collaborator failed.
    #[error(transparent)]
    Storage(StoreError),
}

/// Per-product stock accounting with optimistic concurrency control.
///
/// Every mutation reads the current record, applies the pure transition from
/// `stockroom-products`, and commits with a compare-and-swap at the version
/// it read. No lock is held across multiple products; each product's entry
/// is independently serializable. Conflict retries are the caller's job;
/// the ledger re-reads fresh state on every call, so retrying is simply
/// calling again.
#[derive(Debug)]
pub struct StockLedger<S> {
    store: S,
}

impl<S> StockLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: ProductStore> StockLedger<S> {
    /// Atomically reserve `quantity` units of a product: check sufficiency,
    /// decrement available stock, bump the version.
    pub fn reserve(&self, product_id: ProductId, quantity: i64) -> Result<(), LedgerError> {
        let product = self
            .store
            .find_by_id(product_id)
            .map_err(LedgerError::Storage)?
            .ok_or(LedgerError::NotFound(product_id))?;

        let read_version = product.version();
        let updated = product.reserved(quantity).map_err(map_domain)?;
        self.store
            .save(updated, ExpectedVersion::Exact(read_version))
            .map_err(map_store)?;

        debug!(%product_id, quantity, "stock reserved");
        Ok(())
    }

    /// Release `quantity` units back to a product. Never fails for
    /// insufficient stock; releasing restores previously reserved units.
    pub fn release(&self, product_id: ProductId, quantity: i64) -> Result<(), LedgerError> {
        let product = self
            .store
            .find_by_id(product_id)
            .map_err(LedgerError::Storage)?
            .ok_or(LedgerError::NotFound(product_id))?;

        let read_version = product.version();
        let updated = product.released(quantity).map_err(map_domain)?;
        self.store
            .save(updated, ExpectedVersion::Exact(read_version))
            .map_err(map_store)?;

        debug!(%product_id, quantity, "stock released");
        Ok(())
    }

    /// Read-only probe of a product's current availability.
    pub fn available(&self, product_id: ProductId) -> Result<i64, LedgerError> {
        let product = self
            .store
            .find_by_id(product_id)
            .map_err(LedgerError::Storage)?
            .ok_or(LedgerError::NotFound(product_id))?;
        Ok(product.available())
    }
}

fn map_domain(err: DomainError) -> LedgerError {
    match err {
        DomainError::InsufficientStock {
            product_id,
            requested,
            available,
        } => LedgerError::InsufficientStock {
            product_id,
            requested,
            available,
        },
        DomainError::Conflict(msg) => LedgerError::Conflict(msg),
        other => LedgerError::Invalid(other.to_string()),
    }
}

fn map_store(err: StoreError) -> LedgerError {
    match err {
        StoreError::Conflict(msg) => LedgerError::Conflict(msg),
        other => LedgerError::Storage(other),
    }
}
