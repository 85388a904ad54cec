//! Order domain module.
//!
//! This crate contains the order model and the line-item reconciler,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage). The transaction coordinator in `stockroom-infra` drives the
//! reconciler's output through the Stock Ledger.

pub mod order;
pub mod reconcile;

pub use order::{ItemRequest, LineItem, Order, OrderIntent, OrderStatus, ProductRef};
pub use reconcile::{reconcile, PriceSource, Reconciliation, StockDelta};
