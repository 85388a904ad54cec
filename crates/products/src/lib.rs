//! Product catalog and stock state.
//!
//! This crate contains the Product record and its pure state transitions
//! (no IO, no HTTP, no storage). The Stock Ledger in `stockroom-infra`
//! applies these transitions through a version-checked store.

pub mod product;

pub use product::Product;
