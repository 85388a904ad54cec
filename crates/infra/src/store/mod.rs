//! Storage boundary for products and orders.
//!
//! This module defines the infrastructure-facing abstraction the core works
//! against without making any storage assumptions. Product writes are
//! compare-and-swap on the record version; order writes are plain saves.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::{InMemoryOrderStore, InMemoryProductStore};
pub use r#trait::{OrderStore, ProductStore, StoreError};
