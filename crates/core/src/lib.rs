//! `stockroom-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod money;
pub mod version;

pub use error::{DomainError, DomainResult};
pub use id::{OrderId, ProductId};
pub use money::Money;
pub use version::ExpectedVersion;
