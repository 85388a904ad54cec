//! `stockroom-infra` — storage seam, stock ledger, and the order
//! transaction coordinator.
//!
//! Domain crates stay pure; everything that reads or writes state lives
//! here, behind the `ProductStore`/`OrderStore` traits.

pub mod coordinator;
pub mod ledger;
pub mod store;


pub use coordinator::{OrderCoordinator, OrderError, RetryPolicy};
pub use ledger::{LedgerError, StockLedger};
pub use store::{InMemoryOrderStore, InMemoryProductStore, OrderStore, ProductStore, StoreError};
