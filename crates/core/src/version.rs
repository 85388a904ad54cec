//! Optimistic concurrency primitives.

use crate::error::{DomainError, DomainResult};

/// Version expectation for a compare-and-swap write.
///
/// Every mutable record carries a monotonically increasing version. Writers
/// read the current version, compute the new state, and commit only if the
/// version is unchanged; a mismatch means a concurrent writer got there
/// first and the caller must re-read and retry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (useful for seeding and migrations).
    Any,
    /// Require the record to be at an exact version. `Exact(0)` expects the
    /// record to not exist yet.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}
