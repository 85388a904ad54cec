//! Fixed-point money amounts.
//!
//! Monetary values are carried as signed 64-bit counts of the smallest
//! currency unit (e.g. cents). Floating point is never used for money.

use serde::{Deserialize, Serialize};

/// An amount of money in minor currency units.
///
/// `Money` is a value object: immutable, compared by value, cheap to copy.
/// Arithmetic is checked; callers decide how to surface overflow (in this
/// domain it is a validation failure, never a wrap).
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor_units(units: i64) -> Self {
        Self(units)
    }

    pub const fn minor_units(self) -> i64 {
        self.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Multiply a unit price by a quantity, `None` on overflow.
    pub fn checked_mul(self, quantity: i64) -> Option<Money> {
        self.0.checked_mul(quantity).map(Money)
    }

    /// Sum two amounts, `None` on overflow.
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }
}

impl core::fmt::Display for Money {
    /// Render as major.minor (two minor digits), e.g. `1250` → `12.50`.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl core::iter::Sum for Money {
    /// Unchecked sum, for contexts that have already validated bounds.
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        Money(iter.map(|m| m.0).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_mul_guards_overflow() {
        assert_eq!(
            Money::from_minor_units(250).checked_mul(4),
            Some(Money::from_minor_units(1000))
        );
        assert_eq!(Money::from_minor_units(i64::MAX).checked_mul(2), None);
    }

    #[test]
    fn checked_add_guards_overflow() {
        assert_eq!(
            Money::from_minor_units(1).checked_add(Money::from_minor_units(2)),
            Some(Money::from_minor_units(3))
        );
        assert_eq!(
            Money::from_minor_units(i64::MAX).checked_add(Money::from_minor_units(1)),
            None
        );
    }

    #[test]
    fn displays_in_major_units() {
        assert_eq!(Money::from_minor_units(1250).to_string(), "12.50");
        assert_eq!(Money::from_minor_units(5).to_string(), "0.05");
        assert_eq!(Money::from_minor_units(-1999).to_string(), "-19.99");
    }
}
