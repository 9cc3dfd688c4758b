//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Paise?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer paise (1 rupee = 100 paise)                     │
//! │    Intermediate bill math runs in exact decimals and is rounded        │
//! │    back to whole paise exactly once.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockbook_core::money::Money;
//!
//! let price = Money::from_paise(10_050); // ₹100.50
//! let total = price + Money::from_rupees(20);
//! assert_eq!(total.paise(), 12_050);
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise.
///
/// ## Design Decisions
/// - **i64 (signed)**: differences and refunds can be negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    ///
    /// ## Example
    /// ```rust
    /// use stockbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_paise(1099).paise(), 1099);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * 100)
    }

    /// Rounds an exact decimal rupee amount to whole paise.
    ///
    /// Midpoints round away from zero (₹0.005 → ₹0.01), the convention
    /// used on printed invoices. `None` when the amount does not fit in
    /// i64 paise.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use stockbook_core::money::Money;
    ///
    /// let amount = Decimal::new(180_005, 3); // 180.005 rupees
    /// assert_eq!(Money::from_decimal_rupees(amount).map(|m| m.paise()), Some(18_001));
    /// assert_eq!(Money::from_decimal_rupees(Decimal::MAX), None);
    /// ```
    pub fn from_decimal_rupees(rupees: Decimal) -> Option<Self> {
        rupees
            .checked_mul(Decimal::ONE_HUNDRED)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .map(Money)
    }

    /// Returns the exact rupee value as a decimal.
    #[inline]
    pub fn to_decimal_rupees(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    ///
    /// ## Example
    /// ```rust
    /// use stockbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_paise(1099).rupees(), 10);
    /// assert_eq!(Money::from_paise(-550).rupees(), -5);
    /// ```
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Addition that returns `None` instead of overflowing.
    #[inline]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(paise) => Some(Money(paise)),
            None => None,
        }
    }

    /// Subtraction that returns `None` instead of overflowing.
    #[inline]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(paise) => Some(Money(paise)),
            None => None,
        }
    }

    /// Sums amounts, `None` on overflow.
    ///
    /// ```rust
    /// use stockbook_core::money::Money;
    ///
    /// let fees = [Money::from_rupees(40), Money::from_rupees(10)];
    /// assert_eq!(Money::checked_sum(fees), Some(Money::from_rupees(50)));
    /// assert_eq!(Money::checked_sum([Money::from_paise(i64::MAX), Money::from_paise(1)]), None);
    /// ```
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount as `₹1234.50` (no digit grouping).
///
/// ## Note
/// For logs and debugging. Invoice printing formats amounts itself.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}₹{}.{:02}",
            sign,
            self.rupees().abs(),
            self.paise_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paise() {
        let money = Money::from_paise(1099);
        assert_eq!(money.paise(), 1099);
        assert_eq!(money.rupees(), 10);
        assert_eq!(money.paise_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_paise(1099).to_string(), "₹10.99");
        assert_eq!(Money::from_rupees(5).to_string(), "₹5.00");
        assert_eq!(Money::from_paise(-550).to_string(), "-₹5.50");
        assert_eq!(Money::zero().to_string(), "₹0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_paise(1000);
        let b = Money::from_paise(500);

        assert_eq!((a + b).paise(), 1500);
        assert_eq!((a - b).paise(), 500);
        assert_eq!((-a).paise(), -1000);
        assert_eq!(vec![a, b, b].into_iter().sum::<Money>().paise(), 2000);
    }

    #[test]
    fn test_decimal_round_trip() {
        let m = Money::from_paise(18_050);
        assert_eq!(m.to_decimal_rupees(), Decimal::new(18_050, 2));
        assert_eq!(Money::from_decimal_rupees(m.to_decimal_rupees()), Some(m));
    }

    #[test]
    fn test_midpoint_rounds_away_from_zero() {
        assert_eq!(Money::from_decimal_rupees(Decimal::new(5, 3)), Some(Money::from_paise(1)));
        assert_eq!(Money::from_decimal_rupees(Decimal::new(-5, 3)), Some(Money::from_paise(-1)));
        assert_eq!(Money::from_decimal_rupees(Decimal::new(4, 3)), Some(Money::zero()));
    }

    #[test]
    fn test_out_of_range_amounts() {
        // a rupee past the largest i64 paise value
        let beyond = Decimal::from(i64::MAX) / Decimal::ONE_HUNDRED + Decimal::ONE;
        assert_eq!(Money::from_decimal_rupees(beyond), None);
        assert_eq!(Money::from_decimal_rupees(Decimal::MAX), None);

        let max = Money::from_paise(i64::MAX);
        assert_eq!(max.checked_add(Money::from_paise(100)), None);
        assert_eq!(Money::from_paise(i64::MIN).checked_sub(Money::from_paise(1)), None);
        assert_eq!(max.checked_sub(Money::from_paise(1)), Some(Money::from_paise(i64::MAX - 1)));
    }
}
