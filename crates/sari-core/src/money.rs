//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Minor Units                                      │
//! │    Every amount is an i64 in the currency's smallest unit.             │
//! │    Rupiah has no subunit in practice, so Rp95.000 is simply 95000.     │
//! │    Percentage math rounds once, explicitly, and nowhere else.          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use sari_core::money::Money;
//!
//! let price = Money::new(50_000);
//! let line_total = price * 2;
//! assert_eq!(line_total.amount(), 100_000);
//!
//! // 10% of 100_000
//! assert_eq!(line_total.percentage(10).amount(), 10_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for losses and deltas
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support (serializes as a bare number) and
///   `sqlx(transparent)` so the database sees a plain INTEGER
///
/// EVERY monetary value in the system flows through this type:
/// product prices, sale subtotals, voucher discounts, fees, expenses.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS, Default,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor currency units.
    ///
    /// ## Example
    /// ```rust
    /// use sari_core::money::Money;
    ///
    /// let price = Money::new(95_000);
    /// assert_eq!(price.amount(), 95_000);
    /// ```
    #[inline]
    pub const fn new(amount: i64) -> Self {
        Money(amount)
    }

    /// Returns the value in minor currency units.
    #[inline]
    pub const fn amount(&self) -> i64 {
        self.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
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

    /// Computes a whole-number percentage of this amount, rounded to the
    /// nearest unit.
    ///
    /// ## Implementation
    /// Integer math throughout: `(amount * pct + 50) / 100`.
    /// The +50 provides round-half-up (50/100 = 0.5). i128 intermediate
    /// prevents overflow on large amounts.
    ///
    /// ## Example
    /// ```rust
    /// use sari_core::money::Money;
    ///
    /// let subtotal = Money::new(100_000);
    /// assert_eq!(subtotal.percentage(10).amount(), 10_000);
    ///
    /// // Rounding: 15% of 333 = 49.95 → 50
    /// assert_eq!(Money::new(333).percentage(15).amount(), 50);
    /// ```
    pub fn percentage(&self, pct: i64) -> Money {
        let raw = (self.0 as i128 * pct as i128 + 50) / 100;
        Money(raw as i64)
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use sari_core::money::Money;
    ///
    /// let unit_price = Money::new(25_000);
    /// assert_eq!(unit_price.multiply_quantity(3).amount(), 75_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Subtracts `other`, flooring the result at zero.
    ///
    /// Used for `max(0, subtotal - discount)`: a fixed voucher larger than
    /// the subtotal discounts the goods to zero, never below.
    ///
    /// ## Example
    /// ```rust
    /// use sari_core::money::Money;
    ///
    /// let subtotal = Money::new(100_000);
    /// let discount = Money::new(150_000);
    /// assert_eq!(subtotal.saturating_sub_floor_zero(discount), Money::zero());
    /// ```
    #[inline]
    pub fn saturating_sub_floor_zero(&self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for debugging and logs. The web layer formats amounts with
/// locale-aware separators for actual UI display.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rp{}", self.0)
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// Summation over an iterator of Money (for subtotals).
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_amount() {
        let money = Money::new(95_000);
        assert_eq!(money.amount(), 95_000);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::new(95_000)), "Rp95000");
        assert_eq!(format!("{}", Money::new(-550)), "Rp-550");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::new(1_000);
        let b = Money::new(500);

        assert_eq!((a + b).amount(), 1_500);
        assert_eq!((a - b).amount(), 500);
        assert_eq!((a * 3).amount(), 3_000);
    }

    #[test]
    fn test_percentage_exact() {
        // 10% of 100_000 = 10_000, no rounding involved
        assert_eq!(Money::new(100_000).percentage(10).amount(), 10_000);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // 15% of 333 = 49.95 → 50
        assert_eq!(Money::new(333).percentage(15).amount(), 50);
        // 25% of 2 = 0.5 → 1
        assert_eq!(Money::new(2).percentage(25).amount(), 1);
    }

    #[test]
    fn test_saturating_sub_floor_zero() {
        let subtotal = Money::new(100_000);
        assert_eq!(
            subtotal.saturating_sub_floor_zero(Money::new(30_000)).amount(),
            70_000
        );
        assert_eq!(
            subtotal.saturating_sub_floor_zero(Money::new(150_000)),
            Money::zero()
        );
    }

    #[test]
    fn test_sum() {
        let total: Money = [Money::new(100), Money::new(200), Money::new(300)]
            .into_iter()
            .sum();
        assert_eq!(total.amount(), 600);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        assert!(Money::new(100).is_positive());
        assert!(Money::new(-100).is_negative());
        assert_eq!(Money::new(-100).abs().amount(), 100);
    }
}
