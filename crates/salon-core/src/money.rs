//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Paise?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  A billing page that keeps totals in JS numbers:                        │
//! │    650 × 0.18 = 117.00000000000001                                      │
//! │    (10% of 333.33) + (18% of ...) drifts by a paisa here and there      │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise + Round-Half-Up                            │
//! │    65000 paise × 1800 bps / 10000 = 11700 paise, exactly                │
//! │    Every rounding step is explicit and happens once                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use salon_core::money::Money;
//!
//! let price = Money::from_paise(50_000); // ₹500.00
//! let doubled = price * 2;
//! let total = price + Money::from_paise(10_000);
//! assert_eq!(doubled.paise(), 100_000);
//! assert_eq!(total.paise(), 60_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;
use crate::BPS_SCALE;

// =============================================================================
// Rounding
// =============================================================================

/// Divides `numerator / denominator`, rounding halves away from zero.
///
/// `denominator` must be positive. For the non-negative amounts the engine
/// deals in this is plain round-half-up: 0.5 → 1, 1.5 → 2, 2.5 → 3.
pub(crate) fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    debug_assert!(denominator > 0);
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        -((-numerator + half) / denominator)
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in paise (1/100 of a rupee).
///
/// ## Design Decisions
/// - **i64 (signed)**: subtraction never wraps; negative results are caught
///   by the pricing engine rather than hidden by unsigned underflow
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serializes as a bare integer**: `{"finalAmount": 76700}`
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Catalog price ──► LineItem.unit_price ──► line total                   │
/// │                                               │                         │
/// │                     services / products subtotal                        │
/// │                                               │                         │
/// │                     discount or coupon ──► taxable ──► tax ──► final    │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    ///
    /// ```rust
    /// use salon_core::money::Money;
    ///
    /// let price = Money::from_paise(1099); // ₹10.99
    /// assert_eq!(price.paise(), 1099);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    ///
    /// ```rust
    /// use salon_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupees(500).paise(), 50_000);
    /// ```
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * 100)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
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

    /// Calculates tax at `rate`, rounding half-up to the paisa.
    ///
    /// ## Implementation
    /// Integer math only: `(amount * bps + 5000) / 10000`.
    ///
    /// ```rust
    /// use salon_core::money::Money;
    /// use salon_core::types::TaxRate;
    ///
    /// let taxable = Money::from_paise(1050);      // ₹10.50
    /// let tax = taxable.calculate_tax(TaxRate::from_bps(500)); // 5%
    /// // ₹0.525 → rounds half-up to ₹0.53
    /// assert_eq!(tax.paise(), 53);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        self.percent_bps(rate.bps() as i64)
    }

    /// Returns `bps / 10000` of this amount, rounded half-up.
    ///
    /// Used for percent discounts, percent coupons and tax so that all three
    /// follow the same rounding rule.
    pub fn percent_bps(&self, bps: i64) -> Money {
        // i128 prevents overflow on large amounts
        let scaled = div_round_half_up(self.0 as i128 * bps as i128, BPS_SCALE as i128);
        Money(scaled as i64)
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    ///
    /// ```rust
    /// use salon_core::money::Money;
    ///
    /// let line = Money::from_paise(10_000).checked_multiply_quantity(2);
    /// assert_eq!(line, Some(Money::from_paise(20_000)));
    /// assert_eq!(Money::from_paise(i64::MAX).checked_multiply_quantity(2), None);
    /// ```
    #[inline]
    pub fn checked_multiply_quantity(&self, qty: i64) -> Option<Money> {
        self.0.checked_mul(qty).map(Money)
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Human-readable rupee format, for logs and warning messages.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
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
