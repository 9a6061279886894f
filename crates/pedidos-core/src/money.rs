//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                         │
//! │                                                                     │
//! │  In floating point:                                                 │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                       │
//! │                                                                     │
//! │  Monetary values here are integer cents instead: every derived      │
//! │  quantity is already exact at 2 decimals, and the single lossy      │
//! │  step (decimal → cents) happens once at the boundary with half-up   │
//! │  rounding.                                                          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use pedidos_core::money::Money;
//!
//! let price = Money::from_cents(1099); // S/ 10.99
//! let total = price * 3;               // S/ 32.97
//! assert_eq!(total.cents(), 3297);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents (céntimos of a sol).
///
/// ## Design Decisions
/// - **i64 (signed)**: the outstanding balance may be negative to reveal
///   overpayment in per-order detail views
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Derives**: full serde support for JSON serialization
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a decimal currency amount (e.g. `10.99` from a JSON body)
    /// to cents, rounding half-up to 2 decimal places.
    ///
    /// This is the ONE place where floating point enters the money path.
    /// Call it at the boundary, never inside domain math.
    ///
    /// ## Example
    /// ```rust
    /// use pedidos_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(10.99).cents(), 1099);
    /// assert_eq!(Money::from_decimal(0.005).cents(), 1);
    /// assert_eq!(Money::from_decimal(0.0).cents(), 0);
    /// ```
    pub fn from_decimal(value: f64) -> Self {
        // f64::round is half-away-from-zero, which is half-up for the
        // non-negative amounts accepted at the boundary.
        Money((value * 100.0).round() as i64)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the value as a 2-decimal currency number for responses.
    #[inline]
    pub fn as_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
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

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a line quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Computes a percentage of this amount, half-up.
    ///
    /// ## Arguments
    /// * `bps` - percentage in basis points (1 bps = 0.01%; 1000 = 10%)
    ///
    /// ## Implementation
    /// Integer math in i128 to avoid overflow: `(cents * bps + 5000) / 10000`.
    /// The +5000 provides half-up rounding at the derived quantity, matching
    /// the round-at-every-step behavior of the stored-then-recomputed totals.
    ///
    /// ## Example
    /// ```rust
    /// use pedidos_core::money::Money;
    ///
    /// let subtotal = Money::from_cents(10000); // S/ 100.00
    /// assert_eq!(subtotal.percentage(1000).cents(), 1000); // 10% = S/ 10.00
    /// assert_eq!(Money::from_cents(999).percentage(3333).cents(), 333);
    /// ```
    pub fn percentage(&self, bps: u32) -> Money {
        let part = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money(part as i64)
    }

    /// Clamps this value to the inclusive range `[lo, hi]`.
    #[inline]
    pub fn clamp_range(&self, lo: Money, hi: Money) -> Money {
        Money(self.0.clamp(lo.0, hi.0))
    }

    /// Floors at zero. Used by aggregate report contexts where the
    /// outstanding balance must never display as negative.
    #[inline]
    pub const fn floor_zero(&self) -> Money {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in soles for debugging.
///
/// ## Note
/// This is for logs and diagnostics. Responses carry plain 2-decimal numbers
/// via [`Money::as_decimal`].
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}S/ {}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
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

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
