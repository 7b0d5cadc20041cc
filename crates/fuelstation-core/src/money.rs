//! # Money Module
//!
//! Provides the `Money` and `Litres` types for handling amounts and fuel
//! quantities exactly.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    50.0 L × Rs. 289.50 summed over a month of sales drifts by paisas   │
//! │    and the P&L no longer matches the shift cash counts.                │
//! │                                                                         │
//! │  OUR SOLUTION: rust_decimal                                             │
//! │    Litres are exact decimals (50.125 L stays 50.125 L)                 │
//! │    Money is an exact decimal rounded ONCE, to 2 dp, half-up            │
//! │    Sums of Money never round again → no drift across aggregation       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use fuelstation_core::money::{Litres, Money};
//! use rust_decimal::Decimal;
//!
//! let price = Money::from_cents(28950); // Rs. 289.50
//! let quantity = Litres::new(Decimal::new(500, 1)); // 50.0 L
//!
//! let base = price.times_quantity(quantity).unwrap();
//! assert_eq!(base, Money::from_cents(1_447_500));
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use crate::types::TaxRate;

/// Decimal places every monetary value is normalised to.
pub const MONEY_DECIMAL_PLACES: u32 = 2;

/// Currency symbol used by `Display`.
pub const CURRENCY_SYMBOL: &str = "Rs.";

/// Rounds half away from zero to `dp` places and pins the scale, so
/// `14475` becomes `14475.00`.
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(dp);
    rounded
}

/// `numerator / denominator * 100`, rounded to 2 dp.
///
/// Returns `None` when the denominator is zero: a ratio over nothing is
/// undefined, not zero.
pub fn percentage_ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    let ratio = numerator
        .checked_div(denominator)?
        .checked_mul(Decimal::ONE_HUNDRED)?;
    Some(round_half_up(ratio, 2))
}

// =============================================================================
// Money Type
// =============================================================================

/// A rupee amount, always held at exactly two decimal places.
///
/// ## Design Decisions
/// - **Decimal, not f64**: no binary rounding drift
/// - **Rounded on construction**: `Money::round` is the single rounding point
/// - **Signed**: variances and shortages are negative amounts
///
/// ## User Workflow Context
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                    Where Money is Used                                  │
/// │                                                                         │
/// │  FuelType.unit_price ──► compute_sale ──► Sale.base/tax/total_amount   │
/// │                                                │                        │
/// │                                                ├──► Shift expected cash │
/// │                                                ├──► P&L revenue         │
/// │                                                └──► Customer balance    │
/// │                                                                         │
/// │  EVERY monetary value in the system flows through this type            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Rounds an arbitrary decimal to a Money value (2 dp, half-up).
    ///
    /// ## Example
    /// ```rust
    /// use fuelstation_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(Money::round(Decimal::new(2460_75, 2)), Money::from_cents(246075));
    /// assert_eq!(Money::round(Decimal::new(1005, 3)), Money::from_cents(101)); // 1.005 → 1.01
    /// ```
    pub fn round(value: Decimal) -> Self {
        Money(round_half_up(value, MONEY_DECIMAL_PLACES))
    }

    /// Creates a Money value from paisas (the smallest currency unit).
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, MONEY_DECIMAL_PLACES))
    }

    /// Creates a Money value from whole rupees.
    pub fn from_major(rupees: i64) -> Self {
        Money::round(Decimal::from(rupees))
    }

    /// Returns the underlying decimal (always scale 2).
    #[inline]
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns the absolute value.
    #[inline]
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Floors the value at zero.
    #[inline]
    pub fn clamp_non_negative(self) -> Self {
        if self.is_negative() {
            Money::zero()
        } else {
            self
        }
    }

    /// `self × quantity`, rounded half-up. `None` on decimal overflow.
    pub fn times_quantity(&self, quantity: Litres) -> Option<Money> {
        self.0.checked_mul(quantity.value()).map(Money::round)
    }

    /// `self + other`. `None` on decimal overflow.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Applies a percentage rate: `self × pct / 100`, rounded half-up.
    /// `None` on decimal overflow.
    ///
    /// ## Example
    /// ```rust
    /// use fuelstation_core::money::Money;
    /// use fuelstation_core::types::TaxRate;
    /// use rust_decimal::Decimal;
    ///
    /// let base = Money::from_cents(1_447_500);         // Rs. 14,475.00
    /// let rate = TaxRate::from_percentage(Decimal::from(17));
    /// assert_eq!(base.percentage_of(rate), Some(Money::from_cents(246_075))); // Rs. 2,460.75
    /// ```
    pub fn percentage_of(&self, rate: TaxRate) -> Option<Money> {
        self.0
            .checked_mul(rate.percentage())
            .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
            .map(Money::round)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders `Rs. 1,000.50`; negatives as `-Rs. 5.50`.
///
/// ## Note
/// For debugging and logs. Report layouts are the renderer's job.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let digits = format!("{:.2}", self.0.abs());
        let (whole, frac) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));
        write!(
            f,
            "{}{} {}.{}",
            sign,
            CURRENCY_SYMBOL,
            group_thousands(whole),
            frac
        )
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money::round(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
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
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Litres Type
// =============================================================================

/// A fuel quantity in litres. Exact as entered, never rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Litres(Decimal);

impl Litres {
    #[inline]
    pub const fn new(value: Decimal) -> Self {
        Litres(value)
    }

    #[inline]
    pub const fn zero() -> Self {
        Litres(Decimal::ZERO)
    }

    #[inline]
    pub fn value(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }
}

impl fmt::Display for Litres {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} L", self.0)
    }
}

impl Default for Litres {
    fn default() -> Self {
        Litres::zero()
    }
}

impl Add for Litres {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Litres(self.0 + other.0)
    }
}

impl Sub for Litres {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Litres(self.0 - other.0)
    }
}

impl Sum for Litres {
    fn sum<I: Iterator<Item = Litres>>(iter: I) -> Self {
        iter.fold(Litres::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_half_up() {
        assert_eq!(Money::round(dec!(0.005)).amount(), dec!(0.01));
        assert_eq!(Money::round(dec!(0.004)).amount(), dec!(0.00));
        assert_eq!(Money::round(dec!(2.675)).amount(), dec!(2.68));
        // Half away from zero on the negative side too
        assert_eq!(Money::round(dec!(-2.675)).amount(), dec!(-2.68));
    }

    #[test]
    fn test_scale_is_pinned_to_two_places() {
        assert_eq!(Money::from_major(14475).amount().to_string(), "14475.00");
        assert_eq!(Money::round(dec!(1.5)).amount().to_string(), "1.50");
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(100_050).to_string(), "Rs. 1,000.50");
        assert_eq!(Money::from_cents(500).to_string(), "Rs. 5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-Rs. 5.50");
        assert_eq!(Money::zero().to_string(), "Rs. 0.00");
        assert_eq!(Money::from_major(1_234_567).to_string(), "Rs. 1,234,567.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!(a + b, Money::from_cents(1500));
        assert_eq!(a - b, Money::from_cents(500));
        assert_eq!(b - a, Money::from_cents(-500));
        assert_eq!(-a, Money::from_cents(-1000));

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total, Money::from_cents(2000));
    }

    #[test]
    fn test_percentage_of() {
        let amount = Money::from_cents(1000);
        let rate = TaxRate::from_bps(825);
        // 10.00 × 8.25% = 0.825 → 0.83
        assert_eq!(amount.percentage_of(rate), Some(Money::from_cents(83)));

        let huge = Money::round(Decimal::MAX);
        assert_eq!(huge.percentage_of(TaxRate::from_percentage(Decimal::from(17))), None);
        assert_eq!(huge.checked_add(huge), None);
    }

    #[test]
    fn test_times_quantity() {
        let price = Money::from_cents(28950);
        let base = price.times_quantity(Litres::new(dec!(50.0))).unwrap();
        assert_eq!(base, Money::from_major(14475));

        // 3.333 L × 289.50 = 964.9035 → 964.90
        let base = price.times_quantity(Litres::new(dec!(3.333))).unwrap();
        assert_eq!(base, Money::from_cents(96490));
    }

    #[test]
    fn test_percentage_ratio() {
        assert_eq!(percentage_ratio(dec!(1), dec!(3)), Some(dec!(33.33)));
        assert_eq!(percentage_ratio(dec!(480000), dec!(500000)), Some(dec!(96.00)));
        assert_eq!(percentage_ratio(dec!(10), dec!(0)), None);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Money::from_cents(1_693_575)).unwrap();
        assert_eq!(json, "\"16935.75\"");

        let back: Money = serde_json::from_str("\"16935.75\"").unwrap();
        assert_eq!(back, Money::from_cents(1_693_575));

        // Over-precise input is rounded on the way in
        let rounded: Money = serde_json::from_str("\"1.005\"").unwrap();
        assert_eq!(rounded, Money::from_cents(101));
    }

    #[test]
    fn test_litres_arithmetic() {
        let a = Litres::new(dec!(25000));
        let b = Litres::new(dec!(50.125));
        assert_eq!((a - b) + b, a);
        assert_eq!(b.to_string(), "50.125 L");
        let total: Litres = vec![a, b].into_iter().sum();
        assert_eq!(total.value(), dec!(25050.125));
    }
}
