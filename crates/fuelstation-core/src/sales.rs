//! # Sales Calculation Engine
//!
//! Derives the amounts of one fuel sale and aggregates lists of sales.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  compute_sale(quantity, unit_price, tax_percentage)                     │
//! │                                                                         │
//! │    base_amount  = round(quantity × unit_price)          half-up, 2 dp  │
//! │    tax_amount   = round(base_amount × tax% / 100)       half-up, 2 dp  │
//! │    total_amount = base_amount + tax_amount              exact          │
//! │                                                                         │
//! │  Example: 50.0 L × Rs. 289.50 @ 17%                                    │
//! │    base  = 14,475.00                                                   │
//! │    tax   =  2,460.75                                                   │
//! │    total = 16,935.75                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rounding happens exactly twice and the total is never rounded again, so
//! `total == base + tax` holds for every input.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::{percentage_ratio, Litres, Money};
use crate::types::{NozzleReading, PaymentMethod, Sale, TaxRate};
use crate::validation::{validate_positive_decimal, validate_sale_input};

// =============================================================================
// Amounts
// =============================================================================

/// The three amounts of a priced quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleAmounts {
    pub base_amount: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
}

/// Computes base, tax and total for one sale.
///
/// Fails with an invalid-input error when `quantity <= 0`,
/// `unit_price <= 0` or `tax_percentage < 0`.
///
/// ## Example
/// ```rust
/// use fuelstation_core::money::{Litres, Money};
/// use fuelstation_core::sales::compute_sale;
/// use fuelstation_core::types::TaxRate;
/// use rust_decimal::Decimal;
///
/// let amounts = compute_sale(
///     Litres::new(Decimal::new(500, 1)),          // 50.0 L
///     Money::from_cents(28950),                   // Rs. 289.50
///     TaxRate::from_percentage(Decimal::from(17)),
/// )
/// .unwrap();
///
/// assert_eq!(amounts.base_amount, Money::from_cents(1_447_500));
/// assert_eq!(amounts.tax_amount, Money::from_cents(246_075));
/// assert_eq!(amounts.total_amount, Money::from_cents(1_693_575));
/// ```
pub fn compute_sale(
    quantity: Litres,
    unit_price: Money,
    tax_percentage: TaxRate,
) -> CoreResult<SaleAmounts> {
    validate_sale_input(quantity, unit_price, tax_percentage)?;
    price_quantity(quantity, unit_price, tax_percentage)
}

/// Costs a supplier delivery with the same rounding path as a sale.
///
/// The result maps onto `Purchase::tax_amount` and `Purchase::total_cost`.
pub fn compute_purchase_cost(
    quantity: Litres,
    rate: Money,
    tax_percentage: TaxRate,
) -> CoreResult<SaleAmounts> {
    validate_positive_decimal("quantity", quantity.value())?;
    validate_positive_decimal("rate", rate.amount())?;
    if tax_percentage.is_negative() {
        return Err(CoreError::invalid_input("tax_percentage", "must not be negative"));
    }
    price_quantity(quantity, rate, tax_percentage)
}

fn price_quantity(quantity: Litres, price: Money, tax: TaxRate) -> CoreResult<SaleAmounts> {
    let out_of_range = || CoreError::invalid_input("quantity", "amount is out of range");

    let base_amount = price.times_quantity(quantity).ok_or_else(out_of_range)?;
    let tax_amount = base_amount.percentage_of(tax).ok_or_else(out_of_range)?;
    let total_amount = base_amount.checked_add(tax_amount).ok_or_else(out_of_range)?;

    Ok(SaleAmounts {
        base_amount,
        tax_amount,
        total_amount,
    })
}

// =============================================================================
// Summary
// =============================================================================

/// Totals for one group of sales.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTotals {
    pub count: usize,
    pub quantity: Litres,
    pub amount: Money,
}

impl GroupTotals {
    fn add(&mut self, sale: &Sale) {
        self.count += 1;
        self.quantity = self.quantity + sale.quantity;
        self.amount += sale.total_amount;
    }
}

/// Aggregate over a list of sales, handed as-is to the report renderer.
///
/// Group maps are `BTreeMap`s so keys come out sorted and report diffs are
/// reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub count: usize,
    pub total_quantity: Litres,
    pub base_amount: Money,
    pub tax_collected: Money,
    pub total_amount: Money,
    pub by_payment_method: BTreeMap<PaymentMethod, GroupTotals>,
    pub by_fuel_type: BTreeMap<String, GroupTotals>,
}

/// Groups sales by payment method and by fuel type. Voided sales are skipped.
pub fn summarize_sales(sales: &[Sale]) -> SalesSummary {
    let mut summary = SalesSummary::default();

    for sale in sales.iter().filter(|s| !s.is_voided()) {
        summary.count += 1;
        summary.total_quantity = summary.total_quantity + sale.quantity;
        summary.base_amount += sale.base_amount;
        summary.tax_collected += sale.tax_amount;
        summary.total_amount += sale.total_amount;

        summary
            .by_payment_method
            .entry(sale.payment_method)
            .or_default()
            .add(sale);
        summary
            .by_fuel_type
            .entry(sale.fuel_type_id.clone())
            .or_default()
            .add(sale);
    }

    summary
}

// =============================================================================
// Nozzle Meters
// =============================================================================

/// Meter throughput against recorded sales for one nozzle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterVariance {
    /// Litres the totaliser says left the nozzle.
    pub dispensed: Litres,
    /// Litres booked as sales on the nozzle.
    pub recorded: Litres,
    /// `dispensed - recorded`. Positive means unrecorded fuel.
    pub difference: Litres,
}

/// Litres dispensed between two totaliser readings.
pub fn dispensed(reading: &NozzleReading) -> CoreResult<Litres> {
    if reading.closing_reading < reading.opening_reading {
        return Err(CoreError::invalid_input(
            "closing_reading",
            format!(
                "nozzle {}: closing {} is below opening {}",
                reading.nozzle_id, reading.closing_reading, reading.opening_reading
            ),
        ));
    }
    Ok(reading.closing_reading - reading.opening_reading)
}

/// Compares a nozzle's meter throughput with the sales recorded on it.
pub fn meter_variance(reading: &NozzleReading, sales: &[Sale]) -> CoreResult<MeterVariance> {
    let dispensed = dispensed(reading)?;
    let recorded: Litres = sales
        .iter()
        .filter(|s| !s.is_voided() && s.nozzle_id.as_deref() == Some(reading.nozzle_id.as_str()))
        .map(|s| s.quantity)
        .sum();

    Ok(MeterVariance {
        dispensed,
        recorded,
        difference: dispensed - recorded,
    })
}

// =============================================================================
// Ratios
// =============================================================================

/// Markup on cost: `(selling - cost) / cost × 100`. `None` for zero cost.
pub fn markup_pct(cost: Money, selling: Money) -> Option<Decimal> {
    percentage_ratio((selling - cost).amount(), cost.amount())
}

/// Relative change: `(new - old) / old × 100`. `None` when `old` is zero.
pub fn percentage_change(old: Decimal, new: Decimal) -> Option<Decimal> {
    percentage_ratio(new - old, old)
}

// =============================================================================
// Unit Tests
// =============================================================================
