//! # Profit & Loss Calculator
//!
//! Aggregates sales, purchases and expenses over a half-open period.
//!
//! ## Period Boundaries
//! ```text
//!      start                                       end
//!        │◄──────────── included ─────────────────►│
//!        [═════════════════════════════════════════)
//!        ▲                                         ▲
//!   record at start: IN                 record at end: OUT
//!                                       (belongs to the next period)
//! ```
//!
//! ## Temporal Fields
//! Each record kind is bound to its own date field:
//! - `Sale::date`
//! - `Purchase::purchase_date`
//! - `Expense::expense_date`
//!
//! ## Formulas
//! ```text
//! revenue            = Σ sale.total_amount        (voided sales excluded)
//! cost_of_goods      = Σ purchase.total_cost
//! operating_expenses = Σ expense.amount
//! gross_profit       = revenue - cost_of_goods
//! net_profit         = gross_profit - operating_expenses
//! profit_margin_pct  = net_profit / revenue × 100, None when revenue <= 0
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Days, FixedOffset, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::{percentage_ratio, Money};
use crate::types::{Expense, Purchase, Sale};

// =============================================================================
// Period
// =============================================================================

/// A half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    /// Fails with `InvalidTimestamps` when `end < start`. An empty period
    /// (`start == end`) is allowed and contains nothing.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<Self> {
        if end < start {
            return Err(CoreError::invalid_timestamps(format!(
                "period end {} is before start {}",
                end, start
            )));
        }
        Ok(Period { start, end })
    }

    /// `start <= at < end`.
    #[inline]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    /// Local midnight of `date` to the next local midnight.
    pub fn daily(date: NaiveDate, offset: FixedOffset) -> CoreResult<Self> {
        let next = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| CoreError::invalid_input("date", format!("{} is out of range", date)))?;
        Period::new(local_midnight(date, offset)?, local_midnight(next, offset)?)
    }

    /// First of the month to the first of the next month, local time.
    pub fn monthly(year: i32, month: u32, offset: FixedOffset) -> CoreResult<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            CoreError::invalid_input("month", format!("{}-{} is not a valid month", year, month))
        })?;
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        let next = NaiveDate::from_ymd_opt(next_year, next_month, 1).ok_or_else(|| {
            CoreError::invalid_input("year", format!("{} is out of range", year))
        })?;
        Period::new(local_midnight(first, offset)?, local_midnight(next, offset)?)
    }
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> CoreResult<DateTime<Utc>> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| CoreError::invalid_timestamps(format!("no midnight on {}", date)))?;
    offset
        .from_local_datetime(&midnight)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| CoreError::invalid_timestamps(format!("no local midnight on {}", date)))
}

// =============================================================================
// Report
// =============================================================================

/// Profit and loss for one period. The renderer formats these numbers and
/// never re-derives them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PLReport {
    pub period: Period,
    pub revenue: Money,
    /// Sales tax inside `revenue`.
    pub tax_collected: Money,
    pub cost_of_goods: Money,
    pub operating_expenses: Money,
    pub gross_profit: Money,
    pub net_profit: Money,
    /// `None` when there was no revenue: no sales means no meaningful margin.
    pub profit_margin_pct: Option<Decimal>,
    pub sales_count: usize,
    pub purchase_count: usize,
    pub expense_count: usize,
    pub expenses_by_category: BTreeMap<String, Money>,
}

/// Builds the P&L for `[period_start, period_end)`.
pub fn calculate_pl(
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    sales: &[Sale],
    purchases: &[Purchase],
    expenses: &[Expense],
) -> CoreResult<PLReport> {
    let period = Period::new(period_start, period_end)?;
    Ok(report_for(period, sales, purchases, expenses))
}

/// P&L for one station-local calendar day.
pub fn calculate_daily_pl(
    date: NaiveDate,
    offset: FixedOffset,
    sales: &[Sale],
    purchases: &[Purchase],
    expenses: &[Expense],
) -> CoreResult<PLReport> {
    let period = Period::daily(date, offset)?;
    calculate_pl(period.start, period.end, sales, purchases, expenses)
}

/// P&L for one station-local calendar month.
pub fn calculate_monthly_pl(
    year: i32,
    month: u32,
    offset: FixedOffset,
    sales: &[Sale],
    purchases: &[Purchase],
    expenses: &[Expense],
) -> CoreResult<PLReport> {
    let period = Period::monthly(year, month, offset)?;
    calculate_pl(period.start, period.end, sales, purchases, expenses)
}

fn report_for(
    period: Period,
    sales: &[Sale],
    purchases: &[Purchase],
    expenses: &[Expense],
) -> PLReport {
    let mut revenue = Money::zero();
    let mut tax_collected = Money::zero();
    let mut sales_count = 0;
    for sale in sales
        .iter()
        .filter(|s| !s.is_voided() && period.contains(s.date))
    {
        revenue += sale.total_amount;
        tax_collected += sale.tax_amount;
        sales_count += 1;
    }

    let mut cost_of_goods = Money::zero();
    let mut purchase_count = 0;
    for purchase in purchases.iter().filter(|p| period.contains(p.purchase_date)) {
        cost_of_goods += purchase.total_cost;
        purchase_count += 1;
    }

    let mut operating_expenses = Money::zero();
    let mut expenses_by_category: BTreeMap<String, Money> = BTreeMap::new();
    let mut expense_count = 0;
    for expense in expenses.iter().filter(|e| period.contains(e.expense_date)) {
        operating_expenses += expense.amount;
        *expenses_by_category
            .entry(expense.category.clone())
            .or_default() += expense.amount;
        expense_count += 1;
    }

    let gross_profit = revenue - cost_of_goods;
    let net_profit = gross_profit - operating_expenses;
    let profit_margin_pct = if revenue.is_positive() {
        percentage_ratio(net_profit.amount(), revenue.amount())
    } else {
        None
    };

    PLReport {
        period,
        revenue,
        tax_collected,
        cost_of_goods,
        operating_expenses,
        gross_profit,
        net_profit,
        profit_margin_pct,
        sales_count,
        purchase_count,
        expense_count,
        expenses_by_category,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
