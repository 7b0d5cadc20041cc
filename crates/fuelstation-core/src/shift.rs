//! # Shift Reconciliation Engine
//!
//! Opens operator shifts and reconciles counted cash against what the
//! recorded sales say should be in the till.
//!
//! ## State Machine
//! ```text
//!   open_shift                    close_shift
//!  ───────────►  ┌──────┐  ─────────────────────►  ┌────────┐
//!                │ Open │                          │ Closed │  (terminal)
//!                └──────┘                          └────────┘
//!
//!  expected_cash = opening_cash + Σ total_amount (cash sales, not voided)
//!  variance      = closing_cash - expected_cash
//!                  > 0 excess, < 0 shortage, never auto-corrected
//! ```
//!
//! One open shift per operator. The pure check lives here; the store backs
//! it with a unique index so two terminals cannot both pass it.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{new_id, PaymentMethod, Sale, Shift, ShiftStatus};
use crate::validation::validate_required;

/// Finds the operator's open shift, if any.
pub fn find_open_shift<'a>(shifts: &'a [Shift], operator_id: &str) -> Option<&'a Shift> {
    shifts
        .iter()
        .find(|s| s.is_open() && s.operator_id == operator_id)
}

/// Opens a new shift for an operator.
///
/// `existing` is whatever the caller knows about the operator's shifts;
/// an open one among them fails with `ShiftAlreadyOpen`. The business
/// `date` is taken in `opened_at`'s local offset.
pub fn open_shift(
    existing: &[Shift],
    operator_id: &str,
    opening_cash: Money,
    opened_at: DateTime<FixedOffset>,
) -> CoreResult<Shift> {
    validate_required("operator_id", operator_id)?;

    if opening_cash.is_negative() {
        return Err(CoreError::invalid_input(
            "opening_cash",
            format!("must not be negative, got {}", opening_cash),
        ));
    }

    if let Some(open) = find_open_shift(existing, operator_id) {
        return Err(CoreError::ShiftAlreadyOpen {
            operator_id: operator_id.to_string(),
            shift_id: open.id.clone(),
        });
    }

    Ok(Shift {
        id: new_id(),
        operator_id: operator_id.to_string(),
        date: opened_at.date_naive(),
        opening_time: opened_at.with_timezone(&Utc),
        closing_time: None,
        opening_cash,
        closing_cash: None,
        expected_cash: None,
        variance: None,
        status: ShiftStatus::Open,
    })
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Sign of the cash variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    Balanced,
    /// Less cash than expected.
    Shortage,
    /// More cash than expected.
    Excess,
}

impl ReconciliationOutcome {
    pub fn from_variance(variance: Money) -> Self {
        if variance.is_negative() {
            ReconciliationOutcome::Shortage
        } else if variance.is_positive() {
            ReconciliationOutcome::Excess
        } else {
            ReconciliationOutcome::Balanced
        }
    }
}

/// A closed shift together with the numbers that closed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledShift {
    /// The shift with status `closed` and every closing field set.
    pub shift: Shift,
    pub cash_sales_total: Money,
    /// All non-voided sales, any payment method.
    pub total_sales: Money,
    pub sales_count: usize,
    pub expected_cash: Money,
    pub variance: Money,
    pub outcome: ReconciliationOutcome,
    /// `closing_time - opening_time`, in whole seconds.
    pub duration_secs: i64,
}

impl ReconciledShift {
    pub fn duration(&self) -> Duration {
        Duration::seconds(self.duration_secs)
    }

    /// True when `|variance|` is strictly above `threshold`.
    pub fn exceeds_threshold(&self, threshold: Money) -> bool {
        self.variance.abs() > threshold.abs()
    }
}

/// Closes a shift and reconciles its cash.
///
/// ## Errors
/// - `ShiftNotOpen` if the shift is already closed
/// - `InvalidInput` if `closing_cash` is negative
/// - `InvalidTimestamps` if `closed_at` is before the opening time
pub fn close_shift(
    shift: &Shift,
    closing_cash: Money,
    sales_during_shift: &[Sale],
    closed_at: DateTime<Utc>,
) -> CoreResult<ReconciledShift> {
    if !shift.is_open() {
        return Err(CoreError::ShiftNotOpen {
            shift_id: shift.id.clone(),
        });
    }

    if closing_cash.is_negative() {
        return Err(CoreError::invalid_input(
            "closing_cash",
            format!("must not be negative, got {}", closing_cash),
        ));
    }

    let duration = closed_at - shift.opening_time;
    if duration < Duration::zero() {
        return Err(CoreError::invalid_timestamps(format!(
            "shift {} closes at {} before it opened at {}",
            shift.id, closed_at, shift.opening_time
        )));
    }

    let counted: Vec<&Sale> = sales_during_shift.iter().filter(|s| !s.is_voided()).collect();
    let total_sales: Money = counted.iter().map(|s| s.total_amount).sum();
    let cash_sales_total: Money = counted
        .iter()
        .filter(|s| s.payment_method == PaymentMethod::Cash)
        .map(|s| s.total_amount)
        .sum();

    let expected_cash = shift.opening_cash + cash_sales_total;
    let variance = closing_cash - expected_cash;

    let closed = Shift {
        closing_time: Some(closed_at),
        closing_cash: Some(closing_cash),
        expected_cash: Some(expected_cash),
        variance: Some(variance),
        status: ShiftStatus::Closed,
        ..shift.clone()
    };

    Ok(ReconciledShift {
        shift: closed,
        cash_sales_total,
        total_sales,
        sales_count: counted.len(),
        expected_cash,
        variance,
        outcome: ReconciliationOutcome::from_variance(variance),
        duration_secs: duration.num_seconds(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::sales::tests::sale;
    use crate::types::tests::ts;
    use crate::types::SaleStatus;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;

    fn pkt() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600).unwrap()
    }

    fn opened() -> Shift {
        let at = pkt().with_ymd_and_hms(2024, 3, 15, 6, 0, 0).unwrap();
        open_shift(&[], "op-1", Money::from_major(50_000), at).unwrap()
    }

    fn day_sales() -> Vec<Sale> {
        vec![
            sale("s1", "petrol", PaymentMethod::Cash, dec!(300), Money::from_major(120_000)),
            sale("s2", "diesel", PaymentMethod::Cash, dec!(250), Money::from_major(75_000)),
            sale("s3", "petrol", PaymentMethod::Credit, dec!(100), Money::from_major(40_000)),
            sale("s4", "petrol", PaymentMethod::EasyPaisa, dec!(10), Money::from_major(3_000)),
        ]
    }

    #[test]
    fn test_open_shift() {
        let shift = opened();
        assert!(shift.is_open());
        assert_eq!(shift.operator_id, "op-1");
        assert_eq!(shift.date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(shift.opening_time, ts(2024, 3, 15, 1, 0));
        assert!(shift.closing_time.is_none());
    }

    #[test]
    fn test_business_date_uses_local_offset() {
        // 02:00 PKT on the 16th is still 21:00 UTC on the 15th
        let at = pkt().with_ymd_and_hms(2024, 3, 16, 2, 0, 0).unwrap();
        let shift = open_shift(&[], "op-1", Money::zero(), at).unwrap();
        assert_eq!(shift.date, NaiveDate::from_ymd_opt(2024, 3, 16).unwrap());
    }

    #[test]
    fn test_open_shift_twice_rejected() {
        let first = opened();
        let at = pkt().with_ymd_and_hms(2024, 3, 15, 7, 0, 0).unwrap();
        let err = open_shift(&[first.clone()], "op-1", Money::zero(), at).unwrap_err();

        assert_eq!(
            err,
            CoreError::ShiftAlreadyOpen {
                operator_id: "op-1".to_string(),
                shift_id: first.id.clone(),
            }
        );

        // Another operator is unaffected
        assert!(open_shift(&[first], "op-2", Money::zero(), at).is_ok());
    }

    #[test]
    fn test_open_shift_negative_cash_rejected() {
        let at = pkt().with_ymd_and_hms(2024, 3, 15, 6, 0, 0).unwrap();
        let err = open_shift(&[], "op-1", Money::from_major(-1), at).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_close_shift_balanced() {
        let shift = opened();
        let result = close_shift(&shift, Money::from_major(245_000), &day_sales(), ts(2024, 3, 15, 9, 0)).unwrap();

        assert_eq!(result.cash_sales_total, Money::from_major(195_000));
        assert_eq!(result.expected_cash, Money::from_major(245_000));
        assert_eq!(result.variance, Money::zero());
        assert_eq!(result.outcome, ReconciliationOutcome::Balanced);
        assert_eq!(result.total_sales, Money::from_major(238_000));
        assert_eq!(result.sales_count, 4);
        assert_eq!(result.duration(), Duration::hours(8));

        assert_eq!(result.shift.status, ShiftStatus::Closed);
        assert_eq!(result.shift.closing_time, Some(ts(2024, 3, 15, 9, 0)));
        assert_eq!(result.shift.variance, Some(Money::zero()));
    }

    #[test]
    fn test_close_shift_excess_and_shortage() {
        let shift = opened();
        let closed_at = ts(2024, 3, 15, 9, 0);

        let excess = close_shift(&shift, Money::from_major(250_000), &day_sales(), closed_at).unwrap();
        assert_eq!(excess.variance, Money::from_major(5_000));
        assert_eq!(excess.outcome, ReconciliationOutcome::Excess);

        let short = close_shift(&shift, Money::from_major(244_500), &day_sales(), closed_at).unwrap();
        assert_eq!(short.variance, Money::from_major(-500));
        assert_eq!(short.outcome, ReconciliationOutcome::Shortage);
    }

    #[test]
    fn test_voided_sales_ignored() {
        let shift = opened();
        let mut sales = day_sales();
        sales[0].status = SaleStatus::Voided;

        let result = close_shift(&shift, Money::from_major(125_000), &sales, ts(2024, 3, 15, 9, 0)).unwrap();
        assert_eq!(result.expected_cash, Money::from_major(125_000));
        assert_eq!(result.sales_count, 3);
    }

    #[test]
    fn test_close_shift_errors() {
        let shift = opened();
        let closed = close_shift(&shift, Money::from_major(50_000), &[], ts(2024, 3, 15, 9, 0))
            .unwrap()
            .shift;

        let err = close_shift(&closed, Money::zero(), &[], ts(2024, 3, 15, 10, 0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShiftNotOpen);

        let err = close_shift(&shift, Money::from_major(-1), &[], ts(2024, 3, 15, 9, 0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = close_shift(&shift, Money::zero(), &[], ts(2024, 3, 15, 0, 59)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTimestamps);
    }

    #[test]
    fn test_zero_length_shift_allowed() {
        let shift = opened();
        let result = close_shift(&shift, Money::from_major(50_000), &[], shift.opening_time).unwrap();
        assert_eq!(result.duration_secs, 0);
    }

    #[test]
    fn test_exceeds_threshold() {
        let shift = opened();
        let closed_at = ts(2024, 3, 15, 9, 0);
        let result = close_shift(&shift, Money::from_major(244_000), &day_sales(), closed_at).unwrap();

        assert!(!result.exceeds_threshold(Money::from_major(1_000)));
        assert!(result.exceeds_threshold(Money::from_major(999)));
    }

    #[test]
    fn test_find_open_shift() {
        let open = opened();
        let mut closed = opened();
        closed.operator_id = "op-2".to_string();
        closed.status = ShiftStatus::Closed;
        let shifts = vec![closed, open.clone()];

        assert_eq!(find_open_shift(&shifts, "op-1").map(|s| &s.id), Some(&open.id));
        assert!(find_open_shift(&shifts, "op-2").is_none());
    }
}
