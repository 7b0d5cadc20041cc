//! # Domain Types
//!
//! Typed entity records for the fuel station. Every field is explicit;
//! optional fields are `Option`, never a missing dictionary key.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    FuelType     │   │      Tank       │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  fuel_type_id   │◄──│  tank_id        │       │
//! │  │  unit_price     │   │  capacity       │   │  unit_price ◄── │ snap- │
//! │  │  tax_percentage │   │  current_stock  │   │  tax_percentage │ shot  │
//! │  │  is_active      │   │  version (CAS)  │   │  shift_id       │       │
//! │  └─────────────────┘   └─────────────────┘   └────────┬────────┘       │
//! │                                                       │                │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌────────▼────────┐       │
//! │  │    Payment      │──►│    Customer     │◄──│     Shift       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  amount         │   │  credit_limit   │   │  operator_id    │       │
//! │  │  method         │   │  outstanding    │   │  status         │       │
//! │  └─────────────────┘   │  version (CAS)  │   │  opening_cash   │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Purchase, Expense, NozzleReading: flat records, no references back    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Temporal Field Names
//! Each entity names its own date field: `Sale::date`, `Purchase::purchase_date`,
//! `Expense::expense_date`, `Shift::date`. Aggregations bind to the right one
//! explicitly instead of assuming a shared `date`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::{percentage_ratio, Litres, Money};

/// Generates a fresh entity identifier (UUID v4).
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate held as a decimal percentage.
///
/// ## Representation
/// `17.0` means 17 %. `from_bps(825)` is 8.25 %.
///
/// Negative rates are representable on purpose so the sales engine can
/// reject them with a proper error instead of failing to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(Decimal);

impl TaxRate {
    /// Creates a tax rate from a percentage.
    #[inline]
    pub const fn from_percentage(pct: Decimal) -> Self {
        TaxRate(pct)
    }

    /// Creates a tax rate from basis points (1 bps = 0.01 %).
    pub fn from_bps(bps: u32) -> Self {
        TaxRate(Decimal::new(i64::from(bps), 2))
    }

    /// Returns the rate as a percentage.
    #[inline]
    pub fn percentage(&self) -> Decimal {
        self.0
    }

    /// Returns the rate in basis points, when it is a whole number of them.
    pub fn bps(&self) -> Option<u32> {
        let bps = self.0 * Decimal::ONE_HUNDRED;
        if bps.fract().is_zero() {
            bps.to_u32()
        } else {
            None
        }
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(Decimal::ZERO)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

// =============================================================================
// Stored Enum Helper
// =============================================================================

/// Implements `as_str`, `Display` and `FromStr` for a snake_case enum.
///
/// The string forms match the serde representation and the values stored
/// in SQLite `TEXT` columns.
macro_rules! text_enum {
    ($ty:ident, $field:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            /// Returns the stored string form.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    _ => Err(ValidationError::NotAllowed {
                        field: $field.to_string(),
                        allowed: $ty::ALL.iter().map(|v| v.as_str().to_string()).collect(),
                    }),
                }
            }
        }
    };
}

// =============================================================================
// Fuel Type
// =============================================================================

/// A grade of fuel on sale (Petrol, Diesel, Hi-Octane).
///
/// Sales snapshot `unit_price` and `tax_percentage` at the time of sale, so
/// a later price change never rewrites history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelType {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name ("Petrol").
    pub name: String,

    /// Current price per litre.
    pub unit_price: Money,

    /// Sales tax applied to this grade.
    pub tax_percentage: TaxRate,

    /// Whether the grade is currently sold.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Tank
// =============================================================================

/// An underground storage tank.
///
/// ## Invariant
/// `0 <= current_stock <= capacity`, checked by [`Tank::validate`] at the
/// store boundary and preserved by every stock engine mutation.
///
/// ## Concurrency
/// `version` is bumped by the store on every committed stock change. The
/// engine never touches it; a stale version makes the commit fail and the
/// caller re-reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tank {
    pub id: String,
    pub name: String,
    pub fuel_type_id: String,
    pub capacity: Litres,
    pub current_stock: Litres,
    pub minimum_stock: Litres,

    /// When stock was last changed or dipped.
    pub last_reading_date: Option<DateTime<Utc>>,

    /// Optimistic concurrency counter.
    pub version: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tank {
    /// Below the minimum stock threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.current_stock < self.minimum_stock
    }

    /// Fill level as a percentage of capacity (0-100, 2 dp).
    ///
    /// A zero-capacity tank reports 0; [`Tank::validate`] rejects those anyway.
    pub fn stock_percentage(&self) -> Decimal {
        percentage_ratio(self.current_stock.value(), self.capacity.value())
            .unwrap_or(Decimal::ZERO)
    }

    /// Litres of free space left.
    #[inline]
    pub fn ullage(&self) -> Litres {
        self.capacity - self.current_stock
    }

    /// Checks the stock invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.capacity.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "capacity".to_string(),
            });
        }
        if self.minimum_stock.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "minimum_stock".to_string(),
            });
        }
        if self.current_stock.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "current_stock".to_string(),
            });
        }
        if self.current_stock > self.capacity {
            return Err(ValidationError::OutOfRange {
                field: "current_stock".to_string(),
                reason: format!("{} exceeds capacity {}", self.current_stock, self.capacity),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale or customer payment was settled.
///
/// `Ord` follows declaration order, which keeps summary groups stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Notes and coins into the shift till.
    Cash,
    /// On the customer's account.
    Credit,
    /// Easypaisa mobile wallet.
    EasyPaisa,
    /// JazzCash mobile wallet.
    JazzCash,
    /// Bank transfer or card.
    Bank,
}

text_enum!(PaymentMethod, "payment_method", {
    Cash => "cash",
    Credit => "credit",
    EasyPaisa => "easy_paisa",
    JazzCash => "jazz_cash",
    Bank => "bank",
});

// =============================================================================
// Sale
// =============================================================================

/// Sale lifecycle. Only the status changes after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Completed,
    /// Checked by a supervisor.
    Verified,
    /// Cancelled. Excluded from every aggregate.
    Voided,
}

text_enum!(SaleStatus, "status", {
    Completed => "completed",
    Verified => "verified",
    Voided => "voided",
});

/// One fuel dispensing transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,

    /// When the fuel was sold.
    pub date: DateTime<Utc>,

    pub tank_id: String,
    pub nozzle_id: Option<String>,
    pub fuel_type_id: String,
    pub quantity: Litres,

    /// Price per litre at the time of sale.
    pub unit_price: Money,

    /// Tax rate at the time of sale.
    pub tax_percentage: TaxRate,

    pub base_amount: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
    pub payment_method: PaymentMethod,

    /// Set for credit sales.
    pub customer_id: Option<String>,

    pub operator_id: String,
    pub shift_id: String,
    pub status: SaleStatus,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn is_voided(&self) -> bool {
        self.status == SaleStatus::Voided
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// A supplier delivery into a tank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: String,

    /// When the delivery was received.
    pub purchase_date: DateTime<Utc>,

    pub supplier_name: String,
    pub invoice_number: String,
    pub fuel_type_id: String,
    pub tank_id: String,
    pub quantity: Litres,

    /// Supplier price per litre.
    pub rate: Money,

    pub tax_amount: Money,
    pub total_cost: Money,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Expense
// =============================================================================

/// An operating expense (salaries, electricity, maintenance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub expense_date: DateTime<Utc>,
    pub category: String,
    pub description: Option<String>,
    pub amount: Money,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Shift
// =============================================================================

/// Shift lifecycle: `open -> closed`, no reopen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Open,
    Closed,
}

text_enum!(ShiftStatus, "status", {
    Open => "open",
    Closed => "closed",
});

/// An operator's till session.
///
/// The closing fields are `None` while the shift is open and all set
/// together when it closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    pub id: String,
    pub operator_id: String,

    /// Station-local business day the shift opened on.
    pub date: NaiveDate,

    pub opening_time: DateTime<Utc>,
    pub closing_time: Option<DateTime<Utc>>,
    pub opening_cash: Money,
    pub closing_cash: Option<Money>,
    pub expected_cash: Option<Money>,

    /// `closing_cash - expected_cash`. Positive is excess, negative shortage.
    pub variance: Option<Money>,

    pub status: ShiftStatus,
}

impl Shift {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == ShiftStatus::Open
    }
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    Active,
    Inactive,
    /// Credit suspended by the owner.
    Blocked,
}

text_enum!(CustomerStatus, "status", {
    Active => "active",
    Inactive => "inactive",
    Blocked => "blocked",
});

/// A credit account holder (fleet, transporter, regular).
///
/// ## Soft Invariant
/// `outstanding_balance <= credit_limit` is enforced only for NEW credit
/// sales. Existing balances may already exceed the limit after fees or
/// adjustments, and every calculation must tolerate that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub credit_limit: Money,
    pub outstanding_balance: Money,
    pub status: CustomerStatus,

    /// Optimistic concurrency counter.
    pub version: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Payment
// =============================================================================

/// Money received against a customer's outstanding balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub customer_id: String,
    pub amount: Money,
    pub date: DateTime<Utc>,
    pub method: PaymentMethod,
    pub reference_number: Option<String>,
    pub received_by: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Nozzle Reading
// =============================================================================

/// Totaliser readings for one nozzle over a shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NozzleReading {
    pub nozzle_id: String,
    pub opening_reading: Litres,
    pub closing_reading: Litres,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    pub(crate) fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    pub(crate) fn tank(current: Decimal, capacity: Decimal, minimum: Decimal) -> Tank {
        Tank {
            id: "tank-1".to_string(),
            name: "Petrol Tank 1".to_string(),
            fuel_type_id: "petrol".to_string(),
            capacity: Litres::new(capacity),
            current_stock: Litres::new(current),
            minimum_stock: Litres::new(minimum),
            last_reading_date: None,
            version: 1,
            created_at: ts(2024, 1, 1, 0, 0),
            updated_at: ts(2024, 1, 1, 0, 0),
        }
    }

    #[test]
    fn test_tax_rate_conversions() {
        let rate = TaxRate::from_bps(825);
        assert_eq!(rate.percentage(), dec!(8.25));
        assert_eq!(rate.bps(), Some(825));
        assert_eq!(rate.to_string(), "8.25%");

        let rate = TaxRate::from_percentage(dec!(17.0));
        assert_eq!(rate.bps(), Some(1700));

        assert_eq!(TaxRate::from_percentage(dec!(0.125)).bps(), None);
        assert!(TaxRate::from_percentage(dec!(-1)).is_negative());
    }

    #[test]
    fn test_tank_stock_percentage_and_low_stock() {
        let healthy = tank(dec!(25000), dec!(50000), dec!(5000));
        assert_eq!(healthy.stock_percentage(), dec!(50.00));
        assert!(!healthy.is_low_stock());
        assert_eq!(healthy.ullage(), Litres::new(dec!(25000)));

        let low = tank(dec!(8000), dec!(50000), dec!(10000));
        assert!(low.is_low_stock());
        assert_eq!(low.stock_percentage(), dec!(16.00));
    }

    #[test]
    fn test_tank_validate() {
        assert!(tank(dec!(100), dec!(1000), dec!(50)).validate().is_ok());
        assert!(tank(dec!(1000), dec!(1000), dec!(0)).validate().is_ok());

        assert!(matches!(
            tank(dec!(1001), dec!(1000), dec!(50)).validate(),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            tank(dec!(-1), dec!(1000), dec!(50)).validate(),
            Err(ValidationError::MustNotBeNegative { .. })
        ));
        assert!(matches!(
            tank(dec!(0), dec!(0), dec!(0)).validate(),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_enum_string_forms() {
        assert_eq!(PaymentMethod::EasyPaisa.as_str(), "easy_paisa");
        assert_eq!("jazz_cash".parse::<PaymentMethod>(), Ok(PaymentMethod::JazzCash));
        assert_eq!("voided".parse::<SaleStatus>(), Ok(SaleStatus::Voided));
        assert_eq!("open".parse::<ShiftStatus>(), Ok(ShiftStatus::Open));
        assert_eq!("blocked".parse::<CustomerStatus>(), Ok(CustomerStatus::Blocked));

        let err = "cheque".parse::<PaymentMethod>().unwrap_err();
        assert!(matches!(err, ValidationError::NotAllowed { ref allowed, .. } if allowed.len() == 5));
    }

    #[test]
    fn test_enum_serde_matches_stored_form() {
        for method in PaymentMethod::ALL {
            let json = serde_json::to_string(method).unwrap();
            assert_eq!(json, format!("\"{}\"", method.as_str()));
        }
    }

    #[test]
    fn test_payment_method_order_is_stable() {
        let mut methods = vec![PaymentMethod::Bank, PaymentMethod::Cash, PaymentMethod::Credit];
        methods.sort();
        assert_eq!(
            methods,
            vec![PaymentMethod::Cash, PaymentMethod::Credit, PaymentMethod::Bank]
        );
    }
}
