//! # Customer Credit Manager
//!
//! Credit limits, payments against outstanding balances, and the aging
//! report used for collections.
//!
//! ## Credit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  credit sale requested                                                  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  authorize_credit_sale ── outstanding + amount > limit ──► reject      │
//! │        │ ok                                                             │
//! │        ▼                                                                │
//! │  caller persists sale ──► apply_credit_sale ──► caller persists        │
//! │                                                                         │
//! │  payment received                                                       │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  record_payment ── balance floored at 0 (excess discarded,             │
//! │                    caller logs overpayment())                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Aging Allocation
//! ```text
//! outstanding = 70,000
//! credit sales, newest first:   20,000 (12 d)   30,000 (45 d)   40,000 (95 d)
//! attributed:                   20,000          30,000          20,000
//! bucket:                       Current         31-60           90+
//! ```
//! Payments are assumed to retire the oldest invoices first, so the balance
//! is made of the newest ones. Whatever no sale covers (fees, adjustments)
//! is aged from the last payment, or counted as current.

use std::cmp::min;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::{percentage_ratio, Money};
use crate::types::{Customer, Payment, PaymentMethod, Sale};

// =============================================================================
// Credit Status
// =============================================================================

/// A customer's credit position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditStatus {
    pub customer_id: String,
    pub credit_limit: Money,
    pub outstanding_balance: Money,
    /// `max(0, credit_limit - outstanding_balance)`.
    pub available_credit: Money,
    /// `outstanding / limit × 100`; `None` for a zero limit.
    pub utilization_pct: Option<Decimal>,
}

pub fn get_credit_status(customer: &Customer) -> CreditStatus {
    CreditStatus {
        customer_id: customer.id.clone(),
        credit_limit: customer.credit_limit,
        outstanding_balance: customer.outstanding_balance,
        available_credit: (customer.credit_limit - customer.outstanding_balance)
            .clamp_non_negative(),
        utilization_pct: percentage_ratio(
            customer.outstanding_balance.amount(),
            customer.credit_limit.amount(),
        ),
    }
}

/// Would this credit sale keep the customer within their limit?
///
/// Pure check. It does not touch the balance.
///
/// ## Example
/// ```text
/// limit 500,000   outstanding 480,000
///   sale 30,000  → 510,000 > limit → false
///   sale 20,000  → 500,000 = limit → true
/// ```
pub fn authorize_credit_sale(customer: &Customer, sale_amount: Money) -> bool {
    customer.outstanding_balance + sale_amount <= customer.credit_limit
}

/// [`authorize_credit_sale`] as a `Result`, carrying the figures on refusal.
pub fn ensure_credit_available(customer: &Customer, sale_amount: Money) -> CoreResult<()> {
    if authorize_credit_sale(customer, sale_amount) {
        Ok(())
    } else {
        Err(CoreError::CreditLimitExceeded {
            customer_id: customer.id.clone(),
            credit_limit: customer.credit_limit,
            outstanding: customer.outstanding_balance,
            requested: sale_amount,
        })
    }
}

/// Adds a persisted credit sale to the customer's balance.
pub fn apply_credit_sale(customer: &Customer, sale_amount: Money) -> CoreResult<Customer> {
    ensure_positive_amount(sale_amount)?;
    Ok(Customer {
        outstanding_balance: customer.outstanding_balance + sale_amount,
        ..customer.clone()
    })
}

/// Reduces the balance by a payment, floored at zero.
///
/// Overpayment is discarded here; see [`overpayment`] for the amount lost.
pub fn record_payment(customer: &Customer, amount: Money) -> CoreResult<Customer> {
    ensure_positive_amount(amount)?;
    Ok(Customer {
        outstanding_balance: (customer.outstanding_balance - amount).clamp_non_negative(),
        ..customer.clone()
    })
}

/// The part of `amount` that [`record_payment`] would discard.
pub fn overpayment(customer: &Customer, amount: Money) -> Money {
    (amount - customer.outstanding_balance.clamp_non_negative()).clamp_non_negative()
}

fn ensure_positive_amount(amount: Money) -> CoreResult<()> {
    if !amount.is_positive() {
        return Err(CoreError::InvalidAmount {
            reason: format!("amount must be positive, got {}", amount),
        });
    }
    Ok(())
}

// =============================================================================
// Aging
// =============================================================================

/// Age band of an outstanding amount. `Ord` follows age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgingBucket {
    /// 0-30 days.
    #[serde(rename = "current")]
    Current,
    #[serde(rename = "31_60")]
    Days31To60,
    #[serde(rename = "61_90")]
    Days61To90,
    #[serde(rename = "90_plus")]
    Over90,
}

impl AgingBucket {
    /// Negative ages (future-dated records) count as current.
    pub fn from_days(days: i64) -> Self {
        match days {
            i64::MIN..=30 => AgingBucket::Current,
            31..=60 => AgingBucket::Days31To60,
            61..=90 => AgingBucket::Days61To90,
            _ => AgingBucket::Over90,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgingBucket::Current => "Current (0-30)",
            AgingBucket::Days31To60 => "31-60 days",
            AgingBucket::Days61To90 => "61-90 days",
            AgingBucket::Over90 => "90+ days",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgingLine {
    pub customer_id: String,
    pub customer_name: String,
    pub bucket: AgingBucket,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgingReport {
    pub as_of: DateTime<Utc>,
    pub lines: Vec<AgingLine>,
}

impl AgingReport {
    pub fn customer_total(&self, customer_id: &str) -> Money {
        self.lines
            .iter()
            .filter(|l| l.customer_id == customer_id)
            .map(|l| l.amount)
            .sum()
    }

    pub fn bucket_total(&self, bucket: AgingBucket) -> Money {
        self.lines
            .iter()
            .filter(|l| l.bucket == bucket)
            .map(|l| l.amount)
            .sum()
    }

    pub fn total(&self) -> Money {
        self.lines.iter().map(|l| l.amount).sum()
    }
}

/// Buckets every outstanding balance by age as of `as_of`.
///
/// For each customer the bucket amounts add up to exactly their
/// `outstanding_balance`. Customers with nothing outstanding are left out.
pub fn get_aging_report(
    customers: &[Customer],
    credit_sales: &[Sale],
    payments: &[Payment],
    as_of: DateTime<Utc>,
) -> AgingReport {
    let mut owing: Vec<&Customer> = customers
        .iter()
        .filter(|c| c.outstanding_balance.is_positive())
        .collect();
    owing.sort_by(|a, b| {
        b.outstanding_balance
            .cmp(&a.outstanding_balance)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut lines = Vec::new();
    for customer in owing {
        let buckets = age_balance(customer, credit_sales, payments, as_of);
        lines.extend(
            buckets
                .into_iter()
                .filter(|(_, amount)| amount.is_positive())
                .map(|(bucket, amount)| AgingLine {
                    customer_id: customer.id.clone(),
                    customer_name: customer.name.clone(),
                    bucket,
                    amount,
                }),
        );
    }

    AgingReport { as_of, lines }
}

fn age_balance(
    customer: &Customer,
    credit_sales: &[Sale],
    payments: &[Payment],
    as_of: DateTime<Utc>,
) -> BTreeMap<AgingBucket, Money> {
    let age_of = |at: DateTime<Utc>| AgingBucket::from_days((as_of - at).num_days());

    let mut invoices: Vec<&Sale> = credit_sales
        .iter()
        .filter(|s| {
            !s.is_voided()
                && s.payment_method == PaymentMethod::Credit
                && s.customer_id.as_deref() == Some(customer.id.as_str())
        })
        .collect();
    invoices.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));

    let mut buckets: BTreeMap<AgingBucket, Money> = BTreeMap::new();
    let mut remaining = customer.outstanding_balance;

    for sale in invoices {
        if !remaining.is_positive() {
            break;
        }
        let slice = min(remaining, sale.total_amount.clamp_non_negative());
        *buckets.entry(age_of(sale.date)).or_default() += slice;
        remaining -= slice;
    }

    if remaining.is_positive() {
        let last_payment = payments
            .iter()
            .filter(|p| p.customer_id == customer.id)
            .map(|p| p.date)
            .max();
        let bucket = last_payment.map_or(AgingBucket::Current, age_of);
        *buckets.entry(bucket).or_default() += remaining;
    }

    buckets
}

// =============================================================================
// Unit Tests
// =============================================================================
