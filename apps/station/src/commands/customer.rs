//! # Credit Customer Commands
//!
//! Payments against a customer's outstanding balance and the credit
//! position shown at the counter before a credit sale.

use chrono::{DateTime, Utc};
use fuelstation_core::credit::{get_credit_status, overpayment, record_payment, CreditStatus};
use fuelstation_core::{new_id, Customer, Money, Payment, PaymentMethod};
use fuelstation_db::{CustomerRepository, DbError, PaymentRepository};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::commands::retry_on_conflict;
use crate::error::ApiError;
use crate::state::{ConfigState, DbState};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    pub customer_id: String,
    pub amount: Money,
    pub method: PaymentMethod,
    pub reference_number: Option<String>,
    pub received_by: String,
    /// When the money came in. Defaults to now.
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub outstanding_after: Money,
    /// Part of the payment beyond the outstanding balance. The balance
    /// floors at zero and this amount is not carried as credit.
    pub overpaid: Money,
}

/// Records a payment from a credit customer.
///
/// ## Errors
/// - `VALIDATION_ERROR` for a zero or negative amount, or paying on credit
/// - `NOT_FOUND` for an unknown customer
pub async fn record_customer_payment(
    db: &DbState,
    config: &ConfigState,
    request: RecordPaymentRequest,
) -> Result<PaymentReceipt, ApiError> {
    debug!(
        customer_id = %request.customer_id,
        amount = %request.amount,
        method = %request.method,
        "record_customer_payment command"
    );

    if request.method == PaymentMethod::Credit {
        return Err(ApiError::validation("A credit balance cannot be paid on credit"));
    }

    let payment_id = new_id();
    let request = &request;
    let payment_id = payment_id.as_str();

    let (payment, customer, overpaid) =
        retry_on_conflict(config.cas_max_retries, "record_customer_payment", move || {
            attempt_payment(db, request, payment_id)
        })
        .await?;

    if overpaid.is_positive() {
        warn!(
            customer_id = %customer.id,
            amount = %payment.amount,
            overpaid = %overpaid,
            "Payment exceeds outstanding balance, excess discarded"
        );
    }

    info!(
        payment_id = %payment.id,
        customer_id = %customer.id,
        amount = %payment.amount,
        outstanding_after = %customer.outstanding_balance,
        "Payment recorded"
    );

    Ok(PaymentReceipt {
        outstanding_after: customer.outstanding_balance,
        payment,
        overpaid,
    })
}

async fn attempt_payment(
    db: &DbState,
    request: &RecordPaymentRequest,
    payment_id: &str,
) -> Result<Result<(Payment, Customer, Money), DbError>, ApiError> {
    let store = db.inner();
    let now = Utc::now();

    let customer = store.customers().require(&request.customer_id).await?;
    let overpaid = overpayment(&customer, request.amount);
    let mut updated = record_payment(&customer, request.amount)?;
    updated.updated_at = now;

    let payment = Payment {
        id: payment_id.to_string(),
        customer_id: customer.id.clone(),
        amount: request.amount,
        date: request.paid_at.unwrap_or(now),
        method: request.method,
        reference_number: request.reference_number.clone(),
        received_by: request.received_by.clone(),
        created_at: now,
    };

    let committed = async {
        let mut tx = store.begin().await?;
        let stored =
            CustomerRepository::update_balance_in_tx(&mut *tx, &updated, customer.version).await?;
        PaymentRepository::insert_in_tx(&mut *tx, &payment).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok::<Customer, DbError>(stored)
    }
    .await;

    Ok(committed.map(|customer| (payment, customer, overpaid)))
}

/// Limit, balance, available credit and utilisation for one customer.
pub async fn credit_status(db: &DbState, customer_id: &str) -> Result<CreditStatus, ApiError> {
    let customer = db.inner().customers().require(customer_id).await?;
    Ok(get_credit_status(&customer))
}
