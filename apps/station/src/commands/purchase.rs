//! # Purchase and Expense Commands
//!
//! A supplier delivery adds stock to one tank and records its landed cost;
//! an expense is a plain ledger line for the P&L.

use chrono::{DateTime, Utc};
use fuelstation_core::sales::compute_purchase_cost;
use fuelstation_core::stock::apply_purchase_addition;
use fuelstation_core::types::TaxRate;
use fuelstation_core::validation::{
    validate_positive_decimal, validate_purchase_input, validate_required,
};
use fuelstation_core::{new_id, CoreError, Expense, Litres, Money, Purchase, Tank};
use fuelstation_db::{DbError, PurchaseRepository, TankRepository};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::commands::retry_on_conflict;
use crate::error::ApiError;
use crate::state::{ConfigState, DbState};

/// A tanker delivery as read off the supplier's invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivePurchaseRequest {
    pub tank_id: String,
    pub supplier_name: String,
    pub invoice_number: String,
    pub quantity: Litres,
    /// Cost per litre before tax.
    pub rate: Money,
    #[serde(default)]
    pub tax_percentage: TaxRate,
    pub received_by: String,
    /// When the delivery arrived. Defaults to now.
    pub received_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordExpenseRequest {
    pub category: String,
    pub description: Option<String>,
    pub amount: Money,
    pub recorded_by: String,
    pub spent_at: Option<DateTime<Utc>>,
}

/// Receives a delivery into a tank.
///
/// ## Errors
/// - `VALIDATION_ERROR` for a blank supplier or invoice, or a non-positive
///   quantity or rate
/// - `CAPACITY_EXCEEDED` when the delivery does not fit the tank
pub async fn receive_purchase(
    db: &DbState,
    config: &ConfigState,
    request: ReceivePurchaseRequest,
) -> Result<Purchase, ApiError> {
    debug!(
        tank_id = %request.tank_id,
        supplier = %request.supplier_name,
        quantity = %request.quantity,
        "receive_purchase command"
    );

    validate_purchase_input(
        &request.supplier_name,
        &request.invoice_number,
        request.quantity,
        request.rate,
    )
    .map_err(CoreError::from)?;
    validate_required("received_by", &request.received_by).map_err(CoreError::from)?;

    let purchase_id = new_id();
    let request = &request;
    let purchase_id = purchase_id.as_str();

    let (purchase, tank) =
        retry_on_conflict(config.cas_max_retries, "receive_purchase", move || {
            attempt_purchase(db, request, purchase_id)
        })
        .await?;

    info!(
        purchase_id = %purchase.id,
        tank_id = %tank.id,
        quantity = %purchase.quantity,
        total_cost = %purchase.total_cost,
        stock_after = %tank.current_stock,
        "Purchase received"
    );

    Ok(purchase)
}

async fn attempt_purchase(
    db: &DbState,
    request: &ReceivePurchaseRequest,
    purchase_id: &str,
) -> Result<Result<(Purchase, Tank), DbError>, ApiError> {
    let store = db.inner();
    let now = Utc::now();

    let tank = store.tanks().require(&request.tank_id).await?;
    let cost = compute_purchase_cost(request.quantity, request.rate, request.tax_percentage)?;

    let mut updated_tank = apply_purchase_addition(&tank, request.quantity)?;
    updated_tank.last_reading_date = Some(now);
    updated_tank.updated_at = now;

    let purchase = Purchase {
        id: purchase_id.to_string(),
        purchase_date: request.received_at.unwrap_or(now),
        supplier_name: request.supplier_name.trim().to_string(),
        invoice_number: request.invoice_number.trim().to_string(),
        fuel_type_id: tank.fuel_type_id.clone(),
        tank_id: tank.id.clone(),
        quantity: request.quantity,
        rate: request.rate,
        tax_amount: cost.tax_amount,
        total_cost: cost.total_amount,
        created_by: request.received_by.clone(),
        created_at: now,
    };

    let committed = async {
        let mut tx = store.begin().await?;
        let stored =
            TankRepository::update_stock_in_tx(&mut *tx, &updated_tank, tank.version).await?;
        PurchaseRepository::insert_in_tx(&mut *tx, &purchase).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok::<Tank, DbError>(stored)
    }
    .await;

    Ok(committed.map(|tank| (purchase, tank)))
}

/// Records an operating expense.
pub async fn record_expense(
    db: &DbState,
    request: RecordExpenseRequest,
) -> Result<Expense, ApiError> {
    debug!(category = %request.category, amount = %request.amount, "record_expense command");

    validate_required("category", &request.category).map_err(CoreError::from)?;
    validate_required("recorded_by", &request.recorded_by).map_err(CoreError::from)?;
    validate_positive_decimal("amount", request.amount.amount()).map_err(CoreError::from)?;

    let now = Utc::now();
    let expense = Expense {
        id: new_id(),
        expense_date: request.spent_at.unwrap_or(now),
        category: request.category.trim().to_string(),
        description: request.description,
        amount: request.amount,
        created_by: request.recorded_by,
        created_at: now,
    };

    db.inner().expenses().insert(&expense).await?;

    info!(
        expense_id = %expense.id,
        category = %expense.category,
        amount = %expense.amount,
        "Expense recorded"
    );
    Ok(expense)
}
