//! # Sale Commands
//!
//! ## record_sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  operator's open shift ──► NoOpenShift if none                         │
//! │  tank + fuel type      ──► price and tax snapshot                      │
//! │  compute_sale          ──► base / tax / total                          │
//! │  apply_sale_deduction  ──► InsufficientStock, stock never clamped      │
//! │  credit? customer      ──► ensure_credit_available, apply_credit_sale  │
//! │       │                                                                 │
//! │       ▼  one transaction                                               │
//! │  shift still open? + tank CAS + sale insert (+ customer CAS)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## void_sale
//! The status flip to `voided` runs first in the transaction and matches
//! only a sale that is not voided yet, so stock and credit come back once
//! however many terminals void the same sale.

use chrono::{DateTime, Utc};
use fuelstation_core::credit::{apply_credit_sale, ensure_credit_available, record_payment};
use fuelstation_core::sales::compute_sale;
use fuelstation_core::stock::{apply_purchase_addition, apply_sale_deduction};
use fuelstation_core::{
    new_id, CoreError, Customer, CustomerStatus, Litres, Money, PaymentMethod, Sale, SaleStatus,
    Tank,
};
use fuelstation_db::{
    CustomerRepository, DbError, SaleRepository, ShiftRepository, TankRepository,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::commands::retry_on_conflict;
use crate::error::ApiError;
use crate::state::{ConfigState, DbState};

/// A sale as entered at the pump.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSaleRequest {
    pub operator_id: String,
    pub tank_id: String,
    pub nozzle_id: Option<String>,
    pub quantity: Litres,
    pub payment_method: PaymentMethod,
    /// Required for credit sales.
    pub customer_id: Option<String>,
    /// When the fuel was sold. Defaults to now.
    pub sold_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceipt {
    pub sale: Sale,
    pub tank_stock_after: Litres,
    /// The tank dropped below its minimum with this sale.
    pub low_stock: bool,
    /// Credit sales only.
    pub customer_outstanding: Option<Money>,
}

/// Records one fuel sale.
///
/// ## Errors
/// - `SHIFT_STATE` when the operator has no open shift
/// - `INSUFFICIENT_STOCK` when the tank cannot cover the quantity
/// - `CREDIT_LIMIT_EXCEEDED` for a credit sale past the customer's limit
/// - `CONFLICT` after `cas_max_retries` lost compare-and-swap races
pub async fn record_sale(
    db: &DbState,
    config: &ConfigState,
    request: RecordSaleRequest,
) -> Result<SaleReceipt, ApiError> {
    debug!(
        operator_id = %request.operator_id,
        tank_id = %request.tank_id,
        quantity = %request.quantity,
        method = %request.payment_method,
        "record_sale command"
    );

    if request.payment_method == PaymentMethod::Credit && request.customer_id.is_none() {
        return Err(ApiError::validation("A credit sale needs a customer"));
    }

    let sale_id = new_id();
    let request = &request;
    let sale_id = sale_id.as_str();

    let (sale, tank, customer) = retry_on_conflict(config.cas_max_retries, "record_sale", move || {
        attempt_sale(db, request, sale_id)
    })
    .await?;

    info!(
        sale_id = %sale.id,
        tank_id = %tank.id,
        total = %sale.total_amount,
        method = %sale.payment_method,
        stock_after = %tank.current_stock,
        "Sale recorded"
    );

    if tank.is_low_stock() {
        warn!(
            tank_id = %tank.id,
            current_stock = %tank.current_stock,
            minimum_stock = %tank.minimum_stock,
            "Tank below minimum stock"
        );
    }

    Ok(SaleReceipt {
        tank_stock_after: tank.current_stock,
        low_stock: tank.is_low_stock(),
        customer_outstanding: customer.map(|c| c.outstanding_balance),
        sale,
    })
}

type SaleCommit = (Sale, Tank, Option<Customer>);

async fn attempt_sale(
    db: &DbState,
    request: &RecordSaleRequest,
    sale_id: &str,
) -> Result<Result<SaleCommit, DbError>, ApiError> {
    let store = db.inner();
    let now = Utc::now();

    // Fetch
    let shift = store
        .shifts()
        .find_open_shift(&request.operator_id)
        .await?
        .ok_or_else(|| CoreError::NoOpenShift {
            operator_id: request.operator_id.clone(),
        })?;
    let tank = store.tanks().require(&request.tank_id).await?;
    let fuel_type = store.fuel_types().require(&tank.fuel_type_id).await?;
    let customer = match &request.customer_id {
        Some(id) => Some(store.customers().require(id).await?),
        None => None,
    };

    // Compute
    let amounts = compute_sale(request.quantity, fuel_type.unit_price, fuel_type.tax_percentage)?;

    let mut updated_tank = apply_sale_deduction(&tank, request.quantity)?;
    updated_tank.last_reading_date = Some(now);
    updated_tank.updated_at = now;

    let updated_customer = match (&customer, request.payment_method) {
        (Some(customer), PaymentMethod::Credit) => {
            if customer.status != CustomerStatus::Active {
                return Err(ApiError::validation(format!(
                    "Customer {} is {} and cannot buy on credit",
                    customer.id, customer.status
                )));
            }
            ensure_credit_available(customer, amounts.total_amount)?;
            let mut updated = apply_credit_sale(customer, amounts.total_amount)?;
            updated.updated_at = now;
            Some(updated)
        }
        _ => None,
    };

    let sale = Sale {
        id: sale_id.to_string(),
        date: request.sold_at.unwrap_or(now),
        tank_id: tank.id.clone(),
        nozzle_id: request.nozzle_id.clone(),
        fuel_type_id: fuel_type.id.clone(),
        quantity: request.quantity,
        unit_price: fuel_type.unit_price,
        tax_percentage: fuel_type.tax_percentage,
        base_amount: amounts.base_amount,
        tax_amount: amounts.tax_amount,
        total_amount: amounts.total_amount,
        payment_method: request.payment_method,
        customer_id: customer.as_ref().map(|c| c.id.clone()),
        operator_id: request.operator_id.clone(),
        shift_id: shift.id.clone(),
        status: SaleStatus::Completed,
        created_at: now,
    };

    // Persist
    let committed = commit_sale(
        db,
        &sale,
        &updated_tank,
        tank.version,
        updated_customer.as_ref().zip(customer.as_ref().map(|c| c.version)),
    )
    .await;

    Ok(committed.map(|(tank, customer)| (sale, tank, customer)))
}

async fn commit_sale(
    db: &DbState,
    sale: &Sale,
    tank: &Tank,
    tank_version: i64,
    customer: Option<(&Customer, i64)>,
) -> Result<(Tank, Option<Customer>), DbError> {
    let mut tx = db.inner().begin().await?;

    // A close that committed since the shift was read wins
    ShiftRepository::claim_open_in_tx(&mut *tx, &sale.shift_id).await?;
    let stored_tank = TankRepository::update_stock_in_tx(&mut *tx, tank, tank_version).await?;
    SaleRepository::insert_in_tx(&mut *tx, sale).await?;
    let stored_customer = match customer {
        Some((customer, version)) => {
            Some(CustomerRepository::update_balance_in_tx(&mut *tx, customer, version).await?)
        }
        None => None,
    };

    tx.commit()
        .await
        .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

    Ok((stored_tank, stored_customer))
}

/// Voids a sale and puts its fuel back into the tank (and its amount back
/// on the customer's credit line for credit sales).
pub async fn void_sale(
    db: &DbState,
    config: &ConfigState,
    sale_id: &str,
) -> Result<Sale, ApiError> {
    debug!(sale_id = %sale_id, "void_sale command");

    let store = db.inner();
    let sale = store
        .sales()
        .get_by_id(sale_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", sale_id))?;

    if sale.is_voided() {
        return Err(ApiError::validation(format!("Sale {} is already voided", sale_id)));
    }

    let sale_ref = &sale;
    retry_on_conflict(config.cas_max_retries, "void_sale", move || {
        attempt_void(db, sale_ref)
    })
    .await?;

    info!(sale_id = %sale.id, total = %sale.total_amount, "Sale voided");

    Ok(Sale {
        status: SaleStatus::Voided,
        ..sale
    })
}

async fn attempt_void(db: &DbState, sale: &Sale) -> Result<Result<(), DbError>, ApiError> {
    let store = db.inner();
    let now = Utc::now();

    let tank = store.tanks().require(&sale.tank_id).await?;
    let mut restored_tank = apply_purchase_addition(&tank, sale.quantity)?;
    restored_tank.last_reading_date = Some(now);
    restored_tank.updated_at = now;

    let restored_customer = match (&sale.customer_id, sale.payment_method) {
        (Some(id), PaymentMethod::Credit) => {
            let customer = store.customers().require(id).await?;
            let mut restored = record_payment(&customer, sale.total_amount)?;
            restored.updated_at = now;
            Some((restored, customer.version))
        }
        _ => None,
    };

    let committed = async {
        let mut tx = store.begin().await?;
        // Fails for every void but the first, before any stock moves
        SaleRepository::set_status_in_tx(&mut *tx, &sale.id, SaleStatus::Voided).await?;
        TankRepository::update_stock_in_tx(&mut *tx, &restored_tank, tank.version).await?;
        if let Some((customer, version)) = &restored_customer {
            CustomerRepository::update_balance_in_tx(&mut *tx, customer, *version).await?;
        }
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }
    .await;

    Ok(committed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::shift::open_shift;
    use crate::error::ErrorCode;
    use crate::testing::{seeded_station, CREDIT_CUSTOMER, OPERATOR, PETROL_TANK};
    use rust_decimal_macros::dec;

    fn cash_sale(litres: rust_decimal::Decimal) -> RecordSaleRequest {
        RecordSaleRequest {
            operator_id: OPERATOR.to_string(),
            tank_id: PETROL_TANK.to_string(),
            nozzle_id: Some("N1".to_string()),
            quantity: Litres::new(litres),
            payment_method: PaymentMethod::Cash,
            customer_id: None,
            sold_at: None,
        }
    }

    #[tokio::test]
    async fn test_sale_requires_open_shift() {
        let (db, config) = seeded_station().await;
        let err = record_sale(&db, &config, cash_sale(dec!(10))).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ShiftState);
    }

    #[tokio::test]
    async fn test_cash_sale_deducts_stock() {
        let (db, config) = seeded_station().await;
        open_shift(&db, &config, OPERATOR, Money::from_major(5_000)).await.unwrap();

        let receipt = record_sale(&db, &config, cash_sale(dec!(50))).await.unwrap();

        // 50 L at Rs. 289.50, no tax
        assert_eq!(receipt.sale.total_amount, Money::from_cents(1_447_500));
        assert_eq!(receipt.tank_stock_after, Litres::new(dec!(9950)));
        assert!(!receipt.low_stock);
        assert_eq!(receipt.customer_outstanding, None);

        let tank = db.inner().tanks().require(PETROL_TANK).await.unwrap();
        assert_eq!(tank.current_stock, Litres::new(dec!(9950)));
        assert_eq!(tank.version, 2);
        assert!(tank.last_reading_date.is_some());
    }

    #[tokio::test]
    async fn test_oversell_rejected_and_nothing_written() {
        let (db, config) = seeded_station().await;
        open_shift(&db, &config, OPERATOR, Money::zero()).await.unwrap();

        let err = record_sale(&db, &config, cash_sale(dec!(10001))).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let tank = db.inner().tanks().require(PETROL_TANK).await.unwrap();
        assert_eq!(tank.current_stock, Litres::new(dec!(10000)));
        assert_eq!(tank.version, 1);
    }

    #[tokio::test]
    async fn test_credit_sale_updates_balance() {
        let (db, config) = seeded_station().await;
        open_shift(&db, &config, OPERATOR, Money::zero()).await.unwrap();

        let mut request = cash_sale(dec!(100));
        request.payment_method = PaymentMethod::Credit;
        request.customer_id = Some(CREDIT_CUSTOMER.to_string());

        let receipt = record_sale(&db, &config, request).await.unwrap();
        assert_eq!(receipt.customer_outstanding, Some(Money::from_major(28_950)));

        let customer = db.inner().customers().require(CREDIT_CUSTOMER).await.unwrap();
        assert_eq!(customer.outstanding_balance, Money::from_major(28_950));
        assert_eq!(customer.version, 2);
    }

    #[tokio::test]
    async fn test_credit_limit_enforced() {
        let (db, config) = seeded_station().await;
        open_shift(&db, &config, OPERATOR, Money::zero()).await.unwrap();

        // Limit is Rs. 50,000; 200 L is Rs. 57,900
        let mut request = cash_sale(dec!(200));
        request.payment_method = PaymentMethod::Credit;
        request.customer_id = Some(CREDIT_CUSTOMER.to_string());

        let err = record_sale(&db, &config, request).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CreditLimitExceeded);

        let tank = db.inner().tanks().require(PETROL_TANK).await.unwrap();
        assert_eq!(tank.current_stock, Litres::new(dec!(10000)));
    }

    #[tokio::test]
    async fn test_credit_sale_without_customer_rejected() {
        let (db, config) = seeded_station().await;
        let mut request = cash_sale(dec!(10));
        request.payment_method = PaymentMethod::Credit;
        let err = record_sale(&db, &config, request).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_void_restores_stock_and_balance() {
        let (db, config) = seeded_station().await;
        open_shift(&db, &config, OPERATOR, Money::zero()).await.unwrap();

        let mut request = cash_sale(dec!(10));
        request.payment_method = PaymentMethod::Credit;
        request.customer_id = Some(CREDIT_CUSTOMER.to_string());
        let receipt = record_sale(&db, &config, request).await.unwrap();

        let voided = void_sale(&db, &config, &receipt.sale.id).await.unwrap();
        assert!(voided.is_voided());

        let tank = db.inner().tanks().require(PETROL_TANK).await.unwrap();
        assert_eq!(tank.current_stock, Litres::new(dec!(10000)));
        let customer = db.inner().customers().require(CREDIT_CUSTOMER).await.unwrap();
        assert_eq!(customer.outstanding_balance, Money::zero());

        let err = void_sale(&db, &config, &receipt.sale.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_concurrent_voids_restore_once() {
        let (db, config) = seeded_station().await;
        open_shift(&db, &config, OPERATOR, Money::zero()).await.unwrap();

        let mut request = cash_sale(dec!(10));
        request.payment_method = PaymentMethod::Credit;
        request.customer_id = Some(CREDIT_CUSTOMER.to_string());
        let receipt = record_sale(&db, &config, request).await.unwrap();
        let id = receipt.sale.id.as_str();

        let (a, b) = tokio::join!(void_sale(&db, &config, id), void_sale(&db, &config, id));
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let err = a.err().or(b.err()).unwrap();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let tank = db.inner().tanks().require(PETROL_TANK).await.unwrap();
        assert_eq!(tank.current_stock, Litres::new(dec!(10000)));
        let customer = db.inner().customers().require(CREDIT_CUSTOMER).await.unwrap();
        assert_eq!(customer.outstanding_balance, Money::zero());
    }

    #[tokio::test]
    async fn test_sale_on_closed_shift_rejected_in_transaction() {
        let (db, config) = seeded_station().await;
        let shift = open_shift(&db, &config, OPERATOR, Money::zero()).await.unwrap();
        let receipt = record_sale(&db, &config, cash_sale(dec!(10))).await.unwrap();
        let tank = db.inner().tanks().require(PETROL_TANK).await.unwrap();

        // The shift closes between the read and the commit
        crate::commands::shift::close_shift(&db, &config, OPERATOR, Money::from_major(2_895))
            .await
            .unwrap();

        let late = Sale {
            id: new_id(),
            ..receipt.sale
        };
        assert_eq!(late.shift_id, shift.id);
        let err = commit_sale(&db, &late, &tank, tank.version, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ShiftNotOpen { .. }));
        assert_eq!(ApiError::from(err).code, ErrorCode::ShiftState);

        let stored = db.inner().tanks().require(PETROL_TANK).await.unwrap();
        assert_eq!(stored.version, tank.version);
        assert!(db.inner().sales().get_by_id(&late.id).await.unwrap().is_none());
    }
}
