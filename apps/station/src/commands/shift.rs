//! # Shift Commands
//!
//! ```text
//! open_shift ──► one open shift per operator (engine check + unique index)
//!      │
//!      ▼  sales attach to the open shift
//! close_shift ──► expected = opening cash + cash sales
//!                 variance = counted - expected
//!                 |variance| > threshold ──► warn!
//! ```
//!
//! The close lists the shift's sales and marks it closed in one transaction
//! that holds the shift's write lock, so no sale slips in between.

use chrono::Utc;
use fuelstation_core::shift::{self, ReconciledShift, ReconciliationOutcome};
use fuelstation_core::{CoreError, Money, Shift};
use fuelstation_db::{DbError, SaleRepository, ShiftRepository};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::state::{ConfigState, DbState};

/// What the operator sees after handing over the till.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftReport {
    #[serde(flatten)]
    pub reconciliation: ReconciledShift,
    /// `|variance|` is above the configured alert threshold.
    pub variance_alert: bool,
}

/// Opens a shift for `operator_id` with the counted opening float.
pub async fn open_shift(
    db: &DbState,
    config: &ConfigState,
    operator_id: &str,
    opening_cash: Money,
) -> Result<Shift, ApiError> {
    debug!(operator_id = %operator_id, opening_cash = %opening_cash, "open_shift command");

    let store = db.inner();
    let existing: Vec<Shift> = store
        .shifts()
        .find_open_shift(operator_id)
        .await?
        .into_iter()
        .collect();

    let opened_at = Utc::now().with_timezone(&config.utc_offset());
    let shift = shift::open_shift(&existing, operator_id, opening_cash, opened_at)?;

    store.shifts().insert(&shift).await?;
    Ok(shift)
}

/// Closes the operator's open shift and reconciles the till.
///
/// ## Errors
/// - `SHIFT_STATE` when the operator has no open shift
/// - `VALIDATION_ERROR` for a negative closing count
/// - `SHIFT_STATE` when another terminal closed the shift first
pub async fn close_shift(
    db: &DbState,
    config: &ConfigState,
    operator_id: &str,
    closing_cash: Money,
) -> Result<ShiftReport, ApiError> {
    debug!(operator_id = %operator_id, closing_cash = %closing_cash, "close_shift command");

    let store = db.inner();
    let open = store
        .shifts()
        .find_open_shift(operator_id)
        .await?
        .ok_or_else(|| CoreError::NoOpenShift {
            operator_id: operator_id.to_string(),
        })?;

    let mut tx = store.begin().await?;
    ShiftRepository::claim_open_in_tx(&mut *tx, &open.id).await?;
    let sales = SaleRepository::list_for_shift_in_tx(&mut *tx, &open.id).await?;
    let reconciliation = shift::close_shift(&open, closing_cash, &sales, Utc::now())?;
    ShiftRepository::close_in_tx(&mut *tx, &reconciliation.shift).await?;
    tx.commit()
        .await
        .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

    let variance_alert = reconciliation.exceeds_threshold(config.variance_alert_threshold);

    info!(
        shift_id = %reconciliation.shift.id,
        operator_id = %operator_id,
        sales = reconciliation.sales_count,
        expected_cash = %reconciliation.expected_cash,
        variance = %reconciliation.variance,
        "Shift reconciled"
    );

    if variance_alert {
        let kind = match reconciliation.outcome {
            ReconciliationOutcome::Shortage => "shortage",
            _ => "excess",
        };
        warn!(
            shift_id = %reconciliation.shift.id,
            operator_id = %operator_id,
            variance = %reconciliation.variance,
            threshold = %config.variance_alert_threshold,
            kind,
            "Cash variance above alert threshold"
        );
    }

    Ok(ShiftReport {
        reconciliation,
        variance_alert,
    })
}
