//! # Station Commands Module
//!
//! Every operation the station exposes: plain async functions taking the
//! state they need and returning `Result<T, ApiError>`.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (exports, CAS retry loop)
//! ├── sale.rs      ◄─── record_sale, void_sale
//! ├── purchase.rs  ◄─── receive_purchase, record_expense
//! ├── shift.rs     ◄─── open_shift, close_shift
//! ├── customer.rs  ◄─── record_customer_payment, credit_status
//! └── report.rs    ◄─── daily/monthly P&L, sales summary, low stock, aging
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Fetch → Compute → Persist                            │
//! │                                                                         │
//! │  1. Fetch    db.tanks().require(id)          (pool reads)              │
//! │  2. Compute  stock::apply_sale_deduction()   (pure engine)             │
//! │  3. Persist  db.begin()                                                │
//! │              TankRepository::update_stock_in_tx(.., tank.version)      │
//! │              SaleRepository::insert_in_tx(..)                          │
//! │              tx.commit()                                               │
//! │                                                                         │
//! │  VersionConflict at step 3? Another terminal committed first:          │
//! │  drop the transaction (rollback) and start again at step 1, up to      │
//! │  `cas_max_retries` times.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads always happen before `begin()`: an in-memory database has a
//! single pooled connection, which the open transaction holds.

pub mod customer;
pub mod purchase;
pub mod report;
pub mod sale;
pub mod shift;

use std::future::Future;

use fuelstation_db::DbError;
use tracing::warn;

use crate::error::ApiError;

/// Runs `attempt` until it commits, retrying on a stale compare-and-swap.
///
/// `attempt` returns `Err(ApiError)` for failures that a retry cannot fix
/// (engine rejections, missing records) and `Ok(Err(DbError))` for the
/// outcome of its commit.
pub(crate) async fn retry_on_conflict<T, F, Fut>(
    max_retries: u32,
    operation: &'static str,
    mut attempt: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Result<T, DbError>, ApiError>>,
{
    let mut retries = 0;
    loop {
        match attempt().await? {
            Ok(value) => return Ok(value),
            Err(err) if err.is_version_conflict() && retries < max_retries => {
                retries += 1;
                warn!(operation, retries, error = %err, "Compare-and-swap lost, retrying");
            }
            Err(err) => return Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::cell::Cell;

    #[tokio::test]
    async fn test_retries_until_commit() {
        let calls = Cell::new(0);
        let result = retry_on_conflict(3, "test", || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Ok(Err(DbError::version_conflict("Tank", "tank-1", n)))
                } else {
                    Ok(Ok(n))
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = Cell::new(0);
        let result: Result<(), ApiError> = retry_on_conflict(2, "test", || {
            calls.set(calls.get() + 1);
            async { Ok(Err(DbError::version_conflict("Tank", "tank-1", 1))) }
        })
        .await;

        assert_eq!(result.unwrap_err().code, ErrorCode::Conflict);
        // First try plus two retries
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), ApiError> = retry_on_conflict(3, "test", || {
            calls.set(calls.get() + 1);
            async { Ok(Err(DbError::QueryFailed("disk I/O error".to_string()))) }
        })
        .await;

        assert_eq!(result.unwrap_err().code, ErrorCode::DatabaseError);
        assert_eq!(calls.get(), 1);
    }
}
