//! # Report Commands
//!
//! Every report loads its rows for a half-open period and hands them to a
//! pure engine. Periods are cut at station-local midnight.
//!
//! ```text
//! daily_report(date) ──► Period::daily(date, offset)
//!                          │
//!                          ├── sales.list_between
//!                          ├── purchases.list_between
//!                          └── expenses.list_between
//!                          ▼
//!                        pnl::calculate_pl ──► PLReport
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use fuelstation_core::credit::{get_aging_report, AgingReport};
use fuelstation_core::pnl::{calculate_pl, PLReport, Period};
use fuelstation_core::sales::{summarize_sales, SalesSummary};
use fuelstation_core::stock::{low_stock_alerts, LowStockAlert};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{ConfigState, DbState};

/// Profit and loss for one station-local day.
pub async fn daily_report(
    db: &DbState,
    config: &ConfigState,
    date: NaiveDate,
) -> Result<PLReport, ApiError> {
    debug!(%date, "daily_report command");
    let period = Period::daily(date, config.utc_offset())?;
    pl_for_period(db, period).await
}

/// Profit and loss for one station-local calendar month.
pub async fn monthly_report(
    db: &DbState,
    config: &ConfigState,
    year: i32,
    month: u32,
) -> Result<PLReport, ApiError> {
    debug!(year, month, "monthly_report command");
    let period = Period::monthly(year, month, config.utc_offset())?;
    pl_for_period(db, period).await
}

async fn pl_for_period(db: &DbState, period: Period) -> Result<PLReport, ApiError> {
    let store = db.inner();
    let sales = store.sales().list_between(period.start, period.end).await?;
    let purchases = store.purchases().list_between(period.start, period.end).await?;
    let expenses = store.expenses().list_between(period.start, period.end).await?;

    let report = calculate_pl(period.start, period.end, &sales, &purchases, &expenses)?;

    info!(
        start = %period.start,
        end = %period.end,
        revenue = %report.revenue,
        net_profit = %report.net_profit,
        "P&L calculated"
    );
    Ok(report)
}

/// Sales grouped by payment method and fuel type for `[start, end)`.
pub async fn sales_summary(
    db: &DbState,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<SalesSummary, ApiError> {
    let period = Period::new(start, end)?;
    let sales = db.inner().sales().list_between(period.start, period.end).await?;
    Ok(summarize_sales(&sales))
}

/// Tanks below their minimum stock.
pub async fn low_stock_report(db: &DbState) -> Result<Vec<LowStockAlert>, ApiError> {
    let tanks = db.inner().tanks().list().await?;
    Ok(low_stock_alerts(&tanks))
}

/// Outstanding customer balances bucketed by age as of `as_of`.
pub async fn aging_report(db: &DbState, as_of: DateTime<Utc>) -> Result<AgingReport, ApiError> {
    let store = db.inner();
    let customers = store.customers().list().await?;
    let credit_sales = store.sales().list_credit_sales().await?;
    let payments = store.payments().list().await?;

    Ok(get_aging_report(&customers, &credit_sales, &payments, as_of))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::purchase::{record_expense, RecordExpenseRequest};
    use crate::commands::sale::{record_sale, RecordSaleRequest};
    use crate::commands::shift::open_shift;
    use crate::error::ErrorCode;
    use crate::testing::{seeded_station, CREDIT_CUSTOMER, OPERATOR, PETROL_TANK};
    use chrono::TimeZone;
    use fuelstation_core::credit::AgingBucket;
    use fuelstation_core::{Litres, Money, PaymentMethod};
    use rust_decimal_macros::dec;

    fn sale_at(
        litres: rust_decimal::Decimal,
        method: PaymentMethod,
        at: DateTime<Utc>,
    ) -> RecordSaleRequest {
        RecordSaleRequest {
            operator_id: OPERATOR.to_string(),
            tank_id: PETROL_TANK.to_string(),
            nozzle_id: None,
            quantity: Litres::new(litres),
            payment_method: method,
            customer_id: (method == PaymentMethod::Credit).then(|| CREDIT_CUSTOMER.to_string()),
            sold_at: Some(at),
        }
    }

    #[tokio::test]
    async fn test_daily_report_cuts_at_local_midnight() {
        let (db, config) = seeded_station().await;
        open_shift(&db, &config, OPERATOR, Money::zero()).await.unwrap();

        // 18:30 UTC on the 15th is 23:30 local; 19:30 UTC is already the 16th
        let late = Utc.with_ymd_and_hms(2024, 3, 15, 18, 30, 0).unwrap();
        let next_day = Utc.with_ymd_and_hms(2024, 3, 15, 19, 30, 0).unwrap();
        record_sale(&db, &config, sale_at(dec!(10), PaymentMethod::Cash, late))
            .await
            .unwrap();
        record_sale(&db, &config, sale_at(dec!(20), PaymentMethod::Cash, next_day))
            .await
            .unwrap();
        record_expense(
            &db,
            RecordExpenseRequest {
                category: "Wages".to_string(),
                description: None,
                amount: Money::from_major(1_000),
                recorded_by: "manager-1".to_string(),
                spent_at: Some(late),
            },
        )
        .await
        .unwrap();

        let report = daily_report(&db, &config, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
            .await
            .unwrap();
        assert_eq!(report.sales_count, 1);
        assert_eq!(report.revenue, Money::from_major(2_895));
        assert_eq!(report.operating_expenses, Money::from_major(1_000));
        assert_eq!(report.net_profit, Money::from_major(1_895));

        let month = monthly_report(&db, &config, 2024, 3).await.unwrap();
        assert_eq!(month.sales_count, 2);
    }

    #[tokio::test]
    async fn test_invalid_month_rejected() {
        let (db, config) = seeded_station().await;
        let err = monthly_report(&db, &config, 2024, 13).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_sales_summary_and_low_stock() {
        let (db, config) = seeded_station().await;
        open_shift(&db, &config, OPERATOR, Money::zero()).await.unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 6, 0, 0).unwrap();

        record_sale(&db, &config, sale_at(dec!(10), PaymentMethod::Cash, at))
            .await
            .unwrap();
        record_sale(&db, &config, sale_at(dec!(20), PaymentMethod::Credit, at))
            .await
            .unwrap();

        let summary = sales_summary(&db, at, at + chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.total_quantity, Litres::new(dec!(30)));
        assert_eq!(summary.by_payment_method[&PaymentMethod::Credit].count, 1);

        assert!(low_stock_report(&db).await.unwrap().is_empty());

        // Draw the tank down to 1,970 L, below its 2,000 L minimum
        record_sale(&db, &config, sale_at(dec!(8000), PaymentMethod::Cash, at))
            .await
            .unwrap();
        let alerts = low_stock_report(&db).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].shortfall, Litres::new(dec!(30)));
    }

    #[tokio::test]
    async fn test_aging_report_buckets_credit_sales() {
        let (db, config) = seeded_station().await;
        open_shift(&db, &config, OPERATOR, Money::zero()).await.unwrap();

        let as_of = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let old = as_of - chrono::Duration::days(45);
        let recent = as_of - chrono::Duration::days(3);
        record_sale(&db, &config, sale_at(dec!(10), PaymentMethod::Credit, old))
            .await
            .unwrap();
        record_sale(&db, &config, sale_at(dec!(20), PaymentMethod::Credit, recent))
            .await
            .unwrap();

        let report = aging_report(&db, as_of).await.unwrap();
        assert_eq!(report.customer_total(CREDIT_CUSTOMER), Money::from_major(8_685));
        assert_eq!(report.bucket_total(AgingBucket::Current), Money::from_major(5_790));
        assert_eq!(report.bucket_total(AgingBucket::Days31To60), Money::from_major(2_895));
    }
}
