//! # Sale Repository
//!
//! Sales are written once and only their status changes afterwards.
//! `voided` is terminal: no status update matches a voided row.
//! Listings include voided sales; the engines skip them.

use chrono::{DateTime, Utc};
use fuelstation_core::{Sale, SaleStatus};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::codec::{
    decode_enum, decode_litres, decode_money, decode_rate, decode_ts, encode_litres, encode_money,
    encode_rate, encode_ts,
};
use crate::error::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    date: String,
    tank_id: String,
    nozzle_id: Option<String>,
    fuel_type_id: String,
    quantity: String,
    unit_price: String,
    tax_percentage: String,
    base_amount: String,
    tax_amount: String,
    total_amount: String,
    payment_method: String,
    customer_id: Option<String>,
    operator_id: String,
    shift_id: String,
    status: String,
    created_at: String,
}

impl TryFrom<SaleRow> for Sale {
    type Error = DbError;

    fn try_from(row: SaleRow) -> DbResult<Self> {
        Ok(Sale {
            date: decode_ts("sales.date", &row.date)?,
            quantity: decode_litres("sales.quantity", &row.quantity)?,
            unit_price: decode_money("sales.unit_price", &row.unit_price)?,
            tax_percentage: decode_rate("sales.tax_percentage", &row.tax_percentage)?,
            base_amount: decode_money("sales.base_amount", &row.base_amount)?,
            tax_amount: decode_money("sales.tax_amount", &row.tax_amount)?,
            total_amount: decode_money("sales.total_amount", &row.total_amount)?,
            payment_method: decode_enum("sales.payment_method", &row.payment_method)?,
            status: decode_enum("sales.status", &row.status)?,
            created_at: decode_ts("sales.created_at", &row.created_at)?,
            id: row.id,
            tank_id: row.tank_id,
            nozzle_id: row.nozzle_id,
            fuel_type_id: row.fuel_type_id,
            customer_id: row.customer_id,
            operator_id: row.operator_id,
            shift_id: row.shift_id,
        })
    }
}

/// Repository for sales.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    pub async fn insert(&self, sale: &Sale) -> DbResult<()> {
        insert_sale(&self.pool, sale).await
    }

    /// Inserts a sale inside a caller-owned transaction, next to the tank
    /// and customer updates it causes.
    pub async fn insert_in_tx(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        insert_sale(conn, sale).await
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        debug!(sale_id = %id, "Fetching sale");

        let row = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT id, date, tank_id, nozzle_id, fuel_type_id, quantity, unit_price,
                   tax_percentage, base_amount, tax_amount, total_amount, payment_method,
                   customer_id, operator_id, shift_id, status, created_at
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Sale::try_from).transpose()
    }

    /// Sales with `start <= date < end`, oldest first.
    pub async fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Sale>> {
        debug!(%start, %end, "Listing sales in period");

        let rows = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT id, date, tank_id, nozzle_id, fuel_type_id, quantity, unit_price,
                   tax_percentage, base_amount, tax_amount, total_amount, payment_method,
                   customer_id, operator_id, shift_id, status, created_at
            FROM sales
            WHERE date >= ?1 AND date < ?2
            ORDER BY date, id
            "#,
        )
        .bind(encode_ts(&start))
        .bind(encode_ts(&end))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Sale::try_from).collect()
    }

    /// Every sale recorded under a shift.
    pub async fn list_for_shift(&self, shift_id: &str) -> DbResult<Vec<Sale>> {
        list_by_shift(&self.pool, shift_id).await
    }

    /// [`list_for_shift`](Self::list_for_shift) on a transaction's
    /// connection, so the close that follows sees exactly these sales.
    pub async fn list_for_shift_in_tx(
        conn: &mut SqliteConnection,
        shift_id: &str,
    ) -> DbResult<Vec<Sale>> {
        list_by_shift(conn, shift_id).await
    }

    /// Credit sales carrying a customer, newest first. Input for the aging
    /// report.
    pub async fn list_credit_sales(&self) -> DbResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT id, date, tank_id, nozzle_id, fuel_type_id, quantity, unit_price,
                   tax_percentage, base_amount, tax_amount, total_amount, payment_method,
                   customer_id, operator_id, shift_id, status, created_at
            FROM sales
            WHERE payment_method = 'credit' AND customer_id IS NOT NULL
            ORDER BY date DESC, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Sale::try_from).collect()
    }

    /// Moves a sale to `verified` or `voided`.
    pub async fn set_status(&self, id: &str, status: SaleStatus) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        update_status(&mut *conn, id, status).await
    }

    /// Status change inside a caller-owned transaction, next to the stock
    /// a void puts back. Run it before the stock write: of two voids racing
    /// on one sale, only the first matches the row.
    pub async fn set_status_in_tx(
        conn: &mut SqliteConnection,
        id: &str,
        status: SaleStatus,
    ) -> DbResult<()> {
        update_status(conn, id, status).await
    }
}

async fn list_by_shift<'e, E>(executor: E, shift_id: &str) -> DbResult<Vec<Sale>>
where
    E: SqliteExecutor<'e>,
{
    debug!(shift_id = %shift_id, "Listing sales for shift");

    let rows = sqlx::query_as::<_, SaleRow>(
        r#"
        SELECT id, date, tank_id, nozzle_id, fuel_type_id, quantity, unit_price,
               tax_percentage, base_amount, tax_amount, total_amount, payment_method,
               customer_id, operator_id, shift_id, status, created_at
        FROM sales
        WHERE shift_id = ?1
        ORDER BY date, id
        "#,
    )
    .bind(shift_id)
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(Sale::try_from).collect()
}

/// ## Errors
/// - [`DbError::NotFound`] for an unknown sale
/// - [`DbError::Invalid`] when the sale is already voided
async fn update_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: SaleStatus,
) -> DbResult<()> {
    debug!(sale_id = %id, status = %status, "Updating sale status");

    let result = sqlx::query("UPDATE sales SET status = ?1 WHERE id = ?2 AND status != 'voided'")
        .bind(status.as_str())
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sales WHERE id = ?1")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        return Err(if exists > 0 {
            DbError::invalid("Sale", format!("Sale {} is already voided", id))
        } else {
            DbError::not_found("Sale", id)
        });
    }
    Ok(())
}

async fn insert_sale<'e, E>(executor: E, sale: &Sale) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(
        sale_id = %sale.id,
        tank_id = %sale.tank_id,
        total = %sale.total_amount,
        method = %sale.payment_method,
        "Inserting sale"
    );

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, date, tank_id, nozzle_id, fuel_type_id, quantity, unit_price,
            tax_percentage, base_amount, tax_amount, total_amount, payment_method,
            customer_id, operator_id, shift_id, status, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
        "#,
    )
    .bind(&sale.id)
    .bind(encode_ts(&sale.date))
    .bind(&sale.tank_id)
    .bind(&sale.nozzle_id)
    .bind(&sale.fuel_type_id)
    .bind(encode_litres(&sale.quantity))
    .bind(encode_money(&sale.unit_price))
    .bind(encode_rate(&sale.tax_percentage))
    .bind(encode_money(&sale.base_amount))
    .bind(encode_money(&sale.tax_amount))
    .bind(encode_money(&sale.total_amount))
    .bind(sale.payment_method.as_str())
    .bind(&sale.customer_id)
    .bind(&sale.operator_id)
    .bind(&sale.shift_id)
    .bind(sale.status.as_str())
    .bind(encode_ts(&sale.created_at))
    .execute(executor)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::fixtures::{sale, seeded_db, ts};
    use crate::{DbError, SaleRepository};
    use fuelstation_core::{Money, PaymentMethod, SaleStatus};

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = seeded_db().await;
        let s = sale("s1", ts(2024, 3, 15, 10, 0), PaymentMethod::Cash, Money::from_major(2895));
        db.sales().insert(&s).await.unwrap();

        let loaded = db.sales().get_by_id("s1").await.unwrap().unwrap();
        assert_eq!(loaded, s);
    }

    #[tokio::test]
    async fn test_list_between_is_half_open() {
        let db = seeded_db().await;
        let start = ts(2024, 3, 15, 0, 0);
        let end = ts(2024, 3, 16, 0, 0);
        for (id, at) in [("at-start", start), ("inside", ts(2024, 3, 15, 12, 0)), ("at-end", end)] {
            db.sales()
                .insert(&sale(id, at, PaymentMethod::Cash, Money::from_major(100)))
                .await
                .unwrap();
        }

        let ids: Vec<String> = db
            .sales()
            .list_between(start, end)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["at-start", "inside"]);
    }

    #[tokio::test]
    async fn test_list_for_shift_and_credit() {
        let db = seeded_db().await;
        let mut credit = sale("s2", ts(2024, 3, 15, 11, 0), PaymentMethod::Credit, Money::from_major(500));
        credit.customer_id = Some("cust-1".to_string());
        db.sales()
            .insert(&sale("s1", ts(2024, 3, 15, 10, 0), PaymentMethod::Cash, Money::from_major(100)))
            .await
            .unwrap();
        db.sales().insert(&credit).await.unwrap();

        assert_eq!(db.sales().list_for_shift("shift-1").await.unwrap().len(), 2);
        assert!(db.sales().list_for_shift("other").await.unwrap().is_empty());

        let credit_sales = db.sales().list_credit_sales().await.unwrap();
        assert_eq!(credit_sales.len(), 1);
        assert_eq!(credit_sales[0].customer_id.as_deref(), Some("cust-1"));
    }

    #[tokio::test]
    async fn test_set_status() {
        let db = seeded_db().await;
        db.sales()
            .insert(&sale("s1", ts(2024, 3, 15, 10, 0), PaymentMethod::Cash, Money::from_major(100)))
            .await
            .unwrap();

        db.sales().set_status("s1", SaleStatus::Voided).await.unwrap();
        let loaded = db.sales().get_by_id("s1").await.unwrap().unwrap();
        assert!(loaded.is_voided());

        let err = db.sales().set_status("missing", SaleStatus::Verified).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_voided_is_terminal() {
        let db = seeded_db().await;
        db.sales()
            .insert(&sale("s1", ts(2024, 3, 15, 10, 0), PaymentMethod::Cash, Money::from_major(100)))
            .await
            .unwrap();

        let mut tx = db.begin().await.unwrap();
        SaleRepository::set_status_in_tx(&mut *tx, "s1", SaleStatus::Voided)
            .await
            .unwrap();
        let err = SaleRepository::set_status_in_tx(&mut *tx, "s1", SaleStatus::Voided)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Invalid { .. }));
        tx.commit().await.unwrap();

        let err = db.sales().set_status("s1", SaleStatus::Verified).await.unwrap_err();
        assert!(matches!(err, DbError::Invalid { .. }));
        assert!(db.sales().get_by_id("s1").await.unwrap().unwrap().is_voided());
    }

    #[tokio::test]
    async fn test_list_for_shift_in_tx_sees_own_writes() {
        let db = seeded_db().await;
        let s = sale("s1", ts(2024, 3, 15, 10, 0), PaymentMethod::Cash, Money::from_major(100));

        let mut tx = db.begin().await.unwrap();
        SaleRepository::insert_in_tx(&mut *tx, &s).await.unwrap();
        let listed = SaleRepository::list_for_shift_in_tx(&mut *tx, "shift-1")
            .await
            .unwrap();
        assert_eq!(listed, vec![s]);
    }

    #[tokio::test]
    async fn test_sale_for_unknown_tank_rejected() {
        let db = seeded_db().await;
        let mut s = sale("s1", ts(2024, 3, 15, 10, 0), PaymentMethod::Cash, Money::from_major(100));
        s.tank_id = "missing".to_string();
        let err = db.sales().insert(&s).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
