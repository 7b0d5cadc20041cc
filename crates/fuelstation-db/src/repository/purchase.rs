//! # Purchase Repository
//!
//! Supplier deliveries. A purchase is stored in the same transaction as
//! the tank stock it adds.

use chrono::{DateTime, Utc};
use fuelstation_core::Purchase;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::codec::{decode_litres, decode_money, decode_ts, encode_litres, encode_money, encode_ts};
use crate::error::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct PurchaseRow {
    id: String,
    purchase_date: String,
    supplier_name: String,
    invoice_number: String,
    fuel_type_id: String,
    tank_id: String,
    quantity: String,
    rate: String,
    tax_amount: String,
    total_cost: String,
    created_by: String,
    created_at: String,
}

impl TryFrom<PurchaseRow> for Purchase {
    type Error = DbError;

    fn try_from(row: PurchaseRow) -> DbResult<Self> {
        Ok(Purchase {
            purchase_date: decode_ts("purchases.purchase_date", &row.purchase_date)?,
            quantity: decode_litres("purchases.quantity", &row.quantity)?,
            rate: decode_money("purchases.rate", &row.rate)?,
            tax_amount: decode_money("purchases.tax_amount", &row.tax_amount)?,
            total_cost: decode_money("purchases.total_cost", &row.total_cost)?,
            created_at: decode_ts("purchases.created_at", &row.created_at)?,
            id: row.id,
            supplier_name: row.supplier_name,
            invoice_number: row.invoice_number,
            fuel_type_id: row.fuel_type_id,
            tank_id: row.tank_id,
            created_by: row.created_by,
        })
    }
}

/// Repository for purchases.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    pub async fn insert(&self, purchase: &Purchase) -> DbResult<()> {
        insert_purchase(&self.pool, purchase).await
    }

    pub async fn insert_in_tx(conn: &mut SqliteConnection, purchase: &Purchase) -> DbResult<()> {
        insert_purchase(conn, purchase).await
    }

    /// Purchases with `start <= purchase_date < end`, oldest first.
    pub async fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Purchase>> {
        debug!(%start, %end, "Listing purchases in period");

        let rows = sqlx::query_as::<_, PurchaseRow>(
            r#"
            SELECT id, purchase_date, supplier_name, invoice_number, fuel_type_id, tank_id,
                   quantity, rate, tax_amount, total_cost, created_by, created_at
            FROM purchases
            WHERE purchase_date >= ?1 AND purchase_date < ?2
            ORDER BY purchase_date, id
            "#,
        )
        .bind(encode_ts(&start))
        .bind(encode_ts(&end))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Purchase::try_from).collect()
    }
}

async fn insert_purchase<'e, E>(executor: E, purchase: &Purchase) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(
        purchase_id = %purchase.id,
        invoice = %purchase.invoice_number,
        quantity = %purchase.quantity,
        "Inserting purchase"
    );

    sqlx::query(
        r#"
        INSERT INTO purchases (
            id, purchase_date, supplier_name, invoice_number, fuel_type_id, tank_id,
            quantity, rate, tax_amount, total_cost, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&purchase.id)
    .bind(encode_ts(&purchase.purchase_date))
    .bind(&purchase.supplier_name)
    .bind(&purchase.invoice_number)
    .bind(&purchase.fuel_type_id)
    .bind(&purchase.tank_id)
    .bind(encode_litres(&purchase.quantity))
    .bind(encode_money(&purchase.rate))
    .bind(encode_money(&purchase.tax_amount))
    .bind(encode_money(&purchase.total_cost))
    .bind(&purchase.created_by)
    .bind(encode_ts(&purchase.created_at))
    .execute(executor)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::fixtures::{seeded_db, ts};
    use fuelstation_core::{Litres, Money, Purchase};
    use rust_decimal_macros::dec;

    fn delivery(id: &str, at: chrono::DateTime<chrono::Utc>) -> Purchase {
        Purchase {
            id: id.to_string(),
            purchase_date: at,
            supplier_name: "PSO".to_string(),
            invoice_number: format!("INV-{id}"),
            fuel_type_id: "petrol".to_string(),
            tank_id: "tank-1".to_string(),
            quantity: Litres::new(dec!(2000)),
            rate: Money::round(dec!(270.25)),
            tax_amount: Money::zero(),
            total_cost: Money::from_major(540_500),
            created_by: "owner".to_string(),
            created_at: at,
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_between() {
        let db = seeded_db().await;
        let inside = delivery("p1", ts(2024, 3, 10, 9, 0));
        db.purchases().insert(&inside).await.unwrap();
        db.purchases().insert(&delivery("p2", ts(2024, 4, 1, 0, 0))).await.unwrap();

        let march = db
            .purchases()
            .list_between(ts(2024, 3, 1, 0, 0), ts(2024, 4, 1, 0, 0))
            .await
            .unwrap();
        assert_eq!(march, vec![inside]);
    }
}
