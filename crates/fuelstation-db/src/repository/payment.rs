//! # Payment Repository
//!
//! Money received against a customer's credit balance.

use fuelstation_core::Payment;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::codec::{decode_enum, decode_money, decode_ts, encode_money, encode_ts};
use crate::error::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: String,
    customer_id: String,
    amount: String,
    date: String,
    method: String,
    reference_number: Option<String>,
    received_by: String,
    created_at: String,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DbError;

    fn try_from(row: PaymentRow) -> DbResult<Self> {
        Ok(Payment {
            amount: decode_money("payments.amount", &row.amount)?,
            date: decode_ts("payments.date", &row.date)?,
            method: decode_enum("payments.method", &row.method)?,
            created_at: decode_ts("payments.created_at", &row.created_at)?,
            id: row.id,
            customer_id: row.customer_id,
            reference_number: row.reference_number,
            received_by: row.received_by,
        })
    }
}

/// Repository for customer payments.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    pub async fn insert(&self, payment: &Payment) -> DbResult<()> {
        insert_payment(&self.pool, payment).await
    }

    pub async fn insert_in_tx(conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
        insert_payment(conn, payment).await
    }

    /// All payments, newest first.
    pub async fn list(&self) -> DbResult<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, customer_id, amount, date, method, reference_number,
                   received_by, created_at
            FROM payments
            ORDER BY date DESC, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    /// One customer's payments, newest first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, customer_id, amount, date, method, reference_number,
                   received_by, created_at
            FROM payments
            WHERE customer_id = ?1
            ORDER BY date DESC, id
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Payment::try_from).collect()
    }
}

async fn insert_payment<'e, E>(executor: E, payment: &Payment) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(
        payment_id = %payment.id,
        customer_id = %payment.customer_id,
        amount = %payment.amount,
        "Inserting payment"
    );

    sqlx::query(
        r#"
        INSERT INTO payments (
            id, customer_id, amount, date, method, reference_number, received_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.customer_id)
    .bind(encode_money(&payment.amount))
    .bind(encode_ts(&payment.date))
    .bind(payment.method.as_str())
    .bind(&payment.reference_number)
    .bind(&payment.received_by)
    .bind(encode_ts(&payment.created_at))
    .execute(executor)
    .await?;

    Ok(())
}
