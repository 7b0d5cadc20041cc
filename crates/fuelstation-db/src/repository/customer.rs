//! # Customer Repository
//!
//! Credit customers. `outstanding_balance` changes only through the
//! version-checked updates below, the same way tank stock does.

use fuelstation_core::validation::validate_customer_input;
use fuelstation_core::Customer;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::{debug, warn};

use crate::codec::{decode_enum, decode_money, decode_ts, encode_money, encode_ts};
use crate::error::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: String,
    name: String,
    phone: Option<String>,
    email: Option<String>,
    credit_limit: String,
    outstanding_balance: String,
    status: String,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = DbError;

    fn try_from(row: CustomerRow) -> DbResult<Self> {
        Ok(Customer {
            credit_limit: decode_money("customers.credit_limit", &row.credit_limit)?,
            outstanding_balance: decode_money(
                "customers.outstanding_balance",
                &row.outstanding_balance,
            )?,
            status: decode_enum("customers.status", &row.status)?,
            created_at: decode_ts("customers.created_at", &row.created_at)?,
            updated_at: decode_ts("customers.updated_at", &row.updated_at)?,
            id: row.id,
            name: row.name,
            phone: row.phone,
            email: row.email,
            version: row.version,
        })
    }
}

/// Repository for customers.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(customer_id = %customer.id, name = %customer.name, "Inserting customer");

        validate_customer_input(
            &customer.name,
            customer.phone.as_deref(),
            customer.email.as_deref(),
            customer.credit_limit,
        )
        .map_err(|e| DbError::invalid("Customer", e))?;

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, phone, email, credit_limit, outstanding_balance, status,
                version, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(encode_money(&customer.credit_limit))
        .bind(encode_money(&customer.outstanding_balance))
        .bind(customer.status.as_str())
        .bind(customer.version)
        .bind(encode_ts(&customer.created_at))
        .bind(encode_ts(&customer.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        debug!(customer_id = %id, "Fetching customer");

        let row = sqlx::query_as::<_, CustomerRow>(
            r#"
            SELECT id, name, phone, email, credit_limit, outstanding_balance, status,
                   version, created_at, updated_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Customer::try_from).transpose()
    }

    /// Like [`get_by_id`](Self::get_by_id), but a missing customer is an error.
    pub async fn require(&self, id: &str) -> DbResult<Customer> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// All customers, by name.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let rows = sqlx::query_as::<_, CustomerRow>(
            r#"
            SELECT id, name, phone, email, credit_limit, outstanding_balance, status,
                   version, created_at, updated_at
            FROM customers
            ORDER BY name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Customer::try_from).collect()
    }

    /// Compare-and-swap balance update through the pool.
    pub async fn update_balance_if_version(
        &self,
        customer: &Customer,
        expected_version: i64,
    ) -> DbResult<Customer> {
        update_balance(&self.pool, customer, expected_version).await
    }

    /// Compare-and-swap balance update inside a caller-owned transaction.
    pub async fn update_balance_in_tx(
        conn: &mut SqliteConnection,
        customer: &Customer,
        expected_version: i64,
    ) -> DbResult<Customer> {
        update_balance(conn, customer, expected_version).await
    }
}

async fn update_balance<'e, E>(
    executor: E,
    customer: &Customer,
    expected_version: i64,
) -> DbResult<Customer>
where
    E: SqliteExecutor<'e>,
{
    debug!(
        customer_id = %customer.id,
        outstanding = %customer.outstanding_balance,
        expected_version,
        "Updating customer balance"
    );

    let result = sqlx::query(
        r#"
        UPDATE customers
        SET outstanding_balance = ?1, updated_at = ?2, version = version + 1
        WHERE id = ?3 AND version = ?4
        "#,
    )
    .bind(encode_money(&customer.outstanding_balance))
    .bind(encode_ts(&customer.updated_at))
    .bind(&customer.id)
    .bind(expected_version)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        warn!(customer_id = %customer.id, expected_version, "Stale customer version");
        return Err(DbError::version_conflict(
            "Customer",
            &customer.id,
            expected_version,
        ));
    }

    Ok(Customer {
        version: expected_version + 1,
        ..customer.clone()
    })
}
