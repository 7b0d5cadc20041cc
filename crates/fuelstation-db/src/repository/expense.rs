//! # Expense Repository

use chrono::{DateTime, Utc};
use fuelstation_core::Expense;
use sqlx::SqlitePool;
use tracing::debug;

use crate::codec::{decode_money, decode_ts, encode_money, encode_ts};
use crate::error::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct ExpenseRow {
    id: String,
    expense_date: String,
    category: String,
    description: Option<String>,
    amount: String,
    created_by: String,
    created_at: String,
}

impl TryFrom<ExpenseRow> for Expense {
    type Error = DbError;

    fn try_from(row: ExpenseRow) -> DbResult<Self> {
        Ok(Expense {
            expense_date: decode_ts("expenses.expense_date", &row.expense_date)?,
            amount: decode_money("expenses.amount", &row.amount)?,
            created_at: decode_ts("expenses.created_at", &row.created_at)?,
            id: row.id,
            category: row.category,
            description: row.description,
            created_by: row.created_by,
        })
    }
}

/// Repository for operating expenses.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    pub async fn insert(&self, expense: &Expense) -> DbResult<()> {
        debug!(
            expense_id = %expense.id,
            category = %expense.category,
            amount = %expense.amount,
            "Inserting expense"
        );

        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, expense_date, category, description, amount, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&expense.id)
        .bind(encode_ts(&expense.expense_date))
        .bind(&expense.category)
        .bind(&expense.description)
        .bind(encode_money(&expense.amount))
        .bind(&expense.created_by)
        .bind(encode_ts(&expense.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Expenses with `start <= expense_date < end`, oldest first.
    pub async fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Expense>> {
        let rows = sqlx::query_as::<_, ExpenseRow>(
            r#"
            SELECT id, expense_date, category, description, amount, created_by, created_at
            FROM expenses
            WHERE expense_date >= ?1 AND expense_date < ?2
            ORDER BY expense_date, id
            "#,
        )
        .bind(encode_ts(&start))
        .bind(encode_ts(&end))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Expense::try_from).collect()
    }
}
