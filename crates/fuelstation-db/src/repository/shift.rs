//! # Shift Repository
//!
//! Shifts move `open -> closed` exactly once. The partial unique index
//! `idx_shifts_one_open_per_operator` keeps two terminals from opening a
//! second shift for the same operator: the loser gets
//! [`DbError::UniqueViolation`].
//!
//! ## Serializing Sales Against a Close
//! ```text
//! record_sale tx                       close_shift tx
//! ──────────────                       ──────────────
//! claim_open_in_tx(shift) ◄── write ──► claim_open_in_tx(shift)
//! tank / sale / customer               list sales, reconcile
//! COMMIT                               close_in_tx(shift), COMMIT
//! ```
//! Both transactions start by writing the open shift row, so SQLite runs
//! them one after the other. A sale that loses sees the shift closed and
//! gets [`DbError::ShiftNotOpen`]; a sale that wins is listed by the close.

use chrono::{DateTime, Utc};
use fuelstation_core::{Shift, ShiftStatus};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::{debug, info};

use crate::codec::{
    decode_date, decode_enum, decode_money, decode_opt_money, decode_opt_ts, decode_ts,
    encode_date, encode_money, encode_opt_money, encode_opt_ts, encode_ts,
};
use crate::error::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct ShiftRow {
    id: String,
    operator_id: String,
    date: String,
    opening_time: String,
    closing_time: Option<String>,
    opening_cash: String,
    closing_cash: Option<String>,
    expected_cash: Option<String>,
    variance: Option<String>,
    status: String,
}

impl TryFrom<ShiftRow> for Shift {
    type Error = DbError;

    fn try_from(row: ShiftRow) -> DbResult<Self> {
        Ok(Shift {
            date: decode_date("shifts.date", &row.date)?,
            opening_time: decode_ts("shifts.opening_time", &row.opening_time)?,
            closing_time: decode_opt_ts("shifts.closing_time", row.closing_time.as_deref())?,
            opening_cash: decode_money("shifts.opening_cash", &row.opening_cash)?,
            closing_cash: decode_opt_money("shifts.closing_cash", row.closing_cash.as_deref())?,
            expected_cash: decode_opt_money("shifts.expected_cash", row.expected_cash.as_deref())?,
            variance: decode_opt_money("shifts.variance", row.variance.as_deref())?,
            status: decode_enum("shifts.status", &row.status)?,
            id: row.id,
            operator_id: row.operator_id,
        })
    }
}

/// Repository for shifts.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ShiftRepository { pool }
    }

    /// Stores a newly opened shift.
    ///
    /// ## Errors
    /// [`DbError::UniqueViolation`] when the operator already has an open
    /// shift, even one committed by another terminal a moment ago.
    pub async fn insert(&self, shift: &Shift) -> DbResult<()> {
        debug!(shift_id = %shift.id, operator_id = %shift.operator_id, "Inserting shift");

        sqlx::query(
            r#"
            INSERT INTO shifts (
                id, operator_id, date, opening_time, closing_time, opening_cash,
                closing_cash, expected_cash, variance, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&shift.id)
        .bind(&shift.operator_id)
        .bind(encode_date(&shift.date))
        .bind(encode_ts(&shift.opening_time))
        .bind(encode_opt_ts(&shift.closing_time))
        .bind(encode_money(&shift.opening_cash))
        .bind(encode_opt_money(&shift.closing_cash))
        .bind(encode_opt_money(&shift.expected_cash))
        .bind(encode_opt_money(&shift.variance))
        .bind(shift.status.as_str())
        .execute(&self.pool)
        .await?;

        info!(shift_id = %shift.id, operator_id = %shift.operator_id, "Shift opened");
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Shift>> {
        let row = sqlx::query_as::<_, ShiftRow>(
            r#"
            SELECT id, operator_id, date, opening_time, closing_time, opening_cash,
                   closing_cash, expected_cash, variance, status
            FROM shifts
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Shift::try_from).transpose()
    }

    /// Like [`get_by_id`](Self::get_by_id), but a missing shift is an error.
    pub async fn require(&self, id: &str) -> DbResult<Shift> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Shift", id))
    }

    /// The operator's open shift, if any.
    pub async fn find_open_shift(&self, operator_id: &str) -> DbResult<Option<Shift>> {
        debug!(operator_id = %operator_id, "Looking up open shift");

        let row = sqlx::query_as::<_, ShiftRow>(
            r#"
            SELECT id, operator_id, date, opening_time, closing_time, opening_cash,
                   closing_cash, expected_cash, variance, status
            FROM shifts
            WHERE operator_id = ?1 AND status = 'open'
            "#,
        )
        .bind(operator_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Shift::try_from).transpose()
    }

    /// Shifts that opened in `start <= opening_time < end`.
    pub async fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Shift>> {
        let rows = sqlx::query_as::<_, ShiftRow>(
            r#"
            SELECT id, operator_id, date, opening_time, closing_time, opening_cash,
                   closing_cash, expected_cash, variance, status
            FROM shifts
            WHERE opening_time >= ?1 AND opening_time < ?2
            ORDER BY opening_time, id
            "#,
        )
        .bind(encode_ts(&start))
        .bind(encode_ts(&end))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Shift::try_from).collect()
    }

    /// Writes the closing fields of a shift the engine has reconciled.
    ///
    /// Only an `open` row is updated, so two terminals closing the same
    /// shift cannot both succeed.
    pub async fn close(&self, closed: &Shift) -> DbResult<()> {
        close_shift(&self.pool, closed).await
    }

    /// [`close`](Self::close) inside a caller-owned transaction, after the
    /// sales it reconciles were listed on the same connection.
    pub async fn close_in_tx(conn: &mut SqliteConnection, closed: &Shift) -> DbResult<()> {
        close_shift(conn, closed).await
    }

    /// Takes the write lock on `shift_id` while it is still open.
    ///
    /// Run first in any transaction that must not interleave with a close.
    /// The update changes nothing but makes SQLite hold the write lock until
    /// the transaction ends.
    ///
    /// ## Errors
    /// [`DbError::ShiftNotOpen`] when the shift is closed or unknown.
    pub async fn claim_open_in_tx(conn: &mut SqliteConnection, shift_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE shifts SET status = status WHERE id = ?1 AND status = 'open'",
        )
        .bind(shift_id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::ShiftNotOpen {
                shift_id: shift_id.to_string(),
            });
        }
        Ok(())
    }
}

async fn close_shift<'e, E>(executor: E, closed: &Shift) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(shift_id = %closed.id, "Closing shift");

    if closed.status != ShiftStatus::Closed {
        return Err(DbError::invalid(
            "Shift",
            format!("shift {} must be reconciled before it is stored as closed", closed.id),
        ));
    }

    let result = sqlx::query(
        r#"
        UPDATE shifts
        SET closing_time = ?1, closing_cash = ?2, expected_cash = ?3, variance = ?4,
            status = 'closed'
        WHERE id = ?5 AND status = 'open'
        "#,
    )
    .bind(encode_opt_ts(&closed.closing_time))
    .bind(encode_opt_money(&closed.closing_cash))
    .bind(encode_opt_money(&closed.expected_cash))
    .bind(encode_opt_money(&closed.variance))
    .bind(&closed.id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::ShiftNotOpen {
            shift_id: closed.id.clone(),
        });
    }

    info!(shift_id = %closed.id, "Shift closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::fixtures::{memory_db, shift, ts};
    use crate::{DbError, ShiftRepository};
    use fuelstation_core::{Money, ShiftStatus};

    #[tokio::test]
    async fn test_one_open_shift_per_operator() {
        let db = memory_db().await;
        db.shifts().insert(&shift("s1", "op-1", ts(2024, 3, 15, 6, 0))).await.unwrap();

        let err = db
            .shifts()
            .insert(&shift("s2", "op-1", ts(2024, 3, 15, 7, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        // Another operator is unaffected
        db.shifts().insert(&shift("s3", "op-2", ts(2024, 3, 15, 7, 0))).await.unwrap();

        let open = db.shifts().find_open_shift("op-1").await.unwrap().unwrap();
        assert_eq!(open.id, "s1");
    }

    #[tokio::test]
    async fn test_close_then_reopen() {
        let db = memory_db().await;
        let opened = shift("s1", "op-1", ts(2024, 3, 15, 6, 0));
        db.shifts().insert(&opened).await.unwrap();

        let mut closed = opened.clone();
        closed.status = ShiftStatus::Closed;
        closed.closing_time = Some(ts(2024, 3, 15, 14, 0));
        closed.closing_cash = Some(Money::from_major(19_950));
        closed.expected_cash = Some(Money::from_major(20_000));
        closed.variance = Some(Money::from_major(-50));
        db.shifts().close(&closed).await.unwrap();

        assert_eq!(db.shifts().require("s1").await.unwrap(), closed);
        assert!(db.shifts().find_open_shift("op-1").await.unwrap().is_none());

        // Closing twice fails as a state error, not a missing row
        let err = db.shifts().close(&closed).await.unwrap_err();
        assert!(matches!(err, DbError::ShiftNotOpen { ref shift_id } if shift_id == "s1"));

        // The operator may open a new shift now
        db.shifts().insert(&shift("s2", "op-1", ts(2024, 3, 15, 14, 0))).await.unwrap();
    }

    #[tokio::test]
    async fn test_claim_open_in_tx() {
        let db = memory_db().await;
        let opened = shift("s1", "op-1", ts(2024, 3, 15, 6, 0));
        db.shifts().insert(&opened).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        ShiftRepository::claim_open_in_tx(&mut *tx, "s1").await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(db.shifts().require("s1").await.unwrap(), opened);

        let mut closed = opened.clone();
        closed.status = ShiftStatus::Closed;
        closed.closing_time = Some(ts(2024, 3, 15, 14, 0));
        closed.closing_cash = Some(Money::zero());
        closed.expected_cash = Some(Money::zero());
        closed.variance = Some(Money::zero());
        let mut tx = db.begin().await.unwrap();
        ShiftRepository::close_in_tx(&mut *tx, &closed).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let err = ShiftRepository::claim_open_in_tx(&mut *tx, "s1").await.unwrap_err();
        assert!(matches!(err, DbError::ShiftNotOpen { .. }));
        let err = ShiftRepository::claim_open_in_tx(&mut *tx, "nope").await.unwrap_err();
        assert!(matches!(err, DbError::ShiftNotOpen { .. }));
    }

    #[tokio::test]
    async fn test_unreconciled_close_rejected() {
        let db = memory_db().await;
        let opened = shift("s1", "op-1", ts(2024, 3, 15, 6, 0));
        db.shifts().insert(&opened).await.unwrap();

        let err = db.shifts().close(&opened).await.unwrap_err();
        assert!(matches!(err, DbError::Invalid { .. }));
        assert!(db.shifts().find_open_shift("op-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_between() {
        let db = memory_db().await;
        db.shifts().insert(&shift("s1", "op-1", ts(2024, 3, 15, 6, 0))).await.unwrap();
        db.shifts().insert(&shift("s2", "op-2", ts(2024, 3, 16, 6, 0))).await.unwrap();

        let day = db
            .shifts()
            .list_between(ts(2024, 3, 15, 0, 0), ts(2024, 3, 16, 0, 0))
            .await
            .unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].id, "s1");
    }
}
