//! # Tank Repository
//!
//! Tanks and their stock level.
//!
//! ## Versioned Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  read tank (version = 7)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  stock engine → updated tank (version still 7)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE tanks SET current_stock = ?, version = version + 1             │
//! │  WHERE id = ? AND version = 7                                          │
//! │       │                                                                 │
//! │       ├── 1 row  → committed, tank now at version 8                    │
//! │       └── 0 rows → DbError::VersionConflict, caller re-reads           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use fuelstation_core::Tank;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::{debug, warn};

use crate::codec::{
    decode_litres, decode_opt_ts, decode_ts, encode_litres, encode_opt_ts, encode_ts,
};
use crate::error::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct TankRow {
    id: String,
    name: String,
    fuel_type_id: String,
    capacity: String,
    current_stock: String,
    minimum_stock: String,
    last_reading_date: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<TankRow> for Tank {
    type Error = DbError;

    fn try_from(row: TankRow) -> DbResult<Self> {
        let tank = Tank {
            capacity: decode_litres("tanks.capacity", &row.capacity)?,
            current_stock: decode_litres("tanks.current_stock", &row.current_stock)?,
            minimum_stock: decode_litres("tanks.minimum_stock", &row.minimum_stock)?,
            last_reading_date: decode_opt_ts(
                "tanks.last_reading_date",
                row.last_reading_date.as_deref(),
            )?,
            created_at: decode_ts("tanks.created_at", &row.created_at)?,
            updated_at: decode_ts("tanks.updated_at", &row.updated_at)?,
            id: row.id,
            name: row.name,
            fuel_type_id: row.fuel_type_id,
            version: row.version,
        };

        // A row that breaks 0 <= stock <= capacity never reaches an engine
        tank.validate()
            .map_err(|e| DbError::decode("tanks.current_stock", e))?;

        Ok(tank)
    }
}

/// Repository for tanks.
#[derive(Debug, Clone)]
pub struct TankRepository {
    pool: SqlitePool,
}

impl TankRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TankRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Tank>> {
        debug!(tank_id = %id, "Fetching tank");

        let row = sqlx::query_as::<_, TankRow>(
            r#"
            SELECT id, name, fuel_type_id, capacity, current_stock, minimum_stock,
                   last_reading_date, version, created_at, updated_at
            FROM tanks
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Tank::try_from).transpose()
    }

    /// Like [`get_by_id`](Self::get_by_id), but a missing tank is an error.
    pub async fn require(&self, id: &str) -> DbResult<Tank> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Tank", id))
    }

    /// All tanks, by name.
    pub async fn list(&self) -> DbResult<Vec<Tank>> {
        let rows = sqlx::query_as::<_, TankRow>(
            r#"
            SELECT id, name, fuel_type_id, capacity, current_stock, minimum_stock,
                   last_reading_date, version, created_at, updated_at
            FROM tanks
            ORDER BY name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Tank::try_from).collect()
    }

    /// Inserts a tank after checking its stock invariants.
    pub async fn insert(&self, tank: &Tank) -> DbResult<()> {
        debug!(tank_id = %tank.id, capacity = %tank.capacity, "Inserting tank");

        tank.validate()
            .map_err(|e| DbError::invalid("Tank", format!("tank {}: {e}", tank.id)))?;

        sqlx::query(
            r#"
            INSERT INTO tanks (
                id, name, fuel_type_id, capacity, current_stock, minimum_stock,
                last_reading_date, version, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&tank.id)
        .bind(&tank.name)
        .bind(&tank.fuel_type_id)
        .bind(encode_litres(&tank.capacity))
        .bind(encode_litres(&tank.current_stock))
        .bind(encode_litres(&tank.minimum_stock))
        .bind(encode_opt_ts(&tank.last_reading_date))
        .bind(tank.version)
        .bind(encode_ts(&tank.created_at))
        .bind(encode_ts(&tank.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Compare-and-swap stock update through the pool.
    ///
    /// Returns the tank as stored, with its bumped version.
    pub async fn update_stock_if_version(
        &self,
        tank: &Tank,
        expected_version: i64,
    ) -> DbResult<Tank> {
        update_stock(&self.pool, tank, expected_version).await
    }

    /// Compare-and-swap stock update inside a caller-owned transaction.
    pub async fn update_stock_in_tx(
        conn: &mut SqliteConnection,
        tank: &Tank,
        expected_version: i64,
    ) -> DbResult<Tank> {
        update_stock(conn, tank, expected_version).await
    }
}

async fn update_stock<'e, E>(executor: E, tank: &Tank, expected_version: i64) -> DbResult<Tank>
where
    E: SqliteExecutor<'e>,
{
    debug!(
        tank_id = %tank.id,
        current_stock = %tank.current_stock,
        expected_version,
        "Updating tank stock"
    );

    let result = sqlx::query(
        r#"
        UPDATE tanks
        SET current_stock = ?1, last_reading_date = ?2, updated_at = ?3,
            version = version + 1
        WHERE id = ?4 AND version = ?5
        "#,
    )
    .bind(encode_litres(&tank.current_stock))
    .bind(encode_opt_ts(&tank.last_reading_date))
    .bind(encode_ts(&tank.updated_at))
    .bind(&tank.id)
    .bind(expected_version)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        warn!(tank_id = %tank.id, expected_version, "Stale tank version");
        return Err(DbError::version_conflict("Tank", &tank.id, expected_version));
    }

    Ok(Tank {
        version: expected_version + 1,
        ..tank.clone()
    })
}
