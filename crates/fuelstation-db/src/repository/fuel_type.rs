//! # Fuel Type Repository
//!
//! Fuel grades and their current price. Sales copy the price at the time
//! of sale, so updating it here never changes recorded sales.

use chrono::{DateTime, Utc};
use fuelstation_core::{FuelType, Money, TaxRate};
use sqlx::SqlitePool;
use tracing::debug;

use crate::codec::{decode_money, decode_rate, decode_ts, encode_money, encode_rate, encode_ts};
use crate::error::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct FuelTypeRow {
    id: String,
    name: String,
    unit_price: String,
    tax_percentage: String,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<FuelTypeRow> for FuelType {
    type Error = DbError;

    fn try_from(row: FuelTypeRow) -> DbResult<Self> {
        Ok(FuelType {
            unit_price: decode_money("fuel_types.unit_price", &row.unit_price)?,
            tax_percentage: decode_rate("fuel_types.tax_percentage", &row.tax_percentage)?,
            created_at: decode_ts("fuel_types.created_at", &row.created_at)?,
            updated_at: decode_ts("fuel_types.updated_at", &row.updated_at)?,
            id: row.id,
            name: row.name,
            is_active: row.is_active,
        })
    }
}

/// Repository for fuel types.
#[derive(Debug, Clone)]
pub struct FuelTypeRepository {
    pool: SqlitePool,
}

impl FuelTypeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        FuelTypeRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<FuelType>> {
        debug!(fuel_type_id = %id, "Fetching fuel type");

        let row = sqlx::query_as::<_, FuelTypeRow>(
            r#"
            SELECT id, name, unit_price, tax_percentage, is_active, created_at, updated_at
            FROM fuel_types
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FuelType::try_from).transpose()
    }

    /// Like [`get_by_id`](Self::get_by_id), but a missing row is an error.
    pub async fn require(&self, id: &str) -> DbResult<FuelType> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("FuelType", id))
    }

    /// All fuel types, by name.
    pub async fn list(&self) -> DbResult<Vec<FuelType>> {
        let rows = sqlx::query_as::<_, FuelTypeRow>(
            r#"
            SELECT id, name, unit_price, tax_percentage, is_active, created_at, updated_at
            FROM fuel_types
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FuelType::try_from).collect()
    }

    pub async fn insert(&self, fuel_type: &FuelType) -> DbResult<()> {
        debug!(fuel_type_id = %fuel_type.id, name = %fuel_type.name, "Inserting fuel type");

        sqlx::query(
            r#"
            INSERT INTO fuel_types (
                id, name, unit_price, tax_percentage, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&fuel_type.id)
        .bind(&fuel_type.name)
        .bind(encode_money(&fuel_type.unit_price))
        .bind(encode_rate(&fuel_type.tax_percentage))
        .bind(fuel_type.is_active)
        .bind(encode_ts(&fuel_type.created_at))
        .bind(encode_ts(&fuel_type.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Sets a new price and tax rate for future sales.
    pub async fn update_price(
        &self,
        id: &str,
        unit_price: Money,
        tax_percentage: TaxRate,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(fuel_type_id = %id, unit_price = %unit_price, "Updating fuel price");

        let result = sqlx::query(
            r#"
            UPDATE fuel_types
            SET unit_price = ?1, tax_percentage = ?2, updated_at = ?3
            WHERE id = ?4
            "#,
        )
        .bind(encode_money(&unit_price))
        .bind(encode_rate(&tax_percentage))
        .bind(encode_ts(&at))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("FuelType", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::fixtures::{fuel_type, memory_db};
    use crate::DbError;
    use fuelstation_core::{Money, TaxRate};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = memory_db().await;
        let petrol = fuel_type("petrol", "Petrol", dec!(289.50));
        db.fuel_types().insert(&petrol).await.unwrap();

        let loaded = db.fuel_types().require("petrol").await.unwrap();
        assert_eq!(loaded, petrol);
        assert!(db.fuel_types().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_price() {
        let db = memory_db().await;
        let petrol = fuel_type("petrol", "Petrol", dec!(289.50));
        db.fuel_types().insert(&petrol).await.unwrap();

        db.fuel_types()
            .update_price("petrol", Money::round(dec!(295.00)), TaxRate::from_percentage(dec!(18)), petrol.updated_at)
            .await
            .unwrap();

        let loaded = db.fuel_types().require("petrol").await.unwrap();
        assert_eq!(loaded.unit_price, Money::from_major(295));
        assert_eq!(loaded.tax_percentage.percentage(), dec!(18));

        let err = db
            .fuel_types()
            .update_price("missing", Money::from_major(1), TaxRate::zero(), petrol.updated_at)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = memory_db().await;
        db.fuel_types().insert(&fuel_type("p1", "Petrol", dec!(289.50))).await.unwrap();
        let err = db
            .fuel_types()
            .insert(&fuel_type("p2", "Petrol", dec!(289.50)))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
