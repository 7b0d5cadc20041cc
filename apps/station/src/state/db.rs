//! # Database State
//!
//! Wraps the `Database` connection for use in station commands.
//!
//! ## Thread Safety
//! The `Database` struct from `fuelstation-db` contains a `SqlitePool`
//! which is thread-safe. Commands run concurrently without explicit
//! locking; conflicting stock and balance writes are caught by the
//! versioned updates instead.
//!
//! ## Usage in Commands
//! ```rust,ignore
//! pub async fn low_stock_report(db: &DbState) -> Result<Vec<LowStockAlert>, ApiError> {
//!     let tanks = db.inner().tanks().list().await?;
//!     Ok(stock::low_stock_alerts(&tanks))
//! }
//! ```

use fuelstation_db::Database;

/// Wrapper around `Database` handed to every command.
#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    /// Creates a new DbState wrapping the database connection.
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Returns a reference to the inner Database.
    pub fn inner(&self) -> &Database {
        &self.db
    }
}
