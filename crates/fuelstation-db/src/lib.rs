//! # fuelstation-db: Store Gateway for the Fuel Station
//!
//! Persists the station's records in SQLite and hands them to the
//! calculation engines as typed values.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Fuel Station Data Flow                           │
//! │                                                                         │
//! │  Orchestration command (record_sale)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  fuelstation-db (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │   (tank.rs)   │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │    │ TankRepo      │    │ 001_initial  │  │   │
//! │  │   │ Transactions  │◄───│ SaleRepo      │    │  _schema.sql │  │   │
//! │  │   │               │    │ CustomerRepo  │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │ codec.rs: TEXT ⇄ Money,      │   │
//! │  │                                │ Litres, timestamps, enums    │   │
//! │  └────────────────────────────────┴────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, transactions, repository accessors
//! - [`migrations`] - Embedded database migrations
//! - [`codec`] - Column encoding for decimals, timestamps and enums
//! - [`error`] - Database error types
//! - [`repository`] - One repository per collection
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fuelstation_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("station.db")).await?;
//!
//! // Reads go through the pool
//! let tank = db.tanks().require("tank-1").await?;
//!
//! // Multi-collection writes share one transaction
//! let mut tx = db.begin().await?;
//! SaleRepository::insert_in_tx(&mut *tx, &sale).await?;
//! TankRepository::update_stock_in_tx(&mut *tx, &updated, tank.version).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod codec;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    CustomerRepository, ExpenseRepository, FuelTypeRepository, PaymentRepository,
    PurchaseRepository, SaleRepository, ShiftRepository, TankRepository,
};

// =============================================================================
// Test Fixtures
// =============================================================================
