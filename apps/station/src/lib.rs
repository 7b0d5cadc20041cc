//! # Station Library
//!
//! Orchestration layer of the fuel station ledger. Commands fetch records
//! through `fuelstation-db`, hand them to the pure engines in
//! `fuelstation-core` and persist what comes back.
//!
//! ## Module Organization
//! ```text
//! station_lib/
//! ├── lib.rs          ◄─── You are here (tracing setup & daily snapshot)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   └── config.rs   ◄─── Configuration state
//! ├── commands/
//! │   ├── mod.rs      ◄─── Command exports, CAS retry loop
//! │   ├── sale.rs     ◄─── record_sale, void_sale
//! │   ├── purchase.rs ◄─── receive_purchase, record_expense
//! │   ├── shift.rs    ◄─── open_shift, close_shift
//! │   ├── customer.rs ◄─── record_customer_payment, credit_status
//! │   └── report.rs   ◄─── P&L, sales summary, low stock, aging
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## State
//! ```text
//! ┌──────────────────────────┐ ┌──────────────────────────────────────┐
//! │    DbState               │ │    ConfigState                       │
//! │                          │ │                                      │
//! │  • Database pool         │ │  • Station name, currency            │
//! │  • Repositories          │ │  • UTC offset for business days      │
//! │                          │ │  • Variance alert, CAS retries       │
//! └──────────────────────────┘ └──────────────────────────────────────┘
//! ```
//! Each command takes only the state it needs.

pub mod commands;
pub mod error;
pub mod state;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fuelstation_db::{Database, DbConfig};
use state::{ConfigState, DbState};

/// Opens the station database and prints one business day's snapshot.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Load Configuration ── STATION_* environment variables, defaults    │
/// │  2. Resolve Database Path ── STATION_DB_PATH or platform data dir      │
/// │  3. Connect to Database ── WAL mode, pending migrations applied        │
/// │  4. Report ── P&L, sales summary and low-stock alerts as JSON          │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// `date` is the business day to report on; `None` means today in the
/// station's local time.
pub async fn run(date: Option<NaiveDate>) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigState::from_env()?;
    info!(station = %config.station_name, "Starting station report");

    let db_path = config.resolve_database_path()?;
    info!(?db_path, "Database path determined");

    let db = DbState::new(Database::new(DbConfig::new(db_path)).await?);
    info!("Database connected and migrations applied");

    let date = date.unwrap_or_else(|| config.business_date(Utc::now()));
    let pl = commands::report::daily_report(&db, &config, date).await?;
    let summary = commands::report::sales_summary(&db, pl.period.start, pl.period.end).await?;
    let low_stock = commands::report::low_stock_report(&db).await?;

    let snapshot = json!({
        "station": config.station_name,
        "currency": config.currency_symbol,
        "date": date,
        "profitAndLoss": pl,
        "salesSummary": summary,
        "lowStock": low_stock,
    });
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    db.inner().close().await;
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=fuelstation=trace` - Show trace for the library crates only
/// - Default: INFO, DEBUG for this workspace, WARN for sqlx
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fuelstation=debug,station=debug,sqlx=warn"));

    // Logs go to stderr so stdout stays clean JSON
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// =============================================================================
// Test Support
// =============================================================================
