//! # fuelstation-core: Calculation Engines for the Fuel Station
//!
//! This crate is the **heart** of the station ledger. Every number that ends
//! up in a shift report, a P&L or a collections list is computed here, as a
//! pure function of the records passed in.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Fuel Station Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/station (orchestration)                 │   │
//! │  │     record_sale, close_shift, daily_report, aging_report ...    │   │
//! │  └──────────────┬───────────────────────────────▲──────────────────┘   │
//! │                 │ records in                    │ results out          │
//! │  ┌──────────────▼───────────────────────────────┴──────────────────┐   │
//! │  │            ★ fuelstation-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐       │   │
//! │  │   │ sales  │ │ stock  │ │ shift  │ │  pnl   │ │ credit │       │   │
//! │  │   └────────┘ └────────┘ └────────┘ └────────┘ └────────┘       │   │
//! │  │   ┌────────┐ ┌────────┐ ┌────────────┐ ┌────────┐              │   │
//! │  │   │ money  │ │ types  │ │ validation │ │ error  │              │   │
//! │  │   └────────┘ └────────┘ └────────────┘ └────────┘              │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 fuelstation-db (store gateway)                  │   │
//! │  │           SQLite, migrations, versioned updates                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - `Money` and `Litres` exact decimal types
//! - [`types`] - Entity records (Tank, Sale, Shift, Customer, ...)
//! - [`sales`] - Sale amounts and sales summaries
//! - [`stock`] - Tank stock mutations and low-stock alerts
//! - [`shift`] - Shift open/close and cash reconciliation
//! - [`pnl`] - Profit & loss over half-open periods
//! - [`credit`] - Credit limits, payments, aging
//! - [`validation`] - Field-level input checks
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output, always
//! 2. **No I/O**: the caller fetches, the engine computes, the caller persists
//! 3. **Exact Decimals**: no `f64` anywhere near a rupee or a litre
//! 4. **Explicit Errors**: every failure is a typed `CoreError`, never a panic
//!
//! ## Example Usage
//!
//! ```rust
//! use fuelstation_core::money::{Litres, Money};
//! use fuelstation_core::sales::compute_sale;
//! use fuelstation_core::types::TaxRate;
//! use rust_decimal::Decimal;
//!
//! let amounts = compute_sale(
//!     Litres::new(Decimal::from(50)),
//!     Money::from_cents(28950),
//!     TaxRate::from_percentage(Decimal::from(17)),
//! )
//! .unwrap();
//!
//! assert_eq!(amounts.total_amount.to_string(), "Rs. 16,935.75");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod credit;
pub mod error;
pub mod money;
pub mod pnl;
pub mod sales;
pub mod shift;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::{Litres, Money};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Longest accepted name (customer, supplier, tank).
pub const MAX_NAME_LENGTH: usize = 100;

/// Longest accepted supplier invoice number.
pub const MAX_INVOICE_NUMBER_LENGTH: usize = 50;
