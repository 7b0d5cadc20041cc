//! # Repository Module
//!
//! One repository per collection of the station store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Orchestration command                                                  │
//! │       │                                                                 │
//! │       │  db.tanks().get_by_id("tank-1")                                 │
//! │       ▼                                                                 │
//! │  TankRepository                                                        │
//! │  ├── get_by_id / list / insert            pool-backed                  │
//! │  ├── update_stock_if_version              compare-and-swap             │
//! │  └── update_stock_in_tx(&mut conn, ..)    inside a caller transaction  │
//! │       │                                                                 │
//! │       │  Row struct (TEXT columns) ──► codec ──► typed record          │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Every stored value is decoded and checked on the way out; a bad row   │
//! │  is a DbError::Decode, never a panic deep inside an engine.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`FuelTypeRepository`] - Fuel grades and prices
//! - [`TankRepository`] - Tanks, versioned stock updates
//! - [`SaleRepository`] - Sales, by period/shift/customer
//! - [`PurchaseRepository`] - Supplier deliveries
//! - [`ExpenseRepository`] - Operating expenses
//! - [`ShiftRepository`] - Shifts, open-shift lookup, closing
//! - [`CustomerRepository`] - Credit customers, versioned balance updates
//! - [`PaymentRepository`] - Customer payments

pub mod customer;
pub mod expense;
pub mod fuel_type;
pub mod payment;
pub mod purchase;
pub mod sale;
pub mod shift;
pub mod tank;

pub use customer::CustomerRepository;
pub use expense::ExpenseRepository;
pub use fuel_type::FuelTypeRepository;
pub use payment::PaymentRepository;
pub use purchase::PurchaseRepository;
pub use sale::SaleRepository;
pub use shift::ShiftRepository;
pub use tank::TankRepository;
