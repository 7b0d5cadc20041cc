//! # State Module
//!
//! State shared by the station commands.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  commands::*(db: &DbState, config: &ConfigState, ...)                 │
//! │          │                          │                                   │
//! │          ▼                          ▼                                   │
//! │  ┌──────────────────┐      ┌──────────────────────────┐                │
//! │  │     DbState      │      │       ConfigState        │                │
//! │  │                  │      │                          │                │
//! │  │  Database        │      │  station_name            │                │
//! │  │  (SQLite pool)   │      │  utc_offset_minutes      │                │
//! │  │                  │      │  variance_alert_threshold│                │
//! │  │                  │      │  cas_max_retries         │                │
//! │  └──────────────────┘      └──────────────────────────┘                │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: Database has an internal connection pool                   │
//! │  • ConfigState: Read-only after initialization                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;

pub use config::{ConfigError, ConfigState, DEFAULT_UTC_OFFSET_MINUTES};
pub use db::DbState;
