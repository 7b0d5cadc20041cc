//! # Configuration State
//!
//! Station configuration loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`STATION_*`)
//! 2. Defaults (this file)
//!
//! ## Thread Safety
//! Configuration is read-only after initialization, so no mutex needed.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use directories::ProjectDirs;
use fuelstation_core::money::CURRENCY_SYMBOL;
use fuelstation_core::Money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Pakistan Standard Time, UTC+05:00.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 300;

/// Largest offset any real time zone uses (UTC+14:00).
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Errors while loading configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// An environment variable is set but cannot be used.
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    /// No platform data directory to put the database in.
    #[error("Could not determine app data directory: {0}")]
    DataDir(String),
}

/// Station configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigState {
    /// Station name (report headers)
    pub station_name: String,

    /// Currency symbol for display
    pub currency_symbol: String,

    /// Station-local offset from UTC in minutes. Business days and months
    /// are cut at local midnight. Always within ±14:00.
    pub utc_offset_minutes: i32,

    /// A closed shift whose |variance| is above this is logged as a warning.
    pub variance_alert_threshold: Money,

    /// How many times a command re-reads and retries after losing a
    /// compare-and-swap race.
    pub cas_max_retries: u32,

    /// Database file. `None` means the platform data directory.
    pub database_path: Option<PathBuf>,
}

impl Default for ConfigState {
    /// ## Default Values
    /// - Station: "Fuel Station"
    /// - Currency: Rs.
    /// - Offset: +05:00
    /// - Variance alert: Rs. 1,000.00
    /// - CAS retries: 3
    fn default() -> Self {
        ConfigState {
            station_name: "Fuel Station".to_string(),
            currency_symbol: CURRENCY_SYMBOL.to_string(),
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            variance_alert_threshold: Money::from_major(1_000),
            cas_max_retries: 3,
            database_path: None,
        }
    }
}

impl ConfigState {
    /// Creates a ConfigState from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `STATION_NAME`: Station name
    /// - `STATION_CURRENCY_SYMBOL`: Currency symbol
    /// - `STATION_UTC_OFFSET_MINUTES`: e.g. "300" for +05:00
    /// - `STATION_VARIANCE_THRESHOLD`: e.g. "1000.00"
    /// - `STATION_CAS_RETRIES`: e.g. "3"
    /// - `STATION_DB_PATH`: Database file path
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ConfigState::default();

        if let Some(name) = lookup("STATION_NAME") {
            config.station_name = name;
        }

        if let Some(symbol) = lookup("STATION_CURRENCY_SYMBOL") {
            config.currency_symbol = symbol;
        }

        if let Some(raw) = lookup("STATION_UTC_OFFSET_MINUTES") {
            let minutes: i32 = parse_var("STATION_UTC_OFFSET_MINUTES", &raw)?;
            if minutes.abs() > MAX_UTC_OFFSET_MINUTES {
                return Err(ConfigError::InvalidValue(
                    "STATION_UTC_OFFSET_MINUTES".to_string(),
                ));
            }
            config.utc_offset_minutes = minutes;
        }

        if let Some(raw) = lookup("STATION_VARIANCE_THRESHOLD") {
            let threshold: Decimal = parse_var("STATION_VARIANCE_THRESHOLD", &raw)?;
            if threshold.is_sign_negative() {
                return Err(ConfigError::InvalidValue(
                    "STATION_VARIANCE_THRESHOLD".to_string(),
                ));
            }
            config.variance_alert_threshold = Money::round(threshold);
        }

        if let Some(raw) = lookup("STATION_CAS_RETRIES") {
            config.cas_max_retries = parse_var("STATION_CAS_RETRIES", &raw)?;
        }

        if let Some(path) = lookup("STATION_DB_PATH") {
            if path.trim().is_empty() {
                return Err(ConfigError::InvalidValue("STATION_DB_PATH".to_string()));
            }
            config.database_path = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    /// The station's fixed offset from UTC.
    ///
    /// `from_env` keeps the offset within ±14:00; a hand-built config with
    /// an impossible offset falls back to UTC.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// The station-local business day `at` falls on.
    pub fn business_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.utc_offset()).date_naive()
    }

    /// Resolves the database file path, creating the data directory if
    /// the platform default is used.
    ///
    /// ## Platform-Specific Paths
    /// - **macOS**: `~/Library/Application Support/pk.fuelstation.station/station.db`
    /// - **Windows**: `%APPDATA%\fuelstation\station\data\station.db`
    /// - **Linux**: `~/.local/share/station/station.db`
    pub fn resolve_database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }

        let proj_dirs = ProjectDirs::from("pk", "fuelstation", "station")
            .ok_or_else(|| ConfigError::DataDir("no home directory".to_string()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;

        Ok(data_dir.join("station.db"))
    }
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}
