//! # Column Codec
//!
//! Conversions between typed fields and their SQLite `TEXT` storage.
//!
//! ```text
//! Money / Litres / TaxRate   "14475.00"                     exact decimal
//! DateTime<Utc>              "2024-03-15T10:00:00.000000Z"  fixed width
//! NaiveDate                  "2024-03-15"
//! enums                      "easy_paisa"                   snake_case
//! ```
//!
//! Timestamps are written at a fixed width with a `Z` suffix, so plain
//! string comparison in SQL orders them chronologically and the half-open
//! range queries can run in the database.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use fuelstation_core::{Litres, Money, TaxRate};
use rust_decimal::Decimal;

use crate::error::{DbError, DbResult};

pub fn encode_ts(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn encode_opt_ts(at: &Option<DateTime<Utc>>) -> Option<String> {
    at.as_ref().map(encode_ts)
}

pub fn decode_ts(column: &str, raw: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::decode(column, e))
}

pub fn decode_opt_ts(column: &str, raw: Option<&str>) -> DbResult<Option<DateTime<Utc>>> {
    raw.map(|r| decode_ts(column, r)).transpose()
}

pub fn encode_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn decode_date(column: &str, raw: &str) -> DbResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| DbError::decode(column, e))
}

pub fn decode_decimal(column: &str, raw: &str) -> DbResult<Decimal> {
    Decimal::from_str(raw).map_err(|e| DbError::decode(column, e))
}

pub fn encode_money(money: &Money) -> String {
    money.amount().to_string()
}

pub fn encode_opt_money(money: &Option<Money>) -> Option<String> {
    money.as_ref().map(encode_money)
}

pub fn decode_money(column: &str, raw: &str) -> DbResult<Money> {
    decode_decimal(column, raw).map(Money::round)
}

pub fn decode_opt_money(column: &str, raw: Option<&str>) -> DbResult<Option<Money>> {
    raw.map(|r| decode_money(column, r)).transpose()
}

pub fn encode_litres(litres: &Litres) -> String {
    litres.value().to_string()
}

pub fn decode_litres(column: &str, raw: &str) -> DbResult<Litres> {
    decode_decimal(column, raw).map(Litres::new)
}

pub fn encode_rate(rate: &TaxRate) -> String {
    rate.percentage().to_string()
}

pub fn decode_rate(column: &str, raw: &str) -> DbResult<TaxRate> {
    decode_decimal(column, raw).map(TaxRate::from_percentage)
}

/// Parses a snake_case enum column.
pub fn decode_enum<T>(column: &str, raw: &str) -> DbResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>().map_err(|e| DbError::decode(column, e))
}
