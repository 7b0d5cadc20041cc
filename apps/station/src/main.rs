//! # Station Entry Point
//!
//! Prints one business day's P&L, sales summary and low-stock alerts as
//! JSON for a downstream renderer.
//!
//! ## Usage
//! ```bash
//! # Today, station-local time
//! station
//!
//! # A past business day
//! station 2024-03-15
//! ```

use chrono::NaiveDate;

#[tokio::main]
async fn main() {
    station_lib::init_tracing();

    let date = match std::env::args().nth(1) {
        None => None,
        Some(arg) if arg == "--help" || arg == "-h" => {
            println!("Usage: station [YYYY-MM-DD]");
            return;
        }
        Some(arg) => match NaiveDate::parse_from_str(&arg, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                eprintln!("Invalid date '{}', expected YYYY-MM-DD", arg);
                std::process::exit(2);
            }
        },
    };

    if let Err(e) = station_lib::run(date).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
