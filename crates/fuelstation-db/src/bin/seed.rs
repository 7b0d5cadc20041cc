//! # Demo Station Seeder
//!
//! Populates a database with a small station for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./station_dev.db
//! cargo run -p fuelstation-db --bin seed
//!
//! # Specify database path
//! cargo run -p fuelstation-db --bin seed -- --db ./data/station.db
//! ```
//!
//! ## Seeded Records
//! - Fuel types: Petrol (Rs. 289.50/L) and High Speed Diesel (Rs. 296.75/L)
//! - Tanks: one 20,000 L tank per fuel type, half full
//! - Customers: one transport company with a Rs. 500,000 credit limit

use chrono::Utc;
use fuelstation_core::{new_id, Customer, CustomerStatus, FuelType, Litres, Money, Tank, TaxRate};
use fuelstation_db::{Database, DbConfig};
use rust_decimal::Decimal;
use std::env;

/// (id, name, price in paisa)
const FUEL_TYPES: &[(&str, &str, i64)] = &[
    ("petrol", "Petrol", 28_950),
    ("hsd", "High Speed Diesel", 29_675),
];

const TANK_CAPACITY_LITRES: i64 = 20_000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./station_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Fuel Station Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./station_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Fuel Station Seeder");
    println!("===================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.fuel_types().list().await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} fuel types", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let now = Utc::now();

    for (id, name, paisa) in FUEL_TYPES {
        let fuel_type = FuelType {
            id: id.to_string(),
            name: name.to_string(),
            unit_price: Money::from_cents(*paisa),
            tax_percentage: TaxRate::zero(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.fuel_types().insert(&fuel_type).await?;

        let tank = Tank {
            id: format!("tank-{id}"),
            name: format!("{name} Tank 1"),
            fuel_type_id: id.to_string(),
            capacity: Litres::new(Decimal::from(TANK_CAPACITY_LITRES)),
            current_stock: Litres::new(Decimal::from(TANK_CAPACITY_LITRES / 2)),
            minimum_stock: Litres::new(Decimal::from(TANK_CAPACITY_LITRES / 10)),
            last_reading_date: Some(now),
            version: 1,
            created_at: now,
            updated_at: now,
        };
        db.tanks().insert(&tank).await?;

        println!("✓ {} at {} / litre, tank {}", name, fuel_type.unit_price, tank.id);
    }

    let customer = Customer {
        id: new_id(),
        name: "Khan Transport Co.".to_string(),
        phone: Some("03001234567".to_string()),
        email: None,
        credit_limit: Money::from_major(500_000),
        outstanding_balance: Money::zero(),
        status: CustomerStatus::Active,
        version: 1,
        created_at: now,
        updated_at: now,
    };
    db.customers().insert(&customer).await?;
    println!("✓ Credit customer {} ({})", customer.name, customer.id);

    println!();
    println!("✓ Seed complete");

    db.close().await;
    Ok(())
}
