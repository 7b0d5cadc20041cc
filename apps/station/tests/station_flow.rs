//! One business day at a two-tank station, driven through the public
//! commands only.

use chrono::Utc;
use fuelstation_core::credit::AgingBucket;
use fuelstation_core::shift::ReconciliationOutcome;
use fuelstation_core::{
    Customer, CustomerStatus, FuelType, Litres, Money, PaymentMethod, Tank, TaxRate,
};
use fuelstation_db::{Database, DbConfig};
use rust_decimal_macros::dec;
use station_lib::commands::customer::{credit_status, record_customer_payment, RecordPaymentRequest};
use station_lib::commands::purchase::{
    receive_purchase, record_expense, ReceivePurchaseRequest, RecordExpenseRequest,
};
use station_lib::commands::report::{aging_report, daily_report, low_stock_report, sales_summary};
use station_lib::commands::sale::{record_sale, void_sale, RecordSaleRequest};
use station_lib::commands::shift::{close_shift, open_shift};
use station_lib::error::ErrorCode;
use station_lib::state::{ConfigState, DbState};

const OPERATOR: &str = "op-ali";
const PETROL: &str = "tank-p1";
const DIESEL: &str = "tank-d1";
const FLEET: &str = "cust-fleet";

async fn station() -> (DbState, ConfigState) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let now = Utc::now();

    for (id, name, cents, tax) in [
        ("petrol", "Petrol", 28_950, TaxRate::zero()),
        ("hsd", "High Speed Diesel", 29_675, TaxRate::from_percentage(dec!(10))),
    ] {
        db.fuel_types()
            .insert(&FuelType {
                id: id.to_string(),
                name: name.to_string(),
                unit_price: Money::from_cents(cents),
                tax_percentage: tax,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    for (id, fuel, stock) in [(PETROL, "petrol", dec!(8000)), (DIESEL, "hsd", dec!(2100))] {
        db.tanks()
            .insert(&Tank {
                id: id.to_string(),
                name: id.to_uppercase(),
                fuel_type_id: fuel.to_string(),
                capacity: Litres::new(dec!(15000)),
                current_stock: Litres::new(stock),
                minimum_stock: Litres::new(dec!(2000)),
                last_reading_date: None,
                version: 1,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    db.customers()
        .insert(&Customer {
            id: FLEET.to_string(),
            name: "Fleet Logistics".to_string(),
            phone: None,
            email: None,
            credit_limit: Money::from_major(100_000),
            outstanding_balance: Money::zero(),
            status: CustomerStatus::Active,
            version: 1,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    (DbState::new(db), ConfigState::default())
}

fn sale(tank: &str, litres: rust_decimal::Decimal, method: PaymentMethod) -> RecordSaleRequest {
    RecordSaleRequest {
        operator_id: OPERATOR.to_string(),
        tank_id: tank.to_string(),
        nozzle_id: Some("N1".to_string()),
        quantity: Litres::new(litres),
        payment_method: method,
        customer_id: (method == PaymentMethod::Credit).then(|| FLEET.to_string()),
        sold_at: None,
    }
}

fn sale_at(
    tank: &str,
    litres: rust_decimal::Decimal,
    method: PaymentMethod,
    at: chrono::DateTime<Utc>,
) -> RecordSaleRequest {
    RecordSaleRequest {
        sold_at: Some(at),
        ..sale(tank, litres, method)
    }
}

#[tokio::test]
async fn test_full_business_day() {
    let (db, config) = station().await;
    // Every record carries the same instant so the day cannot roll over
    // mid-test
    let at = Utc::now();

    // Morning: open the till with Rs. 10,000
    open_shift(&db, &config, OPERATOR, Money::from_major(10_000))
        .await
        .unwrap();

    // Cash: 40 L petrol = Rs. 11,580.00
    let cash = record_sale(&db, &config, sale_at(PETROL, dec!(40), PaymentMethod::Cash, at))
        .await
        .unwrap();
    assert_eq!(cash.sale.total_amount, Money::from_major(11_580));

    // Credit: 100 L diesel = 29,675.00 + 10 % = Rs. 32,642.50
    let credit = record_sale(&db, &config, sale_at(DIESEL, dec!(100), PaymentMethod::Credit, at))
        .await
        .unwrap();
    assert_eq!(credit.sale.tax_amount, Money::from_cents(296_750));
    assert_eq!(credit.sale.total_amount, Money::from_cents(3_264_250));
    assert_eq!(credit.customer_outstanding, Some(Money::from_cents(3_264_250)));
    // 2,100 - 100 = 2,000 is not below the minimum
    assert!(!credit.low_stock);

    // One more litre of diesel crosses the minimum
    let tipping = record_sale(&db, &config, sale_at(DIESEL, dec!(1), PaymentMethod::Cash, at))
        .await
        .unwrap();
    assert!(tipping.low_stock);
    let alerts = low_stock_report(&db).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].tank_id, DIESEL);

    // A mistaken sale is voided and its fuel goes back
    let mistake = record_sale(&db, &config, sale_at(PETROL, dec!(5), PaymentMethod::Cash, at))
        .await
        .unwrap();
    void_sale(&db, &config, &mistake.sale.id).await.unwrap();

    // Diesel tanker arrives
    let purchase = receive_purchase(
        &db,
        &config,
        ReceivePurchaseRequest {
            tank_id: DIESEL.to_string(),
            supplier_name: "Attock Petroleum".to_string(),
            invoice_number: "APL-7781".to_string(),
            quantity: Litres::new(dec!(6000)),
            rate: Money::from_major(280),
            tax_percentage: TaxRate::zero(),
            received_by: "manager".to_string(),
            received_at: Some(at),
        },
    )
    .await
    .unwrap();
    assert_eq!(purchase.total_cost, Money::from_major(1_680_000));
    assert!(low_stock_report(&db).await.unwrap().is_empty());

    let diesel = db.inner().tanks().require(DIESEL).await.unwrap();
    assert_eq!(diesel.current_stock, Litres::new(dec!(7999)));
    let petrol = db.inner().tanks().require(PETROL).await.unwrap();
    assert_eq!(petrol.current_stock, Litres::new(dec!(7960)));

    record_expense(
        &db,
        RecordExpenseRequest {
            category: "Generator fuel".to_string(),
            description: None,
            amount: Money::from_major(3_000),
            recorded_by: "manager".to_string(),
            spent_at: Some(at),
        },
    )
    .await
    .unwrap();

    // The fleet customer settles part of the bill
    let receipt = record_customer_payment(
        &db,
        &config,
        RecordPaymentRequest {
            customer_id: FLEET.to_string(),
            amount: Money::from_major(20_000),
            method: PaymentMethod::Bank,
            reference_number: Some("MCB-001".to_string()),
            received_by: "manager".to_string(),
            paid_at: Some(at),
        },
    )
    .await
    .unwrap();
    assert_eq!(receipt.outstanding_after, Money::from_cents(1_264_250));
    let status = credit_status(&db, FLEET).await.unwrap();
    assert_eq!(status.available_credit, Money::from_cents(8_735_750));

    // Evening: expected = 10,000 + 11,580 + 326.43 (1 L diesel with tax)
    let report = close_shift(&db, &config, OPERATOR, Money::from_cents(2_190_643))
        .await
        .unwrap();
    let r = &report.reconciliation;
    assert_eq!(r.sales_count, 3);
    assert_eq!(r.cash_sales_total, Money::from_cents(1_190_643));
    assert_eq!(r.variance, Money::zero());
    assert_eq!(r.outcome, ReconciliationOutcome::Balanced);

    // The till is closed: no more sales for this operator
    let err = record_sale(&db, &config, sale(PETROL, dec!(1), PaymentMethod::Cash))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ShiftState);

    let today = config.business_date(at);
    let pl = daily_report(&db, &config, today).await.unwrap();
    assert_eq!(pl.sales_count, 3);
    assert_eq!(pl.revenue, Money::from_cents(4_454_893));
    assert_eq!(pl.cost_of_goods, Money::from_major(1_680_000));
    assert_eq!(pl.operating_expenses, Money::from_major(3_000));
    assert_eq!(
        pl.net_profit,
        Money::from_cents(4_454_893) - Money::from_major(1_683_000)
    );

    let summary = sales_summary(&db, pl.period.start, pl.period.end).await.unwrap();
    assert_eq!(summary.count, 3);
    assert_eq!(summary.by_fuel_type["hsd"].quantity, Litres::new(dec!(101)));

    let aging = aging_report(&db, Utc::now()).await.unwrap();
    assert_eq!(aging.customer_total(FLEET), Money::from_cents(1_264_250));
    assert_eq!(aging.bucket_total(AgingBucket::Current), aging.total());
}
