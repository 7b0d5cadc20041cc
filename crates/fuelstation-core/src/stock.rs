//! # Stock Management Engine
//!
//! Tank stock mutations and low-stock alerting.
//!
//! ## Mutation Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Caller                         Engine                  Store           │
//! │    │                              │                       │             │
//! │    │── read tank (version v) ─────┼──────────────────────►│             │
//! │    │── apply_sale_deduction ─────►│                       │             │
//! │    │◄──────────── Tank' ──────────│  (pure, no I/O)       │             │
//! │    │── UPDATE ... WHERE version = v ─────────────────────►│             │
//! │    │◄──────────────────── ok / VersionConflict ───────────│             │
//! │    │                                                                    │
//! │    └─ on conflict: re-read, re-run engine (it is retry-safe)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock never goes below zero or above capacity. An offending operation is
//! rejected outright, never clamped.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Litres;
use crate::types::Tank;

/// Removes sold fuel from a tank.
///
/// Returns a copy with `current_stock` reduced. The input tank is untouched,
/// as are `version` and `last_reading_date`.
pub fn apply_sale_deduction(tank: &Tank, quantity: Litres) -> CoreResult<Tank> {
    ensure_positive(quantity)?;

    if quantity > tank.current_stock {
        return Err(CoreError::InsufficientStock {
            tank_id: tank.id.clone(),
            available: tank.current_stock,
            requested: quantity,
        });
    }

    Ok(Tank {
        current_stock: tank.current_stock - quantity,
        ..tank.clone()
    })
}

/// Adds delivered fuel to a tank.
pub fn apply_purchase_addition(tank: &Tank, quantity: Litres) -> CoreResult<Tank> {
    ensure_positive(quantity)?;

    if tank.current_stock + quantity > tank.capacity {
        return Err(CoreError::CapacityExceeded {
            tank_id: tank.id.clone(),
            capacity: tank.capacity,
            current: tank.current_stock,
            requested: quantity,
        });
    }

    Ok(Tank {
        current_stock: tank.current_stock + quantity,
        ..tank.clone()
    })
}

fn ensure_positive(quantity: Litres) -> CoreResult<()> {
    if !quantity.is_positive() {
        return Err(CoreError::invalid_input(
            "quantity",
            format!("must be positive, got {}", quantity),
        ));
    }
    Ok(())
}

// =============================================================================
// Low Stock
// =============================================================================

/// Every tank below its minimum, most critical (lowest fill %) first.
///
/// Ties are broken by tank id so the order is reproducible.
pub fn check_low_stock(tanks: &[Tank]) -> Vec<Tank> {
    let mut low: Vec<Tank> = tanks.iter().filter(|t| t.is_low_stock()).cloned().collect();
    low.sort_by(|a, b| {
        a.stock_percentage()
            .cmp(&b.stock_percentage())
            .then_with(|| a.id.cmp(&b.id))
    });
    low
}

/// Low-stock line for the alert screen and report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockAlert {
    pub tank_id: String,
    pub tank_name: String,
    pub current_stock: Litres,
    pub minimum_stock: Litres,
    /// Litres needed to get back to the minimum.
    pub shortfall: Litres,
    pub stock_percentage: Decimal,
}

/// [`check_low_stock`] shaped for the renderer.
pub fn low_stock_alerts(tanks: &[Tank]) -> Vec<LowStockAlert> {
    check_low_stock(tanks)
        .into_iter()
        .map(|tank| LowStockAlert {
            stock_percentage: tank.stock_percentage(),
            shortfall: tank.minimum_stock - tank.current_stock,
            current_stock: tank.current_stock,
            minimum_stock: tank.minimum_stock,
            tank_name: tank.name,
            tank_id: tank.id,
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::tests::tank;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn named(id: &str, current: Decimal, capacity: Decimal, minimum: Decimal) -> Tank {
        Tank {
            id: id.to_string(),
            name: format!("Tank {}", id),
            ..tank(current, capacity, minimum)
        }
    }

    #[test]
    fn test_sale_deduction() {
        let t = tank(dec!(1000), dec!(5000), dec!(500));
        let after = apply_sale_deduction(&t, Litres::new(dec!(50.5))).unwrap();

        assert_eq!(after.current_stock, Litres::new(dec!(949.5)));
        assert_eq!(after.version, t.version);
        assert_eq!(after.last_reading_date, t.last_reading_date);
        // Input untouched
        assert_eq!(t.current_stock, Litres::new(dec!(1000)));
    }

    #[test]
    fn test_sale_deduction_to_exactly_zero() {
        let t = tank(dec!(45), dec!(5000), dec!(500));
        let after = apply_sale_deduction(&t, Litres::new(dec!(45))).unwrap();
        assert!(after.current_stock.is_zero());
    }

    #[test]
    fn test_insufficient_stock_is_rejected_not_clamped() {
        let t = tank(dec!(45), dec!(5000), dec!(500));
        let err = apply_sale_deduction(&t, Litres::new(dec!(60))).unwrap_err();

        assert_eq!(
            err,
            CoreError::InsufficientStock {
                tank_id: "tank-1".to_string(),
                available: Litres::new(dec!(45)),
                requested: Litres::new(dec!(60)),
            }
        );
    }

    #[test]
    fn test_purchase_addition() {
        let t = tank(dec!(1000), dec!(5000), dec!(500));
        let after = apply_purchase_addition(&t, Litres::new(dec!(4000))).unwrap();
        assert_eq!(after.current_stock, t.capacity);

        let err = apply_purchase_addition(&after, Litres::new(dec!(0.001))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
    }

    #[test]
    fn test_non_positive_quantities_rejected() {
        let t = tank(dec!(1000), dec!(5000), dec!(500));
        for q in [dec!(0), dec!(-10)] {
            assert_eq!(
                apply_sale_deduction(&t, Litres::new(q)).unwrap_err().kind(),
                ErrorKind::InvalidInput
            );
            assert_eq!(
                apply_purchase_addition(&t, Litres::new(q)).unwrap_err().kind(),
                ErrorKind::InvalidInput
            );
        }
    }

    #[test]
    fn test_check_low_stock_ordering() {
        let tanks = vec![
            named("a", dec!(25000), dec!(50000), dec!(5000)), // 50%, fine
            named("b", dec!(8000), dec!(50000), dec!(10000)), // 16%, low
            named("c", dec!(1000), dec!(20000), dec!(2000)),  // 5%, low
            named("d", dec!(2000), dec!(10000), dec!(2000)),  // at minimum, not low
        ];

        let low = check_low_stock(&tanks);
        let ids: Vec<&str> = low.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn test_low_stock_alerts() {
        let tanks = vec![named("b", dec!(8000), dec!(50000), dec!(10000))];
        let alerts = low_stock_alerts(&tanks);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].tank_name, "Tank b");
        assert_eq!(alerts[0].shortfall, Litres::new(dec!(2000)));
        assert_eq!(alerts[0].stock_percentage, dec!(16.00));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn prop_deduct_then_add_restores_stock(
            take in 1i64..50_000_000,
            rest in 0i64..50_000_000,
        ) {
            let t = tank(Decimal::new(take + rest, 3), dec!(100000), dec!(0));
            let q = Litres::new(Decimal::new(take, 3));

            let after = apply_sale_deduction(&t, q).unwrap();
            let restored = apply_purchase_addition(&after, q).unwrap();
            prop_assert_eq!(restored.current_stock, t.current_stock);
        }

        #[test]
        fn prop_deduction_never_negative(
            stock in 0i64..50_000_000,
            take in 1i64..100_000_000,
        ) {
            let t = tank(Decimal::new(stock, 3), dec!(100000), dec!(0));
            match apply_sale_deduction(&t, Litres::new(Decimal::new(take, 3))) {
                Ok(after) => prop_assert!(!after.current_stock.is_negative()),
                Err(err) => {
                    prop_assert!(take > stock);
                    prop_assert_eq!(err.kind(), ErrorKind::InsufficientStock);
                }
            }
        }
    }
}
