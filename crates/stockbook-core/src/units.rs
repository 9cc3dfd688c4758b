//! # Unit Model
//!
//! Translates quantities entered in a product's sub-unit into base units.
//!
//! ## Normalization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Product: Screws   base unit: pcs   sub-unit: box (rate 12)            │
//! │                                                                         │
//! │  normalize(qty 2, is_sub_unit=true)   → 2 × 12 = 24 pcs                │
//! │  normalize(qty 2, is_sub_unit=false)  → 2 pcs                          │
//! │                                                                         │
//! │  Product: Cable   base unit: mtr   (no sub-unit)                        │
//! │                                                                         │
//! │  normalize(qty 2, is_sub_unit=true)   → UnsupportedUnit                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Results keep full decimal precision. Rounding only happens for display
//! via [`display_quantity`].

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{CoreError, CoreResult};
use crate::types::{Product, SubUnit};

/// Converts `quantity` to the product's base unit.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use stockbook_core::units::to_base_quantity;
/// use stockbook_core::{MeasurementUnit, SubUnit};
///
/// let sub_unit = Some(SubUnit { unit: MeasurementUnit::Box, conversion_rate: Decimal::from(12) });
/// let base = to_base_quantity("p1", sub_unit.as_ref(), Decimal::from(2), true).unwrap();
/// assert_eq!(base, Decimal::from(24));
/// ```
pub fn to_base_quantity(
    product_id: &str,
    sub_unit: Option<&SubUnit>,
    quantity: Decimal,
    is_sub_unit: bool,
) -> CoreResult<Decimal> {
    if !is_sub_unit {
        return Ok(quantity);
    }

    match sub_unit {
        Some(sub) => quantity
            .checked_mul(sub.conversion_rate)
            .ok_or_else(|| CoreError::Overflow(format!("base quantity of {product_id}"))),
        None => Err(CoreError::UnsupportedUnit {
            product_id: product_id.to_string(),
        }),
    }
}

/// Normalizes a quantity for `product` to base units.
///
/// Fails with [`CoreError::UnsupportedUnit`] when `is_sub_unit` is set but the
/// product has no sub-unit, and with [`CoreError::Overflow`] when the
/// converted quantity does not fit a decimal.
#[inline]
pub fn normalize(product: &Product, quantity: Decimal, is_sub_unit: bool) -> CoreResult<Decimal> {
    to_base_quantity(&product.id, product.sub_unit.as_ref(), quantity, is_sub_unit)
}

/// Formats a quantity with a fixed number of decimals, trailing zeros trimmed.
///
/// ```rust
/// use rust_decimal::Decimal;
/// use stockbook_core::units::display_quantity;
///
/// assert_eq!(display_quantity(Decimal::new(66_666_667, 7), 3), "6.667");
/// assert_eq!(display_quantity(Decimal::from(24), 3), "24");
/// ```
pub fn display_quantity(quantity: Decimal, decimals: u32) -> String {
    quantity
        .round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
        .to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MeasurementUnit;
    use chrono::Utc;
    use proptest::prelude::*;

    fn product(sub_unit: Option<SubUnit>) -> Product {
        let now = Utc::now();
        Product {
            id: "p1".to_string(),
            name: "Wood Screw".to_string(),
            category_id: None,
            unit: MeasurementUnit::Pcs,
            price_paise: 1000,
            discount_percentage: None,
            current_stock: Decimal::ZERO,
            sub_unit,
            created_at: now,
            updated_at: now,
            sync_version: 0,
        }
    }

    fn boxes_of(rate: Decimal) -> Option<SubUnit> {
        Some(SubUnit {
            unit: MeasurementUnit::Box,
            conversion_rate: rate,
        })
    }

    #[test]
    fn test_base_quantity_passes_through() {
        let p = product(None);
        assert_eq!(normalize(&p, Decimal::new(25, 1), false), Ok(Decimal::new(25, 1)));
    }

    #[test]
    fn test_sub_unit_multiplies_by_rate() {
        let p = product(boxes_of(Decimal::from(12)));
        assert_eq!(normalize(&p, Decimal::from(2), true), Ok(Decimal::from(24)));
    }

    #[test]
    fn test_fractional_rate() {
        // stocked in ft, sold by the 3.5 ft length
        let p = product(boxes_of(Decimal::new(35, 1)));
        assert_eq!(normalize(&p, Decimal::from(3), true), Ok(Decimal::new(105, 1)));
    }

    #[test]
    fn test_sub_unit_without_configuration_fails() {
        let p = product(None);
        assert_eq!(
            normalize(&p, Decimal::ONE, true),
            Err(CoreError::UnsupportedUnit {
                product_id: "p1".to_string()
            })
        );
    }

    #[test]
    fn test_huge_sub_unit_quantity_is_an_error() {
        let p = product(boxes_of(Decimal::from(12)));
        assert!(matches!(normalize(&p, Decimal::MAX, true), Err(CoreError::Overflow(_))));
        assert_eq!(normalize(&p, Decimal::MAX, false), Ok(Decimal::MAX));
    }

    #[test]
    fn test_display_rounds_only_for_presentation() {
        let third = Decimal::ONE / Decimal::from(3);
        assert_eq!(display_quantity(third, 3), "0.333");
        assert_eq!(display_quantity(Decimal::new(-15, 1), 0), "-2");
    }

    proptest! {
        #[test]
        fn prop_no_sub_unit_always_rejects(q in -1_000_000i64..1_000_000, scale in 0u32..4) {
            let p = product(None);
            let result = normalize(&p, Decimal::new(q, scale), true);
            prop_assert!(
                matches!(result, Err(CoreError::UnsupportedUnit { .. })),
                "expected UnsupportedUnit"
            );
        }

        #[test]
        fn prop_sub_unit_scales_by_rate(
            q in 0i64..1_000_000,
            rate in 1i64..10_000,
            rate_scale in 0u32..3,
        ) {
            let rate = Decimal::new(rate, rate_scale);
            let p = product(boxes_of(rate));
            let qty = Decimal::new(q, 2);
            prop_assert_eq!(normalize(&p, qty, true), Ok(qty * rate));
            prop_assert_eq!(normalize(&p, qty, false), Ok(qty));
        }
    }
}
