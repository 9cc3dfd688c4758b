//! # Bill Totals
//!
//! Derives a bill's payable amount from its items and add-on charges.
//!
//! ## Calculation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for each item:                                                         │
//! │     base_qty   = normalize(qty, is_sub_unit)      (price is per base)  │
//! │     gross      = unit_price × base_qty                                  │
//! │     net        = gross × (1 - discount% / 100)                          │
//! │                                                                         │
//! │  total = round_paise( Σ net ) + Σ add_on.price      (add-ons: no disc.) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Line values stay exact decimals until the single rounding step, so the
//! result does not depend on item or add-on order.
//!
//! ## Price Source
//! `unit_price` on an item, when present, is a price frozen at bill creation.
//! Otherwise the live catalog price at computation time is used, so a total
//! recomputed after a price change will differ from the stored one.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::ledger::ProductSnapshot;
use crate::money::Money;
use crate::types::{AddOn, BillItem};
use crate::units;

// =============================================================================
// Priced Line
// =============================================================================

/// A bill item with its price resolved and quantity in base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub unit_price: Money,
    pub base_quantity: Decimal,
    pub discount_percentage: Option<Decimal>,
}

impl PricedLine {
    /// `unit_price × base_quantity`, exact.
    pub fn gross(&self) -> CoreResult<Decimal> {
        self.unit_price
            .to_decimal_rupees()
            .checked_mul(self.base_quantity)
            .ok_or_else(|| line_overflow("line value"))
    }

    /// Gross value less the line discount, exact.
    pub fn net(&self) -> CoreResult<Decimal> {
        let gross = self.gross()?;
        match self.discount_percentage {
            Some(pct) if !pct.is_zero() => gross
                .checked_mul(Decimal::ONE - pct / Decimal::ONE_HUNDRED)
                .ok_or_else(|| line_overflow("discounted line value")),
            _ => Ok(gross),
        }
    }
}

fn line_overflow(what: &str) -> CoreError {
    CoreError::Overflow(what.to_string())
}

fn sum_decimals(values: impl IntoIterator<Item = CoreResult<Decimal>>) -> CoreResult<Decimal> {
    values.into_iter().try_fold(Decimal::ZERO, |acc, value| {
        acc.checked_add(value?).ok_or_else(|| line_overflow("items total"))
    })
}

fn to_money(rupees: Decimal, what: &str) -> CoreResult<Money> {
    Money::from_decimal_rupees(rupees).ok_or_else(|| line_overflow(what))
}

/// Breakdown printed at the foot of an invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillTotals {
    pub items_gross: Money,
    pub discount: Money,
    pub items_net: Money,
    pub add_ons: Money,
    pub total: Money,
}

// =============================================================================
// Pure Computation
// =============================================================================

/// Computes the payable amount from priced lines and add-ons.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use stockbook_core::billing::{compute_total, PricedLine};
/// use stockbook_core::Money;
///
/// let line = PricedLine {
///     unit_price: Money::from_rupees(100),
///     base_quantity: Decimal::from(2),
///     discount_percentage: Some(Decimal::from(10)),
/// };
/// assert_eq!(compute_total(&[line], &[]), Ok(Money::from_rupees(180)));
/// ```
///
/// ## Errors
/// [`CoreError::Overflow`] when a line value or the total does not fit.
pub fn compute_total(lines: &[PricedLine], add_ons: &[AddOn]) -> CoreResult<Money> {
    Ok(compute_totals(lines, add_ons)?.total)
}

/// Same as [`compute_total`] with the full breakdown.
pub fn compute_totals(lines: &[PricedLine], add_ons: &[AddOn]) -> CoreResult<BillTotals> {
    let gross = sum_decimals(lines.iter().map(PricedLine::gross))?;
    let net = sum_decimals(lines.iter().map(PricedLine::net))?;

    let items_gross = to_money(gross, "items gross")?;
    let items_net = to_money(net, "items net")?;
    let add_ons = Money::checked_sum(add_ons.iter().map(|a| a.price))
        .ok_or_else(|| line_overflow("add-ons total"))?;

    let discount = items_gross.checked_sub(items_net).ok_or_else(|| line_overflow("discount"))?;
    let total = items_net.checked_add(add_ons).ok_or_else(|| line_overflow("bill total"))?;

    Ok(BillTotals {
        items_gross,
        discount,
        items_net,
        add_ons,
        total,
    })
}

// =============================================================================
// Catalog Resolution
// =============================================================================

/// Resolves price and base quantity for each bill item.
///
/// ## Errors
/// - [`CoreError::UnsupportedUnit`] if an item claims a sub-unit the product lacks
/// - [`CoreError::PriceNotFound`] if the product is missing and the item has
///   no frozen price it could be billed at
/// - [`CoreError::Overflow`] if a sub-unit quantity does not fit in base units
pub fn price_items(items: &[BillItem], catalog: &ProductSnapshot) -> CoreResult<Vec<PricedLine>> {
    items
        .iter()
        .map(|item| {
            let product = catalog.get(&item.product_id);

            let base_quantity = match product {
                Some(p) => units::normalize(p, item.quantity, item.is_sub_unit)?,
                None if !item.is_sub_unit && item.unit_price.is_some() => item.quantity,
                None => return Err(CoreError::PriceNotFound(item.product_id.clone())),
            };

            let unit_price = match (item.unit_price, product) {
                (Some(frozen), _) => frozen,
                (None, Some(p)) => p.price(),
                (None, None) => return Err(CoreError::PriceNotFound(item.product_id.clone())),
            };

            Ok(PricedLine {
                unit_price,
                base_quantity,
                discount_percentage: item.discount_percentage,
            })
        })
        .collect()
}

/// Computes a bill total against a catalog snapshot.
pub fn compute_bill_total(
    items: &[BillItem],
    add_ons: &[AddOn],
    catalog: &ProductSnapshot,
) -> CoreResult<Money> {
    Ok(compute_bill_totals(items, add_ons, catalog)?.total)
}

/// Computes the full breakdown against a catalog snapshot.
pub fn compute_bill_totals(
    items: &[BillItem],
    add_ons: &[AddOn],
    catalog: &ProductSnapshot,
) -> CoreResult<BillTotals> {
    let lines = price_items(items, catalog)?;
    compute_totals(&lines, add_ons)
}

/// Copies the current catalog price onto every item that has none.
///
/// Used when bills must keep their historical value through later price
/// changes.
pub fn freeze_prices(items: &mut [BillItem], catalog: &ProductSnapshot) -> CoreResult<()> {
    for item in items.iter_mut().filter(|i| i.unit_price.is_none()) {
        let product = catalog
            .get(&item.product_id)
            .ok_or_else(|| CoreError::PriceNotFound(item.product_id.clone()))?;
        item.unit_price = Some(product.price());
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::snapshot_of;
    use crate::types::{MeasurementUnit, Product, SubUnit};
    use chrono::Utc;
    use proptest::prelude::*;

    fn product(id: &str, price_rupees: i64, box_rate: Option<i64>) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: id.to_string(),
            category_id: None,
            unit: MeasurementUnit::Pcs,
            price_paise: price_rupees * 100,
            discount_percentage: None,
            current_stock: Decimal::ZERO,
            sub_unit: box_rate.map(|r| SubUnit {
                unit: MeasurementUnit::Box,
                conversion_rate: Decimal::from(r),
            }),
            created_at: now,
            updated_at: now,
            sync_version: 0,
        }
    }

    fn item(id: &str, qty: i64, discount: Option<i64>, is_sub_unit: bool) -> BillItem {
        BillItem {
            product_id: id.to_string(),
            quantity: Decimal::from(qty),
            discount_percentage: discount.map(Decimal::from),
            is_sub_unit,
            unit_price: None,
        }
    }

    fn add_on(title: &str, rupees: i64) -> AddOn {
        AddOn {
            title: title.to_string(),
            price: Money::from_rupees(rupees),
        }
    }

    #[test]
    fn test_ten_percent_off_two_units() {
        let catalog = snapshot_of(vec![product("p", 100, None)]);
        let total = compute_bill_total(&[item("p", 2, Some(10), false)], &[], &catalog).unwrap();
        assert_eq!(total, Money::from_rupees(180));
    }

    #[test]
    fn test_add_ons_are_not_discounted() {
        let catalog = snapshot_of(vec![product("p", 100, None)]);
        let totals = compute_bill_totals(
            &[item("p", 1, Some(50), false)],
            &[add_on("Freight", 40), add_on("Packing", 10)],
            &catalog,
        )
        .unwrap();
        assert_eq!(totals.items_gross, Money::from_rupees(100));
        assert_eq!(totals.discount, Money::from_rupees(50));
        assert_eq!(totals.add_ons, Money::from_rupees(50));
        assert_eq!(totals.total, Money::from_rupees(100));
    }

    #[test]
    fn test_sub_unit_items_priced_per_base_unit() {
        let catalog = snapshot_of(vec![product("p", 5, Some(12))]);
        let total = compute_bill_total(&[item("p", 2, None, true)], &[], &catalog).unwrap();
        assert_eq!(total, Money::from_rupees(120));
    }

    #[test]
    fn test_sub_unit_without_configuration_fails() {
        let catalog = snapshot_of(vec![product("p", 5, None)]);
        let result = compute_bill_total(&[item("p", 2, None, true)], &[], &catalog);
        assert!(matches!(result, Err(CoreError::UnsupportedUnit { .. })));
    }

    #[test]
    fn test_missing_product_is_price_not_found() {
        let catalog = snapshot_of(vec![]);
        let result = compute_bill_total(&[item("gone", 1, None, false)], &[], &catalog);
        assert_eq!(result, Err(CoreError::PriceNotFound("gone".to_string())));
    }

    #[test]
    fn test_frozen_price_wins_over_catalog() {
        let catalog = snapshot_of(vec![product("p", 120, None)]);
        let mut frozen = item("p", 3, None, false);
        frozen.unit_price = Some(Money::from_rupees(100));
        assert_eq!(
            compute_bill_total(&[frozen.clone()], &[], &catalog).unwrap(),
            Money::from_rupees(300)
        );

        // still billable after the product is deleted
        let empty = snapshot_of(vec![]);
        assert_eq!(
            compute_bill_total(&[frozen], &[], &empty).unwrap(),
            Money::from_rupees(300)
        );
    }

    #[test]
    fn test_live_price_reflects_catalog_changes() {
        let items = vec![item("p", 1, None, false)];
        let before = snapshot_of(vec![product("p", 100, None)]);
        let after = snapshot_of(vec![product("p", 110, None)]);
        assert_eq!(compute_bill_total(&items, &[], &before).unwrap(), Money::from_rupees(100));
        assert_eq!(compute_bill_total(&items, &[], &after).unwrap(), Money::from_rupees(110));
    }

    #[test]
    fn test_freeze_prices() {
        let catalog = snapshot_of(vec![product("p", 75, None)]);
        let mut items = vec![item("p", 1, None, false)];
        freeze_prices(&mut items, &catalog).unwrap();
        assert_eq!(items[0].unit_price, Some(Money::from_rupees(75)));
    }

    #[test]
    fn test_rounds_once_at_the_end() {
        // three lines of ₹0.333 each: per-line rounding would give ₹0.99
        let line = PricedLine {
            unit_price: Money::from_paise(1),
            base_quantity: Decimal::new(333, 1),
            discount_percentage: None,
        };
        assert_eq!(compute_total(&[line, line, line], &[]), Ok(Money::from_paise(100)));
    }

    #[test]
    fn test_extreme_prices_are_errors_not_panics() {
        let mut catalog = snapshot_of(vec![product("p", 1, None)]);
        catalog.get_mut("p").unwrap().price_paise = i64::MAX;
        let result =
            compute_bill_totals(&[item("p", 2, None, false)], &[add_on("Freight", 1)], &catalog);
        assert!(matches!(result, Err(CoreError::Overflow(_))));

        // the largest single price still totals once it fits
        let mut single = item("p", 1, None, false);
        single.unit_price = Some(Money::from_paise(i64::MAX));
        let totals = compute_bill_totals(&[single.clone()], &[], &catalog).unwrap();
        assert_eq!(totals.total, Money::from_paise(i64::MAX));

        // but not with an add-on on top
        let result = compute_bill_totals(&[single], &[add_on("Freight", 1)], &catalog);
        assert!(matches!(result, Err(CoreError::Overflow(_))));
    }

    #[test]
    fn test_huge_quantities_are_errors_not_panics() {
        let line = PricedLine {
            unit_price: Money::from_rupees(1_000),
            base_quantity: Decimal::MAX,
            discount_percentage: Some(Decimal::from(10)),
        };
        assert!(matches!(compute_total(&[line], &[]), Err(CoreError::Overflow(_))));

        let catalog = snapshot_of(vec![product("p", 5, Some(12))]);
        let mut boxes = item("p", 1, None, true);
        boxes.quantity = Decimal::MAX;
        let result = compute_bill_total(&[boxes], &[], &catalog);
        assert!(matches!(result, Err(CoreError::Overflow(_))));
    }

    proptest! {
        #[test]
        fn prop_total_is_order_independent(
            raw in proptest::collection::vec((1i64..100_000, 1i64..10_000, 0i64..=100), 1..8),
            extras in proptest::collection::vec(0i64..50_000, 0..4),
        ) {
            let lines: Vec<PricedLine> = raw
                .iter()
                .map(|(price, qty, pct)| PricedLine {
                    unit_price: Money::from_paise(*price),
                    base_quantity: Decimal::new(*qty, 2),
                    discount_percentage: Some(Decimal::from(*pct)),
                })
                .collect();
            let add_ons: Vec<AddOn> = extras
                .iter()
                .map(|p| AddOn { title: "x".to_string(), price: Money::from_paise(*p) })
                .collect();

            let mut lines_rev = lines.clone();
            lines_rev.reverse();
            let mut add_ons_rev = add_ons.clone();
            add_ons_rev.reverse();

            prop_assert_eq!(
                compute_total(&lines, &add_ons),
                compute_total(&lines_rev, &add_ons_rev)
            );
        }
    }
}
