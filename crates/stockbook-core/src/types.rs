//! # Domain Types
//!
//! Core domain types used throughout Stockbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  StockMovement  │   │      Bill       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  unit (base)    │   │  movement_type  │   │  bill_number    │       │
//! │  │  sub_unit?      │   │  lines[]        │   │  party_id       │       │
//! │  │  price_paise    │   │  created_by     │   │  items[]        │       │
//! │  │  current_stock  │   │  notes          │   │  add_ons[]      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ MeasurementUnit │   │    SubUnit      │   │ Party/Category/ │       │
//! │  │  pcs, box, kg.. │   │  unit           │   │ User (read-only │       │
//! │  │                 │   │  conversion_rate│   │ join inputs)    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! `Product::current_stock` is written only by the stock ledger. Every other
//! product field belongs to catalog management, outside this crate.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::ledger::MovementType;
use crate::money::Money;

// =============================================================================
// Measurement Unit
// =============================================================================

/// The fixed set of units a product can be stocked or sold in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementUnit {
    Pcs,
    Box,
    Kg,
    G,
    Ltr,
    Ml,
    Mtr,
    Ft,
    Inch,
    Dozen,
    Pack,
    Bag,
    Roll,
    Set,
    Pair,
    Bundle,
    Sheet,
    Nos,
}

impl MeasurementUnit {
    pub const ALL: [MeasurementUnit; 18] = [
        MeasurementUnit::Pcs,
        MeasurementUnit::Box,
        MeasurementUnit::Kg,
        MeasurementUnit::G,
        MeasurementUnit::Ltr,
        MeasurementUnit::Ml,
        MeasurementUnit::Mtr,
        MeasurementUnit::Ft,
        MeasurementUnit::Inch,
        MeasurementUnit::Dozen,
        MeasurementUnit::Pack,
        MeasurementUnit::Bag,
        MeasurementUnit::Roll,
        MeasurementUnit::Set,
        MeasurementUnit::Pair,
        MeasurementUnit::Bundle,
        MeasurementUnit::Sheet,
        MeasurementUnit::Nos,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            MeasurementUnit::Pcs => "pcs",
            MeasurementUnit::Box => "box",
            MeasurementUnit::Kg => "kg",
            MeasurementUnit::G => "g",
            MeasurementUnit::Ltr => "ltr",
            MeasurementUnit::Ml => "ml",
            MeasurementUnit::Mtr => "mtr",
            MeasurementUnit::Ft => "ft",
            MeasurementUnit::Inch => "inch",
            MeasurementUnit::Dozen => "dozen",
            MeasurementUnit::Pack => "pack",
            MeasurementUnit::Bag => "bag",
            MeasurementUnit::Roll => "roll",
            MeasurementUnit::Set => "set",
            MeasurementUnit::Pair => "pair",
            MeasurementUnit::Bundle => "bundle",
            MeasurementUnit::Sheet => "sheet",
            MeasurementUnit::Nos => "nos",
        }
    }
}

impl fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasurementUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        MeasurementUnit::ALL
            .iter()
            .copied()
            .find(|unit| unit.as_str() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "unit".to_string(),
                allowed: MeasurementUnit::ALL
                    .iter()
                    .map(|u| u.as_str().to_string())
                    .collect(),
            })
    }
}

// =============================================================================
// Product
// =============================================================================

/// An alternate unit for a product.
///
/// `conversion_rate` is how many base units one sub-unit equals
/// (a box of 12 pieces has rate 12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SubUnit {
    pub unit: MeasurementUnit,
    #[ts(as = "String")]
    pub conversion_rate: Decimal,
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name printed on invoices.
    pub name: String,

    /// Optional category reference.
    pub category_id: Option<String>,

    /// Unit `current_stock` is denominated in.
    pub unit: MeasurementUnit,

    /// Price per base unit, in paise.
    pub price_paise: i64,

    /// Catalog discount shown to staff when billing (0-100).
    #[ts(as = "Option<String>")]
    pub discount_percentage: Option<Decimal>,

    /// Running stock in base units. May go negative after oversells.
    #[ts(as = "String")]
    pub current_stock: Decimal,

    /// Optional secondary unit.
    pub sub_unit: Option<SubUnit>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// Bumped on every write; stock updates compare-and-set on it.
    pub sync_version: i64,
}

impl Product {
    /// Returns the base-unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_paise(self.price_paise)
    }

    #[inline]
    pub fn has_sub_unit(&self) -> bool {
        self.sub_unit.is_some()
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// One line of a stock movement, as entered by the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MovementLine {
    pub product_id: String,
    /// Quantity in the unit `is_sub_unit` selects.
    #[ts(as = "String")]
    pub quantity: Decimal,
    #[serde(default)]
    pub is_sub_unit: bool,
}

impl MovementLine {
    pub fn base(product_id: impl Into<String>, quantity: Decimal) -> Self {
        MovementLine {
            product_id: product_id.into(),
            quantity,
            is_sub_unit: false,
        }
    }

    pub fn sub(product_id: impl Into<String>, quantity: Decimal) -> Self {
        MovementLine {
            product_id: product_id.into(),
            quantity,
            is_sub_unit: true,
        }
    }
}

/// An append-only ledger entry. Its effect on stock is applied once, at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: String,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub lines: Vec<MovementLine>,
    pub notes: Option<String>,
    /// User who created the movement.
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Bill
// =============================================================================

/// A bill line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillItem {
    pub product_id: String,
    #[ts(as = "String")]
    pub quantity: Decimal,
    /// Percentage off this line (0-100).
    #[ts(as = "Option<String>")]
    pub discount_percentage: Option<Decimal>,
    #[serde(default)]
    pub is_sub_unit: bool,
    /// Base-unit price frozen at bill creation. `None` means the live
    /// catalog price is used whenever the total is computed.
    #[serde(default)]
    pub unit_price: Option<Money>,
}

/// An extra charge on a bill (freight, packing). Never discounted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AddOn {
    pub title: String,
    pub price: Money,
}

/// Where and how the goods were supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SupplyDetails {
    pub place_of_supply: String,
    pub transporter: Option<String>,
    pub vehicle_number: Option<String>,
    #[ts(as = "Option<String>")]
    pub date_of_supply: Option<NaiveDate>,
}

/// An invoice. Items are fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: String,
    /// Human-readable, unique.
    pub bill_number: String,
    pub party_id: String,
    pub items: Vec<BillItem>,
    pub add_ons: Vec<AddOn>,
    pub total_amount: Money,
    #[ts(as = "String")]
    pub invoice_date: NaiveDate,
    pub supply: SupplyDetails,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Join Inputs (owned elsewhere)
// =============================================================================

/// A customer or supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub id: String,
    pub name: String,
    pub gstin: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_parsing() {
        assert_eq!("pcs".parse::<MeasurementUnit>(), Ok(MeasurementUnit::Pcs));
        assert_eq!(" BOX ".parse::<MeasurementUnit>(), Ok(MeasurementUnit::Box));
        assert!("furlong".parse::<MeasurementUnit>().is_err());
    }

    #[test]
    fn test_unit_round_trips_through_str() {
        for unit in MeasurementUnit::ALL {
            assert_eq!(unit.as_str().parse::<MeasurementUnit>(), Ok(unit));
        }
    }

    #[test]
    fn test_unit_serializes_lowercase() {
        let json = serde_json::to_string(&MeasurementUnit::Dozen).unwrap();
        assert_eq!(json, "\"dozen\"");
    }

    #[test]
    fn test_movement_line_defaults_to_base_unit() {
        let line: MovementLine =
            serde_json::from_str(r#"{"productId":"p1","quantity":"2.5"}"#).unwrap();
        assert!(!line.is_sub_unit);
        assert_eq!(line.quantity, Decimal::new(25, 1));
    }
}
