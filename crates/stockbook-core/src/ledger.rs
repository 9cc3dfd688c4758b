//! # Stock Ledger Rules
//!
//! How a stock movement changes a product's running stock, and how a batch
//! of movement lines is reduced to one operation per product.
//!
//! ## Movement Effects
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  type         effect on current_stock (base units)                      │
//! │  ──────────   ─────────────────────────────────────                     │
//! │  Receipt      stock + qty                                               │
//! │  Issue        stock - qty         (no floor: negative = oversold)       │
//! │  Correction   qty                 (absolute set, not a delta)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Planning a Batch
//! ```text
//! lines ──► validate ──► lookup in snapshot ──► normalize ──► fold per product
//!                             │                                     │
//!                   missing ──┤ Lenient: skip + report              ▼
//!                             └ Strict:  ProductNotFound     MovementPlan
//!                                                      (first-seen product order)
//! ```
//!
//! Planning is pure. The database layer turns each [`PlannedUpdate`] into
//! one atomic compare-and-set against the product row.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{MovementLine, Product};
use crate::units;
use crate::validation::validate_movement_lines;

// =============================================================================
// Movement Type
// =============================================================================

/// Kind of stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    /// Goods in.
    Receipt,
    /// Goods out.
    Issue,
    /// Physical count overrides the running figure.
    Correction,
}

impl MovementType {
    /// Applies one base-unit quantity to a stock figure, `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use stockbook_core::ledger::MovementType;
    ///
    /// let s = Decimal::from(10);
    /// let oversold = MovementType::Issue.checked_apply(s, Decimal::from(15));
    /// assert_eq!(oversold, Some(Decimal::from(-5)));
    /// assert_eq!(MovementType::Receipt.checked_apply(Decimal::MAX, Decimal::ONE), None);
    /// ```
    pub fn checked_apply(self, current: Decimal, base_quantity: Decimal) -> Option<Decimal> {
        self.operation(base_quantity).checked_apply(current)
    }

    /// The stock operation one line of this type stands for.
    pub fn operation(self, base_quantity: Decimal) -> StockOp {
        match self {
            MovementType::Receipt => StockOp::Adjust(base_quantity),
            MovementType::Issue => StockOp::Adjust(-base_quantity),
            MovementType::Correction => StockOp::Set(base_quantity),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementType::Receipt => "receipt",
            MovementType::Issue => "issue",
            MovementType::Correction => "correction",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "receipt" => Ok(MovementType::Receipt),
            "issue" => Ok(MovementType::Issue),
            "correction" => Ok(MovementType::Correction),
            _ => Err(ValidationError::NotAllowed {
                field: "type".to_string(),
                allowed: vec![
                    "receipt".to_string(),
                    "issue".to_string(),
                    "correction".to_string(),
                ],
            }),
        }
    }
}

// =============================================================================
// Stock Operation
// =============================================================================

/// A single change to one product's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "quantity", rename_all = "lowercase")]
pub enum StockOp {
    /// Signed delta.
    Adjust(Decimal),
    /// Absolute value.
    Set(Decimal),
}

impl StockOp {
    /// The stock after this operation, `None` if it overflows a decimal.
    pub fn checked_apply(&self, current: Decimal) -> Option<Decimal> {
        match *self {
            StockOp::Adjust(delta) => current.checked_add(delta),
            StockOp::Set(value) => Some(value),
        }
    }

    /// Combines `self` followed by `next` into one operation.
    ///
    /// A later `Set` discards everything before it; a delta after a `Set`
    /// shifts the set value. `None` if the combined quantity overflows.
    pub fn checked_then(self, next: StockOp) -> Option<StockOp> {
        match (self, next) {
            (StockOp::Adjust(a), StockOp::Adjust(b)) => a.checked_add(b).map(StockOp::Adjust),
            (StockOp::Set(v), StockOp::Adjust(d)) => v.checked_add(d).map(StockOp::Set),
            (_, StockOp::Set(v)) => Some(StockOp::Set(v)),
        }
    }
}

// =============================================================================
// Missing Product Policy
// =============================================================================

/// What to do with a movement line whose product is not in the catalog.
///
/// `Lenient` is the default and keeps the long-standing behavior: the line
/// is skipped, no stock changes for it, and the rest of the batch proceeds.
/// Skipped lines are reported back in [`MovementPlan::skipped`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingProductPolicy {
    #[default]
    Lenient,
    /// Reject the whole movement before anything is written.
    Strict,
}

impl FromStr for MissingProductPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(MissingProductPolicy::Lenient),
            "strict" => Ok(MissingProductPolicy::Strict),
            _ => Err(ValidationError::NotAllowed {
                field: "missing_product_policy".to_string(),
                allowed: vec!["lenient".to_string(), "strict".to_string()],
            }),
        }
    }
}

// =============================================================================
// Movement Plan
// =============================================================================

/// The folded operation for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedUpdate {
    pub product_id: String,
    pub op: StockOp,
    /// Indexes of the movement lines folded into `op`.
    pub line_indexes: Vec<usize>,
}

/// A line that was skipped because its product was not found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SkippedLine {
    pub line_index: usize,
    pub product_id: String,
}

/// Result of planning a movement against a catalog snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementPlan {
    pub movement_type: MovementType,
    /// One entry per product, in the order products first appear in the lines.
    pub updates: Vec<PlannedUpdate>,
    pub skipped: Vec<SkippedLine>,
}

impl MovementPlan {
    pub fn is_noop(&self) -> bool {
        self.updates.is_empty()
    }
}

/// Catalog snapshot keyed by product id, fetched once per movement.
pub type ProductSnapshot = HashMap<String, Product>;

/// Builds a snapshot map from a product list.
pub fn snapshot_of(products: impl IntoIterator<Item = Product>) -> ProductSnapshot {
    products.into_iter().map(|p| (p.id.clone(), p)).collect()
}

/// Plans a movement: validates, normalizes and folds its lines per product.
///
/// ## Errors
/// - [`CoreError::Validation`] for empty batches or bad quantities
/// - [`CoreError::UnsupportedUnit`] if any line claims a missing sub-unit
/// - [`CoreError::ProductNotFound`] only under [`MissingProductPolicy::Strict`]
/// - [`CoreError::Overflow`] if a product's folded quantity does not fit
///
/// Any error means nothing may be written for this movement.
pub fn plan_movement(
    movement_type: MovementType,
    lines: &[MovementLine],
    snapshot: &ProductSnapshot,
    policy: MissingProductPolicy,
) -> CoreResult<MovementPlan> {
    validate_movement_lines(movement_type, lines)?;

    let mut updates: Vec<PlannedUpdate> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut skipped = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let Some(product) = snapshot.get(&line.product_id) else {
            match policy {
                MissingProductPolicy::Strict => {
                    return Err(CoreError::ProductNotFound(line.product_id.clone()));
                }
                MissingProductPolicy::Lenient => {
                    skipped.push(SkippedLine {
                        line_index: index,
                        product_id: line.product_id.clone(),
                    });
                    continue;
                }
            }
        };

        let base_quantity = units::normalize(product, line.quantity, line.is_sub_unit)?;
        let op = movement_type.operation(base_quantity);

        match position.get(line.product_id.as_str()) {
            Some(&at) => {
                let update = &mut updates[at];
                let overflow = || CoreError::Overflow(format!("quantity of {}", line.product_id));
                update.op = update.op.checked_then(op).ok_or_else(overflow)?;
                update.line_indexes.push(index);
            }
            None => {
                position.insert(line.product_id.as_str(), updates.len());
                updates.push(PlannedUpdate {
                    product_id: line.product_id.clone(),
                    op,
                    line_indexes: vec![index],
                });
            }
        }
    }

    Ok(MovementPlan {
        movement_type,
        updates,
        skipped,
    })
}

/// Applies a plan to an in-memory stock map, returning each product's new stock.
///
/// Mirrors what the database layer does row by row; useful for previews.
/// On [`CoreError::Overflow`] the products before the failing one keep
/// their new values.
pub fn apply_plan(
    plan: &MovementPlan,
    stock: &mut HashMap<String, Decimal>,
) -> CoreResult<Vec<(String, Decimal)>> {
    plan.updates
        .iter()
        .map(|update| {
            let entry = stock.entry(update.product_id.clone()).or_insert(Decimal::ZERO);
            *entry = update
                .op
                .checked_apply(*entry)
                .ok_or_else(|| CoreError::Overflow(format!("stock of {}", update.product_id)))?;
            Ok((update.product_id.clone(), *entry))
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
