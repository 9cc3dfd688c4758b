//! # Validation Module
//!
//! Input validation for movements and bills.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request handler                                              │
//! │  ├── Shape checks (deserialization)                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Quantities, discounts, bill numbers, line counts                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE / FOREIGN KEY constraints                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::ledger::MovementType;
use crate::types::{AddOn, BillItem, MovementLine};
use crate::{MAX_CONVERSION_RATE, MAX_LINES, MAX_PRICE_PAISE, MAX_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a bill number.
///
/// ## Rules
/// - Must not be empty
/// - At most 40 characters
/// - Letters, digits, `-`, `/` and `_` only (e.g. `INV/2024-25/0031`)
///
/// ## Example
/// ```rust
/// use stockbook_core::validation::validate_bill_number;
///
/// assert!(validate_bill_number("INV/2024-25/0031").is_ok());
/// assert!(validate_bill_number("").is_err());
/// ```
pub fn validate_bill_number(bill_number: &str) -> ValidationResult<()> {
    let bill_number = bill_number.trim();

    if bill_number.is_empty() {
        return Err(ValidationError::required("bill_number"));
    }

    if bill_number.len() > 40 {
        return Err(ValidationError::OutOfRange {
            field: "bill_number".to_string(),
            min: "1".to_string(),
            max: "40".to_string(),
        });
    }

    if !bill_number
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '/' | '_'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "bill_number".to_string(),
            reason: "must contain only letters, digits, '-', '/' and '_'".to_string(),
        });
    }

    Ok(())
}

/// Validates an entity id reference (non-empty after trimming).
pub fn validate_reference(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use stockbook_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required("id"));
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity that must be strictly positive.
///
/// ```rust
/// use rust_decimal::Decimal;
/// use stockbook_core::validation::validate_quantity;
///
/// assert!(validate_quantity("quantity", Decimal::new(25, 1)).is_ok());
/// assert!(validate_quantity("quantity", Decimal::ZERO).is_err());
/// assert!(validate_quantity("quantity", Decimal::MAX).is_err());
/// ```
pub fn validate_quantity(field: &str, quantity: Decimal) -> ValidationResult<()> {
    if quantity <= Decimal::ZERO {
        return Err(ValidationError::must_be_positive(field));
    }
    validate_at_most(field, quantity, MAX_QUANTITY)
}

fn validate_at_most(field: &str, value: Decimal, max: i64) -> ValidationResult<()> {
    if value > Decimal::from(max) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "0".to_string(),
            max: max.to_string(),
        });
    }
    Ok(())
}

/// Validates a percentage in the closed range 0-100.
///
/// ```rust
/// use rust_decimal::Decimal;
/// use stockbook_core::validation::validate_discount_percentage;
///
/// assert!(validate_discount_percentage(Decimal::from(10)).is_ok());
/// assert!(validate_discount_percentage(Decimal::from(101)).is_err());
/// ```
pub fn validate_discount_percentage(pct: Decimal) -> ValidationResult<()> {
    if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: "discount_percentage".to_string(),
            min: "0".to_string(),
            max: "100".to_string(),
        });
    }
    Ok(())
}

/// Validates a sub-unit conversion rate (base units per sub-unit).
pub fn validate_conversion_rate(rate: Decimal) -> ValidationResult<()> {
    if rate <= Decimal::ZERO {
        return Err(ValidationError::must_be_positive("conversion_rate"));
    }
    validate_at_most("conversion_rate", rate, MAX_CONVERSION_RATE)
}

/// Validates a price in paise (zero allowed, at most [`MAX_PRICE_PAISE`]).
pub fn validate_price_paise(field: &str, paise: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_PAISE).contains(&paise) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "0".to_string(),
            max: MAX_PRICE_PAISE.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

fn validate_line_count(field: &str, count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Empty {
            field: field.to_string(),
        });
    }
    if count > MAX_LINES {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "1".to_string(),
            max: MAX_LINES.to_string(),
        });
    }
    Ok(())
}

/// Validates the lines of a stock movement.
///
/// ## Rules
/// - At least one line, at most [`MAX_LINES`]
/// - Every line names a product
/// - Receipt / Issue quantities are > 0
/// - Correction quantities are >= 0 (counting a shelf as empty is valid)
/// - No quantity exceeds [`MAX_QUANTITY`]
pub fn validate_movement_lines(
    movement_type: MovementType,
    lines: &[MovementLine],
) -> ValidationResult<()> {
    validate_line_count("lines", lines.len())?;

    for line in lines {
        validate_reference("product_id", &line.product_id)?;
        match movement_type {
            MovementType::Receipt | MovementType::Issue => {
                validate_quantity("quantity", line.quantity)?;
            }
            MovementType::Correction => {
                if line.quantity < Decimal::ZERO {
                    return Err(ValidationError::OutOfRange {
                        field: "quantity".to_string(),
                        min: "0".to_string(),
                        max: MAX_QUANTITY.to_string(),
                    });
                }
                validate_at_most("quantity", line.quantity, MAX_QUANTITY)?;
            }
        }
    }

    Ok(())
}

/// Validates bill items.
pub fn validate_bill_items(items: &[BillItem]) -> ValidationResult<()> {
    validate_line_count("items", items.len())?;

    for item in items {
        validate_reference("product_id", &item.product_id)?;
        validate_quantity("quantity", item.quantity)?;
        if let Some(pct) = item.discount_percentage {
            validate_discount_percentage(pct)?;
        }
        if let Some(price) = item.unit_price {
            validate_price_paise("unit_price", price.paise())?;
        }
    }

    Ok(())
}

/// Validates add-on charges.
pub fn validate_add_ons(add_ons: &[AddOn]) -> ValidationResult<()> {
    for add_on in add_ons {
        if add_on.title.trim().is_empty() {
            return Err(ValidationError::required("add_on.title"));
        }
        validate_price_paise("add_on.price", add_on.price.paise())?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
