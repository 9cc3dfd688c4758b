//! # stockbook-core: Pure Business Logic for Stockbook
//!
//! The inventory ledger and billing rules of the portal, as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbook Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Portal handlers (outside this workspace)             │   │
//! │  │    create movement, create bill, print invoice, list bills      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stockbook-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  units  │ │ ledger  │ │ billing │ │  words  │ │ enrich  │  │   │
//! │  │   │normalize│ │  plan   │ │  total  │ │ Lakh/Cr │ │  joins  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                stockbook-db (Database Layer)                    │   │
//! │  │      SQLite, atomic per-product stock updates, read joins       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, StockMovement, Bill, Party, ...)
//! - [`money`] - Money type in integer paise
//! - [`units`] - Sub-unit to base-unit normalization
//! - [`ledger`] - Stock movement effects and batch planning
//! - [`billing`] - Bill total computation
//! - [`words`] - Amount in words (Indian numbering)
//! - [`enrich`] - Read-model joins
//! - [`rate_limit`] - Windowed request counter
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use stockbook_core::ledger::MovementType;
//!
//! let stock = Decimal::from(100);
//! let receipt = MovementType::Receipt.checked_apply(stock, Decimal::from(24));
//! assert_eq!(receipt, Some(Decimal::from(124)));
//! let count = MovementType::Correction.checked_apply(stock, Decimal::from(5));
//! assert_eq!(count, Some(Decimal::from(5)));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod enrich;
pub mod error;
pub mod ledger;
pub mod money;
pub mod rate_limit;
pub mod types;
pub mod units;
pub mod validation;
pub mod words;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use billing::{compute_bill_total, BillTotals};
pub use enrich::{
    enrich_bill, enrich_stock_movement, EnrichedBill, EnrichedMovement, JoinSnapshot,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{MissingProductPolicy, MovementType, StockOp};
pub use money::Money;
pub use types::*;
pub use words::render_amount_in_words;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Decimals shown for stock quantities in the portal.
///
/// Stored quantities keep full precision; rounding happens only at display.
pub const QUANTITY_DISPLAY_DECIMALS: u32 = 3;

/// Maximum lines in a single movement or bill.
pub const MAX_LINES: usize = 200;

/// Largest quantity accepted on one movement line or bill item.
pub const MAX_QUANTITY: i64 = 1_000_000_000;

/// Largest sub-unit conversion rate (base units per sub-unit).
pub const MAX_CONVERSION_RATE: i64 = 10_000;

/// Largest unit price or add-on charge, in paise (₹100 crore).
pub const MAX_PRICE_PAISE: i64 = 1_000_000_000_000;
