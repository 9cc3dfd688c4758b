//! # stockbook-db: Database Layer for Stockbook
//!
//! SQLite persistence for the inventory and billing portal, plus the
//! services that must touch storage: the stock ledger, bill creation and
//! read-model enrichment.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbook Data Flow                              │
//! │                                                                         │
//! │  Handler (create movement / create bill / get bill)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   stockbook-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐  ┌────────────────┐  ┌──────────────────┐  │   │
//! │  │   │  StockLedger  │  │ BillingService │  │     Enricher     │  │   │
//! │  │   │  (ledger.rs)  │  │  (billing.rs)  │  │   (enrich.rs)    │  │   │
//! │  │   └───────┬───────┘  └───────┬────────┘  └────────┬─────────┘  │   │
//! │  │           │    plan / price / join (stockbook-core)│            │   │
//! │  │           ▼                  ▼                     ▼            │   │
//! │  │   ┌─────────────────────────────────────────────────────────┐  │   │
//! │  │   │ Repositories: products, movements, bills, directory     │  │   │
//! │  │   └─────────────────────────────────────────────────────────┘  │   │
//! │  │   ┌───────────────┐                        ┌──────────────┐    │   │
//! │  │   │   Database    │                        │  Migrations  │    │   │
//! │  │   │   (pool.rs)   │                        │  (embedded)  │    │   │
//! │  │   └───────────────┘                        └──────────────┘    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and service error types
//! - [`config`] - Ledger and billing settings
//! - [`repository`] - Row-level access per table group
//! - [`ledger`] - Applies stock movements with per-product compare-and-set
//! - [`billing`] - Bill creation and total recomputation
//! - [`enrich`] - Batch joins for read APIs
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockbook_db::{Database, DbConfig, LedgerConfig};
//! use stockbook_core::{MovementLine, MovementType};
//!
//! let db = Database::new(DbConfig::new("path/to/stockbook.db")).await?;
//!
//! let lines = [MovementLine::sub(product_id, 2.into())];
//! let receipt = db
//!     .ledger(LedgerConfig::from_env()?)
//!     .apply_movement(MovementType::Receipt, &lines, user_id, None)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod config;
pub mod enrich;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use billing::{BillingService, CreateBill, CreatedBill};
pub use config::{BatchFailureMode, BillingConfig, ConfigError, LedgerConfig};
pub use enrich::Enricher;
pub use error::{DbError, DbResult, ErrorCode, LedgerError, LedgerResult};
pub use ledger::{MovementReceipt, StockChange, StockLedger};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::bill::BillRepository;
pub use repository::directory::DirectoryRepository;
pub use repository::movement::{MovementFilter, MovementRepository};
pub use repository::product::ProductRepository;
