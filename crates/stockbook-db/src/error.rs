//! # Database and Ledger Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error ──► DbError ──┐                                           │
//! │                            ├──► LedgerError ──► ErrorCode ──► handler  │
//! │  CoreError ────────────────┘       (+ changes already applied)         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use stockbook_core::{CoreError, ValidationError};
use thiserror::Error;

use crate::ledger::StockChange;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate bill number
    /// - Any UNIQUE index violation
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Optimistic stock update kept losing to concurrent writers.
    #[error("Concurrent update conflict on {entity} {id} after {attempts} attempts")]
    Conflict {
        entity: String,
        id: String,
        attempts: u32,
    },

    /// A stock update would leave the stored figure outside the decimal range.
    ///
    /// Detected at write time, so other products of the same movement may
    /// already be updated.
    #[error("{entity} {id}: {column} out of range")]
    OutOfRange {
        entity: String,
        id: String,
        column: String,
    },

    /// A stored value could not be turned back into a domain value.
    #[error("Corrupt {column} value '{value}'")]
    Decode { column: String, value: String },

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn decode(column: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::Decode {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Whether the store itself could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DbError::ConnectionFailed(_) | DbError::PoolExhausted)
    }

    /// Whether retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::ConnectionFailed(_)
                | DbError::PoolExhausted
                | DbError::Conflict { .. }
                | DbError::TransactionFailed(_)
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::ColumnDecode   → DbError::Decode
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // "UNIQUE constraint failed: bills.bill_number"
                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::ColumnDecode { index, source } => DbError::Decode {
                column: index,
                value: source.to_string(),
            },

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Ledger / Billing Errors
// =============================================================================

/// Errors from the stock ledger and billing services.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Rejected before any write (validation, unit, strict missing product).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failed part-way through a movement.
    ///
    /// `applied` lists the per-product changes that were committed before the
    /// failure and are still in effect. They are not rolled back; reconcile
    /// them with a Correction movement. Empty when compensation succeeded.
    #[error("Persistence failed after {} product update(s): {source}", .applied.len())]
    Persistence {
        #[source]
        source: DbError,
        applied: Vec<StockChange>,
    },

    /// Storage failed with nothing written.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl LedgerError {
    /// Classifies a failure that happened before anything was written.
    ///
    /// An unreachable store is a [`LedgerError::Persistence`] with nothing
    /// applied; any other storage failure stays [`LedgerError::Db`].
    pub fn before_write(source: DbError) -> Self {
        if source.is_unavailable() {
            LedgerError::Persistence {
                source,
                applied: Vec::new(),
            }
        } else {
            LedgerError::Db(source)
        }
    }
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Core(CoreError::Validation(err))
    }
}

/// Result type for ledger and billing operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Machine-readable error codes for handler responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// Sub-unit quantity on a product without one (400)
    UnsupportedUnit,

    /// Referenced record missing (404)
    NotFound,

    /// Partial write; manual reconciliation may be needed (503)
    PersistenceError,

    /// Duplicate or concurrent write (409)
    Conflict,

    /// Storage failure (500)
    DatabaseError,
}

impl LedgerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::Core(CoreError::UnsupportedUnit { .. }) => ErrorCode::UnsupportedUnit,
            LedgerError::Core(CoreError::ProductNotFound(_) | CoreError::PriceNotFound(_)) => {
                ErrorCode::NotFound
            }
            LedgerError::Core(_) => ErrorCode::ValidationError,
            LedgerError::Persistence { .. } => ErrorCode::PersistenceError,
            LedgerError::Db(DbError::NotFound { .. }) => ErrorCode::NotFound,
            LedgerError::Db(DbError::UniqueViolation { .. } | DbError::Conflict { .. }) => {
                ErrorCode::Conflict
            }
            LedgerError::Db(DbError::ForeignKeyViolation { .. }) => ErrorCode::ValidationError,
            LedgerError::Db(_) => ErrorCode::DatabaseError,
        }
    }

    /// Whether the caller may retry the whole operation.
    ///
    /// A retried movement after a `Persistence` error re-applies the changes
    /// listed in `applied`; callers should correct instead of retrying when
    /// that list is non-empty.
    pub fn is_transient(&self) -> bool {
        match self {
            LedgerError::Core(_) => false,
            LedgerError::Persistence { source, .. } => source.is_transient(),
            LedgerError::Db(e) => e.is_transient(),
        }
    }

    /// Changes that stayed committed when the operation failed.
    pub fn applied(&self) -> &[StockChange] {
        match self {
            LedgerError::Persistence { applied, .. } => applied,
            _ => &[],
        }
    }
}
