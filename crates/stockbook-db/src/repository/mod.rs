//! # Repository Module
//!
//! Database repository implementations for Stockbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  StockLedger / BillingService / Enricher                               │
//! │       │                                                                 │
//! │       │  db.products().apply_stock_op(id, op, retries)                 │
//! │       ▼                                                                 │
//! │  ProductRepository ─┐                                                   │
//! │  MovementRepository ├── row structs (FromRow) ──TryFrom──► core types  │
//! │  BillRepository     │                                                   │
//! │  DirectoryRepository┘                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Decimals travel as canonical TEXT. Rows are decoded into core types with
//! `TryFrom`, so a corrupt stored value surfaces as [`DbError::Decode`].
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog reads, stock compare-and-set
//! - [`MovementRepository`](movement::MovementRepository) - Append-only movements
//! - [`BillRepository`](bill::BillRepository) - Bills with items and add-ons
//! - [`DirectoryRepository`](directory::DirectoryRepository) - Parties, categories, users

pub mod bill;
pub mod directory;
pub mod movement;
pub mod product;

use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::error::{DbError, DbResult};

/// Bound parameters per `IN (...)` query.
const ID_CHUNK: usize = 500;

pub(crate) fn encode_decimal(value: Decimal) -> String {
    value.normalize().to_string()
}

pub(crate) fn decode_decimal(column: &str, value: &str) -> DbResult<Decimal> {
    Decimal::from_str(value).map_err(|_| DbError::decode(column, value))
}

pub(crate) fn decode_optional_decimal(
    column: &str,
    value: Option<&str>,
) -> DbResult<Option<Decimal>> {
    value.map(|v| decode_decimal(column, v)).transpose()
}

/// Runs `select` followed by `WHERE <key> IN (...)` over `ids`, in chunks.
///
/// `select` must end just before the WHERE clause.
pub(crate) async fn fetch_by_ids<R>(
    pool: &SqlitePool,
    select: &str,
    key: &str,
    ids: &[String],
) -> DbResult<Vec<R>>
where
    R: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let mut rows = Vec::with_capacity(ids.len());

    for chunk in ids.chunks(ID_CHUNK) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(select);
        builder.push(" WHERE ").push(key).push(" IN (");
        let mut separated = builder.separated(", ");
        for id in chunk {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        let mut fetched = builder.build_query_as::<R>().fetch_all(pool).await?;
        rows.append(&mut fetched);
    }

    Ok(rows)
}
