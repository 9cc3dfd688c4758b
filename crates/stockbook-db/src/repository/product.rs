//! # Product Repository
//!
//! Catalog reads and the atomic stock update the ledger relies on.
//!
//! ## Compare-and-Set Stock Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  current_stock is decimal TEXT, so SQL cannot add to it in place.      │
//! │  Every write is guarded by the row's sync_version instead:             │
//! │                                                                         │
//! │   1. SELECT current_stock, sync_version            → (100, v7)         │
//! │   2. new = op.checked_apply(100)                   → 124               │
//! │   3. UPDATE products SET current_stock = '124',                        │
//! │             sync_version = sync_version + 1                            │
//! │      WHERE id = ? AND sync_version = 7                                 │
//! │   4. 0 rows? another writer won → back to 1                            │
//! │                                                                         │
//! │  Terminal A: receipt +24 ─┐                                            │
//! │  Terminal B: issue   -50 ─┴─► both land, in some order: 100+24-50 = 74 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::ledger::StockChange;
use crate::repository::{decode_decimal, decode_optional_decimal, encode_decimal, fetch_by_ids};
use stockbook_core::ledger::{snapshot_of, ProductSnapshot};
use stockbook_core::{MeasurementUnit, Product, StockOp, SubUnit};

const SELECT_PRODUCT: &str = r#"
    SELECT
        id, name, category_id, unit, price_paise, discount_percentage,
        current_stock, sub_unit, conversion_rate,
        created_at, updated_at, sync_version
    FROM products
"#;

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    name: String,
    category_id: Option<String>,
    unit: MeasurementUnit,
    price_paise: i64,
    discount_percentage: Option<String>,
    current_stock: String,
    sub_unit: Option<MeasurementUnit>,
    conversion_rate: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    sync_version: i64,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> DbResult<Self> {
        let sub_unit = match (row.sub_unit, row.conversion_rate.as_deref()) {
            (Some(unit), Some(rate)) => Some(SubUnit {
                unit,
                conversion_rate: decode_decimal("products.conversion_rate", rate)?,
            }),
            _ => None,
        };

        Ok(Product {
            discount_percentage: decode_optional_decimal(
                "products.discount_percentage",
                row.discount_percentage.as_deref(),
            )?,
            current_stock: decode_decimal("products.current_stock", &row.current_stock)?,
            id: row.id,
            name: row.name,
            category_id: row.category_id,
            unit: row.unit,
            price_paise: row.price_paise,
            sub_unit,
            created_at: row.created_at,
            updated_at: row.updated_at,
            sync_version: row.sync_version,
        })
    }
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!("{SELECT_PRODUCT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Product::try_from).transpose()
    }

    /// Gets all products whose id is in `ids`. Unknown ids are left out.
    pub async fn get_many(&self, ids: &[String]) -> DbResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = ids.len(), "Fetching products by id");

        let rows: Vec<ProductRow> = fetch_by_ids(&self.pool, SELECT_PRODUCT, "id", ids).await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    /// Fetches the catalog snapshot for one movement or bill.
    pub async fn snapshot(&self, ids: &[String]) -> DbResult<ProductSnapshot> {
        Ok(snapshot_of(self.get_many(ids).await?))
    }

    /// Lists products by name.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> =
            sqlx::query_as(&format!("{SELECT_PRODUCT} ORDER BY name LIMIT ?1"))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - id already exists
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category_id, unit, price_paise, discount_percentage,
                current_stock, sub_unit, conversion_rate,
                created_at, updated_at, sync_version
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11, ?12
            )
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(product.unit)
        .bind(product.price_paise)
        .bind(product.discount_percentage.map(encode_decimal))
        .bind(encode_decimal(product.current_stock))
        .bind(product.sub_unit.map(|s| s.unit))
        .bind(product.sub_unit.map(|s| encode_decimal(s.conversion_rate)))
        .bind(product.created_at)
        .bind(product.updated_at)
        .bind(product.sync_version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Changes the catalog price of a product.
    pub async fn update_price(&self, id: &str, price_paise: i64) -> DbResult<()> {
        debug!(id = %id, price_paise, "Updating product price");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET price_paise = ?2, updated_at = ?3, sync_version = sync_version + 1
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(price_paise)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Applies one stock operation atomically.
    ///
    /// Retries the compare-and-set up to `max_attempts` times when a
    /// concurrent writer changed the row in between. At least one attempt
    /// is always made.
    ///
    /// ## Returns
    /// * `Ok(StockChange)` - stock before and after this operation
    /// * `Err(DbError::NotFound)` - product does not exist
    /// * `Err(DbError::OutOfRange)` - the new stock would not fit a decimal
    /// * `Err(DbError::Conflict)` - every attempt lost the race
    pub async fn apply_stock_op(
        &self,
        id: &str,
        op: StockOp,
        max_attempts: u32,
    ) -> DbResult<StockChange> {
        let max_attempts = max_attempts.max(1);
        for attempt in 1..=max_attempts {
            let row: Option<(String, i64)> =
                sqlx::query_as("SELECT current_stock, sync_version FROM products WHERE id = ?1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;

            let Some((stored, version)) = row else {
                return Err(DbError::not_found("Product", id));
            };

            let previous = decode_decimal("products.current_stock", &stored)?;
            let new = op.checked_apply(previous).ok_or_else(|| DbError::OutOfRange {
                entity: "Product".to_string(),
                id: id.to_string(),
                column: "current_stock".to_string(),
            })?;

            let result = sqlx::query(
                r#"
                UPDATE products
                SET current_stock = ?2, updated_at = ?3, sync_version = sync_version + 1
                WHERE id = ?1 AND sync_version = ?4
                "#,
            )
            .bind(id)
            .bind(encode_decimal(new))
            .bind(Utc::now())
            .bind(version)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 1 {
                debug!(id = %id, %previous, %new, attempt, "Stock updated");
                return Ok(StockChange {
                    product_id: id.to_string(),
                    previous,
                    new,
                });
            }

            warn!(id = %id, attempt, "Stock update lost a concurrent race, retrying");
            tokio::task::yield_now().await;
        }

        Err(DbError::Conflict {
            entity: "Product".to_string(),
            id: id.to_string(),
            attempts: max_attempts,
        })
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Generates a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}
