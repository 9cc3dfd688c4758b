//! # Stock Movement Repository
//!
//! Movements are append-only: inserted once, after their stock effects have
//! been applied, and never updated. Lines keep the quantity and unit flag as
//! entered, including lines that were skipped for an unknown product.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{decode_decimal, encode_decimal, fetch_by_ids};
use stockbook_core::{MovementLine, MovementType, StockMovement};

#[derive(Debug, FromRow)]
struct MovementRow {
    id: String,
    movement_type: MovementType,
    notes: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct LineRow {
    movement_id: String,
    line_index: i64,
    product_id: String,
    quantity: String,
    is_sub_unit: bool,
}

impl TryFrom<LineRow> for MovementLine {
    type Error = DbError;

    fn try_from(row: LineRow) -> DbResult<Self> {
        Ok(MovementLine {
            quantity: decode_decimal("stock_movement_lines.quantity", &row.quantity)?,
            product_id: row.product_id,
            is_sub_unit: row.is_sub_unit,
        })
    }
}

/// Filter for listing movements. Empty filter lists everything.
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    /// Only movements with at least one line for this product.
    pub product_id: Option<String>,
    pub movement_type: Option<MovementType>,
    /// Default: 50
    pub limit: Option<u32>,
}

/// Repository for stock movement records.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Inserts a movement and its lines in one transaction.
    pub async fn insert(&self, movement: &StockMovement) -> DbResult<()> {
        debug!(id = %movement.id, lines = movement.lines.len(), "Recording stock movement");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO stock_movements
                (id, movement_type, notes, created_by, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&movement.id)
        .bind(movement.movement_type)
        .bind(&movement.notes)
        .bind(&movement.created_by)
        .bind(movement.created_at)
        .bind(movement.updated_at)
        .execute(&mut *tx)
        .await?;

        for (index, line) in movement.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO stock_movement_lines
                    (movement_id, line_index, product_id, quantity, is_sub_unit)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&movement.id)
            .bind(index as i64)
            .bind(&line.product_id)
            .bind(encode_decimal(line.quantity))
            .bind(line.is_sub_unit)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Gets a movement with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<StockMovement>> {
        let row: Option<MovementRow> = sqlx::query_as(
            r#"
            SELECT id, movement_type, notes, created_by, created_at, updated_at
            FROM stock_movements
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.attach_lines(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Lists movements, newest first.
    pub async fn list(&self, filter: &MovementFilter) -> DbResult<Vec<StockMovement>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT m.id, m.movement_type, m.notes, m.created_by, m.created_at, m.updated_at \
             FROM stock_movements m WHERE 1 = 1",
        );

        if let Some(product_id) = &filter.product_id {
            builder
                .push(" AND EXISTS (SELECT 1 FROM stock_movement_lines l")
                .push(" WHERE l.movement_id = m.id AND l.product_id = ")
                .push_bind(product_id.as_str())
                .push(")");
        }
        if let Some(movement_type) = filter.movement_type {
            builder.push(" AND m.movement_type = ").push_bind(movement_type);
        }

        builder
            .push(" ORDER BY m.created_at DESC, m.id DESC LIMIT ")
            .push_bind(filter.limit.unwrap_or(50));

        let rows: Vec<MovementRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        self.attach_lines(rows).await
    }

    async fn attach_lines(&self, rows: Vec<MovementRow>) -> DbResult<Vec<StockMovement>> {
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();

        let mut line_rows: Vec<LineRow> = fetch_by_ids(
            &self.pool,
            "SELECT movement_id, line_index, product_id, quantity, is_sub_unit \
             FROM stock_movement_lines",
            "movement_id",
            &ids,
        )
        .await?;

        line_rows.sort_by_key(|r| r.line_index);

        let mut lines: HashMap<String, Vec<MovementLine>> = HashMap::new();
        for row in line_rows {
            let movement_id = row.movement_id.clone();
            lines.entry(movement_id).or_default().push(row.try_into()?);
        }

        Ok(rows
            .into_iter()
            .map(|row| StockMovement {
                lines: lines.remove(&row.id).unwrap_or_default(),
                id: row.id,
                movement_type: row.movement_type,
                notes: row.notes,
                created_by: row.created_by,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn movement(
        id: &str,
        movement_type: MovementType,
        products: &[&str],
        minutes_ago: i64,
    ) -> StockMovement {
        let at = Utc::now() - Duration::minutes(minutes_ago);
        StockMovement {
            id: id.to_string(),
            movement_type,
            lines: products
                .iter()
                .map(|p| MovementLine::base(*p, Decimal::new(15, 1)))
                .collect(),
            notes: None,
            created_by: "u1".to_string(),
            created_at: at,
            updated_at: at,
        }
    }

    async fn repo() -> MovementRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().movements()
    }

    #[tokio::test]
    async fn test_lines_keep_entry_order() {
        let repo = repo().await;
        let mut m = movement("m1", MovementType::Receipt, &["c", "a", "b"], 0);
        m.lines[1].is_sub_unit = true;
        repo.insert(&m).await.unwrap();

        let loaded = repo.get_by_id("m1").await.unwrap().unwrap();
        assert_eq!(loaded.lines, m.lines);
        assert!(repo.get_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_newest_first() {
        let repo = repo().await;
        repo.insert(&movement("old", MovementType::Receipt, &["a"], 30)).await.unwrap();
        repo.insert(&movement("mid", MovementType::Issue, &["a", "b"], 20)).await.unwrap();
        repo.insert(&movement("new", MovementType::Receipt, &["b"], 10)).await.unwrap();

        let all = repo.list(&MovementFilter::default()).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["new", "mid", "old"]);

        let for_a = repo
            .list(&MovementFilter {
                product_id: Some("a".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(for_a.len(), 2);
        assert_eq!(for_a[1].id, "old");

        let receipts_for_b = repo
            .list(&MovementFilter {
                product_id: Some("b".to_string()),
                movement_type: Some(MovementType::Receipt),
                limit: Some(5),
            })
            .await
            .unwrap();
        assert_eq!(receipts_for_b.len(), 1);
        assert_eq!(receipts_for_b[0].id, "new");
    }
}
