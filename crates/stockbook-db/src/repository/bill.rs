//! # Bill Repository
//!
//! Bills are written once, with their items and add-ons, in a single
//! transaction. There is no update path.
//!
//! ```text
//!   bills ──┬── bill_items    (line_index, product_id, quantity, ...)
//!           └── bill_add_ons  (line_index, title, price_paise)
//! ```

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{decode_decimal, decode_optional_decimal, encode_decimal, fetch_by_ids};
use stockbook_core::{AddOn, Bill, BillItem, Money, SupplyDetails};

const SELECT_BILL: &str = r#"
    SELECT
        id, bill_number, party_id, total_paise, invoice_date,
        place_of_supply, transporter, vehicle_number, date_of_supply,
        created_at, updated_at
    FROM bills
"#;

#[derive(Debug, FromRow)]
struct BillRow {
    id: String,
    bill_number: String,
    party_id: String,
    total_paise: i64,
    invoice_date: NaiveDate,
    place_of_supply: String,
    transporter: Option<String>,
    vehicle_number: Option<String>,
    date_of_supply: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ItemRow {
    bill_id: String,
    line_index: i64,
    product_id: String,
    quantity: String,
    discount_percentage: Option<String>,
    is_sub_unit: bool,
    unit_price_paise: Option<i64>,
}

impl TryFrom<ItemRow> for BillItem {
    type Error = DbError;

    fn try_from(row: ItemRow) -> DbResult<Self> {
        Ok(BillItem {
            quantity: decode_decimal("bill_items.quantity", &row.quantity)?,
            discount_percentage: decode_optional_decimal(
                "bill_items.discount_percentage",
                row.discount_percentage.as_deref(),
            )?,
            product_id: row.product_id,
            is_sub_unit: row.is_sub_unit,
            unit_price: row.unit_price_paise.map(Money::from_paise),
        })
    }
}

#[derive(Debug, FromRow)]
struct AddOnRow {
    bill_id: String,
    line_index: i64,
    title: String,
    price_paise: i64,
}

/// Repository for bills.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Inserts a bill with its items and add-ons in one transaction.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - bill number already used
    pub async fn insert(&self, bill: &Bill) -> DbResult<()> {
        debug!(id = %bill.id, bill_number = %bill.bill_number, "Inserting bill");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO bills (
                id, bill_number, party_id, total_paise, invoice_date,
                place_of_supply, transporter, vehicle_number, date_of_supply,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.bill_number)
        .bind(&bill.party_id)
        .bind(bill.total_amount.paise())
        .bind(bill.invoice_date)
        .bind(&bill.supply.place_of_supply)
        .bind(&bill.supply.transporter)
        .bind(&bill.supply.vehicle_number)
        .bind(bill.supply.date_of_supply)
        .bind(bill.created_at)
        .bind(bill.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.ends_with("bill_number") => {
                DbError::duplicate("bill_number", &bill.bill_number)
            }
            other => other,
        })?;

        for (index, item) in bill.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO bill_items (
                    bill_id, line_index, product_id, quantity,
                    discount_percentage, is_sub_unit, unit_price_paise
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&bill.id)
            .bind(index as i64)
            .bind(&item.product_id)
            .bind(encode_decimal(item.quantity))
            .bind(item.discount_percentage.map(encode_decimal))
            .bind(item.is_sub_unit)
            .bind(item.unit_price.map(|p| p.paise()))
            .execute(&mut *tx)
            .await?;
        }

        for (index, add_on) in bill.add_ons.iter().enumerate() {
            sqlx::query(
                "INSERT INTO bill_add_ons (bill_id, line_index, title, price_paise) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&bill.id)
            .bind(index as i64)
            .bind(&add_on.title)
            .bind(add_on.price.paise())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bill>> {
        let row: Option<BillRow> = sqlx::query_as(&format!("{SELECT_BILL} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(self.assemble(row.into_iter().collect()).await?.pop())
    }

    pub async fn get_by_number(&self, bill_number: &str) -> DbResult<Option<Bill>> {
        let row: Option<BillRow> = sqlx::query_as(&format!("{SELECT_BILL} WHERE bill_number = ?1"))
            .bind(bill_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(self.assemble(row.into_iter().collect()).await?.pop())
    }

    pub async fn number_exists(&self, bill_number: &str) -> DbResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM bills WHERE bill_number = ?1)")
                .bind(bill_number)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    /// Lists bills, latest invoice date first, optionally for one party.
    pub async fn list(&self, party_id: Option<&str>, limit: u32) -> DbResult<Vec<Bill>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_BILL);
        if let Some(party_id) = party_id {
            builder.push(" WHERE party_id = ").push_bind(party_id);
        }
        builder
            .push(" ORDER BY invoice_date DESC, created_at DESC LIMIT ")
            .push_bind(limit);

        let rows: Vec<BillRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        self.assemble(rows).await
    }

    async fn assemble(&self, rows: Vec<BillRow>) -> DbResult<Vec<Bill>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();

        let mut item_rows: Vec<ItemRow> = fetch_by_ids(
            &self.pool,
            "SELECT bill_id, line_index, product_id, quantity, discount_percentage, is_sub_unit, \
             unit_price_paise FROM bill_items",
            "bill_id",
            &ids,
        )
        .await?;
        item_rows.sort_by_key(|r| r.line_index);

        let mut add_on_rows: Vec<AddOnRow> = fetch_by_ids(
            &self.pool,
            "SELECT bill_id, line_index, title, price_paise FROM bill_add_ons",
            "bill_id",
            &ids,
        )
        .await?;
        add_on_rows.sort_by_key(|r| r.line_index);

        let mut items: HashMap<String, Vec<BillItem>> = HashMap::new();
        for row in item_rows {
            let bill_id = row.bill_id.clone();
            items.entry(bill_id).or_default().push(row.try_into()?);
        }

        let mut add_ons: HashMap<String, Vec<AddOn>> = HashMap::new();
        for row in add_on_rows {
            add_ons.entry(row.bill_id).or_default().push(AddOn {
                title: row.title,
                price: Money::from_paise(row.price_paise),
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| Bill {
                items: items.remove(&row.id).unwrap_or_default(),
                add_ons: add_ons.remove(&row.id).unwrap_or_default(),
                id: row.id,
                bill_number: row.bill_number,
                party_id: row.party_id,
                total_amount: Money::from_paise(row.total_paise),
                invoice_date: row.invoice_date,
                supply: SupplyDetails {
                    place_of_supply: row.place_of_supply,
                    transporter: row.transporter,
                    vehicle_number: row.vehicle_number,
                    date_of_supply: row.date_of_supply,
                },
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }
}
