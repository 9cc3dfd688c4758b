//! # Billing Service
//!
//! Creates bills and recomputes their totals against the catalog.
//!
//! ```text
//!   create_bill(CreateBill)
//!     │
//!     ├── validate number, items, add-ons         (no I/O)
//!     ├── bill number already used? ──► Duplicate
//!     ├── snapshot = products.snapshot(item ids)
//!     ├── snapshot_prices? ──► freeze unit_price on every item
//!     ├── totals = compute_bill_totals(items, add_ons, snapshot)
//!     ├── bills.insert(bill)                      (one transaction)
//!     └── issue_stock_on_bill? ──► ledger.apply_movement(Issue, items)
//! ```
//!
//! The bill is stored before stock is issued. If issuing fails, the bill
//! stays and the error says which stock changes were applied.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{BillingConfig, LedgerConfig};
use crate::error::{DbError, LedgerError, LedgerResult};
use crate::ledger::{MovementReceipt, StockLedger};
use crate::pool::Database;
use stockbook_core::billing::{compute_bill_totals, freeze_prices};
use stockbook_core::ledger::ProductSnapshot;
use stockbook_core::validation::{
    validate_add_ons, validate_bill_items, validate_bill_number, validate_reference,
};
use stockbook_core::{
    AddOn, Bill, BillItem, BillTotals, Money, MovementLine, MovementType, SupplyDetails,
    ValidationError,
};

/// Input for a new bill.
#[derive(Debug, Clone)]
pub struct CreateBill {
    pub bill_number: String,
    pub party_id: String,
    pub items: Vec<BillItem>,
    pub add_ons: Vec<AddOn>,
    pub invoice_date: NaiveDate,
    pub supply: SupplyDetails,
    /// Recorded on the issue movement when bills issue stock.
    pub created_by: String,
}

/// A stored bill with its computed breakdown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBill {
    pub bill: Bill,
    pub totals: BillTotals,
    /// Present when the bill also issued stock.
    pub stock: Option<MovementReceipt>,
}

#[derive(Debug, Clone)]
pub struct BillingService {
    db: Database,
    config: BillingConfig,
    ledger: StockLedger,
}

impl BillingService {
    pub fn new(db: Database, config: BillingConfig, ledger_config: LedgerConfig) -> Self {
        let ledger = StockLedger::new(db.clone(), ledger_config);
        BillingService { db, config, ledger }
    }

    /// Validates, totals and stores a bill.
    ///
    /// ## Errors
    /// - `Core(Validation(Duplicate))` if the bill number is taken
    /// - `Core(UnsupportedUnit | PriceNotFound)` if an item cannot be priced
    /// - `Persistence` if stock issuing failed after the bill was stored
    pub async fn create_bill(&self, input: CreateBill) -> LedgerResult<CreatedBill> {
        validate_bill_number(&input.bill_number)?;
        validate_reference("party_id", &input.party_id)?;
        validate_bill_items(&input.items)?;
        validate_add_ons(&input.add_ons)?;
        if self.config.issue_stock_on_bill {
            validate_reference("created_by", &input.created_by)?;
        }

        let bills = self.db.bills();
        if bills.number_exists(&input.bill_number).await? {
            return Err(duplicate_number(&input.bill_number).into());
        }

        let snapshot = self.snapshot(&input.items).await?;

        let mut items = input.items;
        if self.config.snapshot_prices {
            freeze_prices(&mut items, &snapshot)?;
        }

        let totals = compute_bill_totals(&items, &input.add_ons, &snapshot)?;

        let now = Utc::now();
        let bill = Bill {
            id: Uuid::new_v4().to_string(),
            bill_number: input.bill_number,
            party_id: input.party_id,
            items,
            add_ons: input.add_ons,
            total_amount: totals.total,
            invoice_date: input.invoice_date,
            supply: input.supply,
            created_at: now,
            updated_at: now,
        };

        // Another request may have taken the number since the check above.
        bills.insert(&bill).await.map_err(|e| match e {
            DbError::UniqueViolation { field, value } if field == "bill_number" => {
                duplicate_number(&value).into()
            }
            other => LedgerError::Db(other),
        })?;

        info!(
            bill_id = %bill.id,
            bill_number = %bill.bill_number,
            total = %bill.total_amount,
            "Bill created"
        );

        let stock = if self.config.issue_stock_on_bill {
            let lines: Vec<MovementLine> = bill
                .items
                .iter()
                .map(|item| MovementLine {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                    is_sub_unit: item.is_sub_unit,
                })
                .collect();
            let notes = format!("Bill {}", bill.bill_number);
            let receipt = self
                .ledger
                .apply_movement(MovementType::Issue, &lines, &input.created_by, Some(&notes))
                .await?;
            Some(receipt)
        } else {
            None
        };

        Ok(CreatedBill {
            bill,
            totals,
            stock,
        })
    }

    /// Computes a total against the live catalog without storing anything.
    pub async fn compute_bill_total(
        &self,
        items: &[BillItem],
        add_ons: &[AddOn],
    ) -> LedgerResult<Money> {
        let snapshot = self.snapshot(items).await?;
        Ok(compute_bill_totals(items, add_ons, &snapshot)?.total)
    }

    /// Re-derives a stored bill's breakdown. Items with a frozen price keep
    /// it; the rest use today's catalog price. The stored bill is untouched.
    pub async fn recompute_total(&self, bill_id: &str) -> LedgerResult<BillTotals> {
        let bill = self
            .db
            .bills()
            .get_by_id(bill_id)
            .await?
            .ok_or_else(|| DbError::not_found("Bill", bill_id))?;

        let snapshot = self.snapshot(&bill.items).await?;
        let totals = compute_bill_totals(&bill.items, &bill.add_ons, &snapshot)?;

        if totals.total != bill.total_amount {
            debug!(
                bill_id = %bill.id,
                stored = %bill.total_amount,
                recomputed = %totals.total,
                "Recomputed total differs from stored total"
            );
        }

        Ok(totals)
    }

    async fn snapshot(&self, items: &[BillItem]) -> LedgerResult<ProductSnapshot> {
        let mut ids: Vec<String> = items.iter().map(|i| i.product_id.clone()).collect();
        ids.sort();
        ids.dedup();
        Ok(self.db.products().snapshot(&ids).await?)
    }
}

fn duplicate_number(number: &str) -> ValidationError {
    ValidationError::Duplicate {
        field: "bill_number".to_string(),
        value: number.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DbConfig, ErrorCode};
    use rust_decimal::Decimal;
    use stockbook_core::{CoreError, MeasurementUnit, Product, SubUnit};

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        for (id, rupees, stock, box_rate) in [("pen", 10, 100, Some(10)), ("pad", 100, 20, None)] {
            db.products()
                .insert(&Product {
                    id: id.to_string(),
                    name: id.to_uppercase(),
                    category_id: None,
                    unit: MeasurementUnit::Pcs,
                    price_paise: rupees * 100,
                    discount_percentage: None,
                    current_stock: Decimal::from(stock),
                    sub_unit: box_rate.map(|r| SubUnit {
                        unit: MeasurementUnit::Box,
                        conversion_rate: Decimal::from(r),
                    }),
                    created_at: now,
                    updated_at: now,
                    sync_version: 0,
                })
                .await
                .unwrap();
        }
        db
    }

    fn item(product_id: &str, qty: i64, discount: Option<i64>, sub: bool) -> BillItem {
        BillItem {
            product_id: product_id.to_string(),
            quantity: Decimal::from(qty),
            discount_percentage: discount.map(Decimal::from),
            is_sub_unit: sub,
            unit_price: None,
        }
    }

    fn request(number: &str, items: Vec<BillItem>) -> CreateBill {
        CreateBill {
            bill_number: number.to_string(),
            party_id: "party-1".to_string(),
            items,
            add_ons: vec![AddOn {
                title: "Freight".to_string(),
                price: Money::from_rupees(50),
            }],
            invoice_date: NaiveDate::from_ymd_opt(2024, 7, 15).unwrap(),
            supply: SupplyDetails {
                place_of_supply: "Pune".to_string(),
                ..Default::default()
            },
            created_by: "u1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_bill_totals() {
        let db = setup().await;
        let billing = db.billing(BillingConfig::default(), LedgerConfig::default());

        // 2 boxes of pens = 20 pcs at ₹10 = ₹200; 2 pads at ₹100 less 10% = ₹180
        let created = billing
            .create_bill(request(
                "INV-1",
                vec![item("pen", 2, None, true), item("pad", 2, Some(10), false)],
            ))
            .await
            .unwrap();

        assert_eq!(created.totals.items_gross, Money::from_rupees(400));
        assert_eq!(created.totals.discount, Money::from_rupees(20));
        assert_eq!(created.totals.total, Money::from_rupees(430));
        assert!(created.stock.is_none());

        let stored = db.bills().get_by_number("INV-1").await.unwrap().unwrap();
        assert_eq!(stored.total_amount, Money::from_rupees(430));
        assert!(stored.items.iter().all(|i| i.unit_price.is_none()));
    }

    #[tokio::test]
    async fn test_duplicate_bill_number() {
        let db = setup().await;
        let billing = db.billing(BillingConfig::default(), LedgerConfig::default());
        billing
            .create_bill(request("INV-1", vec![item("pad", 1, None, false)]))
            .await
            .unwrap();

        let err = billing
            .create_bill(request("INV-1", vec![item("pad", 1, None, false)]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(matches!(
            err,
            LedgerError::Core(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));
    }

    #[tokio::test]
    async fn test_unpriceable_item_stores_nothing() {
        let db = setup().await;
        let billing = db.billing(BillingConfig::default(), LedgerConfig::default());

        let err = billing
            .create_bill(request("INV-1", vec![item("pad", 1, None, true)]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedUnit);

        let err = billing
            .create_bill(request("INV-2", vec![item("ghost", 1, None, false)]))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Core(CoreError::PriceNotFound(_))));

        assert!(db.bills().list(None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_live_price_vs_snapshot() {
        let db = setup().await;
        let live = db.billing(BillingConfig::default(), LedgerConfig::default());
        let frozen = db.billing(
            BillingConfig {
                snapshot_prices: true,
                ..Default::default()
            },
            LedgerConfig::default(),
        );

        let a = live
            .create_bill(request("INV-A", vec![item("pad", 1, None, false)]))
            .await
            .unwrap();
        let b = frozen
            .create_bill(request("INV-B", vec![item("pad", 1, None, false)]))
            .await
            .unwrap();
        assert_eq!(b.bill.items[0].unit_price, Some(Money::from_rupees(100)));

        db.products().update_price("pad", 12_000).await.unwrap();

        let a_now = live.recompute_total(&a.bill.id).await.unwrap();
        let b_now = live.recompute_total(&b.bill.id).await.unwrap();
        assert_eq!(a_now.total, Money::from_rupees(170));
        assert_eq!(b_now.total, Money::from_rupees(150));

        // stored totals never change
        let stored = db.bills().get_by_id(&a.bill.id).await.unwrap().unwrap();
        assert_eq!(stored.total_amount, Money::from_rupees(150));
    }

    #[tokio::test]
    async fn test_issue_stock_on_bill() {
        let db = setup().await;
        let billing = db.billing(
            BillingConfig {
                issue_stock_on_bill: true,
                ..Default::default()
            },
            LedgerConfig::default(),
        );

        let created = billing
            .create_bill(request(
                "INV-1",
                vec![item("pen", 1, None, true), item("pad", 3, None, false)],
            ))
            .await
            .unwrap();

        let receipt = created.stock.unwrap();
        assert_eq!(receipt.movement_type, MovementType::Issue);

        let pen = db.products().get_by_id("pen").await.unwrap().unwrap();
        let pad = db.products().get_by_id("pad").await.unwrap().unwrap();
        assert_eq!(pen.current_stock, Decimal::from(90));
        assert_eq!(pad.current_stock, Decimal::from(17));

        let movement = db.movements().get_by_id(&receipt.movement_id).await.unwrap().unwrap();
        assert_eq!(movement.notes.as_deref(), Some("Bill INV-1"));
    }

    #[tokio::test]
    async fn test_compute_and_recompute_missing() {
        let db = setup().await;
        let billing = db.billing(BillingConfig::default(), LedgerConfig::default());

        let total = billing
            .compute_bill_total(&[item("pad", 2, Some(10), false)], &[])
            .await
            .unwrap();
        assert_eq!(total, Money::from_rupees(180));

        let err = billing.recompute_total("no-such-bill").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_unrepresentable_total_is_rejected_unstored() {
        let db = setup().await;
        db.products().update_price("pad", i64::MAX).await.unwrap();
        let billing = db.billing(BillingConfig::default(), LedgerConfig::default());

        let err = billing
            .create_bill(request("INV-9", vec![item("pad", 2, None, false)]))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Core(CoreError::Overflow(_))));
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(db.bills().get_by_number("INV-9").await.unwrap().is_none());
    }
}
