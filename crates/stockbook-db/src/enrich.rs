//! # Enricher
//!
//! Loads the records bills and movements refer to, then hands them to the
//! pure joins in `stockbook_core::enrich`.
//!
//! ```text
//!   bills / movements
//!        │
//!        ▼  JoinKeys (deduplicated ids)
//!   ┌────────────┬────────────┬────────────┐
//!   │  products  │  parties   │   users    │   one query per kind, concurrent
//!   └─────┬──────┴────────────┴────────────┘
//!         ▼
//!   categories of the loaded products         one more query
//!         ▼
//!   JoinSnapshot ──► enrich_bill / enrich_stock_movement
//! ```
//!
//! Reads take no locks. A record changed or deleted while a join is being
//! built shows up stale or as `None`, never as an error.

use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use stockbook_core::enrich::JoinKeys;
use stockbook_core::{
    enrich_bill, enrich_stock_movement, Bill, EnrichedBill, EnrichedMovement, JoinSnapshot,
    StockMovement,
};

#[derive(Debug, Clone)]
pub struct Enricher {
    db: Database,
}

impl Enricher {
    pub fn new(db: Database) -> Self {
        Enricher { db }
    }

    pub async fn bill(&self, bill: &Bill) -> DbResult<EnrichedBill> {
        let mut enriched = self.bills(std::slice::from_ref(bill)).await?;
        enriched
            .pop()
            .ok_or_else(|| DbError::Internal("enrichment returned no bill".to_string()))
    }

    /// Enriches a page of bills with one lookup per entity kind.
    pub async fn bills(&self, bills: &[Bill]) -> DbResult<Vec<EnrichedBill>> {
        let mut keys = JoinKeys::default();
        for bill in bills {
            keys.add_bill(bill);
        }
        let snapshot = self.load(&keys).await?;
        Ok(bills.iter().map(|b| enrich_bill(b, &snapshot)).collect())
    }

    /// Loads and enriches a stored bill.
    pub async fn bill_by_id(&self, id: &str) -> DbResult<Option<EnrichedBill>> {
        match self.db.bills().get_by_id(id).await? {
            Some(bill) => Ok(Some(self.bill(&bill).await?)),
            None => Ok(None),
        }
    }

    pub async fn movement(&self, movement: &StockMovement) -> DbResult<EnrichedMovement> {
        let mut enriched = self.movements(std::slice::from_ref(movement)).await?;
        enriched
            .pop()
            .ok_or_else(|| DbError::Internal("enrichment returned no movement".to_string()))
    }

    pub async fn movements(&self, movements: &[StockMovement]) -> DbResult<Vec<EnrichedMovement>> {
        let mut keys = JoinKeys::default();
        for movement in movements {
            keys.add_movement(movement);
        }
        let snapshot = self.load(&keys).await?;
        Ok(movements
            .iter()
            .map(|m| enrich_stock_movement(m, &snapshot))
            .collect())
    }

    async fn load(&self, keys: &JoinKeys) -> DbResult<JoinSnapshot> {
        let product_ids: Vec<String> = keys.product_ids.iter().cloned().collect();
        let party_ids: Vec<String> = keys.party_ids.iter().cloned().collect();
        let user_ids: Vec<String> = keys.user_ids.iter().cloned().collect();

        let products_repo = self.db.products();
        let directory = self.db.directory();

        let (products, parties, users) = tokio::try_join!(
            products_repo.snapshot(&product_ids),
            directory.parties_by_ids(&party_ids),
            directory.users_by_ids(&user_ids),
        )?;

        let mut snapshot = JoinSnapshot {
            parties,
            products,
            users,
            ..Default::default()
        };

        let category_ids: Vec<String> = snapshot.category_ids().into_iter().collect();
        snapshot.categories = directory.categories_by_ids(&category_ids).await?;

        debug!(
            products = snapshot.products.len(),
            parties = snapshot.parties.len(),
            users = snapshot.users.len(),
            categories = snapshot.categories.len(),
            "Join snapshot loaded"
        );

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BillingConfig, LedgerConfig};
    use crate::billing::CreateBill;
    use crate::DbConfig;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use stockbook_core::{
        BillItem, Category, MeasurementUnit, MovementLine, MovementType, Party, Product,
        SupplyDetails, User,
    };

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let directory = db.directory();
        directory
            .insert_category(&Category {
                id: "cat-1".to_string(),
                name: "Stationery".to_string(),
            })
            .await
            .unwrap();
        directory
            .insert_party(&Party {
                id: "party-1".to_string(),
                name: "Sharma Traders".to_string(),
                gstin: None,
                address: Some("Pune".to_string()),
                phone: None,
            })
            .await
            .unwrap();
        directory
            .insert_user(&User {
                id: "u1".to_string(),
                name: "Asha".to_string(),
                email: "asha@example.com".to_string(),
                role: "manager".to_string(),
            })
            .await
            .unwrap();

        let now = Utc::now();
        for id in ["pen", "pad"] {
            db.products()
                .insert(&Product {
                    id: id.to_string(),
                    name: id.to_uppercase(),
                    category_id: Some("cat-1".to_string()),
                    unit: MeasurementUnit::Pcs,
                    price_paise: 1_000,
                    discount_percentage: None,
                    current_stock: Decimal::from(10),
                    sub_unit: None,
                    created_at: now,
                    updated_at: now,
                    sync_version: 0,
                })
                .await
                .unwrap();
        }
        db
    }

    fn bill_request(number: &str, party_id: &str) -> CreateBill {
        CreateBill {
            bill_number: number.to_string(),
            party_id: party_id.to_string(),
            items: ["pen", "pad"]
                .into_iter()
                .map(|id| BillItem {
                    product_id: id.to_string(),
                    quantity: Decimal::ONE,
                    discount_percentage: None,
                    is_sub_unit: false,
                    unit_price: None,
                })
                .collect(),
            add_ons: Vec::new(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 7, 15).unwrap(),
            supply: SupplyDetails::default(),
            created_by: "u1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_enrich_stored_bill() {
        let db = setup().await;
        let created = db
            .billing(BillingConfig::default(), LedgerConfig::default())
            .create_bill(bill_request("INV-1", "party-1"))
            .await
            .unwrap();

        let enriched = db.enricher().bill_by_id(&created.bill.id).await.unwrap().unwrap();
        assert_eq!(enriched.party.unwrap().name, "Sharma Traders");
        assert_eq!(enriched.enriched_items.len(), 2);
        assert_eq!(
            enriched.enriched_items[0].category.as_ref().unwrap().name,
            "Stationery"
        );

        assert!(db.enricher().bill_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deleted_references_render_as_none() {
        let db = setup().await;
        let created = db
            .billing(BillingConfig::default(), LedgerConfig::default())
            .create_bill(bill_request("INV-1", "party-gone"))
            .await
            .unwrap();

        sqlx::query("DELETE FROM products WHERE id = 'pad'")
            .execute(db.pool())
            .await
            .unwrap();
        db.directory().delete_category("cat-1").await.unwrap();

        let enriched = db.enricher().bill(&created.bill).await.unwrap();
        assert!(enriched.party.is_none());
        assert_eq!(enriched.enriched_items[0].product.as_ref().unwrap().id, "pen");
        assert!(enriched.enriched_items[0].category.is_none());
        assert!(enriched.enriched_items[1].product.is_none());
        assert!(enriched.enriched_items[1].category.is_none());
    }

    #[tokio::test]
    async fn test_enrich_movements_batch() {
        let db = setup().await;
        let ledger = db.ledger(LedgerConfig::default());
        let pens = [MovementLine::base("pen", Decimal::TEN)];
        ledger
            .apply_movement(MovementType::Receipt, &pens, "u1", None)
            .await
            .unwrap();
        let pads = [MovementLine::base("pad", Decimal::ONE)];
        ledger
            .apply_movement(MovementType::Issue, &pads, "u-gone", None)
            .await
            .unwrap();

        let movements = db.movements().list(&Default::default()).await.unwrap();
        let enriched = db.enricher().movements(&movements).await.unwrap();
        assert_eq!(enriched.len(), 2);

        let by_asha = enriched
            .iter()
            .find(|m| m.movement.created_by == "u1")
            .unwrap();
        assert_eq!(by_asha.created_by_user.as_ref().unwrap().name, "Asha");
        assert_eq!(by_asha.enriched_lines[0].product.as_ref().unwrap().name, "PEN");

        let orphan = enriched
            .iter()
            .find(|m| m.movement.created_by == "u-gone")
            .unwrap();
        assert!(orphan.created_by_user.is_none());
    }
}
