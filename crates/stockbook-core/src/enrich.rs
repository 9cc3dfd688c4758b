//! # Read-Model Joins
//!
//! Embeds referenced records into bills and stock movements for display.
//!
//! ```text
//!   Bill { party_id, items[product_id] }
//!          │             │
//!          ▼             ▼
//!   JoinSnapshot { parties, products, categories, users }
//!          │
//!          ▼
//!   EnrichedBill { party: Option<Party>,
//!                  items[{ item, product: Option<Product>,
//!                          category: Option<Category> }] }
//! ```
//!
//! A reference that cannot be resolved becomes `None`. A bill whose product
//! was deleted must still render, so joins never fail.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{Bill, BillItem, Category, MovementLine, Party, Product, StockMovement, User};

/// Records looked up for a batch of joins, keyed by id.
///
/// Built by the persistence layer; may be stale with respect to concurrent
/// writes.
#[derive(Debug, Clone, Default)]
pub struct JoinSnapshot {
    pub parties: HashMap<String, Party>,
    pub products: HashMap<String, Product>,
    pub categories: HashMap<String, Category>,
    pub users: HashMap<String, User>,
}

/// Ids a set of bills and movements refer to, deduplicated and sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinKeys {
    pub party_ids: BTreeSet<String>,
    pub product_ids: BTreeSet<String>,
    pub user_ids: BTreeSet<String>,
}

impl JoinKeys {
    pub fn add_bill(&mut self, bill: &Bill) {
        self.party_ids.insert(bill.party_id.clone());
        self.product_ids
            .extend(bill.items.iter().map(|i| i.product_id.clone()));
    }

    pub fn add_movement(&mut self, movement: &StockMovement) {
        self.user_ids.insert(movement.created_by.clone());
        self.product_ids
            .extend(movement.lines.iter().map(|l| l.product_id.clone()));
    }
}

impl JoinSnapshot {
    /// Category ids referenced by the products in this snapshot.
    pub fn category_ids(&self) -> BTreeSet<String> {
        self.products
            .values()
            .filter_map(|p| p.category_id.clone())
            .collect()
    }

    fn product_with_category(&self, product_id: &str) -> (Option<Product>, Option<Category>) {
        let product = self.products.get(product_id).cloned();
        let category = product
            .as_ref()
            .and_then(|p| p.category_id.as_ref())
            .and_then(|id| self.categories.get(id))
            .cloned();
        (product, category)
    }
}

// =============================================================================
// Read Models
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedBillItem {
    #[serde(flatten)]
    pub item: BillItem,
    pub product: Option<Product>,
    pub category: Option<Category>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedBill {
    #[serde(flatten)]
    pub bill: Bill,
    pub party: Option<Party>,
    pub enriched_items: Vec<EnrichedBillItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedMovementLine {
    #[serde(flatten)]
    pub line: MovementLine,
    pub product: Option<Product>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedMovement {
    #[serde(flatten)]
    pub movement: StockMovement,
    pub created_by_user: Option<User>,
    pub enriched_lines: Vec<EnrichedMovementLine>,
}

// =============================================================================
// Joins
// =============================================================================

/// Embeds the party, and per item the product and its category.
pub fn enrich_bill(bill: &Bill, snapshot: &JoinSnapshot) -> EnrichedBill {
    let enriched_items = bill
        .items
        .iter()
        .map(|item| {
            let (product, category) = snapshot.product_with_category(&item.product_id);
            EnrichedBillItem {
                item: item.clone(),
                product,
                category,
            }
        })
        .collect();

    EnrichedBill {
        bill: bill.clone(),
        party: snapshot.parties.get(&bill.party_id).cloned(),
        enriched_items,
    }
}

/// Embeds the creator and per line the product.
pub fn enrich_stock_movement(
    movement: &StockMovement,
    snapshot: &JoinSnapshot,
) -> EnrichedMovement {
    let enriched_lines = movement
        .lines
        .iter()
        .map(|line| EnrichedMovementLine {
            line: line.clone(),
            product: snapshot.products.get(&line.product_id).cloned(),
        })
        .collect();

    EnrichedMovement {
        movement: movement.clone(),
        created_by_user: snapshot.users.get(&movement.created_by).cloned(),
        enriched_lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MovementType;
    use crate::money::Money;
    use crate::types::{MeasurementUnit, SupplyDetails};
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    fn product(id: &str, category_id: Option<&str>) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            category_id: category_id.map(String::from),
            unit: MeasurementUnit::Pcs,
            price_paise: 10_000,
            discount_percentage: None,
            current_stock: Decimal::from(10),
            sub_unit: None,
            created_at: now,
            updated_at: now,
            sync_version: 0,
        }
    }

    fn bill(product_ids: &[&str]) -> Bill {
        let now = Utc::now();
        Bill {
            id: "b1".to_string(),
            bill_number: "INV-1".to_string(),
            party_id: "party-1".to_string(),
            items: product_ids
                .iter()
                .map(|id| BillItem {
                    product_id: id.to_string(),
                    quantity: Decimal::ONE,
                    discount_percentage: None,
                    is_sub_unit: false,
                    unit_price: None,
                })
                .collect(),
            add_ons: vec![],
            total_amount: Money::from_rupees(100),
            invoice_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            supply: SupplyDetails::default(),
            created_at: now,
            updated_at: now,
        }
    }

    fn snapshot() -> JoinSnapshot {
        let mut snap = JoinSnapshot::default();
        snap.parties.insert(
            "party-1".to_string(),
            Party {
                id: "party-1".to_string(),
                name: "Sharma Traders".to_string(),
                gstin: None,
                address: None,
                phone: None,
            },
        );
        snap.products
            .insert("p1".to_string(), product("p1", Some("c1")));
        snap.products.insert("p2".to_string(), product("p2", Some("gone")));
        snap.categories.insert(
            "c1".to_string(),
            Category {
                id: "c1".to_string(),
                name: "Hardware".to_string(),
            },
        );
        snap.users.insert(
            "u1".to_string(),
            User {
                id: "u1".to_string(),
                name: "Asha".to_string(),
                email: "asha@example.com".to_string(),
                role: "manager".to_string(),
            },
        );
        snap
    }

    #[test]
    fn test_enrich_bill_resolves_references() {
        let enriched = enrich_bill(&bill(&["p1"]), &snapshot());
        assert_eq!(enriched.party.unwrap().name, "Sharma Traders");
        assert_eq!(enriched.enriched_items[0].product.as_ref().unwrap().id, "p1");
        assert_eq!(enriched.enriched_items[0].category.as_ref().unwrap().name, "Hardware");
    }

    #[test]
    fn test_missing_references_become_none() {
        let mut b = bill(&["p2", "deleted"]);
        b.party_id = "nobody".to_string();
        let enriched = enrich_bill(&b, &snapshot());

        assert!(enriched.party.is_none());
        // product found, its category was deleted
        assert!(enriched.enriched_items[0].product.is_some());
        assert!(enriched.enriched_items[0].category.is_none());
        assert!(enriched.enriched_items[1].product.is_none());
        assert!(enriched.enriched_items[1].category.is_none());
    }

    #[test]
    fn test_enrich_movement() {
        let now = Utc::now();
        let movement = StockMovement {
            id: "m1".to_string(),
            movement_type: MovementType::Receipt,
            lines: vec![
                MovementLine::base("p1", Decimal::from(5)),
                MovementLine::base("missing", Decimal::from(1)),
            ],
            notes: None,
            created_by: "u1".to_string(),
            created_at: now,
            updated_at: now,
        };

        let enriched = enrich_stock_movement(&movement, &snapshot());
        assert_eq!(enriched.created_by_user.unwrap().name, "Asha");
        assert!(enriched.enriched_lines[0].product.is_some());
        assert!(enriched.enriched_lines[1].product.is_none());
        assert_eq!(enriched.movement, movement);
    }

    #[test]
    fn test_join_keys_are_deduplicated() {
        let mut keys = JoinKeys::default();
        keys.add_bill(&bill(&["p1", "p1", "p2"]));
        assert_eq!(keys.product_ids.len(), 2);
        assert_eq!(keys.party_ids.len(), 1);
        assert!(keys.user_ids.is_empty());
    }

    #[test]
    fn test_enriched_bill_serializes_flat() {
        let enriched = enrich_bill(&bill(&["p1"]), &snapshot());
        let json = serde_json::to_value(&enriched).unwrap();
        assert_eq!(json["billNumber"], "INV-1");
        assert_eq!(json["party"]["name"], "Sharma Traders");
        assert_eq!(json["enrichedItems"][0]["productId"], "p1");
    }
}
