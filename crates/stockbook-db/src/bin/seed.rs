//! # Seed Data Generator
//!
//! Populates a database with a small demo catalog, a few stock movements and
//! one bill, for trying out the portal locally.
//!
//! ## Usage
//! ```bash
//! # Seed ./stockbook_dev.db
//! cargo run -p stockbook-db --bin seed
//!
//! # Specify database path
//! cargo run -p stockbook-db --bin seed -- --db ./data/stockbook.db
//!
//! # More detail
//! RUST_LOG=stockbook_db=debug cargo run -p stockbook-db --bin seed
//! ```
//!
//! ## Generated Data
//! - One category per product group, one party, one user
//! - Products with and without a sub-unit (box, dozen, bag)
//! - An opening receipt, an issue and a correction
//! - One bill with a discount and a freight add-on

use std::env;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use stockbook_core::words::render_money_in_words;
use stockbook_core::{
    AddOn, BillItem, Category, MeasurementUnit, Money, MovementLine, MovementType, Party,
    Product, SubUnit, SupplyDetails, User,
};
use stockbook_db::repository::product::generate_product_id;
use stockbook_db::{BillingConfig, CreateBill, Database, DbConfig, LedgerConfig};

/// (category, name, unit, price in paise, sub-unit and rate)
const CATALOG: &[(&str, &str, MeasurementUnit, i64, Option<(MeasurementUnit, i64)>)] = &[
    ("Stationery", "Gel Pen Blue", MeasurementUnit::Pcs, 1_000, Some((MeasurementUnit::Box, 12))),
    ("Stationery", "A4 Ruled Pad", MeasurementUnit::Pcs, 8_500, None),
    ("Stationery", "Pencil HB", MeasurementUnit::Pcs, 500, Some((MeasurementUnit::Dozen, 12))),
    (
        "Hardware",
        "Copper Wire 1.5mm",
        MeasurementUnit::Mtr,
        2_250,
        Some((MeasurementUnit::Roll, 90)),
    ),
    ("Hardware", "Wall Putty", MeasurementUnit::Kg, 4_000, Some((MeasurementUnit::Bag, 20))),
    ("Hardware", "PVC Pipe 1in", MeasurementUnit::Ft, 3_500, None),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./stockbook_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./stockbook_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Stockbook Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let ledger_config = LedgerConfig::from_env()?;
    let billing_config = BillingConfig::from_env()?;

    // Directory
    let directory = db.directory();
    let user = User {
        id: "user-seed".to_string(),
        name: "Seed Operator".to_string(),
        email: "seed@stockbook.local".to_string(),
        role: "manager".to_string(),
    };
    directory.insert_user(&user).await?;
    directory
        .insert_party(&Party {
            id: "party-seed".to_string(),
            name: "Sharma Traders".to_string(),
            gstin: Some("27AAAPL1234C1ZV".to_string()),
            address: Some("Shivaji Nagar, Pune".to_string()),
            phone: Some("+91 98220 00000".to_string()),
        })
        .await?;

    // Catalog
    let now = Utc::now();
    let mut product_ids = Vec::with_capacity(CATALOG.len());
    for (category, name, unit, price_paise, sub_unit) in CATALOG {
        let category_id = format!("cat-{}", category.to_lowercase());
        if directory.categories_by_ids(&[category_id.clone()]).await?.is_empty() {
            directory
                .insert_category(&Category {
                    id: category_id.clone(),
                    name: category.to_string(),
                })
                .await?;
        }

        let product = Product {
            id: generate_product_id(),
            name: name.to_string(),
            category_id: Some(category_id),
            unit: *unit,
            price_paise: *price_paise,
            discount_percentage: None,
            current_stock: Decimal::ZERO,
            sub_unit: sub_unit.map(|(unit, rate)| SubUnit {
                unit,
                conversion_rate: Decimal::from(rate),
            }),
            created_at: now,
            updated_at: now,
            sync_version: 0,
        };
        db.products().insert(&product).await?;
        product_ids.push(product.id);
    }
    println!("✓ Inserted {} products", product_ids.len());

    // Movements: opening stock in sub-units where there is one
    let ledger = db.ledger(ledger_config);
    let opening: Vec<MovementLine> = CATALOG
        .iter()
        .zip(&product_ids)
        .map(|((_, _, _, _, sub_unit), id)| match sub_unit {
            Some(_) => MovementLine::sub(id.clone(), Decimal::from(5)),
            None => MovementLine::base(id.clone(), Decimal::from(40)),
        })
        .collect();
    let receipt = ledger
        .apply_movement(MovementType::Receipt, &opening, &user.id, Some("Opening stock"))
        .await?;
    println!("✓ Opening receipt {} ({} products)", receipt.movement_id, receipt.new_stock.len());

    ledger
        .apply_movement(
            MovementType::Issue,
            &[MovementLine::base(product_ids[1].clone(), Decimal::from(3))],
            &user.id,
            Some("Office use"),
        )
        .await?;
    ledger
        .apply_movement(
            MovementType::Correction,
            &[MovementLine::base(product_ids[5].clone(), Decimal::from(38))],
            &user.id,
            Some("Shelf count"),
        )
        .await?;
    println!("✓ Issue and correction applied");

    // Bill
    let created = db
        .billing(billing_config, ledger_config)
        .create_bill(CreateBill {
            bill_number: "INV-0001".to_string(),
            party_id: "party-seed".to_string(),
            items: vec![
                BillItem {
                    product_id: product_ids[0].clone(),
                    quantity: Decimal::from(2),
                    discount_percentage: Some(Decimal::from(5)),
                    is_sub_unit: true,
                    unit_price: None,
                },
                BillItem {
                    product_id: product_ids[4].clone(),
                    quantity: Decimal::new(125, 1),
                    discount_percentage: None,
                    is_sub_unit: false,
                    unit_price: None,
                },
            ],
            add_ons: vec![AddOn {
                title: "Freight".to_string(),
                price: Money::from_rupees(150),
            }],
            invoice_date: now.date_naive(),
            supply: SupplyDetails {
                place_of_supply: "Maharashtra".to_string(),
                transporter: Some("VRL Logistics".to_string()),
                vehicle_number: Some("MH12AB1234".to_string()),
                date_of_supply: Some(now.date_naive()),
            },
            created_by: user.id.clone(),
        })
        .await?;

    println!();
    println!("Bill {}", created.bill.bill_number);
    println!("  Items gross: {}", created.totals.items_gross);
    println!("  Discount:    {}", created.totals.discount);
    println!("  Add-ons:     {}", created.totals.add_ons);
    println!("  Total:       {}", created.totals.total);
    println!("  In words:    {}", render_money_in_words(created.totals.total)?);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
