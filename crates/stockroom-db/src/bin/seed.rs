//! # Seed Data Generator
//!
//! Populates the database with a small demo catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./stockroom_dev.db
//! cargo run -p stockroom-db --bin seed
//!
//! # Specify database path
//! cargo run -p stockroom-db --bin seed -- --db ./data/stockroom.db
//!
//! # Also record a few sales and a shipping receipt
//! cargo run -p stockroom-db --bin seed -- --with-sales
//! ```
//!
//! ## Generated Catalog
//! - Simple items (caps, bags, socks) with flat stock
//! - Items with size variants (shirts, jackets), SKU `{CODE}-{SIZE}`
//! - Prices in whole rupiah

use std::env;

use stockroom_core::{
    Money, NewProduct, NewReseller, NewShippingReceipt, NewStockLayout, NewVariant, SaleChannel,
};
use stockroom_db::{Database, DbConfig};

/// (code, name, category, stock, price)
const SIMPLE_ITEMS: &[(&str, &str, &str, i64, i64)] = &[
    ("TOPI", "Topi Baseball", "Aksesoris", 24, 45_000),
    ("TAS", "Tas Selempang", "Aksesoris", 8, 120_000),
    ("KAUS-KAKI", "Kaus Kaki", "Aksesoris", 60, 15_000),
    ("GANTUNGAN", "Gantungan Kunci", "Aksesoris", 3, 10_000),
];

/// (code, name, category, price)
const VARIANT_ITEMS: &[(&str, &str, &str, i64)] = &[
    ("KAOS", "Kaos Polos", "Pakaian", 75_000),
    ("KMJ", "Kemeja Flanel", "Pakaian", 165_000),
    ("JKT", "Jaket Hoodie", "Pakaian", 210_000),
];

/// (size, stock)
const SIZES: &[(&str, i64)] = &[("S", 5), ("M", 12), ("L", 9), ("XL", 0)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./stockroom_dev.db");
    let mut with_sales = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--with-sales" => with_sales = true,
            "--help" | "-h" => {
                println!("Stockroom Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./stockroom_dev.db)");
                println!("      --with-sales   Record demo sales and a shipping receipt");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Stockroom Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.inventory().fetch_inventory_data().await?.items.len();
    if existing > 0 {
        println!("⚠ Database already has {} items", existing);
        println!("  Skipping seed to avoid duplicate SKUs.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating catalog...");

    let mut generated = 0;

    for (code, name, category, stock, price) in SIMPLE_ITEMS {
        let product = NewProduct {
            name: name.to_string(),
            category: category.to_string(),
            sku: Some(code.to_string()),
            image_url: None,
            size: None,
            layout: NewStockLayout::Simple {
                stock: *stock,
                price: Money::from_minor(*price),
            },
        };

        match db.inventory().add_product(&product).await {
            Ok(_) => generated += 1,
            Err(e) => eprintln!("Failed to insert {}: {}", code, e),
        }
    }

    for (code, name, category, price) in VARIANT_ITEMS {
        let variants = SIZES
            .iter()
            .map(|(size, stock)| NewVariant {
                name: size.to_string(),
                sku: Some(format!("{}-{}", code, size)),
                stock: *stock,
                price: Money::from_minor(*price),
            })
            .collect();

        let product = NewProduct {
            name: name.to_string(),
            category: category.to_string(),
            sku: Some(code.to_string()),
            image_url: None,
            size: None,
            layout: NewStockLayout::Variants { variants },
        };

        match db.inventory().add_product(&product).await {
            Ok(_) => generated += 1,
            Err(e) => eprintln!("Failed to insert {}: {}", code, e),
        }
    }

    println!("✓ Generated {} items", generated);

    if with_sales {
        println!();
        println!("Recording demo sales...");

        let reseller = db
            .resellers()
            .create(&NewReseller {
                name: "Bu Sari".to_string(),
                phone: Some("081234567890".to_string()),
                address: None,
            })
            .await?;

        let sales = [
            ("KAOS-M", SaleChannel::Pos, 2, None),
            ("TOPI", SaleChannel::Shopee, 1, None),
            ("KMJ-L", SaleChannel::Tokopedia, 1, None),
            ("KAUS-KAKI", SaleChannel::Reseller, 12, Some(reseller.id.as_str())),
        ];

        for (sku, channel, quantity, reseller_id) in sales {
            match db.sales().perform_sale(sku, channel, quantity, reseller_id).await {
                Ok(sale) => println!("  {} × {} via {} ({})", quantity, sku, channel, sale.total()),
                Err(e) => eprintln!("  Failed to sell {}: {}", sku, e),
            }
        }

        let receipt = db
            .receipts()
            .create(&NewShippingReceipt {
                awb: "JP0000000001".to_string(),
                channel: SaleChannel::Shopee,
                date: chrono::Local::now().date_naive(),
                receipt_number: "INV/0001".to_string(),
            })
            .await?;
        println!("  Shipping receipt {} ({})", receipt.awb, receipt.status);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
