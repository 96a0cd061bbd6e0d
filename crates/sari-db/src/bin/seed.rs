//! # Seed Data Generator
//!
//! Populates the database with development data for Sari POS.
//!
//! ## Usage
//! ```bash
//! # Seed into the default dev database
//! cargo run -p sari-db --bin seed
//!
//! # Specify database path
//! cargo run -p sari-db --bin seed -- --db ./data/sari.db
//! ```
//!
//! ## Generated Data
//! - Two users: an admin and a cashier
//! - A spa/retail product catalog (oils, scrubs, balms, teas, ...)
//! - A handful of therapists and regular customers
//! - Two active vouchers (one percentage, one fixed)

use std::env;

use sari_core::{Role, VoucherKind};
use sari_db::repository::customer::new_customer;
use sari_db::repository::product::new_product;
use sari_db::repository::therapist::new_therapist;
use sari_db::repository::user::new_user;
use sari_db::repository::voucher::new_voucher;
use sari_db::{Database, DbConfig};

/// Catalog: (name, sku, price, base_price, stock)
const PRODUCTS: &[(&str, &str, i64, i64, i64)] = &[
    ("Lavender Massage Oil", "OIL-LAV", 50_000, 30_000, 40),
    ("Eucalyptus Massage Oil", "OIL-EUC", 50_000, 30_000, 35),
    ("Jasmine Body Scrub", "SCR-JAS", 65_000, 38_000, 25),
    ("Green Tea Body Scrub", "SCR-GRT", 65_000, 38_000, 25),
    ("Ginger Warming Balm", "BALM-GIN", 35_000, 18_000, 50),
    ("Rose Water Face Mist", "MIST-ROS", 45_000, 22_000, 30),
    ("Aloe Vera Gel", "GEL-ALO", 40_000, 20_000, 45),
    ("Chamomile Herbal Tea", "TEA-CHA", 25_000, 11_000, 60),
    ("Lemongrass Herbal Tea", "TEA-LEM", 25_000, 11_000, 60),
    ("Bamboo Foot File", "TOOL-FFL", 30_000, 14_000, 20),
    ("Hot Stone Set", "TOOL-HST", 250_000, 150_000, 5),
    ("Gift Hamper Small", "GFT-SM", 150_000, 95_000, 12),
    ("Gift Hamper Large", "GFT-LG", 300_000, 190_000, 8),
    ("Scented Candle Vanilla", "CNDL-VAN", 55_000, 27_000, 30),
    ("Scented Candle Sandalwood", "CNDL-SND", 55_000, 27_000, 30),
];

const THERAPISTS: &[&str] = &["Dewi", "Sari", "Putri", "Ayu"];

const CUSTOMERS: &[(&str, &str)] = &[
    ("Ibu Ratna", "0812-1111-2222"),
    ("Pak Budi", "0813-3333-4444"),
    ("Ibu Sinta", "0815-5555-6666"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./sari_dev.db");

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
                println!("Sari POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./sari_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Sari POS Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!();

    // Connect to database
    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing products
    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Users
    let admin = new_user("admin", Role::Admin);
    let cashier = new_user("cashier", Role::Cashier);
    db.users().insert(&admin).await?;
    db.users().insert(&cashier).await?;
    println!("✓ Seeded users: admin, cashier");

    // Products
    let start = std::time::Instant::now();
    let mut generated = 0;
    for &(name, sku, price, base_price, stock) in PRODUCTS {
        let product = new_product(name, sku, price, base_price, stock);
        if let Err(e) = db.products().insert(&product).await {
            eprintln!("Failed to insert {}: {}", sku, e);
            continue;
        }
        generated += 1;
    }
    println!(
        "✓ Seeded {} products in {:?}",
        generated,
        start.elapsed()
    );

    // Therapists
    for name in THERAPISTS {
        db.therapists().insert(&new_therapist(name)).await?;
    }
    println!("✓ Seeded {} therapists", THERAPISTS.len());

    // Customers
    for &(name, phone) in CUSTOMERS {
        db.customers().insert(&new_customer(name, Some(phone))).await?;
    }
    println!("✓ Seeded {} customers", CUSTOMERS.len());

    // Vouchers
    db.vouchers()
        .insert(&new_voucher("SPA10", VoucherKind::Percentage, 10, &admin.id))
        .await?;
    db.vouchers()
        .insert(&new_voucher(
            "WELCOME25K",
            VoucherKind::Fixed,
            25_000,
            &admin.id,
        ))
        .await?;
    println!("✓ Seeded vouchers: SPA10 (10%), WELCOME25K (Rp25000)");

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
