//! # Seed Data Generator
//!
//! Populates a development database with a small salon: staff, a service
//! menu, retail products and a few coupons.
//!
//! ## Usage
//! ```bash
//! # Seed ./salon_dev.db
//! cargo run -p salon-db --bin seed
//!
//! # Specify database path and starting stock per product
//! cargo run -p salon-db --bin seed -- --db ./data/salon.db --stock 25
//! ```

use chrono::{Duration, Utc};
use std::env;
use salon_core::{CatalogService, CouponRecord, DiscountMode, Product, StaffMember};
use salon_db::{Database, DbConfig};
use uuid::Uuid;

/// (name, role)
const STAFF: &[(&str, &str)] = &[
    ("Asha Menon", "manager"),
    ("Ravi Kumar", "stylist"),
    ("Meena Iyer", "stylist"),
    ("Farhan Ali", "therapist"),
    ("Old Account", "stylist"),
];

/// (name, price in rupees, minutes)
const SERVICES: &[(&str, i64, i64)] = &[
    ("Haircut", 500, 45),
    ("Beard Trim", 200, 20),
    ("Hair Colour", 1800, 90),
    ("Head Massage", 400, 30),
    ("Facial", 1200, 60),
    ("Manicure", 600, 40),
];

/// (sku, name, price in rupees)
const PRODUCTS: &[(&str, &str, i64)] = &[
    ("SHMP-200", "Argan Shampoo 200ml", 200),
    ("COND-200", "Argan Conditioner 200ml", 250),
    ("SERM-050", "Hair Serum 50ml", 450),
    ("WAX-075", "Styling Wax 75g", 300),
    ("OIL-100", "Beard Oil 100ml", 350),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./salon_dev.db");
    let mut stock: i64 = 20;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--stock" | "-s" => {
                if i + 1 < args.len() {
                    stock = args[i + 1].parse().unwrap_or(20);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Salon Checkout Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>     Database file path (default: ./salon_dev.db)");
                println!("  -s, --stock <N>     Starting stock per product (default: 20)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Salon Checkout Seed Data Generator");
    println!("=====================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if !db.staff().list_active().await?.is_empty() {
        println!("⚠ Database already has staff");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Seeding staff...");
    for (idx, (name, role)) in STAFF.iter().enumerate() {
        let member = StaffMember {
            id: format!("staff-{:02}", idx + 1),
            name: name.to_string(),
            role: role.to_string(),
            // The last account is a deactivated login, for biller checks
            is_active: idx + 1 < STAFF.len(),
        };
        db.staff().insert(&member).await?;
        println!("  {} ({}){}", member.name, member.id, if member.is_active { "" } else { " [inactive]" });
    }

    println!();
    println!("Seeding services...");
    for (idx, (name, rupees, minutes)) in SERVICES.iter().enumerate() {
        let service = CatalogService {
            id: format!("svc-{:02}", idx + 1),
            name: name.to_string(),
            price_paise: rupees * 100,
            duration_minutes: *minutes,
            is_active: true,
        };
        db.catalog().insert_service(&service).await?;
        println!("  {} ₹{} ({})", service.name, rupees, service.id);
    }

    println!();
    println!("Seeding products...");
    let now = Utc::now();
    for (idx, (sku, name, rupees)) in PRODUCTS.iter().enumerate() {
        let product = Product {
            id: format!("prod-{:02}", idx + 1),
            sku: sku.to_string(),
            name: name.to_string(),
            price_paise: rupees * 100,
            current_stock: stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        if let Err(e) = db.catalog().insert_product(&product).await {
            eprintln!("Failed to insert {}: {}", product.sku, e);
            continue;
        }
        println!("  {} x{} ({})", product.name, stock, product.id);
    }

    println!();
    println!("Seeding coupons...");
    let coupons = [
        coupon("WELCOME10", DiscountMode::Percent, 1000, 0, Some(20_000), None),
        coupon("FLAT100", DiscountMode::Fixed, 10_000, 50_000, None, None),
        coupon("FIRSTVISIT", DiscountMode::Percent, 2000, 0, Some(50_000), Some(1)),
    ];
    for c in &coupons {
        db.coupons().insert(c).await?;
        println!("  {}", c.code);
    }

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Builds a coupon that became active yesterday and runs for 90 days.
fn coupon(
    code: &str,
    discount_type: DiscountMode,
    discount_value: i64,
    min_order_paise: i64,
    max_discount_paise: Option<i64>,
    usage_limit: Option<i64>,
) -> CouponRecord {
    let now = Utc::now();
    CouponRecord {
        id: Uuid::new_v4().to_string(),
        code: code.to_string(),
        discount_type,
        discount_value,
        min_order_paise,
        max_discount_paise,
        valid_from: Some(now - Duration::days(1)),
        valid_until: Some(now + Duration::days(90)),
        is_active: true,
        usage_limit,
        usage_count: 0,
    }
}
