//! # Seed Data Generator
//!
//! Populates a store with a demo clinic for development.
//!
//! ## Usage
//! ```bash
//! # 20 clients with pets, sales and appointments (default)
//! cargo run -p vetpos-db --bin seed
//!
//! # More clients
//! cargo run -p vetpos-db --bin seed -- --count 200
//!
//! # Specify database path
//! cargo run -p vetpos-db --bin seed -- --db ./data/vetpos.db
//! ```

use std::env;
use vetpos_db::{seed_demo, Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 20;
    let mut db_path = String::from("./vetpos_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(20);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("VetPOS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of clients to generate (default: 20)");
                println!("  -d, --db <PATH>    Database file path (default: ./vetpos_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 VetPOS Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Clients:  {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let start = std::time::Instant::now();
    let Some(summary) = seed_demo(&db, count).await? else {
        println!("⚠ Database already has products");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    };

    println!();
    println!("✓ Seeded in {:?}", start.elapsed());
    println!("  Products:     {}", summary.products);
    println!("  Suppliers:    {} ({} deliveries)", summary.suppliers, summary.restocks);
    println!("  Clients:      {}", summary.clients);
    println!("  Pets:         {}", summary.pets);
    println!("  Treatments:   {}", summary.treatments);
    println!("  Appointments: {}", summary.appointments);
    println!("  Sales:        {}", summary.sales);
    println!("  Payments:     {}", summary.payments);

    let low = db.products().low_stock().await?;
    println!();
    println!("  Low stock after sales: {} products", low.len());

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
