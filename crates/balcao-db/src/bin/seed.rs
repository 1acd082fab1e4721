//! # Seed Data Generator
//!
//! Populates the database with sample catalog, customers and ledger history
//! for development.
//!
//! ## Usage
//! ```bash
//! cargo run -p balcao-db --bin seed
//!
//! # Specify database path
//! cargo run -p balcao-db --bin seed -- --db ./data/balcao.db
//! ```
//!
//! Every product is stocked through real `in` movements and sold through
//! real `out` movements, so the seeded database satisfies the same
//! stock-equals-movement-fold invariant as a live one. A few sales are left
//! pending ("fiado") so the dashboard aggregations have something to show.

use std::env;

use balcao_core::MovementInput;
use balcao_db::{Database, DbConfig, NewCustomer, NewProduct};

/// (name, unit price in cents, purchase cost in cents, initial stock)
const PRODUCTS: &[(&str, i64, i64, i64)] = &[
    ("Arroz Branco 5kg", 2890, 2100, 24),
    ("Feijão Carioca 1kg", 899, 620, 40),
    ("Açúcar Cristal 2kg", 1190, 850, 30),
    ("Café Torrado 500g", 1890, 1400, 18),
    ("Óleo de Soja 900ml", 749, 560, 36),
    ("Farinha de Trigo 1kg", 649, 450, 28),
    ("Macarrão Espaguete 500g", 499, 330, 50),
    ("Leite Integral 1L", 589, 430, 48),
    ("Sal Refinado 1kg", 299, 180, 60),
    ("Sabão em Barra 5un", 1090, 780, 20),
];

/// (name, identification, phone)
const CUSTOMERS: &[(&str, Option<&str>, Option<&str>)] = &[
    ("Maria Silva", Some("123.456.789-00"), Some("11 99999-1111")),
    ("João Santos", Some("987.654.321-00"), Some("11 99999-2222")),
    ("Ana Oliveira", None, Some("11 99999-3333")),
    ("Carlos Souza", None, None),
    ("Fernanda Lima", Some("111.222.333-44"), None),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./balcao_dev.db");

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
                println!("Balcao Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./balcao_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Balcao Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.movements().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} movements", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Customers
    println!();
    println!("Creating customers...");
    let mut customers = Vec::new();
    for (name, identification, phone) in CUSTOMERS {
        let mut new = NewCustomer::named(*name);
        if let Some(identification) = identification {
            new = new.identification(*identification);
        }
        if let Some(phone) = phone {
            new = new.phone(*phone);
        }
        customers.push(db.customers().create(new).await?);
    }
    println!("✓ Created {} customers", customers.len());

    // Catalog + initial stock through real `in` movements
    println!();
    println!("Creating products and stocking shelves...");
    let ledger = db.ledger();
    let mut products = Vec::new();
    for (name, unit_price, cost, stock) in PRODUCTS {
        let product = db.products().create(NewProduct::named(*name, *unit_price)).await?;
        ledger
            .commit(MovementInput::purchase(&product.id, *stock, *cost))
            .await?;
        products.push(product);
    }
    println!("✓ Created and stocked {} products", products.len());

    // Sales, including some left pending
    println!();
    println!("Recording sales...");
    let mut sales = 0;
    for (index, product) in products.iter().enumerate() {
        let customer = &customers[index % customers.len()];
        let quantity = 1 + (index as i64 % 3);

        let mut sale = MovementInput::sale(
            &product.id,
            &customer.id,
            quantity,
            product.unit_price_cents,
        );
        if index % 4 == 0 {
            sale = sale.pending();
        }

        ledger.commit(sale).await?;
        sales += 1;
    }
    println!("✓ Recorded {} sales ({} pending)", sales, sales / 4 + 1);

    // Verify the fold invariant end to end
    println!();
    println!("Verifying stock...");
    for product in &products {
        let fresh = db.products().get_by_id(&product.id).await?;
        let fold: i64 = db
            .movements()
            .list_for_product(&product.id)
            .await?
            .iter()
            .map(|m| m.stock_delta())
            .sum();
        assert_eq!(fresh.stock_quantity, fold, "stock drift on {}", fresh.sku);
    }
    println!("✓ Stock matches movement history for every product");

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
