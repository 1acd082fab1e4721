//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! ## SKU Generation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How SKU Assignment Works                             │
//! │                                                                         │
//! │  create("Feijão 1kg")                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  candidate = P-#### (random)  ──► INSERT                               │
//! │       │                             │                                   │
//! │       │   UNIQUE(sku) violation ◄───┘                                   │
//! │       ▼                                                                 │
//! │  fresh candidate, retry (bounded)                                      │
//! │                                                                         │
//! │  The unique index is the enforcement; the retry loop just picks a new  │
//! │  number. With 9,000 possible codes the catalog of a small shop never   │
//! │  comes close to exhausting the space.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Derived Fields
//! `stock_quantity` and `cost_price_cents` are written ONLY by the ledger
//! engine, through the `pub(crate)` transaction helpers at the bottom of
//! this file. Catalog updates here never touch them.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{LedgerResult, StoreError, StoreResult};
use crate::events::{ChangeFeed, Collection};
use balcao_core::validation::{validate_name, validate_price_cents};
use balcao_core::{sku, Product};

/// How many fresh SKU candidates to try before giving up.
const MAX_SKU_ATTEMPTS: u32 = 16;

const PRODUCT_COLUMNS: &str = "id, sku, name, description, unit_price_cents, \
     cost_price_cents, stock_quantity, created_at, updated_at, sync_version";

/// Payload for creating a product. Stock starts at zero; units enter
/// through ledger `in` movements, never at catalog time.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub unit_price_cents: i64,
}

impl NewProduct {
    /// Creates a payload with a name and selling price.
    pub fn named(name: impl Into<String>, unit_price_cents: i64) -> Self {
        NewProduct {
            name: name.into(),
            description: None,
            unit_price_cents,
        }
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial catalog update. Derived fields (stock, cost) are not updatable
/// here; they belong to the ledger.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub unit_price_cents: Option<i64>,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        ProductRepository { pool, feed }
    }

    /// Creates a product with a generated `P-####` SKU.
    ///
    /// Retries with a fresh candidate when the unique index on `sku`
    /// rejects a collision.
    pub async fn create(&self, new: NewProduct) -> LedgerResult<Product> {
        let name = validate_name("name", &new.name)?;
        validate_price_cents("unit_price", new.unit_price_cents)?;

        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        for attempt in 1..=MAX_SKU_ATTEMPTS {
            // ThreadRng must not be held across an await point
            let candidate = sku::generate(&mut rand::rng());

            let result = sqlx::query(
                r#"
                INSERT INTO products
                    (id, sku, name, description, unit_price_cents,
                     cost_price_cents, stock_quantity, created_at, updated_at,
                     sync_version)
                VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6, ?6, 0)
                "#,
            )
            .bind(&id)
            .bind(&candidate)
            .bind(&name)
            .bind(&new.description)
            .bind(new.unit_price_cents)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from);

            match result {
                Ok(_) => {
                    info!(id = %id, sku = %candidate, name = %name, "Product created");
                    self.feed.publish(Collection::Products, &id);
                    return Ok(Product {
                        id,
                        sku: candidate,
                        name,
                        description: new.description,
                        unit_price_cents: new.unit_price_cents,
                        cost_price_cents: 0,
                        stock_quantity: 0,
                        created_at: now,
                        updated_at: now,
                        sync_version: 0,
                    });
                }
                Err(StoreError::UniqueViolation { .. }) => {
                    warn!(sku = %candidate, attempt, "SKU collision, retrying with fresh candidate");
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(StoreError::Internal(format!(
            "could not find a free SKU after {} attempts",
            MAX_SKU_ATTEMPTS
        ))
        .into())
    }

    /// Updates catalog fields (name, description, selling price).
    ///
    /// Bumps `sync_version` so any ledger transaction racing this write
    /// re-reads the product instead of committing over it.
    pub async fn update(&self, id: &str, update: ProductUpdate) -> LedgerResult<Product> {
        let current = self.get_by_id(id).await?;

        let name = match update.name {
            Some(ref name) => validate_name("name", name)?,
            None => current.name,
        };
        let description = update.description.unwrap_or(current.description);
        let unit_price_cents = update.unit_price_cents.unwrap_or(current.unit_price_cents);
        validate_price_cents("unit_price", unit_price_cents)?;

        sqlx::query(
            r#"
            UPDATE products
            SET name = ?2, description = ?3, unit_price_cents = ?4,
                updated_at = ?5, sync_version = sync_version + 1
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&name)
        .bind(&description)
        .bind(unit_price_cents)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        self.feed.publish(Collection::Products, id);
        Ok(self.get_by_id(id).await?)
    }

    /// Deletes a product. Movement history is untouched; movements keep
    /// the stale product id.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", id));
        }

        info!(id = %id, "Product deleted");
        self.feed.publish(Collection::Products, id);
        Ok(())
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> StoreResult<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE id = ?1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("Product", id))
    }

    /// Gets a product by its business code.
    pub async fn get_by_sku(&self, sku: &str) -> StoreResult<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE sku = ?1",
            PRODUCT_COLUMNS
        ))
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("Product", sku))
    }

    /// Lists all products, ordered by name.
    pub async fn list_all(&self) -> StoreResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products ORDER BY name COLLATE NOCASE",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Case-insensitive substring search over name and SKU.
    pub async fn search(&self, query: &str, limit: u32) -> StoreResult<Vec<Product>> {
        let query = query.trim();
        debug!(query = %query, limit, "Searching products");

        if query.is_empty() {
            let mut all = self.list_all().await?;
            all.truncate(limit as usize);
            return Ok(all);
        }

        let pattern = format!("%{}%", query.to_lowercase());
        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {} FROM products
            WHERE lower(name) LIKE ?1 OR lower(sku) LIKE ?1
            ORDER BY name COLLATE NOCASE
            LIMIT ?2
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    // =========================================================================
    // Ledger transaction helpers
    // =========================================================================

    /// Reads a product inside a ledger transaction. `pub(crate)`: only the
    /// ledger engine may follow this read with a derived-field write.
    pub(crate) async fn get_for_update(
        conn: &mut sqlx::SqliteConnection,
        id: &str,
    ) -> StoreResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE id = ?1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(product)
    }

    /// Compare-and-swap write of the derived fields.
    ///
    /// Succeeds only when `sync_version` still equals `expected_version`;
    /// otherwise a concurrent writer won the race and the caller gets
    /// [`StoreError::Conflict`], aborting (and retrying) the whole
    /// transaction.
    pub(crate) async fn apply_effect(
        conn: &mut sqlx::SqliteConnection,
        product_id: &str,
        expected_version: i64,
        new_stock: i64,
        new_cost_cents: i64,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = ?3, cost_price_cents = ?4, updated_at = ?5,
                sync_version = sync_version + 1
            WHERE id = ?1 AND sync_version = ?2
            "#,
        )
        .bind(product_id)
        .bind(expected_version)
        .bind(new_stock)
        .bind(new_cost_cents)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::conflict("Product", product_id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
