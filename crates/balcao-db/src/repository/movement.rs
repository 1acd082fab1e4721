//! # Movement Repository
//!
//! Read access to the stock-movement history, plus the `pub(crate)` row
//! writes the ledger engine performs inside its transactions.
//!
//! The movement table is the ledger: rows are only ever written through
//! the engine, so a product's derived stock always equals the fold of its
//! rows. Reads here return point-in-time snapshots for the query module
//! in balcao-core.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use balcao_core::StockMovement;

const MOVEMENT_COLUMNS: &str = "id, product_id, customer_id, movement_type, quantity, \
     unit_price_cents, original_price_cents, discount_cents, is_paid, \
     payment_date, total_value_cents, date";

/// Repository for stock-movement reads.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Lists the full history, newest first. The in-memory query module
    /// (`balcao_core::query`) filters, paginates and aggregates this
    /// snapshot.
    pub async fn list_all(&self) -> StoreResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {} FROM stock_movements ORDER BY date DESC",
            MOVEMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = movements.len(), "Loaded movement history");
        Ok(movements)
    }

    /// Lists the history of one product, newest first.
    pub async fn list_for_product(&self, product_id: &str) -> StoreResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {} FROM stock_movements WHERE product_id = ?1 ORDER BY date DESC",
            MOVEMENT_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Gets a movement by ID.
    pub async fn get_by_id(&self, id: &str) -> StoreResult<StockMovement> {
        sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {} FROM stock_movements WHERE id = ?1",
            MOVEMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("Movement", id))
    }

    /// Counts all movements.
    pub async fn count(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_movements")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Ledger transaction helpers
    // =========================================================================

    /// Inserts a movement row inside a ledger transaction.
    pub(crate) async fn insert(
        conn: &mut sqlx::SqliteConnection,
        movement: &StockMovement,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_movements
                (id, product_id, customer_id, movement_type, quantity,
                 unit_price_cents, original_price_cents, discount_cents,
                 is_paid, payment_date, total_value_cents, date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.product_id)
        .bind(&movement.customer_id)
        .bind(movement.movement_type)
        .bind(movement.quantity)
        .bind(movement.unit_price_cents)
        .bind(movement.original_price_cents)
        .bind(movement.discount_cents)
        .bind(movement.is_paid)
        .bind(movement.payment_date)
        .bind(movement.total_value_cents)
        .bind(movement.date)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Reads a movement inside a ledger transaction.
    pub(crate) async fn get_for_update(
        conn: &mut sqlx::SqliteConnection,
        id: &str,
    ) -> StoreResult<Option<StockMovement>> {
        let movement = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {} FROM stock_movements WHERE id = ?1",
            MOVEMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(movement)
    }

    /// Overwrites an amended movement row inside a ledger transaction.
    /// `id` and `product_id` are immutable and not part of the SET list.
    pub(crate) async fn update(
        conn: &mut sqlx::SqliteConnection,
        movement: &StockMovement,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE stock_movements
            SET customer_id = ?2, movement_type = ?3, quantity = ?4,
                unit_price_cents = ?5, original_price_cents = ?6,
                discount_cents = ?7, is_paid = ?8, payment_date = ?9,
                total_value_cents = ?10, date = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.customer_id)
        .bind(movement.movement_type)
        .bind(movement.quantity)
        .bind(movement.unit_price_cents)
        .bind(movement.original_price_cents)
        .bind(movement.discount_cents)
        .bind(movement.is_paid)
        .bind(movement.payment_date)
        .bind(movement.total_value_cents)
        .bind(movement.date)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Movement", &movement.id));
        }
        Ok(())
    }

    /// Deletes a movement row inside a ledger transaction (reversal).
    pub(crate) async fn delete(conn: &mut sqlx::SqliteConnection, id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM stock_movements WHERE id = ?1")
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Movement", id));
        }
        Ok(())
    }
}
