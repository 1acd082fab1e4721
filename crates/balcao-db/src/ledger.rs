//! # Ledger Engine
//!
//! Transactional wrapper around the pure ledger math in
//! `balcao_core::ledger`. The three operations (commit, reverse, amend) are
//! the ONLY writers of movement rows and of a product's derived
//! stock/cost fields.
//!
//! ## Transaction Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      One Ledger Operation                               │
//! │                                                                         │
//! │  validate (pure, no I/O)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN ──► read product (+ movement) ──► compute effect (pure)         │
//! │       │                                       │                         │
//! │       │                                       ▼                         │
//! │       │    write movement row + CAS product derived fields             │
//! │       │         │                   │                                   │
//! │       │         │                   │ sync_version mismatch            │
//! │       ▼         ▼                   ▼                                   │
//! │  COMMIT (all)              ROLLBACK + StoreError::Conflict             │
//! │       │                             │                                   │
//! │       ▼                             ▼                                   │
//! │  publish ChangeEvents      retry whole operation (bounded)             │
//! │                                                                         │
//! │  Only Conflict is retriable. Business rejections (insufficient        │
//! │  stock, reassignment) and NotFound are terminal and deterministic.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Soft-skip on deleted products
//! Reverse and amend of a movement whose product was deleted still rewrite
//! the movement row; the stock update is skipped because there is no
//! product left to correct.

use sqlx::SqlitePool;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult, StoreError};
use crate::events::{ChangeFeed, Collection};
use crate::repository::movement::MovementRepository;
use crate::repository::product::ProductRepository;
use balcao_core::ledger::{amend_effect, commit_effect, reverse_effect, total_value_cents};
use balcao_core::validation::{validate_amended, validate_movement};
use balcao_core::{ledger, MovementInput, MovementPatch, StockMovement};

/// How many times a lost sync_version race is retried before the Conflict
/// surfaces to the caller.
const MAX_TX_ATTEMPTS: u32 = 3;

/// Pause between retries, enough for the competing transaction to finish.
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

/// The inventory ledger engine.
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl Ledger {
    /// Creates a new ledger engine over the given pool.
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        Ledger { pool, feed }
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Records a new stock movement and applies its effect to the product,
    /// atomically.
    ///
    /// ## Errors
    /// - `Core(Validation)` for bad input (non-positive quantity, sale
    ///   without customer, ...)
    /// - `Store(NotFound)` when the product doesn't exist
    /// - `Core(InsufficientStock)` when a sale exceeds current stock
    /// - `Store(Conflict)` when concurrent writers won every retry
    pub async fn commit(&self, input: MovementInput) -> LedgerResult<StockMovement> {
        validate_movement(&input)?;

        let movement = self
            .with_retries(|| self.commit_once(&input))
            .await?;

        info!(
            movement_id = %movement.id,
            product_id = %movement.product_id,
            movement_type = ?movement.movement_type,
            quantity = movement.quantity,
            "Movement committed"
        );
        self.publish(&movement);
        Ok(movement)
    }

    async fn commit_once(&self, input: &MovementInput) -> LedgerResult<StockMovement> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        let product = ProductRepository::get_for_update(&mut tx, &input.product_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Product", &input.product_id))?;

        let effect = commit_effect(&product, input)?;

        let movement = StockMovement {
            id: Uuid::new_v4().to_string(),
            product_id: input.product_id.clone(),
            customer_id: input.customer_id.clone(),
            movement_type: input.movement_type,
            quantity: input.quantity,
            unit_price_cents: input.unit_price_cents,
            original_price_cents: input.original_price_cents,
            discount_cents: input.discount_cents,
            is_paid: input.is_paid,
            payment_date: input.payment_date,
            total_value_cents: total_value_cents(input.quantity, input.unit_price_cents),
            date: input.date.unwrap_or_else(chrono::Utc::now),
        };

        MovementRepository::insert(&mut tx, &movement).await?;
        ProductRepository::apply_effect(
            &mut tx,
            &product.id,
            product.sync_version,
            effect.new_stock,
            effect.new_cost_cents,
        )
        .await?;

        tx.commit().await.map_err(StoreError::from)?;
        Ok(movement)
    }

    // =========================================================================
    // Reverse
    // =========================================================================

    /// Deletes a movement and undoes its stock effect, atomically.
    ///
    /// No stock re-check: reversing an `in` movement whose units were
    /// already sold may drive stock negative. Cost price is not restored.
    /// When the product was deleted, only the movement row is removed.
    pub async fn reverse(&self, movement_id: &str) -> LedgerResult<StockMovement> {
        let movement = self
            .with_retries(|| self.reverse_once(movement_id))
            .await?;

        info!(
            movement_id = %movement.id,
            product_id = %movement.product_id,
            "Movement reversed"
        );
        self.publish(&movement);
        Ok(movement)
    }

    async fn reverse_once(&self, movement_id: &str) -> LedgerResult<StockMovement> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        let movement = MovementRepository::get_for_update(&mut tx, movement_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Movement", movement_id))?;

        MovementRepository::delete(&mut tx, movement_id).await?;

        match ProductRepository::get_for_update(&mut tx, &movement.product_id).await? {
            Some(product) => {
                let effect = reverse_effect(&product, &movement);
                ProductRepository::apply_effect(
                    &mut tx,
                    &product.id,
                    product.sync_version,
                    effect.new_stock,
                    effect.new_cost_cents,
                )
                .await?;
            }
            None => {
                // product deleted since: nothing left to correct
                debug!(
                    product_id = %movement.product_id,
                    "Reversing movement of a deleted product, skipping stock update"
                );
            }
        }

        tx.commit().await.map_err(StoreError::from)?;
        Ok(movement)
    }

    // =========================================================================
    // Amend
    // =========================================================================

    /// Applies a partial update to a movement and re-derives the product's
    /// stock from the quantity/type change, atomically.
    ///
    /// Reassigning the movement to another product is rejected. Cost price
    /// is never recomputed on amend.
    pub async fn amend(
        &self,
        movement_id: &str,
        patch: MovementPatch,
    ) -> LedgerResult<StockMovement> {
        let movement = self
            .with_retries(|| self.amend_once(movement_id, &patch))
            .await?;

        info!(
            movement_id = %movement.id,
            product_id = %movement.product_id,
            "Movement amended"
        );
        self.publish(&movement);
        Ok(movement)
    }

    async fn amend_once(
        &self,
        movement_id: &str,
        patch: &MovementPatch,
    ) -> LedgerResult<StockMovement> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        let old = MovementRepository::get_for_update(&mut tx, movement_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Movement", movement_id))?;

        let merged = ledger::merge_patch(&old, patch)?;
        validate_amended(&merged)?;

        match ProductRepository::get_for_update(&mut tx, &old.product_id).await? {
            Some(product) => {
                let effect = amend_effect(&product, &old, &merged)?;
                ProductRepository::apply_effect(
                    &mut tx,
                    &product.id,
                    product.sync_version,
                    effect.new_stock,
                    effect.new_cost_cents,
                )
                .await?;
            }
            None => {
                debug!(
                    product_id = %old.product_id,
                    "Amending movement of a deleted product, skipping stock update"
                );
            }
        }

        MovementRepository::update(&mut tx, &merged).await?;

        tx.commit().await.map_err(StoreError::from)?;
        Ok(merged)
    }

    // =========================================================================
    // Retry Loop
    // =========================================================================

    /// Runs `operation` up to [`MAX_TX_ATTEMPTS`] times, retrying ONLY on
    /// [`StoreError::Conflict`]. Every other error is terminal.
    async fn with_retries<T, F, Fut>(&self, operation: F) -> LedgerResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = LedgerResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Err(LedgerError::Store(StoreError::Conflict { entity, id }))
                    if attempt < MAX_TX_ATTEMPTS =>
                {
                    warn!(
                        %entity, %id, attempt,
                        "Ledger transaction lost a write race, retrying"
                    );
                    attempt += 1;
                    sleep(RETRY_BACKOFF).await;
                }
                result => return result,
            }
        }
    }

    fn publish(&self, movement: &StockMovement) {
        self.feed.publish(Collection::StockMovements, &movement.id);
        self.feed.publish(Collection::Products, &movement.product_id);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::customer::NewCustomer;
    use crate::repository::product::NewProduct;
    use balcao_core::{CoreError, Product};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn stocked_product(db: &Database, stock: i64, cost_cents: i64) -> Product {
        let product = db
            .products()
            .create(NewProduct::named("Arroz 5kg", 2890))
            .await
            .unwrap();
        if stock > 0 {
            db.ledger()
                .commit(MovementInput::purchase(&product.id, stock, cost_cents))
                .await
                .unwrap();
        }
        db.products().get_by_id(&product.id).await.unwrap()
    }

    #[tokio::test]
    async fn test_commit_purchase_updates_stock_and_cost() {
        let db = test_db().await;
        let product = stocked_product(&db, 10, 500).await;
        assert_eq!(product.stock_quantity, 10);
        assert_eq!(product.cost_price_cents, 500);

        // blend a second purchase: (10*500 + 10*700) / 20 = 600
        db.ledger()
            .commit(MovementInput::purchase(&product.id, 10, 700))
            .await
            .unwrap();

        let after = db.products().get_by_id(&product.id).await.unwrap();
        assert_eq!(after.stock_quantity, 20);
        assert_eq!(after.cost_price_cents, 600);
        assert_eq!(db.movements().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_commit_sale_decrements_stock_only() {
        let db = test_db().await;
        let product = stocked_product(&db, 10, 500).await;
        let customer = db
            .customers()
            .create(NewCustomer::named("Maria Silva"))
            .await
            .unwrap();

        let sale = db
            .ledger()
            .commit(MovementInput::sale(&product.id, &customer.id, 4, 1000))
            .await
            .unwrap();
        assert_eq!(sale.total_value_cents, 4000);

        let after = db.products().get_by_id(&product.id).await.unwrap();
        assert_eq!(after.stock_quantity, 6);
        assert_eq!(after.cost_price_cents, 500);
    }

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() {
        let db = test_db().await;
        let product = stocked_product(&db, 5, 500).await;
        let customer = db
            .customers()
            .create(NewCustomer::named("Maria Silva"))
            .await
            .unwrap();

        let err = db
            .ledger()
            .commit(MovementInput::sale(&product.id, &customer.id, 6, 1000))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Core(CoreError::InsufficientStock {
                available: 5,
                requested: 6,
                ..
            })
        ));

        // rejected atomically: no movement row, stock untouched
        let after = db.products().get_by_id(&product.id).await.unwrap();
        assert_eq!(after.stock_quantity, 5);
        assert_eq!(db.movements().count().await.unwrap(), 1); // the stocking purchase
    }

    #[tokio::test]
    async fn test_commit_unknown_product_is_not_found() {
        let db = test_db().await;
        let err = db
            .ledger()
            .commit(MovementInput::purchase("no-such-product", 1, 100))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Store(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_sale_without_customer_rejected_before_io() {
        let db = test_db().await;
        let mut sale = MovementInput::sale("whatever", "c1", 1, 100);
        sale.customer_id = None;

        let err = db.ledger().commit(sale).await.unwrap_err();
        assert!(matches!(err, LedgerError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_reverse_purchase_restores_stock_not_cost() {
        let db = test_db().await;
        let product = stocked_product(&db, 10, 500).await;
        let purchase = db
            .ledger()
            .commit(MovementInput::purchase(&product.id, 10, 700))
            .await
            .unwrap();

        db.ledger().reverse(&purchase.id).await.unwrap();

        let after = db.products().get_by_id(&product.id).await.unwrap();
        assert_eq!(after.stock_quantity, 10);
        // the blended average stays; reversal never rewinds cost
        assert_eq!(after.cost_price_cents, 600);
        assert!(matches!(
            db.movements().get_by_id(&purchase.id).await.unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_reverse_consumed_purchase_goes_negative() {
        let db = test_db().await;
        let product = db
            .products()
            .create(NewProduct::named("Café 500g", 1890))
            .await
            .unwrap();
        let customer = db
            .customers()
            .create(NewCustomer::named("Maria Silva"))
            .await
            .unwrap();

        let purchase = db
            .ledger()
            .commit(MovementInput::purchase(&product.id, 10, 500))
            .await
            .unwrap();
        db.ledger()
            .commit(MovementInput::sale(&product.id, &customer.id, 8, 1000))
            .await
            .unwrap();

        // the 10 units were mostly sold; reversing the purchase is allowed
        // anyway and the drift is visible as negative stock
        db.ledger().reverse(&purchase.id).await.unwrap();
        let after = db.products().get_by_id(&product.id).await.unwrap();
        assert_eq!(after.stock_quantity, -8);
    }

    #[tokio::test]
    async fn test_reverse_after_product_deleted_soft_skips() {
        let db = test_db().await;
        let product = stocked_product(&db, 5, 500).await;
        let purchase_id = db
            .movements()
            .list_for_product(&product.id)
            .await
            .unwrap()[0]
            .id
            .clone();

        db.products().delete(&product.id).await.unwrap();

        // still deletes the row even though there is no product to correct
        db.ledger().reverse(&purchase_id).await.unwrap();
        assert_eq!(db.movements().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_amend_quantity_rederives_stock() {
        let db = test_db().await;
        let product = stocked_product(&db, 10, 500).await;
        let customer = db
            .customers()
            .create(NewCustomer::named("Maria Silva"))
            .await
            .unwrap();
        let sale = db
            .ledger()
            .commit(MovementInput::sale(&product.id, &customer.id, 2, 1000))
            .await
            .unwrap();

        // 2 -> 5 units: net change -3
        let amended = db
            .ledger()
            .amend(
                &sale.id,
                MovementPatch {
                    quantity: Some(5),
                    ..MovementPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(amended.quantity, 5);
        assert_eq!(amended.total_value_cents, 5000);

        let after = db.products().get_by_id(&product.id).await.unwrap();
        assert_eq!(after.stock_quantity, 5);
    }

    #[tokio::test]
    async fn test_amend_rejects_overselling() {
        let db = test_db().await;
        let product = stocked_product(&db, 3, 500).await;
        let customer = db
            .customers()
            .create(NewCustomer::named("Maria Silva"))
            .await
            .unwrap();
        let sale = db
            .ledger()
            .commit(MovementInput::sale(&product.id, &customer.id, 2, 1000))
            .await
            .unwrap();

        let err = db
            .ledger()
            .amend(
                &sale.id,
                MovementPatch {
                    quantity: Some(10),
                    ..MovementPatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Core(CoreError::InsufficientStock { .. })
        ));

        // untouched on rejection
        let unchanged = db.movements().get_by_id(&sale.id).await.unwrap();
        assert_eq!(unchanged.quantity, 2);
        assert_eq!(
            db.products().get_by_id(&product.id).await.unwrap().stock_quantity,
            1
        );
    }

    #[tokio::test]
    async fn test_amend_rejects_product_reassignment() {
        let db = test_db().await;
        let product = stocked_product(&db, 5, 500).await;
        let other = db
            .products()
            .create(NewProduct::named("Feijão 1kg", 899))
            .await
            .unwrap();
        let purchase_id = db
            .movements()
            .list_for_product(&product.id)
            .await
            .unwrap()[0]
            .id
            .clone();

        let err = db
            .ledger()
            .amend(
                &purchase_id,
                MovementPatch {
                    product_id: Some(other.id.clone()),
                    ..MovementPatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Core(CoreError::ProductReassignment { .. })
        ));
    }

    #[tokio::test]
    async fn test_amend_payment_only_leaves_stock_alone() {
        let db = test_db().await;
        let product = stocked_product(&db, 10, 500).await;
        let customer = db
            .customers()
            .create(NewCustomer::named("Maria Silva"))
            .await
            .unwrap();
        let sale = db
            .ledger()
            .commit(
                MovementInput::sale(&product.id, &customer.id, 2, 1000).pending(),
            )
            .await
            .unwrap();
        assert!(sale.is_pending());

        let paid = db
            .ledger()
            .amend(
                &sale.id,
                MovementPatch {
                    is_paid: Some(true),
                    payment_date: Some(chrono::Utc::now()),
                    ..MovementPatch::default()
                },
            )
            .await
            .unwrap();
        assert!(!paid.is_pending());
        assert!(paid.payment_date.is_some());

        assert_eq!(
            db.products().get_by_id(&product.id).await.unwrap().stock_quantity,
            8
        );
    }

    #[tokio::test]
    async fn test_commit_publishes_change_events() {
        let db = test_db().await;
        let product = db
            .products()
            .create(NewProduct::named("Sal 1kg", 299))
            .await
            .unwrap();
        let mut rx = db.subscribe();

        db.ledger()
            .commit(MovementInput::purchase(&product.id, 3, 180))
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.collection, Collection::StockMovements);
        assert_eq!(second.collection, Collection::Products);
        assert_eq!(second.id, product.id);
    }

    #[tokio::test]
    async fn test_stale_version_write_is_rejected() {
        use crate::repository::product::ProductUpdate;

        let db = test_db().await;
        let product = stocked_product(&db, 5, 500).await;

        // a reader holds a stale copy while a catalog update bumps the version
        let stale = db.products().get_by_id(&product.id).await.unwrap();
        db.products()
            .update(
                &product.id,
                ProductUpdate {
                    unit_price_cents: Some(3290),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        let err = ProductRepository::apply_effect(&mut tx, &product.id, stale.sync_version, 99, 500)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        tx.rollback().await.unwrap();

        // the lost race wrote nothing
        let after = db.products().get_by_id(&product.id).await.unwrap();
        assert_eq!(after.stock_quantity, 5);
        assert_eq!(after.unit_price_cents, 3290);

        // a fresh ledger transaction re-reads the current version and lands
        db.ledger()
            .commit(MovementInput::purchase(&product.id, 2, 500))
            .await
            .unwrap();
        assert_eq!(
            db.products().get_by_id(&product.id).await.unwrap().stock_quantity,
            7
        );
    }

    #[tokio::test]
    async fn test_conflict_retries_until_success() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let db = test_db().await;
        let ledger = db.ledger();
        let attempts = AtomicU32::new(0);

        let landed = ledger
            .with_retries(|| {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(LedgerError::Store(StoreError::conflict("Product", "p1")))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(landed, 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_conflict_surfaces_after_retries_exhausted() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let db = test_db().await;
        let ledger = db.ledger();
        let attempts = AtomicU32::new(0);

        let err = ledger
            .with_retries(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(LedgerError::Store(StoreError::conflict("Product", "p1"))) }
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::Store(StoreError::Conflict { .. })
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), MAX_TX_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_non_retriable_errors_fail_fast() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let db = test_db().await;
        let ledger = db.ledger();
        let attempts = AtomicU32::new(0);

        let err = ledger
            .with_retries(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err::<(), _>(LedgerError::Store(StoreError::not_found("Product", "p1")))
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::Store(StoreError::NotFound { .. })
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stock_always_matches_movement_fold() {
        let db = test_db().await;
        let product = db
            .products()
            .create(NewProduct::named("Leite 1L", 589))
            .await
            .unwrap();
        let customer = db
            .customers()
            .create(NewCustomer::named("Maria Silva"))
            .await
            .unwrap();
        let ledger = db.ledger();

        ledger
            .commit(MovementInput::purchase(&product.id, 10, 430))
            .await
            .unwrap();
        let sale = ledger
            .commit(MovementInput::sale(&product.id, &customer.id, 3, 589))
            .await
            .unwrap();
        ledger
            .commit(MovementInput::purchase(&product.id, 5, 450))
            .await
            .unwrap();
        ledger
            .amend(
                &sale.id,
                MovementPatch {
                    quantity: Some(4),
                    ..MovementPatch::default()
                },
            )
            .await
            .unwrap();

        let fresh = db.products().get_by_id(&product.id).await.unwrap();
        let fold: i64 = db
            .movements()
            .list_for_product(&product.id)
            .await
            .unwrap()
            .iter()
            .map(|m| m.stock_delta())
            .sum();
        assert_eq!(fresh.stock_quantity, fold);
        assert_eq!(fresh.stock_quantity, 11);
    }
}
