//! # Domain Types
//!
//! Core domain documents used throughout Balcao.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Documents                                │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │     Product     │   │  StockMovement  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name           │   │  sku (P-####)   │   │  product_id ────┼──┐    │
//! │  │  identification │   │  unit_price     │   │  customer_id?   │  │    │
//! │  │  phone?         │   │  cost_price*    │   │  in | out       │  │    │
//! │  └─────────────────┘   │  stock_qty*     │◄──┤  quantity       │  │    │
//! │                        └─────────────────┘   │  total_value    │  │    │
//! │                                              └─────────────────┘  │    │
//! │   * derived state: written ONLY by the ledger engine  ◄───────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Relationships
//! - StockMovement → Product: required, many-to-one, **immutable** after
//!   creation (a movement can never be reassigned to another product)
//! - StockMovement → Customer: optional, required for sales (`out`)
//! - Deleting a customer or product does NOT cascade: movements keep the
//!   stale id and display as "removed"

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Customer
// =============================================================================

/// A customer record.
///
/// Identity for duplicate detection is the lower-cased trimmed
/// `(name, identification)` pair; see [`crate::dedup`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name. Required, trimmed.
    pub name: String,

    /// Tax/identity document number (CPF, etc.). Optional.
    pub identification: Option<String>,

    /// Contact phone. Optional, display-only.
    pub phone: Option<String>,
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
///
/// `stock_quantity` and `cost_price_cents` are **derived state**: they always
/// equal the net effect of the committed movement history, and only the
/// ledger engine writes them. The invariant `stock_quantity >= 0` holds after
/// every committed transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Generated business code (`P-####`). Immutable once assigned.
    pub sku: String,

    /// Display name.
    pub name: String,

    /// Optional description.
    pub description: Option<String>,

    /// Selling (list) price in cents.
    pub unit_price_cents: i64,

    /// Weighted-average purchase cost in cents. Derived.
    pub cost_price_cents: i64,

    /// Units currently in stock. Derived.
    pub stock_quantity: i64,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,

    /// Optimistic-concurrency token; bumped on every write.
    pub sync_version: i64,
}

impl Product {
    /// Returns the selling price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the weighted-average cost as Money.
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    /// Advisory stock check for the request path. The atomic transaction in
    /// the ledger engine is the authoritative enforcement; this read may be
    /// stale under concurrency.
    #[inline]
    pub fn has_stock_for(&self, quantity: i64) -> bool {
        self.stock_quantity >= quantity
    }
}

// =============================================================================
// Movement Type
// =============================================================================

/// The direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    /// Purchase / restock: units enter inventory at a purchase cost.
    In,
    /// Sale: units leave inventory towards a customer.
    Out,
}

impl MovementType {
    /// The signed effect of `quantity` units on stock.
    #[inline]
    pub const fn stock_delta(self, quantity: i64) -> i64 {
        match self {
            MovementType::In => quantity,
            MovementType::Out => -quantity,
        }
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// A single recorded stock transaction, either a purchase (`in`) or a
/// sale (`out`).
///
/// ## Immutable identity
/// `id` and `product_id` never change after creation. Everything else may be
/// amended, and every amendment re-derives the owning product's stock in the
/// same transaction.
///
/// ## Sale snapshot fields
/// For sales, `original_price_cents` and `discount_cents` record the
/// list-price vs. actual-price delta at sale time. They are snapshotted at
/// creation and never recomputed later (except when explicitly amended).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    /// Unique identifier (UUID v4). Immutable.
    pub id: String,

    /// Owning product. Immutable.
    pub product_id: String,

    /// Buying customer. Required for `out`, absent for `in`. May reference
    /// a customer that was since deleted.
    pub customer_id: Option<String>,

    /// Purchase (`in`) or sale (`out`).
    pub movement_type: MovementType,

    /// Units moved. Always positive.
    pub quantity: i64,

    /// Transaction price per unit, in cents. Sale price for `out`,
    /// purchase cost for `in`. Optional (e.g. samples/adjustments).
    pub unit_price_cents: Option<i64>,

    /// List price at sale time, for sales with a discount.
    pub original_price_cents: Option<i64>,

    /// Discount granted per unit at sale time.
    pub discount_cents: Option<i64>,

    /// Payment state for sales. `None` and `Some(true)` both mean paid;
    /// `Some(false)` means pending ("fiado").
    pub is_paid: Option<bool>,

    /// When a pending sale was eventually paid.
    pub payment_date: Option<DateTime<Utc>>,

    /// `quantity * unit_price_cents` (0 when no price). Recomputed on amend
    /// when quantity or price change.
    pub total_value_cents: i64,

    /// When the movement happened.
    pub date: DateTime<Utc>,
}

impl StockMovement {
    /// The signed effect this movement has on its product's stock.
    #[inline]
    pub fn stock_delta(&self) -> i64 {
        self.movement_type.stock_delta(self.quantity)
    }

    /// True for sales (`out` movements).
    #[inline]
    pub fn is_sale(&self) -> bool {
        self.movement_type == MovementType::Out
    }

    /// True for sales recorded but not yet paid ("fiado").
    ///
    /// Absent `is_paid` counts as paid; only an explicit `false` is pending.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.is_sale() && self.is_paid == Some(false)
    }

    /// Returns the total value as Money.
    #[inline]
    pub fn total_value(&self) -> Money {
        Money::from_cents(self.total_value_cents)
    }
}

// =============================================================================
// Movement Input
// =============================================================================

/// Request payload to commit a new stock movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementInput {
    pub product_id: String,
    pub customer_id: Option<String>,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub unit_price_cents: Option<i64>,
    pub original_price_cents: Option<i64>,
    pub discount_cents: Option<i64>,
    pub is_paid: Option<bool>,
    pub payment_date: Option<DateTime<Utc>>,
    /// Defaults to now when unspecified.
    pub date: Option<DateTime<Utc>>,
}

impl MovementInput {
    /// Convenience constructor for a purchase (`in`) movement.
    pub fn purchase(product_id: impl Into<String>, quantity: i64, cost_cents: i64) -> Self {
        MovementInput {
            product_id: product_id.into(),
            customer_id: None,
            movement_type: MovementType::In,
            quantity,
            unit_price_cents: Some(cost_cents),
            original_price_cents: None,
            discount_cents: None,
            is_paid: None,
            payment_date: None,
            date: None,
        }
    }

    /// Convenience constructor for a sale (`out`) movement.
    pub fn sale(
        product_id: impl Into<String>,
        customer_id: impl Into<String>,
        quantity: i64,
        price_cents: i64,
    ) -> Self {
        MovementInput {
            product_id: product_id.into(),
            customer_id: Some(customer_id.into()),
            movement_type: MovementType::Out,
            quantity,
            unit_price_cents: Some(price_cents),
            original_price_cents: None,
            discount_cents: None,
            is_paid: None,
            payment_date: None,
            date: None,
        }
    }

    /// Marks a sale as pending payment ("fiado").
    pub fn pending(mut self) -> Self {
        self.is_paid = Some(false);
        self
    }
}

// =============================================================================
// Movement Patch
// =============================================================================

/// Partial update for an existing movement (shallow field overwrite).
///
/// `None` leaves the field unchanged. `product_id` is accepted only so that
/// an attempted reassignment can be rejected explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementPatch {
    pub product_id: Option<String>,
    pub customer_id: Option<String>,
    pub movement_type: Option<MovementType>,
    pub quantity: Option<i64>,
    pub unit_price_cents: Option<i64>,
    pub original_price_cents: Option<i64>,
    pub discount_cents: Option<i64>,
    pub is_paid: Option<bool>,
    pub payment_date: Option<DateTime<Utc>>,
    pub date: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_delta_signs() {
        assert_eq!(MovementType::In.stock_delta(5), 5);
        assert_eq!(MovementType::Out.stock_delta(5), -5);
    }

    #[test]
    fn test_pending_requires_explicit_false() {
        // payment state defaults to "received"
        let sale = MovementInput::sale("p1", "c1", 1, 100);
        assert_eq!(sale.is_paid, None);

        let fiado = sale.pending();
        assert_eq!(fiado.is_paid, Some(false));
    }

    #[test]
    fn test_movement_type_serde_lowercase() {
        assert_eq!(serde_json::to_string(&MovementType::In).unwrap(), "\"in\"");
        assert_eq!(serde_json::to_string(&MovementType::Out).unwrap(), "\"out\"");
    }
}
