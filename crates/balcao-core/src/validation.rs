//! # Validation Module
//!
//! Business rule validation, run before any I/O.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request validation (this module)                             │
//! │  ├── Positive quantity, non-negative price                             │
//! │  └── Sale requires a customer                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Ledger transaction (balcao-db)                               │
//! │  └── Authoritative stock check inside the atomic transaction           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  └── NOT NULL / CHECK / UNIQUE constraints                             │
//! │                                                                         │
//! │  The advisory stock pre-check here is UX-only and may be stale under   │
//! │  concurrency; the transaction is the enforcement.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{MovementInput, MovementType, Product, StockMovement};
use crate::MAX_MOVEMENT_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Movement Validation
// =============================================================================

/// Validates a movement request before it reaches the ledger engine.
///
/// ## Rules
/// - quantity positive and within [`MAX_MOVEMENT_QUANTITY`]
/// - unit price, when present, non-negative (zero allowed: gifts/samples)
/// - `out` movements require a customer
pub fn validate_movement(input: &MovementInput) -> ValidationResult<()> {
    validate_movement_fields(
        input.movement_type,
        input.quantity,
        input.unit_price_cents,
        input.customer_id.as_deref(),
    )
}

/// Same rules as [`validate_movement`], applied to a merged movement during
/// amend (a patch may change type, quantity, price or customer).
pub fn validate_amended(movement: &StockMovement) -> ValidationResult<()> {
    validate_movement_fields(
        movement.movement_type,
        movement.quantity,
        movement.unit_price_cents,
        movement.customer_id.as_deref(),
    )
}

fn validate_movement_fields(
    movement_type: MovementType,
    quantity: i64,
    unit_price_cents: Option<i64>,
    customer_id: Option<&str>,
) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > MAX_MOVEMENT_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_MOVEMENT_QUANTITY,
        });
    }

    if let Some(price) = unit_price_cents {
        if price < 0 {
            return Err(ValidationError::OutOfRange {
                field: "unit_price".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
    }

    if movement_type == MovementType::Out && customer_id.map_or(true, |id| id.trim().is_empty()) {
        return Err(ValidationError::Required {
            field: "customer_id".to_string(),
        });
    }

    Ok(())
}

/// Advisory pre-check that a sale does not exceed the product's advertised
/// stock. The ledger transaction remains authoritative.
pub fn precheck_sale_stock(product: &Product, quantity: i64) -> CoreResult<()> {
    if !product.has_stock_for(quantity) {
        return Err(CoreError::InsufficientStock {
            sku: product.sku.clone(),
            available: product.stock_quantity,
            requested: quantity,
        });
    }
    Ok(())
}

// =============================================================================
// Name / Price Validation
// =============================================================================

/// Validates a customer or product name: required, trimmed, bounded.
/// Returns the trimmed name.
pub fn validate_name(field: &str, name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(name.to_string())
}

/// Validates a price in cents: non-negative, zero allowed.
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
