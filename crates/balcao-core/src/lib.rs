//! # balcao-core: Pure Business Logic for Balcao
//!
//! Balcao is a small-business sales/inventory manager. This crate is the
//! **heart** of the system: all business rules as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Balcao Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Caller (UI / API / seed tool)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  balcao-db (Ledger engine)                      │   │
//! │  │    Atomic transactions: movement write + product CAS update     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ balcao-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  ledger   │  │   query   │  │   dedup   │  │   │
//! │  │   │  Product  │  │ stock Δ   │  │  filters  │  │ customer  │  │   │
//! │  │   │ Movement  │  │ avg cost  │  │  series   │  │   keys    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain documents (Customer, Product, StockMovement)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`ledger`] - The stock/cost math behind commit, reverse and amend
//! - [`query`] - Read-side filtering, pagination and sales aggregation
//! - [`dedup`] - Customer duplicate detection
//! - [`sku`] - Generated product codes (`P-####`)
//! - [`validation`] - Business rule validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Derived state has one writer**: `Product::stock_quantity` and
//!    `Product::cost_price_cents` are only ever produced by [`ledger`]
//!    effects; no caller computes them by hand
//! 2. **Integer money**: all monetary values are cents (i64)
//! 3. **Explicit errors**: typed enums, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod dedup;
pub mod error;
pub mod ledger;
pub mod money;
pub mod query;
pub mod sku;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity accepted on a single stock movement.
///
/// ## Business Reason
/// Prevents accidental over-entry (e.g., typing 1000 instead of 10) at
/// small-business scale. Could be made configurable later.
pub const MAX_MOVEMENT_QUANTITY: i64 = 99_999;

/// How many customers the outstanding-balance dashboard panel shows.
pub const OUTSTANDING_TOP_N: usize = 5;
