//! # balcao-db: Entity Store + Ledger Engine for Balcao
//!
//! This crate provides the transactional backing store and the inventory
//! ledger engine. It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Balcao Data Flow                                │
//! │                                                                         │
//! │  Caller: record a sale                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    balcao-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │    Ledger     │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │  (ledger.rs)  │    │ customer.rs   │    │  (embedded)  │  │   │
//! │  │   │               │    │ product.rs    │    │              │  │   │
//! │  │   │ commit        │───►│ movement.rs   │    │ 001_init.sql │  │   │
//! │  │   │ reverse       │    │               │    │              │  │   │
//! │  │   │ amend         │    └───────────────┘    └──────────────┘  │   │
//! │  │   └───────┬───────┘                                            │   │
//! │  │           │ publish                                            │   │
//! │  │   ┌───────▼───────┐                                            │   │
//! │  │   │  ChangeFeed   │  broadcast to dashboard/read path          │   │
//! │  │   └───────────────┘                                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL mode)                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The one rule that matters
//!
//! A product's `stock_quantity` and `cost_price_cents` are derived state.
//! Every ledger operation executes as a **single atomic transaction**: read
//! the product, decide, write the movement AND the product's derived fields,
//! or write nothing. The product write is a compare-and-swap on
//! `sync_version`; a lost race aborts the transaction with
//! [`StoreError::Conflict`] and the engine retries a bounded number of times.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use balcao_db::{Database, DbConfig};
//! use balcao_core::MovementInput;
//!
//! let db = Database::new(DbConfig::new("./balcao.db")).await?;
//!
//! let product = db.products().create(NewProduct::named("Feijão 1kg", 1250)).await?;
//! db.ledger().commit(MovementInput::purchase(&product.id, 10, 800)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod events;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{LedgerError, LedgerResult, StoreError, StoreResult};
pub use events::{ChangeEvent, Collection};
pub use ledger::Ledger;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::{CustomerRepository, CustomerUpdate, NewCustomer};
pub use repository::movement::MovementRepository;
pub use repository::product::{NewProduct, ProductRepository, ProductUpdate};
