//! # Repository Module
//!
//! Database access organized by entity.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Repository Layout                                  │
//! │                                                                         │
//! │  CustomerRepository   create / update (dedup-checked), delete, list    │
//! │  ProductRepository    create (SKU-generating), update, delete, search  │
//! │  MovementRepository   read-only listing + the ledger's row writes      │
//! │                                                                         │
//! │  Repositories never touch a product's derived stock/cost fields        │
//! │  outside a ledger transaction. The `*_tx` helpers that do are          │
//! │  pub(crate) and callable only from the ledger engine.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod customer;
pub mod movement;
pub mod product;

pub use customer::{CustomerRepository, CustomerUpdate, NewCustomer};
pub use movement::MovementRepository;
pub use product::{NewProduct, ProductRepository, ProductUpdate};
