//! # SKU Generation
//!
//! New products receive a generated code of the shape `P-####` where `####`
//! is a random 4-digit number. The SKU is immutable once assigned.
//!
//! Generation alone does not guarantee uniqueness: the store keeps a unique
//! index on `sku` and product creation retries with a fresh candidate on
//! collision (see `balcao-db::repository::product`).

use rand::Rng;

/// Prefix for generated product codes.
pub const SKU_PREFIX: &str = "P";

/// Generates a candidate SKU like `P-4821`.
///
/// Takes the RNG as a parameter so tests can pass a seeded one.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> String {
    let digits: u32 = rng.random_range(1000..10000);
    format!("{}-{}", SKU_PREFIX, digits)
}
