//! Products domain module.
//!
//! This crate contains the product catalog entity and the stock ledger rules,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod input;
pub mod ledger;
pub mod product;

pub use input::{NewProduct, ProductInput, ProductPatch};
pub use product::Product;
