//! Catalog products module.
//!
//! Products are plain records; the only behavior the consistency core needs
//! from them is the list price used to default order line prices.

pub mod product;

pub use product::{Product, RegisterProduct};
