//! `orderflow-catalog` — product/customer records and lookup seams.
//!
//! These are the external collaborators of the fulfillment core: the engine
//! resolves products and customers through the directory traits and never
//! mutates catalog data.

pub mod customer;
pub mod product;

pub use customer::{Customer, CustomerDirectory, InMemoryCustomerDirectory};
pub use product::{InMemoryProductDirectory, Product, ProductDirectory};
