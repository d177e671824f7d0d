//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `catalog` - Cached catalog reads over the catalog store

pub mod catalog;

pub use catalog::{CatalogError, CatalogRepository};
