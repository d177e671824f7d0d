//! VIVIAS Core - Shared types library.
//!
//! This crate provides the types shared by every VIVIAS SHOP component:
//! - `storefront` - Catalog API server with the read-through query cache
//! - `client` - Cart, wishlist and session stores that mirror the server
//! - `cli` - Terminal front-end driving the client stores
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. Both sides of the wire deserialize the same
//! snapshot and envelope types, so the JSON contract lives in one place.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, money, quantities, snapshots and the response envelope

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
