//! Core types for VIVIAS SHOP.
//!
//! This module provides type-safe wrappers for common domain concepts and the
//! snapshot types exchanged between the storefront backend and its clients.

pub mod cart;
pub mod catalog;
pub mod email;
pub mod envelope;
pub mod id;
pub mod money;
pub mod quantity;
pub mod user;
pub mod wishlist;

pub use cart::{AppliedCoupon, CartLine, CartProduct, CartSnapshot, CouponDiscount, VariantOptions};
pub use catalog::{
    CatalogStatistics, Category, CategoryListing, Product, ProductFilter, ProductPage, ProductSort,
};
pub use email::{Email, EmailError};
pub use envelope::{ApiResponse, FieldErrors};
pub use id::*;
pub use money::Money;
pub use quantity::{Quantity, QuantityError};
pub use user::{AuthPayload, LoginCredentials, RegistrationData, User};
pub use wishlist::{WishlistItem, WishlistSnapshot};
