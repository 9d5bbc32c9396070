//! The Nut Barn Core - Shared domain library.
//!
//! This crate provides the pieces shared by every Nut Barn component:
//! - `storefront` - Public-facing HTTP API (orders, contact, content, cart)
//! - native or kiosk clients that keep a device-local cart
//!
//! # Architecture
//!
//! The core crate contains only types, the catalog and the cart state
//! machine - no network I/O and no HTTP clients. The one piece of I/O is the
//! optional [`cart::FileStorage`] backend for device-local persistence.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for product IDs, order references, prices, emails and order options
//! - [`catalog`] - The fixed product list and authoritative price table
//! - [`cart`] - Cart store with pluggable persistence

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod types;

pub use catalog::{Catalog, DietaryTag, PRODUCTS, Product, StaticCatalog, product_by_id};
pub use types::*;
