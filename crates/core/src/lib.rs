//! GarageHub Core - Shared types and storefront domain logic.
//!
//! This crate provides the types and pure logic used by every GarageHub
//! component:
//! - `storefront` - Public web tier (parts shop, account area, garage portal)
//! - `cli` - Command-line tools for migrations and fee lookups
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure functions - no I/O,
//! no database access, no HTTP clients. Everything here can be tested
//! without a server or a backend.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, and statuses
//! - [`catalog`] - Categories and products as served by the backend
//! - [`facets`] - Facet option derivation and product filtering
//! - [`pagination`] - Fixed-size page slicing
//! - [`cart`] - Cart arithmetic and the `CartStore` persistence seam
//! - [`delivery`] - Static delivery fee table
//! - [`checkout`] - Checkout form validation and order quotes
//! - [`booking`] - Garages, services, bookings and status transitions
//! - [`review`] - Customer reviews, rating scale and ownership rules

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod booking;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod delivery;
pub mod facets;
pub mod pagination;
pub mod review;
pub mod types;

pub use types::*;
