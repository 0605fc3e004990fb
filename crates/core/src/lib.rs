//! Protocol Zero Core - Shared domain library.
//!
//! This crate holds the business rules used across all Protocol Zero components:
//! - `storefront` - Public API for the shop, checkout, and admin order handling
//! - `cli` - Operator tooling for add-on pricing and order management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no record-store access. Everything here can be exercised in a
//! plain unit test.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, money, and statuses
//! - [`order`] - Orders, admin actions, and the lifecycle state machine
//! - [`cart`] - Cart pricing engine (add-on unlock, promo discount)
//! - [`catalog`] - Products, variants, public sanitisation, add-on offers
//! - [`promo`] - Promo code validation
//! - [`pricing`] - Supplier cost and add-on margin calculator

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod order;
pub mod pricing;
pub mod promo;
pub mod types;

pub use types::*;
