//! Protocol Zero storefront library.
//!
//! The HTTP service is exposed as a library so the router can be exercised
//! in integration tests against in-memory stores.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod error;
pub mod knack;
pub mod middleware;
pub mod notion;
pub mod repository;
pub mod routes;
pub mod state;
