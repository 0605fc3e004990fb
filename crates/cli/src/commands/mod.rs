//! CLI command implementations.

pub mod addon_pricing;
pub mod orders;
pub mod revalidate;
