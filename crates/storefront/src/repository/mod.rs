//! Persistence seams for orders, users and promo codes.
//!
//! Each store is a trait so handlers can run against the Knack-backed
//! implementations in production and the in-memory ones in [`memory`] under
//! test. Implementations are chosen once when [`crate::state::AppState`] is
//! built.

pub mod knack;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use protocol_zero_core::order::{NewOrder, Order};
use protocol_zero_core::promo::PromoCode;
use protocol_zero_core::{Email, OrderId, OrderStatus, UserId};
use thiserror::Error;

use crate::knack::KnackError;
use crate::notion::NotionError;

/// Errors raised by repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Record store failure.
    #[error("Record store error: {0}")]
    Knack(#[from] KnackError),

    /// Notes store failure.
    #[error("Notes store error: {0}")]
    Notion(#[from] NotionError),

    /// An optional backing object is not set up.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// A stored record could not be mapped.
    #[error("Malformed {entity} record {id}: {reason}")]
    Malformed {
        entity: &'static str,
        id: String,
        reason: String,
    },

    /// The order changed since it was read.
    #[error("Order {id} was modified concurrently (expected version {expected}, found {found})")]
    Conflict {
        id: OrderId,
        expected: u64,
        found: u64,
    },

    /// The record to update no longer exists.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl RepositoryError {
    /// Whether the failure comes from missing vendor configuration.
    #[must_use]
    pub const fn is_not_configured(&self) -> bool {
        matches!(
            self,
            Self::NotConfigured(_)
                | Self::Knack(KnackError::NotConfigured)
                | Self::Notion(NotionError::NotConfigured)
        )
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Admin order listing options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub page_size: u32,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            status: None,
            page_size: 25,
        }
    }
}

/// Order persistence.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a new order in `placed` and return it with its storage id.
    async fn create(&self, order: NewOrder, now: DateTime<Utc>) -> Result<Order>;

    async fn get(&self, id: &OrderId) -> Result<Option<Order>>;

    /// Newest first.
    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>>;

    /// The most recent order numbers, newest first, for sequence generation.
    async fn recent_order_numbers(&self, limit: u32) -> Result<Vec<String>>;

    /// Write back an order changed by an admin action.
    ///
    /// `expected_version` is the version the caller read. Implementations
    /// reject the write with [`RepositoryError::Conflict`] if the stored
    /// order has moved on.
    async fn update(&self, order: &Order, expected_version: u64) -> Result<()>;
}

/// A registered or guest shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Storage record id, referenced by orders.
    pub id: UserId,
    /// Auth provider uid, or a generated guest id.
    pub uid: String,
    pub email: String,
    pub display_name: String,
}

/// Details for creating a user at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub uid: String,
    pub email: Email,
    pub display_name: String,
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// Shopper records.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_uid(&self, uid: &str) -> Result<Option<UserRecord>>;

    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>>;

    async fn create(&self, user: NewUser, now: DateTime<Utc>) -> Result<UserRecord>;
}

/// Promo code lookup.
#[async_trait]
pub trait PromoRepository: Send + Sync {
    /// Find a code. `code` is already normalised.
    async fn find(&self, code: &str) -> Result<Option<PromoCode>>;
}
