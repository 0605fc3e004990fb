//! In-memory repositories.
//!
//! Backs the handler and integration tests.
//! Ids are handed out sequentially (`rec_1`, `user_1`, ...).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use protocol_zero_core::order::{NewOrder, Order};
use protocol_zero_core::promo::PromoCode;
use protocol_zero_core::{Email, OrderId, UserId};
use tokio::sync::Mutex;

use super::{
    NewUser, OrderFilter, OrderRepository, PromoRepository, RepositoryError, Result, UserDirectory,
    UserRecord,
};

// =============================================================================
// Orders
// =============================================================================

#[derive(Default)]
struct OrderStore {
    orders: Vec<Order>,
    next_id: u64,
}

/// Orders held in a vector, insertion ordered.
#[derive(Default)]
pub struct MemoryOrders {
    store: Mutex<OrderStore>,
}

impl MemoryOrders {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an order as-is, replacing any order with the same id.
    pub async fn insert(&self, order: Order) {
        let mut store = self.store.lock().await;
        store.orders.retain(|o| o.id != order.id);
        store.orders.push(order);
    }

    /// Every stored order, oldest first.
    pub async fn all(&self) -> Vec<Order> {
        self.store.lock().await.orders.clone()
    }
}

#[async_trait]
impl OrderRepository for MemoryOrders {
    async fn create(&self, order: NewOrder, now: DateTime<Utc>) -> Result<Order> {
        let mut store = self.store.lock().await;
        store.next_id += 1;
        let order = order.place(OrderId::new(format!("rec_{}", store.next_id)), now);
        store.orders.push(order.clone());
        Ok(order)
    }

    async fn get(&self, id: &OrderId) -> Result<Option<Order>> {
        let store = self.store.lock().await;
        Ok(store.orders.iter().find(|o| &o.id == id).cloned())
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        let store = self.store.lock().await;
        let mut orders: Vec<Order> = store
            .orders
            .iter()
            .filter(|o| filter.status.is_none_or(|status| o.status == status))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders.truncate(filter.page_size as usize);
        Ok(orders)
    }

    async fn recent_order_numbers(&self, limit: u32) -> Result<Vec<String>> {
        let store = self.store.lock().await;
        let mut numbers: Vec<String> = store
            .orders
            .iter()
            .map(|o| o.order_number.to_string())
            .collect();
        numbers.sort_unstable_by(|a, b| b.cmp(a));
        numbers.truncate(limit as usize);
        Ok(numbers)
    }

    async fn update(&self, order: &Order, expected_version: u64) -> Result<()> {
        let mut store = self.store.lock().await;
        let stored = store
            .orders
            .iter_mut()
            .find(|o| o.id == order.id)
            .ok_or_else(|| RepositoryError::NotFound(order.id.to_string()))?;
        if stored.version != expected_version {
            return Err(RepositoryError::Conflict {
                id: order.id.clone(),
                expected: expected_version,
                found: stored.version,
            });
        }
        *stored = order.clone();
        Ok(())
    }
}

// =============================================================================
// Users
// =============================================================================

#[derive(Default)]
struct UserStore {
    users: Vec<UserRecord>,
    next_id: u64,
}

#[derive(Default)]
pub struct MemoryUsers {
    store: Mutex<UserStore>,
}

impl MemoryUsers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<UserRecord> {
        self.store.lock().await.users.clone()
    }
}

#[async_trait]
impl UserDirectory for MemoryUsers {
    async fn find_by_uid(&self, uid: &str) -> Result<Option<UserRecord>> {
        let store = self.store.lock().await;
        Ok(store.users.iter().find(|u| u.uid == uid).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>> {
        let store = self.store.lock().await;
        Ok(store
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email.as_str()))
            .cloned())
    }

    async fn create(&self, user: NewUser, _now: DateTime<Utc>) -> Result<UserRecord> {
        let mut store = self.store.lock().await;
        store.next_id += 1;
        let record = UserRecord {
            id: UserId::new(format!("user_{}", store.next_id)),
            uid: user.uid,
            email: user.email.into_inner(),
            display_name: user.display_name,
        };
        store.users.push(record.clone());
        Ok(record)
    }
}

// =============================================================================
// Promo codes
// =============================================================================

/// Promo codes keyed by upper-case code. `None` behaves like a store without
/// a promo object.
pub struct MemoryPromos {
    codes: Option<HashMap<String, PromoCode>>,
}

impl MemoryPromos {
    #[must_use]
    pub fn new(codes: impl IntoIterator<Item = PromoCode>) -> Self {
        Self {
            codes: Some(
                codes
                    .into_iter()
                    .map(|code| (code.code.to_uppercase(), code))
                    .collect(),
            ),
        }
    }

    #[must_use]
    pub const fn unconfigured() -> Self {
        Self { codes: None }
    }
}

#[async_trait]
impl PromoRepository for MemoryPromos {
    async fn find(&self, code: &str) -> Result<Option<PromoCode>> {
        let codes = self
            .codes
            .as_ref()
            .ok_or(RepositoryError::NotConfigured("promo codes"))?;
        Ok(codes.get(&code.to_uppercase()).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use protocol_zero_core::OrderStatus;
    use protocol_zero_core::order::{AdminActionRequest, OrderNumber};
    use rust_decimal_macros::dec;

    use super::*;

    fn new_order(seq: u32) -> NewOrder {
        NewOrder {
            order_number: OrderNumber::parse(&format!("PZ-20251126-{seq:04}")).unwrap(),
            user_id: UserId::new("user_1"),
            user_email: None,
            customer_name: None,
            customer_phone: None,
            items: Vec::new(),
            subtotal_cad: dec!(10),
            shipping_cad: dec!(0),
            total_cad: dec!(10),
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 26, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let orders = MemoryOrders::new();
        let first = orders.create(new_order(1), at(9)).await.unwrap();
        let second = orders.create(new_order(2), at(10)).await.unwrap();
        assert_eq!(first.id.as_str(), "rec_1");
        assert_eq!(second.id.as_str(), "rec_2");
        assert_eq!(first.status, OrderStatus::Placed);
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_filtered() {
        let orders = MemoryOrders::new();
        orders.create(new_order(1), at(9)).await.unwrap();
        let mut paid = orders.create(new_order(2), at(10)).await.unwrap();
        paid.apply(AdminActionRequest::parse("markPaid", None).unwrap(), at(11))
            .unwrap();
        orders.update(&paid, 1).await.unwrap();

        let all = orders.list(&OrderFilter::default()).await.unwrap();
        assert_eq!(all[0].id.as_str(), "rec_2");

        let filter = OrderFilter {
            status: Some(OrderStatus::Placed),
            ..OrderFilter::default()
        };
        let placed = orders.list(&filter).await.unwrap();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].id.as_str(), "rec_1");
    }

    #[tokio::test]
    async fn test_stale_update_is_rejected() {
        let orders = MemoryOrders::new();
        let mut order = orders.create(new_order(1), at(9)).await.unwrap();
        let mut racing = order.clone();

        order
            .apply(AdminActionRequest::parse("markPaid", None).unwrap(), at(10))
            .unwrap();
        orders.update(&order, 1).await.unwrap();

        racing
            .apply(AdminActionRequest::parse("cancel", None).unwrap(), at(10))
            .unwrap();
        let err = orders.update(&racing, 1).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { expected: 1, found: 2, .. }));
    }

    #[tokio::test]
    async fn test_recent_order_numbers_are_descending() {
        let orders = MemoryOrders::new();
        for seq in [3, 1, 2] {
            orders.create(new_order(seq), at(9)).await.unwrap();
        }
        let numbers = orders.recent_order_numbers(2).await.unwrap();
        assert_eq!(numbers, vec!["PZ-20251126-0003", "PZ-20251126-0002"]);
    }

    #[tokio::test]
    async fn test_unconfigured_promos() {
        let err = MemoryPromos::unconfigured().find("SAVE10").await.unwrap_err();
        assert!(err.is_not_configured());
    }
}
