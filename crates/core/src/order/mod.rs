//! Orders and their fulfillment sub-records.
//!
//! An [`Order`] is created in [`OrderStatus::Placed`] at checkout and changes
//! afterwards only through [`Order::apply`] (see [`lifecycle`]). The status
//! history is append-only and its last entry always matches `status`.

pub mod action;
pub mod lifecycle;
pub mod number;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::money;
use crate::types::{ItemType, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId, VariantId};

pub use action::{ActionError, ActionMeta, AdminAction, AdminActionRequest};
pub use lifecycle::{LifecycleError, Transition};
pub use number::{OrderNumber, OrderNumberError};

/// One purchased line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub quantity: u32,
    /// Unit price charged, CAD.
    pub unit_price_cad: Decimal,
    #[serde(default)]
    pub item_type: ItemType,
}

impl OrderItem {
    /// Unit price times quantity, `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        money::checked_line_total(self.unit_price_cad, self.quantity)
    }
}

/// Payment sub-record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// Reference quoted by the shopper's bank for the e-Transfer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etransfer_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
}

/// Carrier details, populated by `markShipped`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<DateTime<Utc>>,
}

impl ShippingInfo {
    /// Overlay `update` on `self`: fields present in `update` win.
    #[must_use]
    pub fn merged_with(self, update: Self) -> Self {
        Self {
            carrier: update.carrier.or(self.carrier),
            tracking: update.tracking.or(self.tracking),
            shipped_at: update.shipped_at.or(self.shipped_at),
            estimated_delivery: update.estimated_delivery.or(self.estimated_delivery),
        }
    }
}

/// In-person pickup appointment, populated by `schedulePickup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupInfo {
    /// e.g. `ultimate-airsoft` or `reception`.
    pub location_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_label: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub confirmed_by_customer: bool,
}

/// Drop-off record, populated by `recordDropOff`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropOffInfo {
    pub location_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropped_off_at: Option<DateTime<Utc>>,
    /// Proof photo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Procurement details from the upstream marketplace purchase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcingInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchased_at: Option<DateTime<Utc>>,
}

/// One entry of the append-only status log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Storage record id.
    pub id: OrderId,
    pub order_number: OrderNumber,
    /// Registered user record or guest record.
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    pub items: Vec<OrderItem>,
    pub subtotal_cad: Decimal,
    pub shipping_cad: Decimal,
    pub total_cad: Decimal,
    pub payment: PaymentInfo,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<ShippingInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup: Option<PickupInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropoff: Option<DropOffInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sourcing: Option<SourcingInfo>,
    pub status_history: Vec<StatusHistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented by every accepted admin action.
    #[serde(default)]
    pub version: u64,
}

/// Everything checkout knows about an order before it has a storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub user_email: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub items: Vec<OrderItem>,
    pub subtotal_cad: Decimal,
    pub shipping_cad: Decimal,
    pub total_cad: Decimal,
}

impl NewOrder {
    /// Materialise the order in `placed` with a single history entry.
    #[must_use]
    pub fn place(self, id: OrderId, now: DateTime<Utc>) -> Order {
        Order {
            id,
            order_number: self.order_number,
            user_id: self.user_id,
            user_email: self.user_email,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            items: self.items,
            subtotal_cad: self.subtotal_cad,
            shipping_cad: self.shipping_cad,
            total_cad: self.total_cad,
            payment: PaymentInfo::default(),
            status: OrderStatus::Placed,
            shipping: None,
            pickup: None,
            dropoff: None,
            sourcing: None,
            status_history: vec![StatusHistoryEntry {
                status: OrderStatus::Placed,
                at: now,
                actor_id: None,
                note: None,
            }],
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }
}

impl Order {
    /// Whether `status` agrees with the last history entry.
    ///
    /// Orders read back from the record store are checked with this before
    /// any action is applied.
    #[must_use]
    pub fn history_is_consistent(&self) -> bool {
        self.status_history
            .last()
            .is_some_and(|entry| entry.status == self.status)
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod fixtures {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;

    pub fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 26, hour, 0, 0)
            .unwrap()
    }

    pub fn placed_order() -> Order {
        NewOrder {
            order_number: OrderNumber::parse("PZ-20251126-0001").unwrap(),
            user_id: UserId::new("user_1"),
            user_email: Some("shopper@example.com".to_string()),
            customer_name: Some("Sam".to_string()),
            customer_phone: None,
            items: vec![OrderItem {
                product_id: ProductId::new("PZ-001"),
                variant_id: VariantId::new("var_1"),
                title: "Tactical Vest".to_string(),
                variant_title: Some("Black".to_string()),
                sku: None,
                quantity: 2,
                unit_price_cad: dec!(75),
                item_type: ItemType::Regular,
            }],
            subtotal_cad: dec!(150),
            shipping_cad: dec!(0),
            total_cad: dec!(150),
        }
        .place(OrderId::new("rec_1"), at(9))
    }
}
