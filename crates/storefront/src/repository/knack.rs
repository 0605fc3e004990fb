//! Knack-backed repositories.
//!
//! Orders keep their sub-documents (items, shipping, pickup, drop-off,
//! sourcing, status history) as JSON text in single fields. The order
//! version is not stored; it is the length of the status history, which
//! grows by exactly one per accepted action.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use protocol_zero_core::order::{
    DropOffInfo, NewOrder, Order, OrderItem, OrderNumber, PaymentInfo, PickupInfo, ShippingInfo,
    SourcingInfo, StatusHistoryEntry,
};
use protocol_zero_core::promo::PromoCode;
use protocol_zero_core::{Email, OrderId, OrderStatus, PaymentMethod, PaymentStatus, UserId};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{instrument, warn};

use super::{
    NewUser, OrderFilter, OrderRepository, PromoRepository, RepositoryError, Result, UserDirectory,
    UserRecord,
};
use crate::config::{KnackConfig, OrderFields, PromoFields, UserFields};
use crate::knack::fields;
use crate::knack::{KnackClient, Record, RecordQuery, SortOrder};

// =============================================================================
// Orders
// =============================================================================

/// Orders stored in the Knack orders object.
#[derive(Clone)]
pub struct KnackOrders {
    client: KnackClient,
    object: String,
    fields: OrderFields,
}

impl KnackOrders {
    #[must_use]
    pub fn new(client: KnackClient, config: &KnackConfig) -> Self {
        Self {
            client,
            object: config.objects.orders.clone(),
            fields: config.fields.orders.clone(),
        }
    }
}

#[async_trait]
impl OrderRepository for KnackOrders {
    #[instrument(skip(self, order), fields(order_number = %order.order_number))]
    async fn create(&self, order: NewOrder, now: DateTime<Utc>) -> Result<Order> {
        let mut order = order.place(OrderId::new(String::new()), now);
        let record = order_to_record(&order, &self.fields)?;
        let id = self.client.create_record(&self.object, &record).await?;
        order.id = OrderId::new(id);
        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %id.as_str()))]
    async fn get(&self, id: &OrderId) -> Result<Option<Order>> {
        match self.client.get_record(&self.object, id.as_str()).await? {
            Some(record) => order_from_record(&record, &self.fields).map(Some),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        let mut query = RecordQuery::new()
            .sort(&self.fields.created_at, SortOrder::Desc)
            .page(1, filter.page_size);
        if let Some(status) = filter.status {
            query = query.filter(&self.fields.status, status.as_str());
        }

        let records = self.client.get_records(&self.object, &query).await?;
        Ok(records
            .iter()
            .filter_map(|record| match order_from_record(record, &self.fields) {
                Ok(order) => Some(order),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable order record");
                    None
                }
            })
            .collect())
    }

    async fn recent_order_numbers(&self, limit: u32) -> Result<Vec<String>> {
        let query = RecordQuery::new()
            .sort(&self.fields.order_number, SortOrder::Desc)
            .page(1, limit);
        let records = self.client.get_records(&self.object, &query).await?;
        Ok(records
            .iter()
            .filter_map(|r| fields::text(fields::field(r, &self.fields.order_number, "Order Number")))
            .collect())
    }

    #[instrument(skip(self, order), fields(order_id = %order.id.as_str(), status = %order.status))]
    async fn update(&self, order: &Order, expected_version: u64) -> Result<()> {
        // Knack has no conditional writes; re-read right before writing to
        // narrow the window for lost history entries.
        let stored = self
            .client
            .get_record(&self.object, order.id.as_str())
            .await?
            .ok_or_else(|| RepositoryError::NotFound(order.id.to_string()))?;
        let found = order_from_record(&stored, &self.fields)?.version;
        if found != expected_version {
            return Err(RepositoryError::Conflict {
                id: order.id.clone(),
                expected: expected_version,
                found,
            });
        }

        let record = order_to_record(order, &self.fields)?;
        self.client
            .update_record(&self.object, order.id.as_str(), &record)
            .await?;
        Ok(())
    }
}

fn to_json_text<T: Serialize>(value: &T, id: &OrderId) -> Result<String> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Malformed {
        entity: "order",
        id: id.to_string(),
        reason: e.to_string(),
    })
}

fn optional_json_text<T: Serialize>(value: Option<&T>, id: &OrderId) -> Result<Value> {
    value.map_or(Ok(Value::Null), |v| to_json_text(v, id).map(Value::String))
}

/// Knack field payload for an order.
pub(crate) fn order_to_record(order: &Order, f: &OrderFields) -> Result<Value> {
    let id = &order.id;
    let mut record = Map::new();
    let mut set = |key: &str, value: Value| {
        if !key.is_empty() {
            record.insert(key.to_string(), value);
        }
    };

    set(&f.order_number, json!(order.order_number.to_string()));
    set(&f.user_id, json!(order.user_id.as_str()));
    for (key, value) in [
        (&f.user_email, &order.user_email),
        (&f.customer_name, &order.customer_name),
        (&f.customer_phone, &order.customer_phone),
    ] {
        if let Some(key) = key {
            set(key, value.as_ref().map_or(Value::Null, |v| json!(v)));
        }
    }
    set(&f.items, json!(to_json_text(&order.items, id)?));
    set(&f.subtotal, decimal_json(order.subtotal_cad));
    set(&f.shipping, decimal_json(order.shipping_cad));
    set(&f.total, decimal_json(order.total_cad));
    set(&f.payment_method, json!(order.payment.method.display_label()));
    set(&f.payment_status, json!(order.payment.status.as_str()));
    set(
        &f.etransfer_ref,
        order.payment.etransfer_ref.as_ref().map_or(Value::Null, |r| json!(r)),
    );
    set(
        &f.payment_received_at,
        order
            .payment
            .received_at
            .map_or(Value::Null, |at| json!(at.to_rfc3339())),
    );
    set(&f.status, json!(order.status.as_str()));
    set(&f.shipping_info, optional_json_text(order.shipping.as_ref(), id)?);
    set(&f.pickup_info, optional_json_text(order.pickup.as_ref(), id)?);
    set(&f.dropoff_info, optional_json_text(order.dropoff.as_ref(), id)?);
    set(&f.sourcing_info, optional_json_text(order.sourcing.as_ref(), id)?);
    set(&f.status_history, json!(to_json_text(&order.status_history, id)?));
    set(&f.created_at, json!(order.created_at.to_rfc3339()));
    set(&f.updated_at, json!(order.updated_at.to_rfc3339()));

    Ok(Value::Object(record))
}

fn decimal_json(amount: Decimal) -> Value {
    serde_json::Number::from_f64(amount.to_f64().unwrap_or_default())
        .map_or(Value::Null, Value::Number)
}

/// Map a Knack order record.
pub(crate) fn order_from_record(record: &Record, f: &OrderFields) -> Result<Order> {
    let id = fields::record_id(record).unwrap_or_default();
    let malformed = |reason: String| RepositoryError::Malformed {
        entity: "order",
        id: id.clone(),
        reason,
    };
    let get = |key: &str, name: &str| fields::field(record, key, name);
    let optional_get = |key: &Option<String>, name: &str| {
        key.as_deref().and_then(|k| fields::text(fields::field(record, k, name)))
    };

    let order_number = fields::text(get(&f.order_number, "Order Number"))
        .ok_or_else(|| malformed("missing order number".to_string()))?;
    let order_number = OrderNumber::parse(&order_number).map_err(|e| malformed(e.to_string()))?;

    let items: Vec<OrderItem> =
        json_field(get(&f.items, "Items")).map_err(&malformed)?.unwrap_or_default();
    let status_history: Vec<StatusHistoryEntry> = json_field(get(&f.status_history, "Status History"))
        .map_err(&malformed)?
        .unwrap_or_default();

    let status = match fields::text(get(&f.status, "Status")) {
        Some(label) => label
            .parse::<OrderStatus>()
            .map_err(|e| malformed(e.to_string()))?,
        None => OrderStatus::Placed,
    };

    let payment = PaymentInfo {
        method: PaymentMethod::Etransfer,
        status: fields::text(get(&f.payment_status, "Payment Status"))
            .and_then(|s| s.parse::<PaymentStatus>().ok())
            .unwrap_or_default(),
        etransfer_ref: fields::text(get(&f.etransfer_ref, "E-Transfer Reference")),
        received_at: timestamp(get(&f.payment_received_at, "Payment Received At")),
    };

    let first_at = status_history.first().map(|e| e.at);
    let last_at = status_history.last().map(|e| e.at);
    let created_at = timestamp(get(&f.created_at, "Created At"))
        .or(first_at)
        .ok_or_else(|| malformed("missing created timestamp".to_string()))?;
    let updated_at = timestamp(get(&f.updated_at, "Updated At"))
        .or(last_at)
        .unwrap_or(created_at);

    let user_id = fields::connection_values(get(&f.user_id, "User ID"), "")
        .into_iter()
        .next()
        .unwrap_or_default();

    Ok(Order {
        id: OrderId::new(id.clone()),
        order_number,
        user_id: UserId::new(user_id),
        user_email: optional_get(&f.user_email, "User Email"),
        customer_name: optional_get(&f.customer_name, "Customer Name"),
        customer_phone: optional_get(&f.customer_phone, "Customer Phone"),
        items,
        subtotal_cad: fields::decimal(get(&f.subtotal, "Subtotal CAD")).unwrap_or_default(),
        shipping_cad: fields::decimal(get(&f.shipping, "Shipping CAD")).unwrap_or_default(),
        total_cad: fields::decimal(get(&f.total, "Total CAD")).unwrap_or_default(),
        payment,
        status,
        shipping: json_field::<ShippingInfo>(get(&f.shipping_info, "Shipping Info")).map_err(&malformed)?,
        pickup: json_field::<PickupInfo>(get(&f.pickup_info, "Pickup Info")).map_err(&malformed)?,
        dropoff: json_field::<DropOffInfo>(get(&f.dropoff_info, "Dropoff Info")).map_err(&malformed)?,
        sourcing: json_field::<SourcingInfo>(get(&f.sourcing_info, "Taobao Info")).map_err(&malformed)?,
        version: status_history.len() as u64,
        status_history,
        created_at,
        updated_at,
    })
}

/// Decode a JSON sub-document held as text (or, rarely, as a JSON value).
fn json_field<T: DeserializeOwned>(value: Option<&Value>) -> std::result::Result<Option<T>, String> {
    match value {
        None => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => serde_json::from_str(s).map(Some).map_err(|e| e.to_string()),
        Some(other) => serde_json::from_value(other.clone())
            .map(Some)
            .map_err(|e| e.to_string()),
    }
}

fn timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let raw = fields::text(value)?;
    DateTime::parse_from_rfc3339(&raw)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

// =============================================================================
// Users
// =============================================================================

/// Shoppers stored in the Knack users object.
#[derive(Clone)]
pub struct KnackUsers {
    client: KnackClient,
    object: String,
    fields: UserFields,
}

impl KnackUsers {
    #[must_use]
    pub fn new(client: KnackClient, config: &KnackConfig) -> Self {
        Self {
            client,
            object: config.objects.users.clone(),
            fields: config.fields.users.clone(),
        }
    }

    async fn find_by(&self, field: &str, value: &str) -> Result<Option<UserRecord>> {
        let query = RecordQuery::new().filter(field, value).page(1, 1);
        let records = self.client.get_records(&self.object, &query).await?;
        Ok(records.first().map(|r| user_from_record(r, &self.fields)))
    }
}

#[async_trait]
impl UserDirectory for KnackUsers {
    #[instrument(skip(self))]
    async fn find_by_uid(&self, uid: &str) -> Result<Option<UserRecord>> {
        self.find_by(&self.fields.user_id, uid).await
    }

    #[instrument(skip(self, email))]
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>> {
        self.find_by(&self.fields.email, email.as_str()).await
    }

    #[instrument(skip(self, user), fields(uid = %user.uid))]
    async fn create(&self, user: NewUser, now: DateTime<Utc>) -> Result<UserRecord> {
        let record = user_to_record(&user, &self.fields, now);
        let id = self.client.create_record(&self.object, &record).await?;
        Ok(UserRecord {
            id: UserId::new(id),
            uid: user.uid,
            email: user.email.into_inner(),
            display_name: user.display_name,
        })
    }
}

/// Split a full name for Knack's person field.
fn person_name(name: Option<&str>, display_name: &str) -> (String, String) {
    let name = name.map(str::trim).unwrap_or_default();
    let mut parts = name.split_whitespace();
    let first = parts
        .next()
        .map(ToString::to_string)
        .or_else(|| (!display_name.is_empty()).then(|| display_name.to_string()))
        .unwrap_or_else(|| "Guest".to_string());
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

pub(crate) fn user_to_record(user: &NewUser, f: &UserFields, now: DateTime<Utc>) -> Value {
    let (first, last) = person_name(user.name.as_deref(), &user.display_name);
    let now = now.to_rfc3339();
    let mut record = json!({
        f.display_name.as_str(): user.display_name,
        f.name.as_str(): { "first": first, "last": last },
        f.user_id.as_str(): user.uid,
        f.role.as_str(): "Customer",
        f.email.as_str(): user.email.as_str(),
        f.status.as_str(): "Active",
        f.is_active.as_str(): true,
        f.created_at.as_str(): now,
        f.updated_at.as_str(): now,
    });
    if let Some(phone) = &user.phone {
        record[f.phone.as_str()] = json!(phone);
    }
    record
}

fn user_from_record(record: &Record, f: &UserFields) -> UserRecord {
    let email = match fields::field(record, &f.email, "Email") {
        Some(Value::Object(obj)) => fields::text(obj.get("email")),
        other => fields::text(other).map(|e| fields::strip_tags(&e)),
    };
    UserRecord {
        id: UserId::new(fields::record_id(record).unwrap_or_default()),
        uid: fields::text(fields::field(record, &f.user_id, "User ID")).unwrap_or_default(),
        email: email.unwrap_or_default(),
        display_name: fields::text(fields::field(record, &f.display_name, "Display Name"))
            .unwrap_or_default(),
    }
}

// =============================================================================
// Promo codes
// =============================================================================

/// Promo codes in an optional Knack object.
#[derive(Clone)]
pub struct KnackPromos {
    client: KnackClient,
    object: Option<String>,
    fields: PromoFields,
}

impl KnackPromos {
    #[must_use]
    pub fn new(client: KnackClient, config: &KnackConfig) -> Self {
        Self {
            client,
            object: config.objects.promo_codes.clone(),
            fields: config.fields.promo_codes.clone(),
        }
    }
}

#[async_trait]
impl PromoRepository for KnackPromos {
    #[instrument(skip(self))]
    async fn find(&self, code: &str) -> Result<Option<PromoCode>> {
        let object = self
            .object
            .as_deref()
            .ok_or(RepositoryError::NotConfigured("promo codes"))?;

        let query = RecordQuery::new().filter(&self.fields.code, code).page(1, 1);
        let records = self.client.get_records(object, &query).await?;
        Ok(records.first().map(|record| PromoCode {
            code: fields::text(fields::field(record, &self.fields.code, "Code"))
                .unwrap_or_else(|| code.to_string())
                .to_uppercase(),
            active: fields::flag(fields::field(record, &self.fields.is_active, "Is Active")),
            discount_percent: fields::decimal(fields::field(
                record,
                &self.fields.discount_percent,
                "Discount Percent",
            ))
            .unwrap_or_default(),
        }))
    }
}
