//! Admin order management.
//!
//! Every handler requires [`RequireAdmin`]. Status changes go through the
//! order lifecycle state machine; an action that is not allowed from the
//! current status is rejected with 409 and nothing is written.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use chrono::Utc;
use protocol_zero_core::order::{AdminActionRequest, Order};
use protocol_zero_core::{OrderId, OrderStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::error::{AdminError, AppError, add_breadcrumb};
use crate::middleware::RequireAdmin;
use crate::repository::OrderFilter;
use crate::state::AppState;

type Result<T> = std::result::Result<T, AdminError>;

/// Largest page the record store serves in one request.
const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<String>,
    pub page_size: Option<u32>,
}

impl ListQuery {
    fn filter(&self) -> std::result::Result<OrderFilter, AppError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<OrderStatus>()
                    .map_err(|_| AppError::BadRequest(format!("Unknown status: {raw}")))?,
            ),
        };
        let page_size = self
            .page_size
            .unwrap_or(OrderFilter::default().page_size)
            .clamp(1, MAX_PAGE_SIZE);
        Ok(OrderFilter { status, page_size })
    }
}

#[derive(Debug, Serialize)]
pub struct OrderList {
    pub orders: Vec<Order>,
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    pub order: Order,
}

/// PATCH body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionBody {
    pub action: String,
    #[serde(default)]
    pub payload: Option<Value>,
    /// Version the admin last saw. Stale versions are rejected.
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ActionResult {
    pub ok: bool,
    pub status: OrderStatus,
    pub version: u64,
}

/// GET /api/admin/orders?status=&pageSize=
#[instrument(skip(state, admin))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<ListQuery>,
) -> Result<Json<OrderList>> {
    let filter = query.filter()?;
    let orders = state.orders().list(&filter).await?;
    info!(admin = %admin.email, count = orders.len(), "Listed orders");
    Ok(Json(OrderList { orders }))
}

/// GET /api/admin/orders/{id}
#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<OrderDetail>> {
    let order = state
        .orders()
        .get(&OrderId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))?;
    Ok(Json(OrderDetail { order }))
}

/// Apply an admin action.
///
/// PATCH /api/admin/orders/{id}
///
/// The acting admin's uid is recorded on the history entry, overriding any
/// `actorId` in the payload.
#[instrument(skip_all)]
pub async fn apply_action(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    body: std::result::Result<Json<ActionBody>, JsonRejection>,
) -> Result<Json<ActionResult>> {
    let Json(body) = body.map_err(|_| AppError::BadRequest("Invalid JSON body".to_string()))?;

    let mut request = AdminActionRequest::parse(&body.action, body.payload)?;
    request.meta.actor_id = Some(admin.user_id.clone());

    let id = OrderId::new(id);
    let mut order = state
        .orders()
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))?;

    if let Some(expected) = body.expected_version
        && expected != order.version
    {
        return Err(AppError::Conflict(format!(
            "Order has changed (version {} is current, {expected} was expected); reload and retry",
            order.version
        ))
        .into());
    }

    let read_version = order.version;
    let transition = order.apply(request, Utc::now())?;
    state.orders().update(&order, read_version).await?;

    add_breadcrumb(
        "order",
        "Admin action applied",
        &[
            ("order_id", id.as_str()),
            ("action", body.action.as_str()),
            ("status", order.status.as_str()),
        ],
    );
    info!(
        order_id = %id,
        action = %body.action,
        from = %transition.from,
        to = %transition.to,
        actor = %admin.user_id,
        "Order status changed"
    );

    Ok(Json(ActionResult {
        ok: true,
        status: order.status,
        version: order.version,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let query = ListQuery {
            status: None,
            page_size: None,
        };
        assert_eq!(query.filter().unwrap(), OrderFilter::default());
    }

    #[test]
    fn test_list_query_status_and_clamp() {
        let query = ListQuery {
            status: Some("paid".to_string()),
            page_size: Some(5000),
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.status, Some(OrderStatus::Paid));
        assert_eq!(filter.page_size, MAX_PAGE_SIZE);

        let query = ListQuery {
            status: Some("lost-in-space".to_string()),
            page_size: Some(0),
        };
        assert!(query.filter().is_err());
    }
}
