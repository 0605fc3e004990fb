//! Order listing.
//!
//! # Usage
//!
//! ```bash
//! pz-cli orders list
//! pz-cli orders list --status paid --page-size 50
//! ```

use protocol_zero_core::OrderStatus;
use protocol_zero_core::money::format_cad;
use protocol_zero_core::order::Order;
use protocol_zero_storefront::config::{ConfigError, StorefrontConfig};
use protocol_zero_storefront::knack::KnackClient;
use protocol_zero_storefront::repository::knack::KnackOrders;
use protocol_zero_storefront::repository::{OrderFilter, OrderRepository, RepositoryError};
use thiserror::Error;

/// Largest page the record store serves in one request.
const MAX_PAGE_SIZE: u32 = 1000;

/// Errors that can occur while listing orders.
#[derive(Debug, Error)]
pub enum OrdersError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Unrecognised status filter.
    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    /// Record store lookup failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Build the listing filter from command line arguments.
///
/// # Errors
///
/// Returns `OrdersError::UnknownStatus` for an unrecognised status.
pub fn filter(status: Option<&str>, page_size: u32) -> Result<OrderFilter, OrdersError> {
    let status = status
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|raw| {
            raw.parse::<OrderStatus>()
                .map_err(|_| OrdersError::UnknownStatus(raw.to_string()))
        })
        .transpose()?;
    Ok(OrderFilter {
        status,
        page_size: page_size.clamp(1, MAX_PAGE_SIZE),
    })
}

/// One table row.
#[must_use]
pub fn row(order: &Order) -> String {
    format!(
        "{:<20}{:<20}{:>10}  {:<32}{}",
        order.order_number.to_string(),
        order.status.as_str(),
        format_cad(order.total_cad),
        order.user_email.as_deref().unwrap_or("-"),
        order.created_at.format("%Y-%m-%d %H:%M"),
    )
}

/// List orders, newest first.
///
/// # Errors
///
/// Returns `OrdersError` if configuration is invalid, the status is
/// unknown, or the record store request fails.
pub async fn list(status: Option<&str>, page_size: u32) -> Result<(), OrdersError> {
    let filter = filter(status, page_size)?;
    let config = StorefrontConfig::from_env()?;
    let orders = KnackOrders::new(KnackClient::new(&config.knack), &config.knack);

    tracing::info!(status = ?filter.status, page_size = filter.page_size, "Fetching orders...");
    let orders = orders.list(&filter).await?;

    #[allow(clippy::print_stdout)]
    {
        println!(
            "{:<20}{:<20}{:>10}  {:<32}Created",
            "Order", "Status", "Total", "Email"
        );
        for order in &orders {
            println!("{}", row(order));
        }
    }

    tracing::info!("{} orders", orders.len());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use protocol_zero_core::order::{NewOrder, OrderItem, OrderNumber};
    use protocol_zero_core::{ItemType, OrderId, ProductId, UserId, VariantId};
    use rust_decimal_macros::dec;

    use super::*;

    fn order() -> Order {
        NewOrder {
            order_number: OrderNumber::parse("PZ-20251126-0007").unwrap(),
            user_id: UserId::new("user_1"),
            user_email: Some("shopper@example.com".to_string()),
            customer_name: None,
            customer_phone: None,
            items: vec![OrderItem {
                product_id: ProductId::new("PZ-001"),
                variant_id: VariantId::new("var_1"),
                title: "Tactical Vest".to_string(),
                variant_title: None,
                sku: None,
                quantity: 1,
                unit_price_cad: dec!(75),
                item_type: ItemType::Regular,
            }],
            subtotal_cad: dec!(75),
            shipping_cad: dec!(0),
            total_cad: dec!(75),
        }
        .place(
            OrderId::new("rec_7"),
            Utc.with_ymd_and_hms(2025, 11, 26, 9, 30, 0).unwrap(),
        )
    }

    #[test]
    fn test_filter() {
        let parsed = filter(Some("ready_for_pickup"), 5000).unwrap();
        assert_eq!(parsed.status, Some(OrderStatus::ReadyForPickup));
        assert_eq!(parsed.page_size, MAX_PAGE_SIZE);

        let parsed = filter(Some("  "), 0).unwrap();
        assert_eq!(parsed.status, None);
        assert_eq!(parsed.page_size, 1);

        assert!(matches!(
            filter(Some("teleported"), 10),
            Err(OrdersError::UnknownStatus(s)) if s == "teleported"
        ));
    }

    #[test]
    fn test_row() {
        let line = row(&order());
        assert!(line.starts_with("PZ-20251126-0007"));
        assert!(line.contains("placed"));
        assert!(line.contains("75.00"));
        assert!(line.contains("shopper@example.com"));
        assert!(line.ends_with("2025-11-26 09:30"));
    }
}
