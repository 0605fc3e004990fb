//! Status enums for orders, payments, and cart lines.
//!
//! Statuses serialize as `snake_case`. Parsing is lenient about case and
//! separators because records written by the back-office tooling use display
//! labels such as `Placed` or `In Production`.

use serde::{Deserialize, Serialize};

/// Error returned when a status label is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownStatus {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Normalise `In Production` / `in-production` / `IN_PRODUCTION` to `in_production`.
fn normalize_label(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum OrderStatus {
    #[default]
    Placed,
    Paid,
    Purchasing,
    InProduction,
    Shipped,
    ReadyForPickup,
    DropoffScheduled,
    DroppedOff,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 10] = [
        Self::Placed,
        Self::Paid,
        Self::Purchasing,
        Self::InProduction,
        Self::Shipped,
        Self::ReadyForPickup,
        Self::DropoffScheduled,
        Self::DroppedOff,
        Self::Completed,
        Self::Cancelled,
    ];

    /// `completed` and `cancelled` admit no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Canonical `snake_case` label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Placed => "placed",
            Self::Paid => "paid",
            Self::Purchasing => "purchasing",
            Self::InProduction => "in_production",
            Self::Shipped => "shipped",
            Self::ReadyForPickup => "ready_for_pickup",
            Self::DropoffScheduled => "dropoff_scheduled",
            Self::DroppedOff => "dropped_off",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = normalize_label(s);
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == label)
            .ok_or_else(|| UnknownStatus {
                kind: "order status",
                value: s.to_owned(),
            })
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

impl PaymentStatus {
    /// Canonical `snake_case` label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            _ => Err(UnknownStatus {
                kind: "payment status",
                value: s.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for PaymentStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// How an order is paid. Only manual Interac e-Transfer is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    #[default]
    #[serde(rename = "etransfer", alias = "e-transfer", alias = "E-Transfer")]
    Etransfer,
}

impl PaymentMethod {
    /// Label shown to shoppers.
    #[must_use]
    pub const fn display_label(self) -> &'static str {
        match self {
            Self::Etransfer => "e-transfer",
        }
    }
}

/// Whether a cart line is priced at its regular or add-on price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    #[default]
    Regular,
    Addon,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_parses_display_labels() {
        assert_eq!("Placed".parse::<OrderStatus>().unwrap(), OrderStatus::Placed);
        assert_eq!(
            "In Production".parse::<OrderStatus>().unwrap(),
            OrderStatus::InProduction
        );
        assert_eq!(
            "ready-for-pickup".parse::<OrderStatus>().unwrap(),
            OrderStatus::ReadyForPickup
        );
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_order_status_round_trips_through_json() {
        for status in OrderStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            let back: OrderStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn test_terminal_statuses() {
        let terminal: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![OrderStatus::Completed, OrderStatus::Cancelled]);
    }

    #[test]
    fn test_payment_status_is_case_insensitive() {
        assert_eq!("Pending".parse::<PaymentStatus>().unwrap(), PaymentStatus::Pending);
        assert_eq!("PAID".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
    }

    #[test]
    fn test_payment_method_accepts_hyphenated_label() {
        let method: PaymentMethod = serde_json::from_str("\"e-transfer\"").unwrap();
        assert_eq!(method, PaymentMethod::Etransfer);
        assert_eq!(serde_json::to_string(&method).unwrap(), "\"etransfer\"");
    }
}
