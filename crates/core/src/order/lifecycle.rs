//! Order state machine.
//!
//! ```text
//! placed -> paid -> purchasing -> in_production -> shipped
//!        -> ready_for_pickup -> dropoff_scheduled -> dropped_off -> completed
//! ```
//!
//! `cancelled` is reachable from every non-terminal status. `completed` and
//! `cancelled` are absorbing. An action whose source status is not in its
//! allowed set is rejected and leaves the order untouched.

use chrono::{DateTime, Utc};

use super::action::{AdminAction, AdminActionRequest};
use super::{Order, ShippingInfo, StatusHistoryEntry};
use crate::types::{OrderStatus, PaymentStatus};

/// Errors from applying an action to an order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("cannot {action} an order that is {from}")]
    IllegalTransition {
        action: &'static str,
        from: OrderStatus,
    },
    #[error("order status {status} disagrees with its history")]
    InconsistentHistory { status: OrderStatus },
}

/// Outcome of a successful action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl AdminAction {
    /// Status the order ends up in.
    #[must_use]
    pub const fn target(&self) -> OrderStatus {
        match self {
            Self::MarkPaid { .. } => OrderStatus::Paid,
            Self::SetPurchasing { .. } => OrderStatus::Purchasing,
            Self::SetInProduction => OrderStatus::InProduction,
            Self::MarkShipped { .. } => OrderStatus::Shipped,
            Self::SchedulePickup { .. } => OrderStatus::ReadyForPickup,
            Self::RecordDropOff { .. } => OrderStatus::DroppedOff,
            Self::Complete => OrderStatus::Completed,
            Self::Cancel => OrderStatus::Cancelled,
        }
    }

    /// Whether the action may run on an order currently in `from`.
    #[must_use]
    pub const fn allowed_from(&self, from: OrderStatus) -> bool {
        use OrderStatus as S;

        match self {
            Self::MarkPaid { .. } => matches!(from, S::Placed),
            Self::SetPurchasing { .. } => matches!(from, S::Paid | S::Placed),
            Self::SetInProduction => matches!(from, S::Paid | S::Purchasing | S::InProduction),
            Self::MarkShipped { .. } => matches!(from, S::Purchasing | S::InProduction),
            Self::SchedulePickup { .. } => matches!(from, S::Shipped | S::InProduction),
            Self::RecordDropOff { .. } => matches!(from, S::DropoffScheduled | S::ReadyForPickup),
            Self::Complete | Self::Cancel => !from.is_terminal(),
        }
    }
}

impl Order {
    /// Names of the actions that are legal from the current status.
    #[must_use]
    pub fn available_actions(&self) -> Vec<&'static str> {
        let candidates = [
            AdminAction::MarkPaid { etransfer_ref: None },
            AdminAction::SetPurchasing { sourcing: None },
            AdminAction::SetInProduction,
            AdminAction::MarkShipped {
                shipping: ShippingInfo::default(),
            },
            AdminAction::Complete,
            AdminAction::Cancel,
        ];
        let mut names: Vec<&'static str> = candidates
            .iter()
            .filter(|action| action.allowed_from(self.status))
            .map(AdminAction::name)
            .collect();
        // Pickup and drop-off need payloads to test; their rules are simple enough to inline.
        if matches!(self.status, OrderStatus::Shipped | OrderStatus::InProduction) {
            names.push("schedulePickup");
        }
        if matches!(
            self.status,
            OrderStatus::DropoffScheduled | OrderStatus::ReadyForPickup
        ) {
            names.push("recordDropOff");
        }
        names
    }

    /// Apply an admin action.
    ///
    /// On success exactly one history entry is appended, `status` and
    /// `updated_at` change, and `version` is bumped. On error the order is
    /// not modified.
    ///
    /// # Errors
    ///
    /// `IllegalTransition` when the current status is not in the action's
    /// allowed set, `InconsistentHistory` when the stored order is already
    /// corrupt.
    pub fn apply(
        &mut self,
        request: AdminActionRequest,
        now: DateTime<Utc>,
    ) -> Result<Transition, LifecycleError> {
        if !self.history_is_consistent() {
            return Err(LifecycleError::InconsistentHistory {
                status: self.status,
            });
        }

        let from = self.status;
        let action = request.action;
        if !action.allowed_from(from) {
            return Err(LifecycleError::IllegalTransition {
                action: action.name(),
                from,
            });
        }
        let to = action.target();

        match action {
            AdminAction::MarkPaid { etransfer_ref } => {
                self.payment.status = PaymentStatus::Paid;
                self.payment.received_at = Some(now);
                if etransfer_ref.is_some() {
                    self.payment.etransfer_ref = etransfer_ref;
                }
            }
            AdminAction::SetPurchasing { sourcing } => {
                if sourcing.is_some() {
                    self.sourcing = sourcing;
                }
            }
            AdminAction::MarkShipped { shipping } => {
                let mut merged = self.shipping.take().unwrap_or_default().merged_with(shipping);
                merged.shipped_at.get_or_insert(now);
                self.shipping = Some(merged);
            }
            AdminAction::SchedulePickup { pickup } => self.pickup = Some(pickup),
            AdminAction::RecordDropOff { mut dropoff } => {
                dropoff.dropped_off_at.get_or_insert(now);
                self.dropoff = Some(dropoff);
            }
            AdminAction::SetInProduction | AdminAction::Complete | AdminAction::Cancel => {}
        }

        self.status = to;
        self.status_history.push(StatusHistoryEntry {
            status: to,
            at: now,
            actor_id: request.meta.actor_id,
            note: request.meta.note,
        });
        self.updated_at = now;
        self.version += 1;

        Ok(Transition { from, to })
    }
}
