//! Admin actions and their payloads.
//!
//! The admin endpoint receives `{ "action": "markShipped", "payload": {...} }`.
//! [`AdminActionRequest::parse`] turns that into a typed [`AdminAction`] plus
//! the optional actor/note metadata every action may carry.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{DropOffInfo, PickupInfo, ShippingInfo, SourcingInfo};

/// Errors from decoding an admin action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// Action name is not one of the known lifecycle actions.
    #[error("Invalid action: {0}")]
    UnknownAction(String),
    /// Payload is missing a required field or has the wrong shape.
    #[error("Invalid payload for {action}: {reason}")]
    InvalidPayload {
        action: &'static str,
        reason: String,
    },
}

/// One lifecycle action with its typed side-effect data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    MarkPaid { etransfer_ref: Option<String> },
    SetPurchasing { sourcing: Option<SourcingInfo> },
    SetInProduction,
    MarkShipped { shipping: ShippingInfo },
    SchedulePickup { pickup: PickupInfo },
    RecordDropOff { dropoff: DropOffInfo },
    Complete,
    Cancel,
}

impl AdminAction {
    /// Wire name of the action.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MarkPaid { .. } => "markPaid",
            Self::SetPurchasing { .. } => "setPurchasing",
            Self::SetInProduction => "setInProduction",
            Self::MarkShipped { .. } => "markShipped",
            Self::SchedulePickup { .. } => "schedulePickup",
            Self::RecordDropOff { .. } => "recordDropOff",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
        }
    }
}

/// Attribution attached to the history entry an action appends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionMeta {
    #[serde(default)]
    pub actor_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// A decoded admin request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminActionRequest {
    pub action: AdminAction,
    pub meta: ActionMeta,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkPaidBody {
    #[serde(default)]
    etransfer_ref: Option<String>,
}

#[derive(Deserialize)]
struct SetPurchasingBody {
    #[serde(default, alias = "taobao")]
    sourcing: Option<SourcingInfo>,
}

#[derive(Deserialize)]
struct MarkShippedBody {
    shipping: ShippingInfo,
}

#[derive(Deserialize)]
struct SchedulePickupBody {
    pickup: PickupInfo,
}

#[derive(Deserialize)]
struct RecordDropOffBody {
    dropoff: DropOffInfo,
}

fn body<T: DeserializeOwned>(action: &'static str, payload: &Value) -> Result<T, ActionError> {
    T::deserialize(payload).map_err(|e| ActionError::InvalidPayload {
        action,
        reason: e.to_string(),
    })
}

impl AdminActionRequest {
    /// Decode an action name and its optional JSON payload.
    ///
    /// A missing payload is treated as `{}`, so actions whose payload is
    /// optional (`complete`, `cancel`, ...) accept none at all.
    ///
    /// # Errors
    ///
    /// `UnknownAction` for an unrecognised name, `InvalidPayload` when a
    /// required sub-record is missing or malformed.
    pub fn parse(name: &str, payload: Option<Value>) -> Result<Self, ActionError> {
        let payload = match payload {
            None | Some(Value::Null) => Value::Object(serde_json::Map::new()),
            Some(value) => value,
        };

        let action = match name {
            "markPaid" => {
                let b: MarkPaidBody = body("markPaid", &payload)?;
                AdminAction::MarkPaid {
                    etransfer_ref: b.etransfer_ref.filter(|r| !r.trim().is_empty()),
                }
            }
            "setPurchasing" => {
                let b: SetPurchasingBody = body("setPurchasing", &payload)?;
                AdminAction::SetPurchasing { sourcing: b.sourcing }
            }
            "setInProduction" => AdminAction::SetInProduction,
            "markShipped" => {
                let b: MarkShippedBody = body("markShipped", &payload)?;
                AdminAction::MarkShipped { shipping: b.shipping }
            }
            "schedulePickup" => {
                let b: SchedulePickupBody = body("schedulePickup", &payload)?;
                AdminAction::SchedulePickup { pickup: b.pickup }
            }
            "recordDropOff" => {
                let b: RecordDropOffBody = body("recordDropOff", &payload)?;
                AdminAction::RecordDropOff { dropoff: b.dropoff }
            }
            "complete" => AdminAction::Complete,
            "cancel" => AdminAction::Cancel,
            other => return Err(ActionError::UnknownAction(other.to_owned())),
        };

        let meta = ActionMeta::deserialize(&payload).unwrap_or_default();

        Ok(Self { action, meta })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_mark_paid_with_reference_and_meta() {
        let req = AdminActionRequest::parse(
            "markPaid",
            Some(json!({"etransferRef": "CA1234", "note": "matched", "actorId": "admin_1"})),
        )
        .unwrap();
        assert_eq!(
            req.action,
            AdminAction::MarkPaid {
                etransfer_ref: Some("CA1234".to_string())
            }
        );
        assert_eq!(req.meta.note.as_deref(), Some("matched"));
        assert_eq!(req.meta.actor_id.as_deref(), Some("admin_1"));
    }

    #[test]
    fn test_parse_without_payload() {
        let req = AdminActionRequest::parse("cancel", None).unwrap();
        assert_eq!(req.action, AdminAction::Cancel);
        assert_eq!(req.meta, ActionMeta::default());
    }

    #[test]
    fn test_parse_unknown_action() {
        let err = AdminActionRequest::parse("refund", None).unwrap_err();
        assert_eq!(err, ActionError::UnknownAction("refund".to_string()));
    }

    #[test]
    fn test_mark_shipped_requires_shipping() {
        let err = AdminActionRequest::parse("markShipped", Some(json!({}))).unwrap_err();
        assert!(matches!(
            err,
            ActionError::InvalidPayload {
                action: "markShipped",
                ..
            }
        ));
    }

    #[test]
    fn test_set_purchasing_accepts_taobao_alias() {
        let req = AdminActionRequest::parse(
            "setPurchasing",
            Some(json!({"taobao": {"orderId": "TB-99"}})),
        )
        .unwrap();
        let AdminAction::SetPurchasing { sourcing } = req.action else {
            panic!("wrong action");
        };
        assert_eq!(sourcing.unwrap().order_id.as_deref(), Some("TB-99"));
    }

    #[test]
    fn test_schedule_pickup_payload() {
        let req = AdminActionRequest::parse(
            "schedulePickup",
            Some(json!({"pickup": {"locationId": "reception", "scheduledAt": "2025-12-01T18:00:00Z"}})),
        )
        .unwrap();
        let AdminAction::SchedulePickup { pickup } = req.action else {
            panic!("wrong action");
        };
        assert_eq!(pickup.location_id, "reception");
        assert!(!pickup.confirmed_by_customer);
    }
}
