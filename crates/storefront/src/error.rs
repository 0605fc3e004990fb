//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding. All route handlers return `Result<T, AppError>`.
//! The response body is always JSON: `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use protocol_zero_core::order::{ActionError, LifecycleError};
use serde_json::json;
use thiserror::Error;

use crate::repository::RepositoryError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request body failed validation; the message is shown to the shopper.
    #[error("{0}")]
    Validation(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Admin action not allowed from the order's current status.
    #[error("{0}")]
    Precondition(#[from] LifecycleError),

    /// Order changed since the caller read it.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// A backing service is not configured.
    #[error("Service not configured: {0}")]
    NotConfigured(String),

    /// Record store or notes store failed.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Checkout could not be stored; the cause has already been reported.
    #[error("Checkout failed")]
    CheckoutFailed,
}

impl AppError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Precondition(_) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) | Self::CheckoutFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Upstream(_) | Self::Internal(_) | Self::NotConfigured(_)
        )
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        if err.is_not_configured() {
            return Self::NotConfigured(err.to_string());
        }
        match err {
            RepositoryError::Conflict { .. } => Self::Conflict(err.to_string()),
            RepositoryError::NotFound(_) => Self::NotFound("Not found".to_string()),
            RepositoryError::Malformed { .. } => Self::Internal(err.to_string()),
            RepositoryError::Knack(_) | RepositoryError::Notion(_) | RepositoryError::NotConfigured(_) => {
                Self::Upstream(err.to_string())
            }
        }
    }
}

impl From<ActionError> for AppError {
    fn from(err: ActionError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl AppError {
    /// Message safe to show any caller.
    fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "Internal server error".to_string(),
            Self::CheckoutFailed => "Checkout failed. Please try again.".to_string(),
            Self::Upstream(_) => "External service error".to_string(),
            Self::NotConfigured(_) => "Service not configured".to_string(),
            Self::NotFound(msg)
            | Self::BadRequest(msg)
            | Self::Validation(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::Precondition(err) => err.to_string(),
            Self::RateLimited => "Too many requests".to_string(),
        }
    }

    fn respond(self, expose_details: bool) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let message = if expose_details && self.is_server_error() {
            self.to_string()
        } else {
            self.public_message()
        };

        (self.status(), Json(json!({ "error": message }))).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.respond(false)
    }
}

/// Error type for the admin surface.
///
/// Same statuses as [`AppError`], but server-side failures carry their
/// detail so operators can see what the record store said.
#[derive(Debug)]
pub struct AdminError(pub AppError);

impl From<AppError> for AdminError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<RepositoryError> for AdminError {
    fn from(err: RepositoryError) -> Self {
        Self(err.into())
    }
}

impl From<ActionError> for AdminError {
    fn from(err: ActionError) -> Self {
        Self(err.into())
    }
}

impl From<LifecycleError> for AdminError {
    fn from(err: LifecycleError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        self.0.respond(true)
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for an order or checkout event.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use protocol_zero_core::OrderStatus;
    use protocol_zero_core::OrderId;

    use super::*;
    use crate::knack::KnackError;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order rec_1".to_string());
        assert_eq!(err.to_string(), "Not found: order rec_1");

        let err = AppError::Validation("Valid email is required".to_string());
        assert_eq!(err.to_string(), "Valid email is required");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(get_status(AppError::NotFound("test".to_string())), StatusCode::NOT_FOUND);
        assert_eq!(get_status(AppError::Unauthorized("test".to_string())), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(AppError::Forbidden("test".to_string())), StatusCode::FORBIDDEN);
        assert_eq!(get_status(AppError::BadRequest("test".to_string())), StatusCode::BAD_REQUEST);
        assert_eq!(get_status(AppError::Conflict("test".to_string())), StatusCode::CONFLICT);
        assert_eq!(get_status(AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            get_status(AppError::NotConfigured("test".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(get_status(AppError::Upstream("test".to_string())), StatusCode::BAD_GATEWAY);
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_illegal_transition_is_conflict() {
        let err = AppError::from(LifecycleError::IllegalTransition {
            action: "markShipped",
            from: OrderStatus::Placed,
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_repository_error_mapping() {
        let conflict = RepositoryError::Conflict {
            id: OrderId::new("rec_1"),
            expected: 1,
            found: 2,
        };
        assert_eq!(AppError::from(conflict).status(), StatusCode::CONFLICT);

        let unconfigured = RepositoryError::Knack(KnackError::NotConfigured);
        assert_eq!(
            AppError::from(unconfigured).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let upstream = RepositoryError::Knack(KnackError::Api {
            status: 500,
            body: "boom".to_string(),
        });
        assert_eq!(AppError::from(upstream).status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_admin_errors_carry_details() {
        let response = AdminError(AppError::Upstream("Knack API error (500): boom".to_string()))
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            json!({ "error": "Upstream error: Knack API error (500): boom" })
        );
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let response = AppError::Internal("secret stack trace".to_string()).into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({ "error": "Internal server error" }));
    }
}
