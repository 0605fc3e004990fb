//! Admin authentication extractor and authorization policy.
//!
//! Identity tokens are verified by the auth provider in front of the service,
//! which forwards the caller as `Authorization: Bearer <token>` plus
//! `x-user-email` and `x-user-id`. Authorization is delegated to the
//! [`AdminPolicy`] held in [`AppState`].
//!
//! # Deployment requirement
//!
//! This service does not verify the bearer token and takes the identity
//! headers as given. It must only be reachable through the auth proxy, and
//! the proxy must strip any client-supplied `x-user-email` / `x-user-id`
//! before setting its own. Exposed directly, anyone can claim an allow-listed
//! email and the admin API is open.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the authenticated caller's email.
pub const USER_EMAIL_HEADER: &str = "x-user-email";
/// Header carrying the authenticated caller's uid.
pub const USER_ID_HEADER: &str = "x-user-id";

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
}

/// Decides which principals may use the admin surface.
pub trait AdminPolicy: Send + Sync {
    fn is_authorized(&self, principal: &Principal) -> bool;
}

/// Allows principals whose email is on a fixed list (case-insensitive).
#[derive(Debug, Clone, Default)]
pub struct EmailAllowList {
    emails: Vec<String>,
}

impl EmailAllowList {
    #[must_use]
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }
}

impl AdminPolicy for EmailAllowList {
    fn is_authorized(&self, principal: &Principal) -> bool {
        let email = principal.email.trim().to_lowercase();
        self.emails.iter().any(|allowed| *allowed == email)
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl Principal {
    /// The forwarded caller, if the request carries a bearer token and both
    /// identity headers. The token is only checked for presence; see the
    /// module docs.
    #[must_use]
    pub fn from_parts(parts: &Parts) -> Option<Self> {
        let token = header(parts, "authorization")?.strip_prefix("Bearer ")?;
        if token.trim().is_empty() {
            return None;
        }
        Some(Self {
            user_id: header(parts, USER_ID_HEADER)?.to_string(),
            email: header(parts, USER_EMAIL_HEADER)?.to_string(),
        })
    }
}

/// Extractor that requires an authorized admin.
///
/// Rejects with 401 when the caller is not authenticated and 403 when the
/// policy refuses them.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAdmin(admin): RequireAdmin) -> impl IntoResponse {
///     format!("Hello, {}!", admin.email)
/// }
/// ```
pub struct RequireAdmin(pub Principal);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_parts(parts)
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

        if !state.admin_policy().is_authorized(&principal) {
            tracing::warn!(email = %principal.email, "Admin access denied");
            return Err(AppError::Forbidden("Forbidden".to_string()));
        }

        sentry::configure_scope(|scope| {
            scope.set_user(Some(sentry::User {
                id: Some(principal.user_id.clone()),
                email: Some(principal.email.clone()),
                ..Default::default()
            }));
        });

        Ok(Self(principal))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/api/admin/orders");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_principal_requires_token_and_identity() {
        let full = parts(&[
            ("authorization", "Bearer abc"),
            ("x-user-email", "Admin@Example.com"),
            ("x-user-id", "uid_1"),
        ]);
        let principal = Principal::from_parts(&full).unwrap();
        assert_eq!(principal.user_id, "uid_1");

        assert!(Principal::from_parts(&parts(&[("x-user-email", "a@b.co"), ("x-user-id", "u")])).is_none());
        assert!(Principal::from_parts(&parts(&[("authorization", "Basic abc"), ("x-user-email", "a@b.co"), ("x-user-id", "u")])).is_none());
        assert!(Principal::from_parts(&parts(&[("authorization", "Bearer abc"), ("x-user-id", "u")])).is_none());
    }

    #[test]
    fn test_forwarded_identity_is_taken_as_given() {
        // Token contents are the proxy's concern; only presence is checked here
        let forwarded = parts(&[
            ("authorization", "Bearer not-a-jwt"),
            ("x-user-email", "whoever@example.com"),
            ("x-user-id", "uid_claimed"),
        ]);
        let principal = Principal::from_parts(&forwarded).unwrap();
        assert_eq!(principal.email, "whoever@example.com");
        assert_eq!(principal.user_id, "uid_claimed");

        let empty_token = parts(&[
            ("authorization", "Bearer "),
            ("x-user-email", "whoever@example.com"),
            ("x-user-id", "uid_claimed"),
        ]);
        assert!(Principal::from_parts(&empty_token).is_none());
    }

    #[test]
    fn test_allow_list_ignores_case() {
        let policy = EmailAllowList::new(["admin@example.com", " "]);
        let admin = Principal {
            user_id: "uid_1".to_string(),
            email: "ADMIN@example.com".to_string(),
        };
        let shopper = Principal {
            user_id: "uid_2".to_string(),
            email: "shopper@example.com".to_string(),
        };
        assert!(policy.is_authorized(&admin));
        assert!(!policy.is_authorized(&shopper));
    }

    #[test]
    fn test_empty_allow_list_denies_everyone() {
        let policy = EmailAllowList::default();
        let principal = Principal {
            user_id: "uid".to_string(),
            email: "admin@example.com".to_string(),
        };
        assert!(!policy.is_authorized(&principal));
    }
}
