//! Catalog cache revalidation hook.

use axum::{Json, extract::State, http::HeaderMap, http::header};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Serialize;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    /// Epoch millis.
    pub timestamp: i64,
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Clear the catalog read cache.
///
/// POST /api/revalidate
///
/// # Errors
///
/// 503 when no revalidation token is configured, 401 on a wrong token.
pub async fn revalidate(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RevalidateResponse>> {
    let Some(expected) = state.config().revalidate_token.as_ref() else {
        warn!("Revalidation requested but REVALIDATE_TOKEN is not set");
        return Err(AppError::NotConfigured("revalidate token".to_string()));
    };

    let presented = bearer(&headers).unwrap_or_default();
    let matches: bool = presented
        .as_bytes()
        .ct_eq(expected.expose_secret().as_bytes())
        .into();
    if !matches {
        return Err(AppError::Unauthorized("Unauthorized".to_string()));
    }

    state.catalog().invalidate().await;
    info!("Catalog cache revalidated");

    Ok(Json(RevalidateResponse {
        revalidated: true,
        timestamp: Utc::now().timestamp_millis(),
    }))
}
