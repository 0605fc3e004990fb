//! Promo code validation.

use axum::{
    Json,
    extract::{Query, State},
};
use protocol_zero_core::promo::{self, PromoValidation};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ValidateQuery {
    pub code: Option<String>,
}

/// Look up a shopper-entered code.
///
/// GET /api/promo/validate?code=
///
/// # Errors
///
/// 400 without a code, 503 when the promo object is not configured.
#[instrument(skip(state))]
pub async fn validate(
    State(state): State<AppState>,
    Query(query): Query<ValidateQuery>,
) -> Result<Json<PromoValidation>> {
    let validation = check_code(&state, query.code.as_deref()).await?;
    Ok(Json(validation))
}

/// Normalise, look up and judge a code.
pub(crate) async fn check_code(state: &AppState, code: Option<&str>) -> Result<PromoValidation> {
    let code = code
        .map(promo::normalize_code)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Promo code is required".to_string()))?;

    let record = state.promos().find(&code).await?;
    let validation = promo::evaluate(&code, record.as_ref());
    debug!(code = %validation.code, valid = validation.valid, "Promo code checked");
    Ok(validation)
}
