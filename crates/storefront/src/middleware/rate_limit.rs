//! Per-IP rate limiting using governor and `tower_governor`.
//!
//! | Route group            | Budget        |
//! |------------------------|---------------|
//! | checkout               | ~5/min        |
//! | products, addons       | ~60/min       |
//! | revalidate             | ~10/min       |
//! | everything else        | ~100/min      |
//!
//! Rejections are rendered through [`AppError`], so a limited client gets
//! the usual JSON error body plus a `Retry-After` header.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderValue, Request, header};
use axum::response::{IntoResponse, Response};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use crate::error::AppError;

// =============================================================================
// Client IP Key Extractor
// =============================================================================

/// Proxy headers consulted for the client address, most trusted first.
const CLIENT_IP_HEADERS: [&str; 4] = [
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-real-ip",
    "fly-client-ip",
];

/// Key extractor for the real client IP.
///
/// Proxy headers win when present (`X-Forwarded-For` contributes its first
/// entry only). Without them the TCP peer address is used, which requires
/// the server to run with `into_make_service_with_connect_info`.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl ClientIpKeyExtractor {
    fn client_ip(headers: &axum::http::HeaderMap) -> Option<IpAddr> {
        CLIENT_IP_HEADERS.iter().find_map(|name| {
            headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        })
    }

    fn peer_ip<T>(req: &Request<T>) -> Option<IpAddr> {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Self::client_ip(req.headers())
            .or_else(|| Self::peer_ip(req))
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Render a limiter rejection as an [`AppError`] response.
fn rejection_response(error: GovernorError) -> Response {
    match error {
        GovernorError::TooManyRequests { wait_time, .. } => {
            let mut response = AppError::RateLimited.into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(wait_time));
            response
        }
        other => AppError::Internal(format!("rate limiter: {other}")).into_response(),
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

fn limiter(replenish_ms: u64, burst: u32) -> Option<RateLimiterLayer> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_millisecond(replenish_ms)
        .burst_size(burst)
        .finish()?;
    Some(GovernorLayer::new(Arc::new(config)).error_handler(rejection_response))
}

/// Checkout: one token every 12 seconds, burst of 5.
///
/// # Panics
///
/// Never panics; the period and burst are non-zero constants.
#[must_use]
pub fn checkout_rate_limiter() -> RateLimiterLayer {
    limiter(12_000, 5).expect("rate limiter config with 12s period and burst 5 is valid")
}

/// Catalog reads: one token per second, burst of 20.
///
/// # Panics
///
/// Never panics; the period and burst are non-zero constants.
#[must_use]
pub fn catalog_rate_limiter() -> RateLimiterLayer {
    limiter(1_000, 20).expect("rate limiter config with 1s period and burst 20 is valid")
}

/// Cache revalidation: one token every 6 seconds, burst of 3.
///
/// # Panics
///
/// Never panics; the period and burst are non-zero constants.
#[must_use]
pub fn revalidate_rate_limiter() -> RateLimiterLayer {
    limiter(6_000, 3).expect("rate limiter config with 6s period and burst 3 is valid")
}

/// Everything else: ~100 requests per minute, burst of 50.
///
/// # Panics
///
/// Never panics; the period and burst are non-zero constants.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    limiter(600, 50).expect("rate limiter config with 600ms period and burst 50 is valid")
}
