//! HTTP middleware stack for the storefront API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID
//! 4. CORS (`ALLOWED_ORIGINS`)
//! 5. Security headers
//! 6. Rate limiting (governor, per route group)
//!
//! Admin authorization is an extractor ([`RequireAdmin`]) rather than a
//! layer so each handler states its own requirement.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{AdminPolicy, EmailAllowList, Principal, RequireAdmin};
pub use rate_limit::{
    api_rate_limiter, catalog_rate_limiter, checkout_rate_limiter, revalidate_rate_limiter,
};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
