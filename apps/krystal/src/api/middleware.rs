//! # Middleware Module
//!
//! Rate limiting for the Krystal HTTP API.
//!
//! - `KRYSTAL_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Environment variable holding the request rate.
pub const RATE_LIMIT_ENV: &str = "KRYSTAL_RATE_LIMIT";

const DEFAULT_RATE_LIMIT: u32 = 100;

// =============================================================================
// RATE LIMITER
// =============================================================================

/// Process-wide rate limiter.
pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Create a limiter allowing `requests_per_second`. Zero falls back to the default.
pub fn create_rate_limiter(requests_per_second: u32) -> GlobalRateLimiter {
    let rps = NonZeroU32::new(requests_per_second)
        .or(NonZeroU32::new(DEFAULT_RATE_LIMIT))
        .unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_second(rps)))
}

/// Parse a configured rate; unset or unparsable values give the default.
pub(crate) fn parse_rate_limit(value: Option<&str>) -> u32 {
    value
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(DEFAULT_RATE_LIMIT)
}

/// Requests per second from `KRYSTAL_RATE_LIMIT`.
pub fn get_rate_limit_from_env() -> u32 {
    parse_rate_limit(std::env::var(RATE_LIMIT_ENV).ok().as_deref())
}

/// Reject requests with 429 once the limiter is exhausted.
pub async fn rate_limit_middleware(
    State(limiter): State<GlobalRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    match limiter.check() {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!(path = request.uri().path(), "Rate limit exceeded");
            Err((StatusCode::TOO_MANY_REQUESTS, "Too Many Requests"))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
