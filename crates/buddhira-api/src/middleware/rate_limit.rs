//! In-memory per-IP rate limiting.
//!
//! Sliding-window limiter keyed by client IP. The health and root probes
//! are exempt so load balancers keep working. State is process-local; a
//! multi-instance deployment rate-limits per instance.

use crate::errors::ApiError;
use crate::routes::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Rate limit window.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Paths exempt from rate limiting.
const EXEMPT_PATHS: &[&str] = &["/", "/health"];

/// Sliding-window request counter per client key.
pub struct RateLimiter {
    /// Window length.
    window: Duration,

    /// Maximum requests per window.
    max_requests: usize,

    /// Request timestamps per client key.
    counts: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_requests` per `window`.
    #[must_use]
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            window,
            max_requests,
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// Record a request for `key` and return whether it is allowed.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut counts = match self.counts.lock() {
            Ok(guard) => guard,
            // A poisoned lock only means another thread panicked mid-update;
            // the map itself is still usable.
            Err(poisoned) => poisoned.into_inner(),
        };

        let entry = counts.entry(key.to_string()).or_default();
        while entry
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            entry.pop_front();
        }

        if entry.len() >= self.max_requests {
            return false;
        }

        entry.push_back(now);
        true
    }
}

/// Rate limiting middleware. Returns 429 when the client's window is full.
pub async fn enforce_rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let path = req.uri().path();
    if EXEMPT_PATHS.contains(&path) {
        return Ok(next.run(req).await);
    }

    let ip = client_ip(&req);
    if !state.rate_limiter.check(&ip) {
        tracing::warn!(
            target: "buddhira.rate_limit",
            client_ip = %ip,
            path = %path,
            "Rate limit exceeded"
        );
        return Err(ApiError::RateLimitExceeded);
    }

    Ok(next.run(req).await)
}

/// Client IP for rate limiting. Respects `X-Forwarded-For` (first hop) when
/// set by the fronting proxy, falling back to the connection peer address.
fn client_ip(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |info| info.0.ip().to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_max_requests() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 3);

        assert!(limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);

        assert!(limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.2"));
    }

    #[test]
    fn test_window_expiry_frees_capacity() {
        let limiter = RateLimiter::new(Duration::from_millis(50), 1);

        assert!(limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));

        std::thread::sleep(Duration::from_millis(60));
        assert!(limiter.check("10.0.0.1"));
    }

    #[test]
    fn test_rejected_request_does_not_consume_capacity() {
        let limiter = RateLimiter::new(Duration::from_millis(80), 2);

        assert!(limiter.check("10.0.0.1"));
        std::thread::sleep(Duration::from_millis(50));
        assert!(limiter.check("10.0.0.1"));
        // Window full; this rejection must not extend the window.
        assert!(!limiter.check("10.0.0.1"));

        // First timestamp expires; one slot frees up.
        std::thread::sleep(Duration::from_millis(40));
        assert!(limiter.check("10.0.0.1"));
    }

    #[test]
    fn test_exempt_paths() {
        assert!(EXEMPT_PATHS.contains(&"/"));
        assert!(EXEMPT_PATHS.contains(&"/health"));
        assert!(!EXEMPT_PATHS.contains(&"/me"));
    }
}
