//! HTTP middleware: authentication, rate limiting, request logging.

mod auth;
mod rate_limit;
mod request_log;

pub use auth::{require_auth, AuthState};
pub use rate_limit::{enforce_rate_limit, RateLimiter, RATE_LIMIT_WINDOW};
pub use request_log::log_requests;
