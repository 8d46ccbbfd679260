//! Per-request logging middleware.
//!
//! Emits one structured log line per request: path, method, user id,
//! status, and latency. The user id is peeked from the bearer payload
//! WITHOUT verification and is for log correlation only; authorization
//! decisions always go through the verified principal.

use axum::{extract::Request, middleware::Next, response::Response};
use common::jwt::unverified_subject;
use std::time::Instant;

/// Log every request with its outcome and latency.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let user_id = bearer_subject(&req).unwrap_or_else(|| "anon".to_string());

    let response = next.run(req).await;

    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    tracing::info!(
        target: "buddhira.http",
        method = %method,
        path = %path,
        user_id = %user_id,
        status = response.status().as_u16(),
        latency_ms,
        "request"
    );

    response
}

/// Unverified subject from the Authorization header, if any.
fn bearer_subject(req: &Request) -> Option<String> {
    let auth = req.headers().get("authorization")?.to_str().ok()?;
    let token = auth.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    unverified_subject(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    fn request_with_auth(value: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/api/items");
        if let Some(v) = value {
            builder = builder.header("authorization", v);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn token_with_sub(sub: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"ES256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{sub}"}}"#));
        format!("{header}.{payload}.sig")
    }

    #[test]
    fn test_bearer_subject_extracted() {
        let token = token_with_sub("user-7");
        let req = request_with_auth(Some(&format!("Bearer {token}")));
        assert_eq!(bearer_subject(&req), Some("user-7".to_string()));
    }

    #[test]
    fn test_no_header_means_no_subject() {
        let req = request_with_auth(None);
        assert_eq!(bearer_subject(&req), None);
    }

    #[test]
    fn test_non_bearer_scheme_ignored() {
        let req = request_with_auth(Some("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_subject(&req), None);
    }

    #[test]
    fn test_empty_token_ignored() {
        let req = request_with_auth(Some("Bearer "));
        assert_eq!(bearer_subject(&req), None);
    }
}
