//! Origin allow-list and CORS response headers.

use axum::http::{header, HeaderMap, HeaderValue, Method};
use std::collections::HashSet;

use crate::config::RoutingMode;

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization, X-Requested-With";
const PREFLIGHT_MAX_AGE_SECS: u64 = 86_400;

/// Result of checking a request's declared origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginDecision {
    /// No `Origin` header: non-browser client, always accepted.
    NoOrigin,
    /// Accepted; the value is echoed back in `Access-Control-Allow-Origin`.
    Allowed(HeaderValue),
    /// Present, not allow-listed, and the mode enforces the list.
    Rejected(String),
}

/// Exact-match origin allow-list, enforced only in Production Mode.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: HashSet<String>,
    mode: RoutingMode,
}

impl OriginPolicy {
    pub fn new(allowed: impl IntoIterator<Item = String>, mode: RoutingMode) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
            mode,
        }
    }

    pub fn is_listed(&self, origin: &str) -> bool {
        self.allowed.contains(origin)
    }

    pub fn check(&self, origin: Option<&HeaderValue>) -> OriginDecision {
        let Some(value) = origin else {
            return OriginDecision::NoOrigin;
        };
        let text = String::from_utf8_lossy(value.as_bytes()).into_owned();
        if self.is_listed(&text) || !self.mode.is_production() {
            OriginDecision::Allowed(value.clone())
        } else {
            OriginDecision::Rejected(text)
        }
    }
}

/// True for a CORS preflight: `OPTIONS` carrying `Access-Control-Request-Method`.
pub fn is_preflight(method: &Method, headers: &HeaderMap) -> bool {
    method == Method::OPTIONS && headers.contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}

/// Headers added to every response for an accepted origin.
pub fn cors_headers(origin: HeaderValue, target: &mut HeaderMap) {
    target.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    target.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    target.append(header::VARY, HeaderValue::from_static("Origin"));
}

/// Extra headers for a preflight answer.
pub fn preflight_headers(target: &mut HeaderMap) {
    target.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    target.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    target.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from(PREFLIGHT_MAX_AGE_SECS),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(mode: RoutingMode) -> OriginPolicy {
        OriginPolicy::new(vec!["https://panda.example".to_string()], mode)
    }

    #[test]
    fn test_no_origin_always_passes() {
        assert_eq!(policy(RoutingMode::Production).check(None), OriginDecision::NoOrigin);
        assert_eq!(policy(RoutingMode::Development).check(None), OriginDecision::NoOrigin);
    }

    #[test]
    fn test_production_is_exact_match() {
        let policy = policy(RoutingMode::Production);
        let listed = HeaderValue::from_static("https://panda.example");
        assert_eq!(policy.check(Some(&listed)), OriginDecision::Allowed(listed.clone()));

        for near_miss in [
            "https://panda.example.evil.com",
            "https://panda.example:8443",
            "http://panda.example",
            "https://PANDA.example",
        ] {
            let value = HeaderValue::from_static(near_miss);
            assert_eq!(
                policy.check(Some(&value)),
                OriginDecision::Rejected(near_miss.to_string()),
                "{}",
                near_miss
            );
        }
    }

    #[test]
    fn test_development_accepts_everyone() {
        let value = HeaderValue::from_static("http://192.168.1.20:5173");
        assert_eq!(
            policy(RoutingMode::Development).check(Some(&value)),
            OriginDecision::Allowed(value.clone())
        );
    }

    #[test]
    fn test_preflight_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_preflight(&Method::OPTIONS, &headers));
        headers.insert(header::ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("POST"));
        assert!(is_preflight(&Method::OPTIONS, &headers));
        assert!(!is_preflight(&Method::GET, &headers));
    }
}
