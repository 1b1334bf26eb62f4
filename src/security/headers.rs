//! Response header hardening.
//!
//! # Responsibilities
//! - Strip technology-disclosure headers (`X-Powered-By`, `Server`)
//! - Add transport, content-security, framing, sniffing and referrer headers
//! - Apply to every response, including gate rejections and proxied responses
//!
//! # Design Decisions
//! - Header set is compiled once from config; invalid CSP text fails at startup
//! - Runs as the outermost layer so nothing downstream can skip it

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::config::SecurityConfig;

const X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");

/// Compiled hardening header set.
#[derive(Debug, Clone)]
pub struct HardeningHeaders {
    enabled: bool,
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl HardeningHeaders {
    pub fn from_config(config: &SecurityConfig) -> Result<Self, header::InvalidHeaderValue> {
        let csp = HeaderValue::from_str(&config.content_security_policy)?;
        let fixed = [
            ("strict-transport-security", "max-age=31536000; includeSubDomains; preload"),
            ("x-frame-options", "DENY"),
            ("x-content-type-options", "nosniff"),
            ("referrer-policy", "strict-origin-when-cross-origin"),
            ("x-dns-prefetch-control", "off"),
            ("x-download-options", "noopen"),
            ("x-permitted-cross-domain-policies", "none"),
            ("cross-origin-opener-policy", "same-origin"),
            ("cross-origin-resource-policy", "same-origin"),
            ("origin-agent-cluster", "?1"),
            ("x-xss-protection", "0"),
        ];

        let mut headers = Vec::with_capacity(fixed.len() + 1);
        headers.push((header::CONTENT_SECURITY_POLICY, csp));
        for (name, value) in fixed {
            headers.push((HeaderName::from_static(name), HeaderValue::from_static(value)));
        }

        Ok(Self {
            enabled: config.enable_headers,
            headers,
        })
    }

    /// Harden a response header map in place.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.remove(X_POWERED_BY);
        headers.remove(header::SERVER);
        if !self.enabled {
            return;
        }
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
    }
}

/// Middleware applying [`HardeningHeaders`] to every response.
pub async fn harden_headers_middleware(
    State(headers): State<Arc<HardeningHeaders>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    headers.apply(response.headers_mut());
    response
}
