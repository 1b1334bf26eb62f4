//! Terminal error responses.
//!
//! # Responsibilities
//! - Map every classified failure to a status code and a JSON body
//! - Carry the retry hint for rate-limit rejections
//! - Map upstream errors to gateway status codes
//!
//! # Design Decisions
//! - One enum for every failure a request can end in; handlers never build
//!   ad-hoc error bodies
//! - Upstream timeouts result in 504 Gateway Timeout, other upstream
//!   failures in 502 Bad Gateway

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::security::rate_limit::LimitScope;

/// A request that ends before (or instead of) reaching a content handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EdgeRejection {
    #[error("origin {origin:?} not allowed by CORS")]
    OriginNotAllowed { origin: String },

    #[error("rate limit exceeded ({scope:?}), retry after {retry_after_secs}s")]
    RateLimited { scope: LimitScope, retry_after_secs: u64 },

    #[error("upstream {target} unreachable: {reason}")]
    UpstreamUnavailable { target: &'static str, reason: String },

    #[error("upstream {target} timed out")]
    UpstreamTimeout { target: &'static str },

    #[error("no API route for {path}")]
    ApiRouteNotFound { path: String },

    #[error("no route for {path}")]
    Unrouted { path: String },
}

impl EdgeRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            EdgeRejection::OriginNotAllowed { .. } => StatusCode::FORBIDDEN,
            EdgeRejection::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            EdgeRejection::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
            EdgeRejection::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            EdgeRejection::ApiRouteNotFound { .. } | EdgeRejection::Unrouted { .. } => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for EdgeRejection {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            EdgeRejection::OriginNotAllowed { .. } => {
                (status, Json(json!({ "error": "Not allowed by CORS" }))).into_response()
            }
            EdgeRejection::RateLimited { scope, retry_after_secs } => {
                let body = Json(json!({
                    "error": scope.message(),
                    "retryAfter": format!("{} seconds", retry_after_secs),
                }));
                let mut response = (status, body).into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
            EdgeRejection::UpstreamUnavailable { target, .. } => (
                status,
                Json(json!({
                    "error": "Bad gateway",
                    "message": format!("The {} dev server is not reachable", target),
                })),
            )
                .into_response(),
            EdgeRejection::UpstreamTimeout { target } => (
                status,
                Json(json!({
                    "error": "Gateway timeout",
                    "message": format!("The {} dev server did not respond in time", target),
                })),
            )
                .into_response(),
            EdgeRejection::ApiRouteNotFound { path } => (
                status,
                Json(json!({ "error": "Not found", "message": format!("No API route for {}", path) })),
            )
                .into_response(),
            EdgeRejection::Unrouted { .. } => (status, Json(json!({ "error": "Not found" }))).into_response(),
        }
    }
}
