//! API dispatcher.
//!
//! Owns the reserved API prefix exclusively: every path under it is answered
//! here, including unknown ones (JSON 404), so nothing under the prefix can
//! fall through to a front-end bundle.
//!
//! # Endpoints
//! - `GET {prefix}{health_path}`: liveness, always 200
//! - `GET {prefix}{db_health_path}`: database reachability (200 / 503 / 500)
//! - `GET {prefix}/hello`: plain-text connectivity check

pub mod database;

use axum::{
    extract::{OriginalUri, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::{ApiConfig, RoutingMode};
use crate::http::response::EdgeRejection;

pub use database::{DatabaseProbe, PostgresProbe, ProbeError};

/// State shared by the API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub mode: RoutingMode,
    pub database: Arc<dyn DatabaseProbe>,
}

#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub status: &'static str,
    pub timestamp: String,
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build the API sub-router, mounted under `config.prefix`.
pub fn api_router(config: &ApiConfig, state: ApiState) -> Router {
    let routes = Router::new()
        .route(&config.health_path, get(health))
        .route(&config.db_health_path, get(db_health))
        .route("/hello", get(hello))
        .fallback(api_not_found);

    Router::new()
        .nest(&config.prefix, routes)
        .fallback(api_not_found)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}

/// Liveness probe.
pub async fn health() -> Json<StatusBody> {
    Json(StatusBody {
        status: "OK",
        timestamp: timestamp(),
    })
}

/// Database reachability.
///
/// 503 when no database is configured, 500 when it is configured but
/// unreachable, 200 otherwise.
pub async fn db_health(State(state): State<ApiState>) -> Response {
    if !state.database.is_configured() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "Database not configured",
                "message": format!("{} env variable not set", state.mode.database_url_var()),
                "timestamp": timestamp(),
            })),
        )
            .into_response();
    }

    match state.database.test_connection().await {
        Ok(()) => Json(StatusBody {
            status: "OK",
            timestamp: timestamp(),
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Unable to connect to the database");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Database connection failed" })),
            )
                .into_response()
        }
    }
}

pub async fn hello() -> &'static str {
    "Hello from server"
}

async fn api_not_found(OriginalUri(uri): OriginalUri) -> EdgeRejection {
    EdgeRejection::ApiRouteNotFound {
        path: uri.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct FixedProbe {
        configured: bool,
        reachable: bool,
    }

    #[async_trait]
    impl DatabaseProbe for FixedProbe {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn test_connection(&self) -> Result<(), ProbeError> {
            if self.reachable {
                Ok(())
            } else {
                Err(ProbeError::Timeout {
                    timeout: std::time::Duration::from_secs(1),
                })
            }
        }
    }

    fn router(mode: RoutingMode, configured: bool, reachable: bool) -> Router {
        api_router(
            &ApiConfig::default(),
            ApiState {
                mode,
                database: Arc::new(FixedProbe { configured, reachable }),
            },
        )
    }

    async fn get_json(router: Router, path: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(router(RoutingMode::Production, false, false), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
        assert!(chrono::DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_db_health_not_configured_names_the_variable() {
        let (status, body) = get_json(router(RoutingMode::Production, false, false), "/api/db-health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Database not configured");
        assert_eq!(body["message"], "DATABASE_URL env variable not set");
        assert!(body["timestamp"].is_string());

        let (_, body) = get_json(router(RoutingMode::Development, false, false), "/api/db-health").await;
        assert_eq!(body["message"], "DEV_DATABASE_URL env variable not set");
    }

    #[tokio::test]
    async fn test_db_health_unreachable() {
        let (status, body) = get_json(router(RoutingMode::Production, true, false), "/api/db-health").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Database connection failed" }));
    }

    #[tokio::test]
    async fn test_db_health_reachable() {
        let (status, body) = get_json(router(RoutingMode::Production, true, true), "/api/db-health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
    }

    #[tokio::test]
    async fn test_unknown_api_route_is_json_404() {
        let (status, body) = get_json(router(RoutingMode::Production, false, false), "/api/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No API route for /api/nope");
    }

    #[tokio::test]
    async fn test_hello_and_cache_control() {
        let response = router(RoutingMode::Development, false, false)
            .oneshot(Request::get("/api/hello").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Hello from server");
    }
}
