//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge
//! router. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::mode::RoutingMode;

/// Root configuration for the edge router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EdgeConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Development (upstream proxying) or Production (static serving).
    pub mode: RoutingMode,

    /// Reserved API prefix and its well-known endpoints.
    pub api: ApiConfig,

    /// Hardening headers, origin allow-list, body limits.
    pub security: SecurityConfig,

    /// Global and API-scoped rate limit windows.
    pub rate_limit: RateLimitConfig,

    /// Static bundles served in Production Mode.
    pub assets: AssetsConfig,

    /// Dev servers proxied in Development Mode.
    pub upstreams: UpstreamsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Database collaborator used by the dependency-health endpoint.
    pub database: DatabaseConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3001").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3001".to_string(),
        }
    }
}

impl ListenerConfig {
    /// Replace the port of the bind address, keeping the host.
    pub fn set_port(&mut self, port: u16) {
        let host = self
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        self.bind_address = format!("{}:{}", host, port);
    }
}

/// API prefix configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Path prefix owned exclusively by the API dispatcher.
    pub prefix: String,

    /// Liveness path, relative to the prefix. Exempt from rate limiting.
    pub health_path: String,

    /// Dependency-health path, relative to the prefix.
    pub db_health_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: "/api".to_string(),
            health_path: "/health".to_string(),
            db_health_path: "/db-health".to_string(),
        }
    }
}

impl ApiConfig {
    /// Full request path of the liveness endpoint.
    pub fn liveness_path(&self) -> String {
        format!("{}{}", self.prefix, self.health_path)
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable hardening response headers.
    pub enable_headers: bool,

    /// Content-Security-Policy value sent with every response.
    pub content_security_policy: String,

    /// Origins accepted in Production Mode (exact match).
    pub allowed_origins: Vec<String>,

    /// Take the client address from X-Forwarded-For.
    pub trust_proxy: bool,

    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

pub const DEFAULT_CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
style-src 'self' 'unsafe-inline'; \
script-src 'self' 'unsafe-inline'; \
img-src 'self' data: https:; \
font-src 'self' https: data:; \
connect-src 'self'; \
media-src 'self'; \
object-src 'none'; \
child-src 'self'; \
frame-src 'none'; \
worker-src 'self'; \
manifest-src 'self'; \
upgrade-insecure-requests";

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            content_security_policy: DEFAULT_CONTENT_SECURITY_POLICY.to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:4321".to_string(),
                "http://localhost:3001".to_string(),
            ],
            trust_proxy: false,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Window applied to every request.
    pub global: WindowConfig,

    /// Window applied only to requests under the API prefix.
    pub api: WindowConfig,

    /// How often expired client counters are swept, in seconds.
    pub sweep_interval_secs: u64,
}

/// A fixed rate-limit window.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct WindowConfig {
    /// Window length in milliseconds.
    pub window_ms: u64,

    /// Requests allowed per client within one window.
    pub max_requests: u32,
}

const FIFTEEN_MINUTES_MS: u64 = 15 * 60 * 1000;

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            global: WindowConfig {
                window_ms: FIFTEEN_MINUTES_MS,
                max_requests: 100,
            },
            api: WindowConfig {
                window_ms: FIFTEEN_MINUTES_MS,
                max_requests: 50,
            },
            sweep_interval_secs: 60,
        }
    }
}

/// Static bundle locations (Production Mode).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// React single-page application bundle.
    pub react: StaticTreeConfig,

    /// Landing site bundle, mounted at the root.
    pub landing: StaticTreeConfig,
}

/// One static tree.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticTreeConfig {
    /// Mount prefix (e.g., "/app" or "/").
    pub mount_prefix: String,

    /// Directory holding the built assets.
    pub root: PathBuf,

    /// Entry document, relative to `root`.
    #[serde(default = "default_fallback_document")]
    pub fallback_document: PathBuf,
}

fn default_fallback_document() -> PathBuf {
    PathBuf::from("index.html")
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            react: StaticTreeConfig {
                mount_prefix: "/app".to_string(),
                root: PathBuf::from("app/dist"),
                fallback_document: default_fallback_document(),
            },
            landing: StaticTreeConfig {
                mount_prefix: "/".to_string(),
                root: PathBuf::from("landing/dist"),
                fallback_document: default_fallback_document(),
            },
        }
    }
}

/// Dev server origins (Development Mode).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamsConfig {
    /// React dev server (Vite).
    pub react: UpstreamConfig,

    /// Landing dev server (Astro).
    pub landing: UpstreamConfig,
}

/// One upstream dev origin.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Path prefix routed to this origin.
    pub path_prefix: String,

    /// Origin URL (scheme, host, port).
    pub origin: String,

    /// Forward protocol-upgrade requests (hot-reload sockets).
    #[serde(default = "default_true")]
    pub websocket: bool,
}

fn default_true() -> bool {
    true
}

impl Default for UpstreamsConfig {
    fn default() -> Self {
        Self {
            react: UpstreamConfig {
                path_prefix: "/app".to_string(),
                origin: "http://localhost:5173".to_string(),
                websocket: true,
            },
            landing: UpstreamConfig {
                path_prefix: "/".to_string(),
                origin: "http://localhost:4321".to_string(),
                websocket: true,
            },
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time until response headers) in seconds.
    pub request_secs: u64,

    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for an upstream to produce response headers, in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            connect_secs: 5,
            upstream_secs: 25,
        }
    }
}

/// Database collaborator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL. `None` means the database is not wired up.
    pub url: Option<String>,

    /// Connectivity probe timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            connect_timeout_secs: 3,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
