//! Forwarding to the development servers.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the upstream origin, path unchanged
//! - Strip hop-by-hop headers, add X-Forwarded-*
//! - Stream bodies in both directions
//! - Hand protocol-upgrade requests to the tunnel
//! - Map connection failures to 502 and slow upstreams to 504
//!
//! # Design Decisions
//! - No retries: each request is independent, failures surface immediately
//! - The original Host header is preserved
//! - Dropping the handler future (client went away) drops the upstream request

use axum::{
    body::Body,
    http::{
        header, uri::PathAndQuery, HeaderMap, HeaderName, HeaderValue, Request, StatusCode, Uri,
        Version,
    },
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::Duration;
use tokio::time;

use crate::config::{EdgeConfig, UpstreamConfig};
use crate::http::request::ClientAddress;
use crate::http::response::EdgeRejection;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::proxy::upgrade;
use crate::routing::Bundle;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("upstream origin {origin:?} is invalid: {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error("cannot build upstream URI: {0}")]
    Uri(#[from] axum::http::Error),
}

/// One development server.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    pub bundle: Bundle,
    pub path_prefix: String,
    pub origin: Uri,
    pub supports_upgrade: bool,
}

impl UpstreamTarget {
    pub fn from_config(bundle: Bundle, config: &UpstreamConfig) -> Result<Self, ProxyError> {
        let invalid = |reason: &str| ProxyError::InvalidOrigin {
            origin: config.origin.clone(),
            reason: reason.to_string(),
        };
        let origin: Uri = config.origin.parse().map_err(|_| invalid("not a URI"))?;
        if origin.scheme().is_none() || origin.authority().is_none() {
            return Err(invalid("scheme and host are required"));
        }
        if origin.path() != "/" && !origin.path().is_empty() {
            return Err(invalid("origins carry no path"));
        }

        Ok(Self {
            bundle,
            path_prefix: config.path_prefix.clone(),
            origin,
            supports_upgrade: config.websocket,
        })
    }

    pub fn name(&self) -> &'static str {
        self.bundle.as_str()
    }

    /// The upstream URI for a request: origin scheme and authority, original
    /// path and query.
    pub fn upstream_uri(&self, original: &Uri) -> Result<Uri, ProxyError> {
        let path_and_query = original
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));
        let mut builder = Uri::builder().path_and_query(path_and_query);
        if let Some(scheme) = self.origin.scheme() {
            builder = builder.scheme(scheme.clone());
        }
        if let Some(authority) = self.origin.authority() {
            builder = builder.authority(authority.clone());
        }
        Ok(builder.build()?)
    }
}

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();
    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Development Mode proxy to the React and landing dev servers.
pub struct DevProxy {
    client: Client<HttpConnector, Body>,
    react: UpstreamTarget,
    landing: UpstreamTarget,
    response_timeout: Duration,
    shutdown: Shutdown,
}

impl DevProxy {
    pub fn from_config(config: &EdgeConfig, shutdown: Shutdown) -> Result<Self, ProxyError> {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            react: UpstreamTarget::from_config(Bundle::React, &config.upstreams.react)?,
            landing: UpstreamTarget::from_config(Bundle::Landing, &config.upstreams.landing)?,
            response_timeout: Duration::from_secs(config.timeouts.upstream_secs),
            shutdown,
        })
    }

    pub fn target(&self, bundle: Bundle) -> &UpstreamTarget {
        match bundle {
            Bundle::React => &self.react,
            Bundle::Landing => &self.landing,
        }
    }

    /// Forward `request` to the dev server for `bundle`.
    pub async fn forward(&self, bundle: Bundle, mut request: Request<Body>) -> Response {
        let target = self.target(bundle);
        let upgrading = target.supports_upgrade && upgrade::is_upgrade_request(request.headers());
        let client_upgrade = upgrading.then(|| hyper::upgrade::on(&mut request));

        let upstream_request = match self.prepare(target, request, upgrading) {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(upstream = target.name(), error = %e, "Failed to build upstream request");
                metrics::record_upstream_failure(target.name(), "request");
                return EdgeRejection::UpstreamUnavailable {
                    target: target.name(),
                    reason: e.to_string(),
                }
                .into_response();
            }
        };

        let result = time::timeout(self.response_timeout, self.client.request(upstream_request)).await;
        let mut response = match result {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!(upstream = target.name(), origin = %target.origin, error = %e, "Upstream error");
                metrics::record_upstream_failure(target.name(), "connect");
                return EdgeRejection::UpstreamUnavailable {
                    target: target.name(),
                    reason: e.to_string(),
                }
                .into_response();
            }
            Err(_) => {
                tracing::error!(upstream = target.name(), timeout = ?self.response_timeout, "Upstream timed out");
                metrics::record_upstream_failure(target.name(), "timeout");
                return EdgeRejection::UpstreamTimeout { target: target.name() }.into_response();
            }
        };

        if let Some(client_upgrade) = client_upgrade {
            if response.status() == StatusCode::SWITCHING_PROTOCOLS {
                let upstream_upgrade = hyper::upgrade::on(&mut response);
                upgrade::spawn_tunnel(target.name(), client_upgrade, upstream_upgrade, &self.shutdown);
                let (parts, _) = response.into_parts();
                return Response::from_parts(parts, Body::empty());
            }
        }

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Response::from_parts(parts, Body::new(body))
    }

    fn prepare(&self, target: &UpstreamTarget, request: Request<Body>, upgrading: bool) -> Result<Request<Body>, ProxyError> {
        let client = request
            .extensions()
            .get::<ClientAddress>()
            .map(|ClientAddress(addr)| addr.clone());
        let (parts, body) = request.into_parts();

        let mut headers = parts.headers;
        let upgrade_header = headers.get(header::UPGRADE).cloned();
        strip_hop_by_hop(&mut headers);
        if upgrading {
            if let Some(protocol) = upgrade_header {
                headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
                headers.insert(header::UPGRADE, protocol);
            }
        }
        add_forwarded_headers(&mut headers, client.as_deref());

        let mut upstream = Request::builder()
            .method(parts.method)
            .uri(target.upstream_uri(&parts.uri)?)
            .version(Version::HTTP_11)
            .body(if upgrading { Body::empty() } else { body })?;
        *upstream.headers_mut() = headers;
        Ok(upstream)
    }
}

fn add_forwarded_headers(headers: &mut HeaderMap, client: Option<&str>) {
    if let Some(client) = client {
        let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{}, {}", existing, client),
            None => client.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }
    if let Some(host) = headers.get(header::HOST).cloned() {
        headers.entry(X_FORWARDED_HOST).or_insert(host);
    }
    headers
        .entry(X_FORWARDED_PROTO)
        .or_insert(HeaderValue::from_static("http"));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(origin: &str) -> UpstreamTarget {
        UpstreamTarget::from_config(
            Bundle::React,
            &UpstreamConfig {
                path_prefix: "/app".to_string(),
                origin: origin.to_string(),
                websocket: true,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_upstream_uri_keeps_path_and_query() {
        let target = target("http://localhost:5173");
        let uri: Uri = "/app/src/main.tsx?t=123".parse().unwrap();
        assert_eq!(
            target.upstream_uri(&uri).unwrap().to_string(),
            "http://localhost:5173/app/src/main.tsx?t=123"
        );
    }

    #[test]
    fn test_origin_validation() {
        let config = |origin: &str| UpstreamConfig {
            path_prefix: "/".to_string(),
            origin: origin.to_string(),
            websocket: true,
        };
        assert!(UpstreamTarget::from_config(Bundle::Landing, &config("http://localhost:4321")).is_ok());
        assert!(UpstreamTarget::from_config(Bundle::Landing, &config("localhost:4321")).is_err());
        assert!(UpstreamTarget::from_config(Bundle::Landing, &config("http://localhost:4321/site")).is_err());
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-debug"));
        headers.insert("x-debug", HeaderValue::from_static("1"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::ACCEPT));
    }

    #[test]
    fn test_forwarded_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("localhost:3001"));
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("203.0.113.1"));

        add_forwarded_headers(&mut headers, Some("10.0.0.2"));

        assert_eq!(headers[X_FORWARDED_FOR], "203.0.113.1, 10.0.0.2");
        assert_eq!(headers[X_FORWARDED_HOST], "localhost:3001");
        assert_eq!(headers[X_FORWARDED_PROTO], "http");
    }
}
