//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::{body::Body, http::Request, response::IntoResponse, Router};
use edge_router::config::{EdgeConfig, RoutingMode};
use edge_router::{EdgeServer, Shutdown};
use futures_util::{SinkExt, StreamExt};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;

pub const REACT_INDEX: &str = "<!doctype html><title>react app</title><div id=\"root\"></div>";
pub const LANDING_INDEX: &str = "<!doctype html><title>landing</title>";
pub const REACT_SCRIPT: &str = "export const answer = 42;";

/// Start the edge router on an ephemeral port.
pub async fn spawn_edge(config: EdgeConfig) -> (SocketAddr, Shutdown) {
    let shutdown = Shutdown::new();
    let server = EdgeServer::new(config, shutdown.clone()).expect("server builds");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });
    (addr, shutdown)
}

/// Start a mock dev server answering `"{name}:{path?query}"` and echoing the
/// forwarded-for header it received.
pub async fn start_mock_upstream(name: &'static str) -> SocketAddr {
    let app = Router::new().fallback(move |request: Request<Body>| async move {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = format!("{}:{}", name, request.uri());
        ([("x-seen-forwarded-for", forwarded)], body).into_response()
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a WebSocket server that echoes text and binary frames.
pub async fn start_websocket_echo() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(message)) = ws.next().await {
                    if (message.is_text() || message.is_binary()) && ws.send(message).await.is_err() {
                        break;
                    }
                }
            });
        }
    });
    addr
}

/// An address nothing listens on.
pub fn closed_port_origin() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

/// Write a React and a landing bundle under `dir`.
pub fn write_bundles(dir: &Path) {
    let react = dir.join("app/dist");
    let landing = dir.join("landing/dist");
    fs::create_dir_all(react.join("assets")).unwrap();
    fs::create_dir_all(landing.join("blog")).unwrap();
    fs::write(react.join("index.html"), REACT_INDEX).unwrap();
    fs::write(react.join("assets/index-3f2a.js"), REACT_SCRIPT).unwrap();
    fs::write(react.join("assets/index-3f2a.css"), "body{margin:0}").unwrap();
    fs::write(landing.join("index.html"), LANDING_INDEX).unwrap();
    fs::write(landing.join("blog/index.html"), "<!doctype html><title>blog</title>").unwrap();
}

pub fn production_config(dir: &Path) -> EdgeConfig {
    write_bundles(dir);
    let mut config = EdgeConfig {
        mode: RoutingMode::Production,
        ..Default::default()
    };
    config.assets.react.root = dir.join("app/dist");
    config.assets.landing.root = dir.join("landing/dist");
    config
}

pub fn development_config(react_origin: String, landing_origin: String) -> EdgeConfig {
    let mut config = EdgeConfig {
        mode: RoutingMode::Development,
        ..Default::default()
    };
    config.upstreams.react.origin = react_origin;
    config.upstreams.landing.origin = landing_origin;
    config
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
