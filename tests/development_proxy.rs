//! Development Mode proxying over real listeners.

use futures_util::{SinkExt, StreamExt};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

mod common;

#[tokio::test]
async fn test_react_paths_forwarded_with_prefix_intact() {
    let react = common::start_mock_upstream("react").await;
    let landing = common::start_mock_upstream("landing").await;
    let (addr, _shutdown) = common::spawn_edge(common::development_config(
        format!("http://{}", react),
        format!("http://{}", landing),
    ))
    .await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/app/src/main.tsx?t=1700000000", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-seen-forwarded-for"], "127.0.0.1");
    assert_eq!(res.text().await.unwrap(), "react:/app/src/main.tsx?t=1700000000");

    let res = client.get(format!("http://{}/app", addr)).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "react:/app");
}

#[tokio::test]
async fn test_residual_paths_go_to_landing() {
    let react = common::start_mock_upstream("react").await;
    let landing = common::start_mock_upstream("landing").await;
    let (addr, _shutdown) = common::spawn_edge(common::development_config(
        format!("http://{}", react),
        format!("http://{}", landing),
    ))
    .await;
    let client = common::client();

    for (path, expected) in [("/", "landing:/"), ("/apple", "landing:/apple"), ("/blog/post-1", "landing:/blog/post-1")] {
        let body = client
            .get(format!("http://{}{}", addr, path))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, expected);
    }
}

#[tokio::test]
async fn test_api_is_never_proxied() {
    let react = common::start_mock_upstream("react").await;
    let landing = common::start_mock_upstream("landing").await;
    let (addr, _shutdown) = common::spawn_edge(common::development_config(
        format!("http://{}", react),
        format!("http://{}", landing),
    ))
    .await;
    let client = common::client();

    let res = client.get(format!("http://{}/api/hello", addr)).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "Hello from server");

    let res = client.get(format!("http://{}/api/db-health", addr)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "DEV_DATABASE_URL env variable not set");
}

#[tokio::test]
async fn test_unreachable_dev_server_is_bad_gateway() {
    let landing = common::start_mock_upstream("landing").await;
    let (addr, _shutdown) = common::spawn_edge(common::development_config(
        common::closed_port_origin(),
        format!("http://{}", landing),
    ))
    .await;
    let client = common::client();

    let res = client.get(format!("http://{}/app/dashboard", addr)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Bad gateway");

    // The other upstream is unaffected.
    let res = client.get(format!("http://{}/about", addr)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_websocket_upgrade_is_tunnelled() {
    let react = common::start_websocket_echo().await;
    let landing = common::start_mock_upstream("landing").await;
    let (addr, _shutdown) = common::spawn_edge(common::development_config(
        format!("http://{}", react),
        format!("http://{}", landing),
    ))
    .await;

    let (mut ws, response) = tokio_tungstenite::connect_async(format!("ws://{}/app/hmr", addr))
        .await
        .expect("upgrade through the edge router");
    assert_eq!(response.status(), 101);

    for text in ["ping", "full-reload"] {
        ws.send(Message::text(text)).await.unwrap();
        let echoed = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("echo arrives")
            .unwrap()
            .unwrap();
        assert_eq!(echoed.into_text().unwrap().as_str(), text);
    }

    ws.close(None).await.unwrap();
}
