//! Production Mode routing over a real listener.

use reqwest::StatusCode;
use serde_json::Value;

mod common;

#[tokio::test]
async fn test_client_side_routes_get_react_entry_document() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _shutdown) = common::spawn_edge(common::production_config(dir.path())).await;
    let client = common::client();

    for path in ["/app", "/app/", "/app/dashboard", "/app/settings/profile?tab=2"] {
        let res = client.get(format!("http://{}{}", addr, path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{}", path);
        assert_eq!(res.text().await.unwrap(), common::REACT_INDEX, "{}", path);
    }
}

#[tokio::test]
async fn test_everything_else_gets_landing() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _shutdown) = common::spawn_edge(common::production_config(dir.path())).await;
    let client = common::client();

    for path in ["/", "/pricing", "/apple", "/docs/getting-started"] {
        let res = client.get(format!("http://{}{}", addr, path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{}", path);
        assert_eq!(res.text().await.unwrap(), common::LANDING_INDEX, "{}", path);
    }

    let res = client.get(format!("http://{}/blog/", addr)).send().await.unwrap();
    assert!(res.text().await.unwrap().contains("<title>blog</title>"));
}

#[tokio::test]
async fn test_assets_served_with_precise_mime_types() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _shutdown) = common::spawn_edge(common::production_config(dir.path())).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/app/assets/index-3f2a.js", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()["content-type"],
        "application/javascript; charset=utf-8"
    );
    assert_eq!(res.text().await.unwrap(), common::REACT_SCRIPT);

    let res = client
        .get(format!("http://{}/app/assets/index-3f2a.css", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["content-type"], "text/css; charset=utf-8");
}

#[tokio::test]
async fn test_api_prefix_wins_over_static_trees() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _shutdown) = common::spawn_edge(common::production_config(dir.path())).await;
    let client = common::client();

    let res = client.get(format!("http://{}/api/health", addr)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["cache-control"], "no-store");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "OK");

    let res = client.get(format!("http://{}/api/unknown", addr)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Not found");

    let res = client.get(format!("http://{}/api/db-health", addr)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "DATABASE_URL env variable not set");
}

#[tokio::test]
async fn test_hardening_headers_on_static_responses() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _shutdown) = common::spawn_edge(common::production_config(dir.path())).await;

    let res = common::client()
        .get(format!("http://{}/app/dashboard", addr))
        .send()
        .await
        .unwrap();
    let headers = res.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers["content-security-policy"]
        .to_str()
        .unwrap()
        .contains("default-src 'self'"));
    assert!(headers.contains_key("strict-transport-security"));
    assert!(headers.contains_key("x-request-id"));
    assert!(!headers.contains_key("x-powered-by"));
}

#[tokio::test]
async fn test_mode_is_fixed_even_with_live_dev_servers() {
    let react = common::start_mock_upstream("react").await;
    let landing = common::start_mock_upstream("landing").await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = common::production_config(dir.path());
    config.upstreams.react.origin = format!("http://{}", react);
    config.upstreams.landing.origin = format!("http://{}", landing);
    let (addr, _shutdown) = common::spawn_edge(config).await;
    let client = common::client();

    for _ in 0..3 {
        let body = client
            .get(format!("http://{}/app/dashboard", addr))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, common::REACT_INDEX);
    }
}

#[tokio::test]
async fn test_shutdown_stops_the_listener() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, shutdown) = common::spawn_edge(common::production_config(dir.path())).await;
    let client = common::client();

    let res = client.get(format!("http://{}/", addr)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    shutdown.trigger();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let fresh = common::client();
    assert!(fresh.get(format!("http://{}/", addr)).send().await.is_err());
}
