//! Integration tests for the HTTP API
//!
//! Requests go straight through the router with `oneshot`, no socket needed.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use common::{scheduler_for, HistoryRow, Profile};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use youknow::api::create_api_router;
use youknow::collector::CollectionScheduler;
use youknow::config::{FrontendConfig, StoreConfig};

fn no_frontend() -> FrontendConfig {
    FrontendConfig { static_dir: None }
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn app_for(scheduler: &Arc<CollectionScheduler>) -> Router {
    create_api_router(Arc::clone(scheduler), no_frontend())
}

#[tokio::test]
async fn test_health() {
    let profile = Profile::empty();
    let scheduler = Arc::new(scheduler_for(&profile, StoreConfig::memory()));

    let (status, json) = get(app_for(&scheduler), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "youknow-backend");
}

#[tokio::test]
async fn test_dashboard_fallback_without_source() {
    let profile = Profile::empty();
    let scheduler = Arc::new(scheduler_for(&profile, StoreConfig::memory()));

    let (status, json) = get(app_for(&scheduler), "/api/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    let expected = serde_json::to_value(youknow::analytics::fallback_payload()).unwrap();
    assert_eq!(json, expected);
}

#[tokio::test]
async fn test_dashboard_shape_and_bad_days() {
    let profile = Profile::with_rows(&[
        HistoryRow::visit("https://github.com/a", 1),
        HistoryRow::visit("https://www.google.com/search?q=rust+ownership&foo=1", 2),
        HistoryRow::visit("https://docs.rs/serde", 3),
    ])
    .await;
    let scheduler = Arc::new(scheduler_for(&profile, StoreConfig::memory()));
    scheduler.start().await;

    for uri in ["/api/dashboard", "/api/dashboard?days=abc", "/api/dashboard?days=99999"] {
        let (status, json) = get(app_for(&scheduler), uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");

        for key in [
            "top_domains",
            "top_searches",
            "focus",
            "golden_hours",
            "sessions",
            "trends",
            "chains",
            "interests",
        ] {
            assert!(json.get(key).is_some(), "missing {key} for {uri}");
        }

        assert_eq!(json["golden_hours"].as_object().unwrap().len(), 10);
        assert_eq!(json["top_searches"][0]["q"], "rust ownership");
        assert_eq!(json["top_searches"][0]["count"], 1);
        assert_eq!(json["trends"]["docs_min_delta_pct"], 0);
    }

    scheduler.stop().await;
}

#[tokio::test]
async fn test_refresh_and_status() {
    let profile = Profile::with_rows(&[HistoryRow::visit("https://github.com/a", 1)]).await;
    let scheduler = Arc::new(scheduler_for(&profile, StoreConfig::memory()));

    let (_, before) = get(app_for(&scheduler), "/api/status").await;
    assert_eq!(before["data_collection_running"], false);
    assert!(before["last_collection_time"].is_null());
    assert_eq!(before["influxdb_connected"], false);

    let (status, json) = get(app_for(&scheduler), "/api/refresh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert!(json["message"].is_string());

    let (_, after) = get(app_for(&scheduler), "/api/status").await;
    let stamp = after["last_collection_time"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
}

#[tokio::test]
async fn test_chrome_test_report() {
    let profile = Profile::with_rows(&[HistoryRow::visit("https://github.com/a", 1)]).await;
    let scheduler = Arc::new(scheduler_for(&profile, StoreConfig::memory()));

    let (status, json) = get(app_for(&scheduler), "/api/chrome-test").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["chrome_history"]["access_test"], true);
    assert_eq!(json["chrome_history"]["info"]["accessible"], true);
    assert_eq!(json["chrome_history"]["info"]["sample_count"], 1);
    assert_eq!(json["chrome_history"]["info"]["sample_domains"][0], "github.com");
    assert!(json["influxdb"].is_null());
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_chrome_test_without_source() {
    let profile = Profile::empty();
    let scheduler = Arc::new(scheduler_for(&profile, StoreConfig::memory()));

    let (status, json) = get(app_for(&scheduler), "/api/chrome-test").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["chrome_history"]["access_test"], false);
    assert_eq!(json["chrome_history"]["info"]["accessible"], false);
    assert_eq!(json["chrome_history"]["info"]["sample_count"], 0);
}

#[tokio::test]
async fn test_static_frontend_with_spa_fallback() {
    let site = TempDir::new().unwrap();
    std::fs::write(site.path().join("index.html"), "<html>dashboard</html>").unwrap();
    std::fs::write(site.path().join("app.js"), "console.log(1)").unwrap();

    let profile = Profile::empty();
    let scheduler = Arc::new(scheduler_for(&profile, StoreConfig::memory()));
    let frontend = FrontendConfig {
        static_dir: Some(site.path().display().to_string()),
    };

    let body_of = |uri: &'static str| {
        let app = create_api_router(Arc::clone(&scheduler), frontend.clone());
        async move {
            let response = app
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            (status, String::from_utf8(body.to_vec()).unwrap())
        }
    };

    let (status, body) = body_of("/app.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "console.log(1)");

    let (status, body) = body_of("/insights/week").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("dashboard"));

    // API routes are not shadowed by the frontend
    let (status, body) = body_of("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("healthy"));
}
