//! HTTP API 통합 테스트.
//!
//! 실제 와이어링(버퍼 + 브로드캐스터 + HTML 렌더러 + SQLite)으로 라우터를
//! 구성하고 `tower::ServiceExt::oneshot`으로 요청을 보낸다.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use futures::StreamExt;
use phoenix_core::config::WebConfig;
use phoenix_pipeline::{Broadcaster, EventBuffer, MetricsHub};
use phoenix_storage::SqliteStorage;
use phoenix_web::{AppState, HtmlRenderer, WebServer};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app() -> (Router, AppState) {
    let renderer = Arc::new(HtmlRenderer::new());
    let hub = MetricsHub::new(
        Arc::new(EventBuffer::new(1000)),
        Broadcaster::new(100),
        renderer.clone(),
    );
    let storage = SqliteStorage::open_in_memory().expect("인메모리 DB");
    let state = AppState::new(hub, Arc::new(storage), renderer, Duration::from_secs(15));
    let router = WebServer::new(state.clone(), WebConfig::default()).router();
    (router, state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn ingest_ndjson_then_read_back() {
    let (app, _) = test_app();
    let body = concat!(
        "{\"bot\":\"arb-scout\",\"latency_ms\":120,\"tx\":\"0xabc\",\"profit\":0.02}\n",
        "this is not json\n",
        "{\"bot\":\"mev-watch\",\"latency_ms\":300,\"error\":\"reverted\"}\n",
    );
    let request = Request::post("/api/logs")
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .body(Body::from(body))
        .unwrap();

    let (status, value) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["status"], "success");
    assert_eq!(value["logs_received"], 2);
    assert_eq!(value["metrics_created"], 2);

    let (_, events) = send(&app, get("/api/events/recent?limit=10")).await;
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["bot_name"], "mev-watch");
    assert_eq!(events[1]["bot_name"], "arb-scout");

    let (_, kpis) = send(&app, get("/api/kpis")).await;
    assert_eq!(kpis["avg_latency_ms"], 210);
    assert_eq!(kpis["throughput_1m"], 2);
    assert_eq!(kpis["success_rate_pct"], 50.0);

    let (_, bots) = send(&app, get("/api/bots/status")).await;
    assert_eq!(bots.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn ingest_json_array() {
    let (app, _) = test_app();
    let body = json!([
        {"bot": "a", "latency_ms": 10},
        {"bot": "b", "latency_ms": 20},
        "not an object"
    ]);
    let (status, value) = send(&app, post_json("/api/logs", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["logs_received"], 3);
    assert_eq!(value["metrics_created"], 2);
}

#[tokio::test]
async fn live_series_and_charts() {
    let (app, state) = test_app();
    state.hub.ingest((0..3).map(|i| {
        phoenix_core::models::metric::MetricEvent::new(chrono::Utc::now(), "arb-scout", 100 * i)
    }));

    let (status, live) = send(&app, get("/api/live/throughput")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(live["values"], json!([1.0, 1.0, 1.0]));
    assert_eq!(live["timestamps"].as_array().unwrap().len(), 3);

    let (_, charts) = send(&app, get("/api/charts/data")).await;
    assert_eq!(charts["metrics"].as_array().unwrap().len(), 3);
    assert_eq!(charts["kpis"]["avg_latency_ms"], 100);

    let (_, series) = send(&app, get("/api/series")).await;
    assert_eq!(series["latency"]["values"], json!([0, 100, 200]));
    assert_eq!(series["heatmap"]["rows"].as_array().unwrap().len(), 4);

    let (_, summary) = send(&app, get("/api/summary/daily")).await;
    assert_eq!(summary["total_events"], 3);
}

#[tokio::test]
async fn rental_lifecycle() {
    let (app, _) = test_app();
    let rent = json!({"bot_id": "mev-watch", "duration": "daily", "payment_method": "crypto"});

    let (status, created) = send(&app, post_json("/api/bots/rent", &rent)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["status"], "success");
    // 이벤트 없음 → 배수 0.8
    assert_eq!(created["rental"]["price"], 9.6);
    let rental_id = created["rental"]["id"].as_str().unwrap().to_string();

    let (_, list) = send(&app, get("/api/bots/rentals")).await;
    assert_eq!(list["count"], 1);
    assert_eq!(list["rentals"][0]["id"], rental_id.as_str());
    assert!(list["rentals"][0]["time_remaining"].as_i64().unwrap() > 86_000);
    assert_eq!(list["rentals"][0]["current_performance"]["success_rate"], 0.0);

    let delete = |id: &str| {
        Request::delete(format!("/api/bots/rentals/{id}"))
            .body(Body::empty())
            .unwrap()
    };
    let (status, cancelled) = send(&app, delete(&rental_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["rental_id"], rental_id.as_str());

    let (_, list) = send(&app, get("/api/bots/rentals")).await;
    assert_eq!(list["count"], 0);

    let (status, missing) = send(&app, delete("does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["status"], "error");
    assert_eq!(missing["code"], 404);
}

#[tokio::test]
async fn rent_rejects_bad_duration() {
    let (app, _) = test_app();
    let rent = json!({"bot_id": "mev-watch", "duration": "weekly", "payment_method": "crypto"});
    let (status, body) = send(&app, post_json("/api/bots/rent", &rent)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let (status, _) = send(
        &app,
        Request::post("/api/bots/rent")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rental_info_quote() {
    let (app, _) = test_app();
    let (status, info) = send(&app, get("/api/bots/chain-monitor/rental-info")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["pricing"]["base_strategy"], "monitoring");
    assert_eq!(info["pricing"]["hourly"], 0.24);
    assert_eq!(info["available"], true);
}

#[tokio::test]
async fn pages_and_health() {
    let (app, _) = test_app();

    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(page.contains("id=\"metrics\""));
    assert!(!page.contains("{{METRICS}}"));

    let response = app.clone().oneshot(get("/report")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, health) = send(&app, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");

    let (_, version) = send(&app, get("/version")).await;
    assert_eq!(version["name"], "phoenix");
}

#[tokio::test]
async fn stream_sends_ready_then_update() {
    let (app, state) = test_app();
    let response = app.oneshot(get("/stream")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );

    let mut body = response.into_body().into_data_stream();
    let first = body.next().await.unwrap().unwrap();
    let first = String::from_utf8(first.to_vec()).unwrap();
    assert!(first.contains("event: ping"));
    assert!(first.contains("data: ready"));
    assert_eq!(state.hub.broadcaster().subscriber_count(), 1);

    state
        .hub
        .ingest_one(phoenix_core::models::metric::MetricEvent::new(
            chrono::Utc::now(),
            "arb-scout",
            42,
        ));

    let mut received = String::new();
    while !received.contains("arb-scout") {
        let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        received.push_str(&String::from_utf8_lossy(&chunk));
    }
    assert!(received.contains("event: metrics_update"));

    drop(body);
    assert_eq!(state.hub.broadcaster().subscriber_count(), 0);
}

#[tokio::test]
async fn html_feeds_start_streaming() {
    let (app, state) = test_app();
    state
        .hub
        .ingest_one(phoenix_core::models::metric::MetricEvent::new(
            chrono::Utc::now(),
            "arb-scout",
            250,
        ));

    for (uri, marker) in [
        ("/events", "event-stream-start"),
        ("/logs/stream", "logs-stream-start"),
        ("/charts/mini", "charts-mini-start"),
    ] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html"));

        let mut body = response.into_body().into_data_stream();
        let first = body.next().await.unwrap().unwrap();
        assert!(String::from_utf8_lossy(&first).contains(marker), "{uri}");
    }
}
