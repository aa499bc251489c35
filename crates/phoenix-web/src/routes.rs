//! 라우트 정의.

use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use phoenix_core::config::WebConfig;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::embedded;
use crate::error::panic_response;
use crate::handlers;
use crate::AppState;

/// API 라우트 생성 (`/api` 아래에 중첩)
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // 이벤트/집계
        .route("/events/recent", get(handlers::metrics::recent_events))
        .route("/kpis", get(handlers::metrics::get_kpis))
        .route("/summary/daily", get(handlers::metrics::daily_summary))
        .route("/series", get(handlers::metrics::get_series))
        .route("/live/{metric}", get(handlers::metrics::live_metric))
        .route("/charts/data", get(handlers::metrics::charts_data))
        .route("/bots/status", get(handlers::metrics::bots_status))
        // 수집
        .route("/logs", post(handlers::ingest::ingest_logs))
        // 렌탈
        .route("/bots/rent", post(handlers::rentals::rent_bot))
        .route("/bots/rentals", get(handlers::rentals::list_rentals))
        .route(
            "/bots/rentals/{rental_id}",
            delete(handlers::rentals::cancel_rental),
        )
        .route(
            "/bots/{bot_id}/rental-info",
            get(handlers::rentals::rental_info),
        )
}

/// 전체 라우터 구성
pub fn build_router(state: AppState, config: &WebConfig) -> Router {
    Router::new()
        .route("/", get(handlers::dashboard::index))
        .route("/report", get(handlers::dashboard::report))
        .route("/stream", get(handlers::stream::event_stream))
        .route("/events", get(handlers::feeds::event_feed))
        .route("/logs/stream", get(handlers::feeds::log_feed))
        .route("/charts/mini", get(handlers::feeds::mini_chart_feed))
        .route("/health", get(handlers::health::health))
        .route("/healthz", get(handlers::health::health))
        .route("/version", get(handlers::health::version))
        .nest("/api", api_routes())
        .fallback(embedded::serve_static)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 설정 기반 CORS
fn cors_layer(config: &WebConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if config.cors_allow_all {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("잘못된 CORS origin 무시: {origin}");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_state;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn cors_allows_configured_origin_only() {
        let app = build_router(test_state(), &WebConfig::default());
        let response = app
            .clone()
            .oneshot(
                Request::get("/api/kpis")
                    .header(header::ORIGIN, "http://localhost:8000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "http://localhost:8000"
        );

        let response = app
            .oneshot(
                Request::get("/api/kpis")
                    .header(header::ORIGIN, "http://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn cors_allow_all() {
        let config = WebConfig {
            cors_allow_all: true,
            ..WebConfig::default()
        };
        let response = build_router(test_state(), &config)
            .oneshot(
                Request::get("/health")
                    .header(header::ORIGIN, "http://anywhere.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn unknown_route_falls_back_to_404() {
        let response = build_router(test_state(), &WebConfig::default())
            .oneshot(Request::get("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
