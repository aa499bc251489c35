//! 헬스 체크, 버전.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// 헬스 체크 응답
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// 프로세스 가동 시간 (초)
    pub uptime_secs: i64,
    /// 버퍼에 있는 이벤트 수
    pub buffered_events: usize,
    /// 현재 SSE 구독자 수
    pub subscribers: usize,
}

/// 버전 응답
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub name: &'static str,
    pub version: &'static str,
}

/// GET /health, GET /healthz
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        buffered_events: state.hub.buffer().len(),
        subscribers: state.hub.broadcaster().subscriber_count(),
    })
}

/// GET /version
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: "phoenix",
        version: env!("CARGO_PKG_VERSION"),
    })
}
