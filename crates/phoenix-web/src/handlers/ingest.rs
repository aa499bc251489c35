//! JSON 로그 수집 핸들러.

use axum::extract::State;
use axum::Json;
use phoenix_pipeline::normalize::normalize_batch;
use serde::Serialize;
use tracing::debug;

use crate::AppState;

/// 수집 결과
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    /// 본문에서 읽은 JSON 객체 수
    pub logs_received: usize,
    /// 생성된 메트릭 이벤트 수
    pub metrics_created: usize,
}

/// POST /api/logs
///
/// 본문은 JSON 배열, 단일 객체, 또는 줄 단위 JSON. 해석할 수 없는 줄과
/// 객체는 건너뛰며 요청 전체를 실패시키지 않는다.
pub async fn ingest_logs(State(state): State<AppState>, body: String) -> Json<IngestResponse> {
    let outcome = normalize_batch(&body);
    let received = outcome.received;
    let created = state.hub.ingest(outcome.events);
    debug!("로그 수집: 수신 {received}, 생성 {created}");

    Json(IngestResponse {
        status: "success",
        logs_received: received,
        metrics_created: created,
    })
}
