//! 메트릭 조회 API 핸들러.

use axum::extract::{Path, Query, State};
use axum::Json;
use phoenix_core::models::metric::MetricEvent;
use phoenix_pipeline::buffer::{
    BotHealth, DailySummary, Heatmap, Kpis, LiveMetric, LiveSeries, Series, DEFAULT_HEATMAP_COLS,
    DEFAULT_LIVE_LEN, DEFAULT_RECENT, DEFAULT_SERIES_LEN, DEFAULT_THROUGHPUT_MINUTES,
};
use serde::Serialize;

use crate::AppState;

use super::LimitQuery;

/// 차트 데이터에 포함할 이벤트 수
const CHART_EVENTS: usize = 100;

/// 시계열 묶음 응답
#[derive(Debug, Serialize)]
pub struct SeriesResponse {
    pub latency: Series<u64>,
    pub throughput: Series<usize>,
    pub profit: Series<f64>,
    pub heatmap: Heatmap,
}

/// 차트 초기 데이터 응답
#[derive(Debug, Serialize)]
pub struct ChartsDataResponse {
    /// 최근 이벤트 (최신 순)
    pub metrics: Vec<MetricEvent>,
    pub kpis: Kpis,
}

/// 최근 이벤트 (최신 순)
///
/// GET /api/events/recent?limit=
pub async fn recent_events(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> Json<Vec<MetricEvent>> {
    Json(state.hub.buffer().recent(params.limit_or(DEFAULT_RECENT)))
}

/// GET /api/kpis
pub async fn get_kpis(State(state): State<AppState>) -> Json<Kpis> {
    Json(state.hub.buffer().kpis())
}

/// GET /api/summary/daily
pub async fn daily_summary(State(state): State<AppState>) -> Json<DailySummary> {
    Json(state.hub.buffer().daily_summary())
}

/// GET /api/series
pub async fn get_series(State(state): State<AppState>) -> Json<SeriesResponse> {
    let buffer = state.hub.buffer();
    Json(SeriesResponse {
        latency: buffer.latency_series(DEFAULT_SERIES_LEN),
        throughput: buffer.throughput_series(DEFAULT_THROUGHPUT_MINUTES),
        profit: buffer.profit_series(DEFAULT_SERIES_LEN),
        heatmap: buffer.heatmap_matrix(DEFAULT_HEATMAP_COLS),
    })
}

/// 라이브 차트 지표. 알 수 없는 지표는 지연으로 응답한다.
///
/// GET /api/live/{metric}
pub async fn live_metric(
    State(state): State<AppState>,
    Path(metric): Path<String>,
) -> Json<LiveSeries> {
    let metric = LiveMetric::parse(&metric);
    Json(state.hub.buffer().live_series(metric, DEFAULT_LIVE_LEN))
}

/// GET /api/charts/data
pub async fn charts_data(State(state): State<AppState>) -> Json<ChartsDataResponse> {
    let buffer = state.hub.buffer();
    Json(ChartsDataResponse {
        metrics: buffer.recent(CHART_EVENTS),
        kpis: buffer.kpis(),
    })
}

/// 봇별 상태 (최근 heartbeat 순)
///
/// GET /api/bots/status
pub async fn bots_status(State(state): State<AppState>) -> Json<Vec<BotHealth>> {
    Json(state.hub.buffer().bot_health())
}
