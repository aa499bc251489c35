//! 대시보드 페이지와 일일 리포트.

use axum::extract::State;
use axum::response::Html;

use crate::embedded::dashboard_page;
use crate::AppState;

/// GET /
///
/// 현재 메트릭 패널을 넣은 대시보드 페이지.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(dashboard_page(&state.hub.render_current()))
}

/// GET /report
pub async fn report(State(state): State<AppState>) -> Html<String> {
    let summary = state.hub.buffer().daily_summary();
    Html(state.renderer.render_report(&summary))
}
