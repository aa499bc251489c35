//! HTML 조각 스트리밍 핸들러.
//!
//! 청크마다 HTML 조각 하나를 흘려보내는 `text/html` 응답이다. 첫 청크는 시작
//! 표시 주석이고, 클라이언트가 연결을 끊으면 스트림이 버려지며 끝난다.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures::stream::{self, Stream, StreamExt};
use phoenix_pipeline::normalize::normalize_line;
use phoenix_pipeline::sources::mock::sample_event;
use phoenix_pipeline::sources::tail::LogFollower;
use phoenix_pipeline::EventBuffer;
use tracing::{debug, warn};

use crate::render;
use crate::AppState;

/// 새 이벤트 확인 간격
const EVENTS_POLL: Duration = Duration::from_millis(500);
/// 로그 파일 EOF 재확인 간격
const LOG_POLL: Duration = Duration::from_millis(100);
const MINI_CHART_INTERVAL: Duration = Duration::from_secs(1);
const DEMO_LOG_INTERVAL: Duration = Duration::from_secs(1);
/// 로그 파일이 없을 때 보내는 샘플 항목 수
const DEMO_LOG_LINES: usize = 10;

/// 시작 표시 뒤에 조각을 이어 붙인 HTML 스트림 응답
fn html_stream<S>(start_marker: &'static str, chunks: S) -> Response
where
    S: Stream<Item = String> + Send + 'static,
{
    let body = stream::once(async move { format!("<!-- {start_marker} -->\n") })
        .chain(chunks)
        .map(Ok::<_, Infallible>);
    (
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(body),
    )
        .into_response()
}

/// 버퍼 이벤트를 한 줄씩 (기존 이벤트부터)
///
/// GET /events
pub async fn event_feed(State(state): State<AppState>) -> Response {
    html_stream("event-stream-start", event_rows(state.hub.buffer().clone()))
}

/// 커서 이후 이벤트를 모아 한 청크로. 새 이벤트가 없으면 기다린다.
fn event_rows(buffer: Arc<EventBuffer>) -> impl Stream<Item = String> + Send {
    stream::unfold((buffer, 0u64), |(buffer, mut cursor)| async move {
        loop {
            let (events, next) = buffer.events_since(cursor);
            cursor = next;
            if !events.is_empty() {
                let chunk: String = events.iter().map(render::event_row).collect();
                return Some((chunk, (buffer, cursor)));
            }
            tokio::time::sleep(EVENTS_POLL).await;
        }
    })
}

/// 로그 파일 추적 스트림. 파일이 없으면 샘플 항목 10개.
///
/// GET /logs/stream
pub async fn log_feed(State(state): State<AppState>) -> Response {
    let follower = match &state.log_path {
        Some(path) => match LogFollower::open(path, false).await {
            Ok(follower) => Some(follower),
            Err(e) => {
                debug!("로그 파일 열기 실패, 샘플 항목 사용: {}: {e}", path.display());
                None
            }
        },
        None => None,
    };

    match follower {
        Some(follower) => html_stream("logs-stream-start", log_lines(follower)),
        None => html_stream("logs-stream-start", demo_log_lines()),
    }
}

/// 파일 끝에 추가되는 줄을 정규화해 항목으로. 읽기 실패 시 주석 하나를 남기고 끝.
fn log_lines(follower: LogFollower) -> impl Stream<Item = String> + Send {
    stream::unfold(Some(follower), |follower| async move {
        let mut follower = follower?;
        loop {
            match follower.next_line().await {
                Ok(Some(line)) => match normalize_line(&line) {
                    Ok(Some(event)) => return Some((render::log_entry(&event), Some(follower))),
                    Ok(None) => {}
                    Err(e) => debug!("로그 줄 건너뜀: {e}"),
                },
                Ok(None) => tokio::time::sleep(LOG_POLL).await,
                Err(e) => {
                    warn!("로그 스트림 읽기 실패: {e}");
                    let comment = format!(
                        "<!-- 로그 파일 읽기 실패: {} -->\n",
                        render::escape_html(&e.to_string())
                    );
                    return Some((comment, None));
                }
            }
        }
    })
}

fn demo_log_lines() -> impl Stream<Item = String> + Send {
    stream::unfold(0usize, |sent| async move {
        if sent >= DEMO_LOG_LINES {
            return None;
        }
        if sent > 0 {
            tokio::time::sleep(DEMO_LOG_INTERVAL).await;
        }
        Some((render::log_entry(&sample_event()), sent + 1))
    })
}

/// 최신 이벤트 지연을 1초마다 막대 하나로
///
/// GET /charts/mini
pub async fn mini_chart_feed(State(state): State<AppState>) -> Response {
    html_stream("charts-mini-start", mini_bars(state.hub.buffer().clone()))
}

fn mini_bars(buffer: Arc<EventBuffer>) -> impl Stream<Item = String> + Send {
    stream::unfold((buffer, true), |(buffer, first)| async move {
        if !first {
            tokio::time::sleep(MINI_CHART_INTERVAL).await;
        }
        loop {
            if let Some(latest) = buffer.recent(1).pop() {
                return Some((render::mini_bar(latest.latency_ms), (buffer, false)));
            }
            tokio::time::sleep(MINI_CHART_INTERVAL).await;
        }
    })
}
