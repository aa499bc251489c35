//! SSE 실시간 스트림 핸들러.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures::stream::{self, Stream, StreamExt};
use phoenix_pipeline::Subscription;
use tracing::debug;

use crate::AppState;

/// 메트릭 패널 갱신 이벤트 이름
pub const METRICS_UPDATE_EVENT: &str = "metrics_update";

/// 스트림으로 내보낼 메시지
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    /// 연결 직후 1회
    Ready,
    /// 렌더링된 메트릭 패널
    Update(Arc<str>),
    /// 유휴 시간 초과
    Keepalive,
}

impl StreamMessage {
    fn into_event(self) -> Event {
        match self {
            StreamMessage::Ready => Event::default().event("ping").data("ready"),
            StreamMessage::Keepalive => Event::default().event("ping").data("keepalive"),
            StreamMessage::Update(html) => {
                // SSE 데이터에는 CR을 쓸 수 없음
                let data = if html.contains('\r') {
                    html.replace('\r', "")
                } else {
                    html.to_string()
                };
                Event::default().event(METRICS_UPDATE_EVENT).data(data)
            }
        }
    }
}

/// 구독 → 메시지 스트림
///
/// `Ready` 후, `keepalive` 안에 발행이 오면 `Update`, 없으면 `Keepalive`.
/// 구독 메일박스가 닫히면 끝난다. 스트림이 버려지면 구독도 해제된다.
pub fn message_stream(
    subscription: Subscription,
    keepalive: Duration,
) -> impl Stream<Item = StreamMessage> + Send {
    let ready = stream::once(async { StreamMessage::Ready });
    let updates = stream::unfold(subscription, move |mut sub| async move {
        match tokio::time::timeout(keepalive, sub.recv()).await {
            Ok(Some(html)) => Some((StreamMessage::Update(html), sub)),
            Ok(None) => {
                debug!("구독 {} 메일박스 닫힘, 스트림 종료", sub.id());
                None
            }
            Err(_) => Some((StreamMessage::Keepalive, sub)),
        }
    });
    ready.chain(updates)
}

/// SSE 스트림 엔드포인트
///
/// GET /stream
///
/// 클라이언트는 EventSource API로 `ping`, `metrics_update` 이벤트를 수신한다.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.hub.broadcaster().subscribe();
    debug!("SSE 구독 시작: {}", subscription.id());

    let events = message_stream(subscription, state.keepalive)
        .map(|message| Ok::<_, Infallible>(message.into_event()));
    Sse::new(events)
}
