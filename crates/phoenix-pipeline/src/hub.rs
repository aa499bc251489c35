//! 버퍼 → 렌더링 → 브로드캐스트 연결.
//!
//! 모든 입력 소스(샘플 생성기, 로그 추적기, HTTP 수집)는 `MetricsHub::ingest`를
//! 통해 이벤트를 넣는다. 버퍼 추가와 발행은 서로 독립적이며, 발행 실패가
//! 버퍼 상태에 영향을 주지 않는다.

use std::sync::Arc;

use tracing::debug;

use phoenix_core::models::metric::MetricEvent;

use crate::broadcaster::{Broadcaster, PublishReport};
use crate::buffer::{DashboardSnapshot, EventBuffer};

/// 대시보드 스냅샷 → HTML 조각
///
/// 구현: `phoenix-web` crate (`HtmlRenderer`)
pub trait FragmentRenderer: Send + Sync {
    /// 실시간 갱신용 메트릭 패널 렌더링
    fn render_metrics(&self, snapshot: &DashboardSnapshot) -> String;
}

/// 파이프라인 허브
#[derive(Clone)]
pub struct MetricsHub {
    buffer: Arc<EventBuffer>,
    broadcaster: Broadcaster,
    renderer: Arc<dyn FragmentRenderer>,
}

impl MetricsHub {
    pub fn new(
        buffer: Arc<EventBuffer>,
        broadcaster: Broadcaster,
        renderer: Arc<dyn FragmentRenderer>,
    ) -> Self {
        Self {
            buffer,
            broadcaster,
            renderer,
        }
    }

    pub fn buffer(&self) -> &Arc<EventBuffer> {
        &self.buffer
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// 이벤트 추가 후, 하나 이상 추가되었으면 한 번만 렌더링/발행
    ///
    /// 추가된 이벤트 수를 반환한다.
    pub fn ingest<I>(&self, events: I) -> usize
    where
        I: IntoIterator<Item = MetricEvent>,
    {
        let mut added = 0;
        for event in events {
            self.buffer.add(event);
            added += 1;
        }
        if added > 0 {
            let report = self.publish_snapshot();
            debug!(
                "이벤트 {added}개 수집, 발행 {}건 (폐기 {})",
                report.delivered, report.dropped
            );
        }
        added
    }

    pub fn ingest_one(&self, event: MetricEvent) {
        self.ingest(std::iter::once(event));
    }

    /// 현재 상태의 메트릭 패널
    pub fn render_current(&self) -> String {
        self.renderer.render_metrics(&self.buffer.snapshot())
    }

    /// 현재 상태를 렌더링해 모든 구독자에게 발행
    pub fn publish_snapshot(&self) -> PublishReport {
        self.broadcaster.publish(self.render_current())
    }
}

impl std::fmt::Debug for MetricsHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsHub")
            .field("buffered", &self.buffer.len())
            .field("subscribers", &self.broadcaster.subscriber_count())
            .finish()
    }
}
