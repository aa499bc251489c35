//! 이벤트 입력 소스.
//!
//! - [`mock`]: 합성 샘플 이벤트
//! - [`tail`]: JSONL 로그 파일 추적
//!
//! HTTP 수집은 웹 레이어가 `MetricsHub::ingest`를 직접 호출한다.

pub mod mock;
pub mod tail;

use phoenix_core::config::{PipelineConfig, SourceMode};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::hub::MetricsHub;

/// 설정된 입력 소스를 백그라운드 태스크로 시작
///
/// `clean_ui` 모드면 아무것도 시작하지 않고 None.
pub fn spawn_source(
    config: &PipelineConfig,
    hub: MetricsHub,
    shutdown_rx: watch::Receiver<bool>,
) -> Option<JoinHandle<()>> {
    match config.source_mode() {
        SourceMode::Clean => {
            info!("클린 UI 모드: 데이터 발행기 없음");
            None
        }
        SourceMode::Tail(path) => {
            let options = tail::TailOptions::new(path, config.tail_from_start);
            Some(tokio::spawn(tail::run_log_tailer(hub, options, shutdown_rx)))
        }
        SourceMode::Sample => {
            let interval = mock::MockInterval::new(
                config.mock_interval_min_secs,
                config.mock_interval_max_secs,
            );
            Some(tokio::spawn(mock::run_mock_publisher(
                hub,
                interval,
                shutdown_rx,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::tests::test_hub;

    #[tokio::test]
    async fn clean_mode_spawns_nothing() {
        let config = PipelineConfig {
            clean_ui: true,
            ..PipelineConfig::default()
        };
        let (_tx, rx) = watch::channel(false);
        assert!(spawn_source(&config, test_hub(10), rx).is_none());
    }

    #[tokio::test]
    async fn sample_mode_stops_on_shutdown() {
        let config = PipelineConfig::default();
        let hub = test_hub(10);
        let (tx, rx) = watch::channel(false);
        let handle = spawn_source(&config, hub.clone(), rx).unwrap();

        tx.send(true).unwrap();
        handle.await.unwrap();
        assert!(hub.buffer().len() <= 1);
    }
}
