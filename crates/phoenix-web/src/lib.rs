//! # phoenix-web
//!
//! 봇 모니터링 웹 대시보드 서버.
//! Axum 기반 SSE 스트림 + JSON API + 서버 렌더링 HTML.
//!
//! ## 기능
//! - 실시간 메트릭 패널 스트림 (`/stream`)
//! - HTML 조각 스트림 (`/events`, `/logs/stream`, `/charts/mini`)
//! - 이벤트/KPI/시계열/봇 상태 조회
//! - JSON 로그 수집 (`POST /api/logs`)
//! - 봇 렌탈 생성/조회/취소, 가격 견적
//! - 대시보드 페이지, 일일 리포트, 정적 에셋 서빙

pub mod embedded;
pub mod error;
pub mod handlers;
pub mod render;
pub mod routes;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use chrono::{DateTime, Utc};
use phoenix_core::config::WebConfig;
use phoenix_core::ports::rental::RentalRepository;
use phoenix_pipeline::MetricsHub;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub use render::HtmlRenderer;

/// 포트 바인드 최대 시도 횟수
const MAX_PORT_ATTEMPTS: u16 = 10;

/// 웹 서버 애플리케이션 상태
#[derive(Clone)]
pub struct AppState {
    /// 이벤트 버퍼 + 브로드캐스터
    pub hub: MetricsHub,
    /// 렌탈 저장소
    pub rentals: Arc<dyn RentalRepository>,
    /// 리포트 페이지 렌더러
    pub renderer: Arc<HtmlRenderer>,
    /// SSE 유휴 keepalive 간격
    pub keepalive: Duration,
    /// 프로세스 시작 시각
    pub started_at: DateTime<Utc>,
    /// `/logs/stream`이 추적할 JSONL 로그 파일
    pub log_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        hub: MetricsHub,
        rentals: Arc<dyn RentalRepository>,
        renderer: Arc<HtmlRenderer>,
        keepalive: Duration,
    ) -> Self {
        Self {
            hub,
            rentals,
            renderer,
            keepalive,
            started_at: Utc::now(),
            log_path: None,
        }
    }

    pub fn with_log_path(mut self, log_path: Option<PathBuf>) -> Self {
        self.log_path = log_path;
        self
    }
}

/// 웹 대시보드 서버
pub struct WebServer {
    config: WebConfig,
    state: AppState,
}

impl WebServer {
    pub fn new(state: AppState, config: WebConfig) -> Self {
        Self { config, state }
    }

    /// 전체 라우터 (테스트에서 직접 구동)
    pub fn router(&self) -> Router {
        routes::build_router(self.state.clone(), &self.config)
    }

    /// 서버 실행
    ///
    /// 설정 포트부터 시작해 이미 사용 중이면 다음 포트를 시도한다.
    /// 최대 10개 포트를 시도한 후 실패하면 에러를 반환한다.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<(), std::io::Error> {
        let host = self.config.bind_host().to_string();
        let listener = bind_with_fallback(&host, self.config.port).await?;
        let app = self.router();

        match listener.local_addr() {
            Ok(addr) => info!("웹 대시보드 서버 시작: http://{addr}"),
            Err(_) => info!("웹 대시보드 서버 시작: http://{host}"),
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                loop {
                    if *shutdown_rx.borrow() {
                        info!("웹 서버 종료 신호 수신");
                        break;
                    }
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            })
            .await?;

        info!("웹 대시보드 서버 종료");
        Ok(())
    }

    /// 서버 URL 반환
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.config.bind_host(), self.config.port)
    }
}

/// `base_port`부터 시도할 포트 목록. `u16` 범위를 넘으면 멈춘다.
fn candidate_ports(base_port: u16) -> impl Iterator<Item = u16> {
    (0..MAX_PORT_ATTEMPTS).map_while(move |attempt| base_port.checked_add(attempt))
}

/// 사용 중인 포트는 건너뛰며 바인딩
///
/// 호스트 이름(`localhost`)과 IPv6 주소도 그대로 해석한다.
async fn bind_with_fallback(host: &str, base_port: u16) -> Result<TcpListener, std::io::Error> {
    let mut last_error = None;

    for port in candidate_ports(base_port) {
        match TcpListener::bind((host, port)).await {
            Ok(listener) => {
                if port != base_port {
                    warn!("포트 {base_port} 사용 불가, 대체 포트 {port} 사용");
                }
                return Ok(listener);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                warn!("포트 {port} 이미 사용 중, 다음 포트 시도...");
                last_error = Some(e);
            }
            Err(e) => {
                error!("{host}:{port} 바인딩 실패: {e}");
                return Err(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrInUse,
            format!("포트 {base_port}부터 사용 가능한 포트 없음"),
        )
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use phoenix_pipeline::{Broadcaster, EventBuffer};
    use phoenix_storage::SqliteStorage;

    pub(crate) fn test_state() -> AppState {
        let renderer = Arc::new(HtmlRenderer::new());
        let hub = MetricsHub::new(
            Arc::new(EventBuffer::new(100)),
            Broadcaster::new(10),
            renderer.clone(),
        );
        let storage = SqliteStorage::open_in_memory().unwrap();
        AppState::new(hub, Arc::new(storage), renderer, Duration::from_secs(15))
    }

    #[test]
    fn web_server_url() {
        let server = WebServer::new(test_state(), WebConfig::default());
        assert_eq!(server.url(), "http://127.0.0.1:8000");
    }

    #[test]
    fn external_binding_url() {
        let config = WebConfig {
            allow_external: true,
            ..WebConfig::default()
        };
        let server = WebServer::new(test_state(), config);
        assert_eq!(server.url(), "http://0.0.0.0:8000");
    }

    #[tokio::test]
    async fn falls_back_to_next_port_when_busy() {
        let blocker = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let busy_port = blocker.local_addr().unwrap().port();

        let config = WebConfig {
            port: busy_port,
            ..WebConfig::default()
        };
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(WebServer::new(test_state(), config).run(rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn candidate_ports_stop_at_range_end() {
        assert_eq!(candidate_ports(65535).collect::<Vec<_>>(), vec![65535]);
        assert_eq!(
            candidate_ports(65530).collect::<Vec<_>>(),
            (65530..=65535).collect::<Vec<_>>()
        );
        assert_eq!(candidate_ports(8000).count(), MAX_PORT_ATTEMPTS as usize);
    }

    #[tokio::test]
    async fn binds_by_host_name() {
        let listener = bind_with_fallback("localhost", 0).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }

    #[tokio::test]
    async fn binds_ipv6_loopback_when_available() {
        // IPv6가 없는 환경에서는 AddrNotAvailable 등으로 실패할 수 있다
        match bind_with_fallback("::1", 0).await {
            Ok(listener) => assert!(listener.local_addr().unwrap().is_ipv6()),
            Err(e) => assert_ne!(e.kind(), std::io::ErrorKind::InvalidInput),
        }
    }
}
