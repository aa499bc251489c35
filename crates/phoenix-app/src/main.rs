//! # phoenix-app
//!
//! Phoenix 봇 대시보드 바이너리 진입점.
//! 설정 로드, 의존성 와이어링, 백그라운드 태스크, 종료 처리.

mod lifecycle;
mod sweeper;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use phoenix_core::config::AppConfig;
use phoenix_core::config_manager::ConfigManager;
use phoenix_core::ports::rental::RentalRepository;
use phoenix_pipeline::sources::spawn_source;
use phoenix_pipeline::{Broadcaster, EventBuffer, MetricsHub};
use phoenix_storage::SqliteStorage;
use phoenix_web::{AppState, HtmlRenderer, WebServer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::lifecycle::LifecycleManager;

/// 로그 필터 대상 crate
const LOG_TARGETS: [&str; 5] = [
    "phoenix",
    "phoenix_core",
    "phoenix_pipeline",
    "phoenix_storage",
    "phoenix_web",
];

/// Phoenix 봇 모니터링 대시보드
///
/// 봇 지표를 수집해 SSE로 실시간 대시보드에 전송하고, 봇 렌탈을 관리한다.
#[derive(Parser, Debug)]
#[command(name = "phoenix")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 웹 서버 포트
    #[arg(long, short = 'p', env = "PORT")]
    port: Option<u16>,

    /// 바인드 호스트
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// 메모리에 보관할 최대 이벤트 수
    #[arg(long, env = "MAX_EVENTS")]
    max_events: Option<usize>,

    /// 추적할 JSONL 로그 파일
    #[arg(long, env = "SILVERBACK_LOG_PATH")]
    log_path: Option<PathBuf>,

    /// 로그 파일을 처음부터 읽기
    #[arg(long)]
    from_start: bool,

    /// 로그 경로가 있어도 샘플 데이터 사용
    #[arg(long, env = "FORCE_SAMPLE")]
    force_sample: bool,

    /// 데이터 발행기 없이 빈 UI로 시작
    #[arg(long, env = "CLEAN_UI")]
    clean_ui: bool,

    /// 렌탈 DB 경로
    #[arg(long, env = "DATABASE_PATH")]
    database_path: Option<PathBuf>,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    /// 파일 설정 위에 CLI/환경 변수 값을 덮어쓴다.
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.web.port = port;
        }
        if let Some(host) = &self.host {
            config.web.host = host.clone();
        }
        if let Some(max_events) = self.max_events {
            config.pipeline.max_events = max_events;
        }
        if let Some(path) = &self.log_path {
            config.pipeline.log_path = Some(path.clone());
        }
        if self.from_start {
            config.pipeline.tail_from_start = true;
        }
        if self.force_sample {
            config.pipeline.force_sample = true;
        }
        if self.clean_ui {
            config.pipeline.clean_ui = true;
        }
        if let Some(path) = &self.database_path {
            config.storage.database_path = Some(path.clone());
        }
    }
}

fn init_tracing(log_level: &str) {
    let log_filter = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={log_level}"))
        .collect::<Vec<_>>()
        .join(",");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();
}

/// 설정 로드. 설정 관리자를 만들 수 없으면 기본 설정을 쓴다.
fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    let manager = match path {
        Some(path) => Some(ConfigManager::with_path(path)?),
        None => match ConfigManager::new() {
            Ok(manager) => Some(manager),
            Err(e) => {
                warn!("설정 관리자 초기화 실패, 기본 설정 사용: {e}");
                None
            }
        },
    };
    Ok(match manager {
        Some(manager) => {
            info!("설정 파일: {}", manager.config_path().display());
            manager.get()
        }
        None => AppConfig::default_config(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!(".env 로드 실패: {e}");
        }
    }
    let args = Args::parse();
    init_tracing(&args.log_level);

    let mut config = load_config(args.config.clone())?;
    args.apply_to(&mut config);
    config.validate().context("설정 검증 실패")?;

    // ── 렌탈 저장소 ──
    let db_path = match &config.storage.database_path {
        Some(path) => path.clone(),
        None => ConfigManager::default_database_path()?,
    };
    let storage = SqliteStorage::open(&db_path)
        .with_context(|| format!("렌탈 DB 열기 실패: {}", db_path.display()))?;
    info!("렌탈 DB: {}", db_path.display());
    let rentals: Arc<dyn RentalRepository> = Arc::new(storage);

    // ── 이벤트 파이프라인 ──
    let renderer = Arc::new(HtmlRenderer::new());
    let hub = MetricsHub::new(
        Arc::new(EventBuffer::new(config.pipeline.max_events)),
        Broadcaster::new(config.pipeline.mailbox_capacity),
        renderer.clone(),
    );

    let mut lifecycle = LifecycleManager::new();

    if let Some(handle) = spawn_source(&config.pipeline, hub.clone(), lifecycle.subscribe()) {
        lifecycle.track("event-source", handle);
    }

    lifecycle.track(
        "rental-sweeper",
        tokio::spawn(sweeper::run_expiry_sweeper(
            rentals.clone(),
            config.storage.expiry_sweep(),
            lifecycle.subscribe(),
        )),
    );

    // ── 웹 대시보드 ──
    let state = AppState::new(hub, rentals, renderer, config.pipeline.keepalive())
        .with_log_path(config.pipeline.log_path.clone());
    let web_server = WebServer::new(state, config.web.clone());
    info!("웹 대시보드: {}", web_server.url());
    let web_shutdown_rx = lifecycle.subscribe();
    let web_shutdown = lifecycle.shutdown_sender();
    lifecycle.track(
        "web-server",
        tokio::spawn(async move {
            if let Err(e) = web_server.run(web_shutdown_rx).await {
                error!("웹 서버 오류: {e}");
                let _ = web_shutdown.send(true);
            }
        }),
    );

    info!("Phoenix 실행 중 (Ctrl+C로 종료)");
    let mut shutdown_rx = lifecycle.subscribe();
    tokio::select! {
        _ = lifecycle.wait_for_signal() => {}
        _ = shutdown_rx.changed() => warn!("웹 서버 중단으로 종료"),
    }

    lifecycle.join_all().await;
    info!("Phoenix 종료");
    Ok(())
}
