//! 애플리케이션 설정 구조체.
//!
//! 웹 서버 바인딩, 이벤트 파이프라인(버퍼 크기, 메일박스 용량, 입력 소스),
//! 렌탈 저장소 설정을 정의한다. `ConfigManager`가 JSON 파일로 로드/저장하고,
//! 바이너리에서 CLI/환경 변수로 오버라이드한다.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 웹 대시보드 설정
    #[serde(default)]
    pub web: WebConfig,
    /// 이벤트 파이프라인 설정
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// 렌탈 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// 기본 설정
    pub fn default_config() -> Self {
        Self::default()
    }

    /// 설정값 검증
    ///
    /// 시작 시점에만 호출되며, 실패는 프로세스 시작 실패로 이어진다.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.pipeline.max_events == 0 {
            return Err(CoreError::Config("max_events는 1 이상이어야 합니다".to_string()));
        }
        if self.pipeline.mailbox_capacity == 0 {
            return Err(CoreError::Config(
                "mailbox_capacity는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.pipeline.keepalive_secs == 0 {
            return Err(CoreError::Config(
                "keepalive_secs는 1 이상이어야 합니다".to_string(),
            ));
        }
        let (min, max) = (
            self.pipeline.mock_interval_min_secs,
            self.pipeline.mock_interval_max_secs,
        );
        if !(min > 0.0 && min <= max) {
            return Err(CoreError::Config(format!(
                "mock 간격 범위가 잘못됨: {min}..{max}"
            )));
        }
        if self.storage.expiry_sweep_secs == 0 {
            return Err(CoreError::Config(
                "expiry_sweep_secs는 1 이상이어야 합니다".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================
// 웹 서버 설정
// ============================================================

/// 웹 대시보드 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// 바인드 호스트 (기본: 127.0.0.1)
    #[serde(default = "default_web_host")]
    pub host: String,
    /// 웹 서버 포트 (기본: 8000)
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// 외부 접근 허용 여부 (true면 host 대신 0.0.0.0에 바인드)
    #[serde(default)]
    pub allow_external: bool,
    /// 허용 CORS origin 목록
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// 모든 origin 허용 (개발용)
    #[serde(default)]
    pub cors_allow_all: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            allow_external: false,
            cors_origins: default_cors_origins(),
            cors_allow_all: false,
        }
    }
}

impl WebConfig {
    /// 실제 바인드할 호스트
    pub fn bind_host(&self) -> &str {
        if self.allow_external {
            "0.0.0.0"
        } else {
            &self.host
        }
    }
}

fn default_web_host() -> String {
    "127.0.0.1".to_string()
}

fn default_web_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:8000".to_string(),
        "http://127.0.0.1:8000".to_string(),
    ]
}

// ============================================================
// 파이프라인 설정
// ============================================================

/// 이벤트 파이프라인 설정 (버퍼, 브로드캐스트, 입력 소스)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 메모리에 보관할 최대 이벤트 수
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    /// 구독자별 메일박스 용량
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
    /// SSE 유휴 시 keepalive 전송 간격 (초)
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
    /// 추적할 JSONL 로그 파일 경로 (없으면 샘플 모드)
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    /// 파일 처음부터 읽기 (기본: 끝에서부터 tail)
    #[serde(default)]
    pub tail_from_start: bool,
    /// 로그 경로가 있어도 샘플 데이터 강제
    #[serde(default)]
    pub force_sample: bool,
    /// 데이터 발행기 없이 빈 UI로 시작
    #[serde(default)]
    pub clean_ui: bool,
    /// 샘플 이벤트 최소 간격 (초)
    #[serde(default = "default_mock_interval_min_secs")]
    pub mock_interval_min_secs: f64,
    /// 샘플 이벤트 최대 간격 (초)
    #[serde(default = "default_mock_interval_max_secs")]
    pub mock_interval_max_secs: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_events: default_max_events(),
            mailbox_capacity: default_mailbox_capacity(),
            keepalive_secs: default_keepalive_secs(),
            log_path: None,
            tail_from_start: false,
            force_sample: false,
            clean_ui: false,
            mock_interval_min_secs: default_mock_interval_min_secs(),
            mock_interval_max_secs: default_mock_interval_max_secs(),
        }
    }
}

/// 설정에서 결정된 입력 소스
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMode {
    /// 발행기 없음
    Clean,
    /// JSONL 파일 추적
    Tail(PathBuf),
    /// 합성 샘플 이벤트
    Sample,
}

impl PipelineConfig {
    /// keepalive 간격
    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    /// 입력 소스 결정: clean_ui > 로그 파일 > 샘플
    pub fn source_mode(&self) -> SourceMode {
        if self.clean_ui {
            return SourceMode::Clean;
        }
        match &self.log_path {
            Some(path) if !self.force_sample => SourceMode::Tail(path.clone()),
            _ => SourceMode::Sample,
        }
    }
}

fn default_max_events() -> usize {
    1000
}

fn default_mailbox_capacity() -> usize {
    100
}

fn default_keepalive_secs() -> u64 {
    15
}

fn default_mock_interval_min_secs() -> f64 {
    3.0
}

fn default_mock_interval_max_secs() -> f64 {
    12.0
}

// ============================================================
// 저장소 설정
// ============================================================

/// 렌탈 저장소 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite 파일 경로 (없으면 플랫폼 데이터 디렉토리의 rentals.db)
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// 만료 렌탈 정리 주기 (초)
    #[serde(default = "default_expiry_sweep_secs")]
    pub expiry_sweep_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            expiry_sweep_secs: default_expiry_sweep_secs(),
        }
    }
}

impl StorageConfig {
    /// 만료 렌탈 정리 주기
    pub fn expiry_sweep(&self) -> Duration {
        Duration::from_secs(self.expiry_sweep_secs)
    }
}

fn default_expiry_sweep_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_uses_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.web.host, "127.0.0.1");
        assert_eq!(config.web.cors_origins.len(), 2);
        assert!(config.pipeline.log_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"pipeline": {"max_events": 50}}"#).unwrap();
        assert_eq!(config.pipeline.max_events, 50);
        assert_eq!(config.pipeline.mailbox_capacity, 100);
    }

    #[test]
    fn source_mode_priority() {
        let mut pipeline = PipelineConfig::default();
        assert_eq!(pipeline.source_mode(), SourceMode::Sample);

        pipeline.log_path = Some(PathBuf::from("/tmp/bot.jsonl"));
        assert_eq!(
            pipeline.source_mode(),
            SourceMode::Tail(PathBuf::from("/tmp/bot.jsonl"))
        );

        pipeline.force_sample = true;
        assert_eq!(pipeline.source_mode(), SourceMode::Sample);

        pipeline.clean_ui = true;
        assert_eq!(pipeline.source_mode(), SourceMode::Clean);
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let mut config = AppConfig::default_config();
        config.pipeline.max_events = 0;
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));

        let mut config = AppConfig::default_config();
        config.pipeline.mock_interval_min_secs = 20.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn allow_external_binds_all_interfaces() {
        let mut web = WebConfig::default();
        assert_eq!(web.bind_host(), "127.0.0.1");
        web.allow_external = true;
        assert_eq!(web.bind_host(), "0.0.0.0");
    }
}
