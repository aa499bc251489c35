//! 메트릭 이벤트 모델.
//!
//! 봇이 방출한 단일 관측값. 정규화 단계에서 생성되어 이후 불변으로 취급된다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 이벤트 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Ok,
    Warning,
    Critical,
}

impl EventStatus {
    /// 문자열 상태값 해석 (대소문자 무시, 흔한 동의어 허용)
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ok" | "success" | "healthy" => Some(Self::Ok),
            "warning" | "warn" | "degraded" => Some(Self::Warning),
            "critical" | "error" | "failed" | "failure" => Some(Self::Critical),
            _ => None,
        }
    }

    /// 에러 유무로부터 상태 유도
    pub fn derived_from_error(error: Option<&str>) -> Self {
        if error.is_some() {
            Self::Critical
        } else {
            Self::Ok
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 메트릭 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEvent {
    /// 관측 시각 (UTC, 정렬 키)
    pub timestamp: DateTime<Utc>,
    /// 이벤트를 방출한 봇 이름
    #[serde(rename = "bot_name", alias = "source_name")]
    pub source_name: String,
    /// 지연 시간 (ms)
    pub latency_ms: u64,
    /// 표시용 트랜잭션 참조 (축약된 해시)
    #[serde(rename = "tx_hash", alias = "tx_reference", default)]
    pub tx_reference: String,
    /// 에러 메시지 (있으면 실패)
    #[serde(default)]
    pub error: Option<String>,
    /// 상태 (없으면 error로부터 유도)
    #[serde(default)]
    pub status: Option<EventStatus>,
    /// 손익 (선택)
    #[serde(default)]
    pub profit: Option<f64>,
}

impl MetricEvent {
    /// 성공 상태의 기본 이벤트 생성
    pub fn new(timestamp: DateTime<Utc>, source_name: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            timestamp,
            source_name: source_name.into(),
            latency_ms,
            tx_reference: String::new(),
            error: None,
            status: Some(EventStatus::Ok),
            profit: None,
        }
    }

    pub fn with_tx_reference(mut self, tx: impl Into<String>) -> Self {
        self.tx_reference = tx.into();
        self
    }

    /// 에러 설정. 상태가 Ok였다면 Critical로 바꾼다.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        if matches!(self.status, None | Some(EventStatus::Ok)) {
            self.status = Some(EventStatus::Critical);
        }
        self
    }

    pub fn with_status(mut self, status: Option<EventStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn with_profit(mut self, profit: f64) -> Self {
        self.profit = Some(profit);
        self
    }

    /// 에러 없음 여부 (KPI 성공률 기준)
    pub fn is_error_free(&self) -> bool {
        self.error.is_none()
    }

    /// 에러 없음 + 상태 ok 또는 미지정 (일일 요약/봇 상태 기준)
    pub fn is_success(&self) -> bool {
        self.error.is_none() && matches!(self.status, None | Some(EventStatus::Ok))
    }

    /// 상태가 없으면 error로부터 유도한 상태
    pub fn effective_status(&self) -> EventStatus {
        self.status
            .unwrap_or_else(|| EventStatus::derived_from_error(self.error.as_deref()))
    }

    /// URL/렌탈용 봇 식별자 (소문자, 공백 → '-')
    pub fn bot_id(&self) -> String {
        bot_id_of(&self.source_name)
    }
}

/// 봇 이름을 식별자로 변환
pub fn bot_id_of(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}
