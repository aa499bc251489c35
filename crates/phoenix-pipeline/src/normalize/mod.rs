//! 이종 입력 → `MetricEvent` 정규화.
//!
//! 샘플 생성기, JSONL 로그 파일, HTTP 수집 엔드포인트의 JSON 객체를 하나의
//! 이벤트 형태로 바꾼다. 구조화된 메트릭 객체와 봇 로그 레코드를 구분해서
//! 처리하며, 필드별 후보 키는 [`fields`]의 테이블에 있다.
//!
//! 잘못된 객체는 `NormalizeError`를 반환하고, 호출자는 해당 객체만 건너뛴다.

mod fields;
mod log_record;

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use phoenix_core::models::metric::{EventStatus, MetricEvent};

pub use fields::shorten_tx_reference;

/// 정규화 실패
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// 타임스탬프 해석 불가
    #[error("타임스탬프 해석 실패 ({field}): {value}")]
    InvalidTimestamp { field: &'static str, value: String },

    /// 필드 값 오류
    #[error("필드 값 오류 ({field}): {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// JSON 객체가 아님
    #[error("JSON 객체가 아님")]
    NotAnObject,

    /// JSON 파싱 실패
    #[error("JSON 파싱 실패: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON 값 하나를 정규화
///
/// 로그 레코드가 메트릭을 담고 있지 않으면 `Ok(None)`.
pub fn normalize(value: &Value) -> Result<Option<MetricEvent>, NormalizeError> {
    let obj = value.as_object().ok_or(NormalizeError::NotAnObject)?;
    if log_record::looks_like_log_record(obj) {
        log_record::parse(obj)
    } else {
        normalize_structured(value).map(Some)
    }
}

/// 구조화된 메트릭 객체 정규화
pub fn normalize_structured(value: &Value) -> Result<MetricEvent, NormalizeError> {
    let obj = value.as_object().ok_or(NormalizeError::NotAnObject)?;

    let timestamp = fields::timestamp(obj)?.unwrap_or_else(Utc::now);
    let latency_ms = fields::latency_ms(obj)?.unwrap_or(0);
    let error = fields::first_text(obj, fields::ERROR_KEYS);
    let status = fields::first_str(obj, fields::STATUS_KEYS)
        .and_then(EventStatus::parse_lenient)
        .unwrap_or_else(|| EventStatus::derived_from_error(error.as_deref()));

    Ok(MetricEvent {
        timestamp,
        source_name: fields::bot_name(obj),
        latency_ms,
        tx_reference: fields::tx_reference(obj).unwrap_or_default(),
        error,
        status: Some(status),
        profit: fields::first_f64(obj, fields::PROFIT_KEYS),
    })
}

/// JSONL 한 줄 정규화. 빈 줄은 `Ok(None)`.
pub fn normalize_line(line: &str) -> Result<Option<MetricEvent>, NormalizeError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(line)?;
    normalize(&value)
}

/// 요청 본문 → JSON 값 목록
///
/// JSON 배열, 단일 객체, 줄 단위 JSON(NDJSON)을 받는다. 파싱할 수 없는 줄은
/// 건너뛴다.
pub fn split_batch(body: &str) -> Vec<Value> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => items,
        Ok(single @ Value::Object(_)) => vec![single],
        Ok(_) => Vec::new(),
        Err(_) => body
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| match serde_json::from_str::<Value>(line) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!("잘못된 JSON 줄 건너뜀: {e}");
                    None
                }
            })
            .collect(),
    }
}

/// 배치 정규화 결과
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// 본문에서 읽은 JSON 값 수
    pub received: usize,
    /// 생성된 이벤트
    pub events: Vec<MetricEvent>,
}

/// 요청 본문 전체를 정규화. 실패한 객체는 건너뛴다.
pub fn normalize_batch(body: &str) -> BatchOutcome {
    let values = split_batch(body);
    let received = values.len();
    let events = values
        .iter()
        .filter_map(|value| match normalize(value) {
            Ok(event) => event,
            Err(e) => {
                debug!("객체 정규화 실패, 건너뜀: {e}");
                None
            }
        })
        .collect();
    BatchOutcome { received, events }
}
