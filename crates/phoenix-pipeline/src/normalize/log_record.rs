//! 봇 로그 레코드 해석.
//!
//! `level`/`levelno` + `message`/`msg` 형태의 로그 한 줄에서 메트릭을 뽑는다.
//! 트랜잭션 참조, 0이 아닌 지연, 확정/제출 문구 중 하나도 없으면 이벤트를
//! 만들지 않는다.

use chrono::Utc;
use serde_json::{Map, Value};

use phoenix_core::models::metric::{EventStatus, MetricEvent};

use super::fields;
use super::NormalizeError;

type Object = Map<String, Value>;

/// 이벤트로 인정하는 메시지 문구 (소문자 비교)
const TX_MARKERS: &[&str] = &["confirmed", "submitted"];

/// 레이트 리밋 감지 문구 (소문자 비교)
const RATE_LIMIT_MARKERS: &[&str] = &["429", "rate limit", "too many requests"];

const LEVEL_CRITICAL: u64 = 40;
const LEVEL_WARNING: u64 = 30;
const LEVEL_INFO: u64 = 20;

/// 로그 레코드 형태인지 판별
///
/// 레벨과 메시지가 모두 있고, 구조화된 지연 필드가 없어야 한다.
pub(crate) fn looks_like_log_record(obj: &Object) -> bool {
    level_of(obj).is_some()
        && fields::first_str(obj, fields::MESSAGE_KEYS).is_some()
        && !obj.contains_key("latency_ms")
}

/// 숫자 레벨 또는 이름 레벨을 숫자로
fn level_of(obj: &Object) -> Option<u64> {
    fields::LEVEL_KEYS.iter().find_map(|key| match obj.get(*key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(name) => level_from_name(name),
        _ => None,
    })
}

fn level_from_name(name: &str) -> Option<u64> {
    match name.trim().to_ascii_uppercase().as_str() {
        "DEBUG" => Some(10),
        "INFO" => Some(LEVEL_INFO),
        "WARNING" | "WARN" => Some(LEVEL_WARNING),
        "ERROR" => Some(LEVEL_CRITICAL),
        "CRITICAL" | "FATAL" => Some(50),
        other => other.parse().ok(),
    }
}

/// 레벨별 상태/에러 결정
fn status_for_level(level: u64, message: &str) -> (Option<EventStatus>, Option<String>) {
    if level >= LEVEL_CRITICAL {
        let lower = message.to_lowercase();
        let error = if RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m)) {
            format!("rate limited: {message}")
        } else {
            message.to_string()
        };
        (Some(EventStatus::Critical), Some(error))
    } else if level == LEVEL_WARNING {
        (Some(EventStatus::Warning), Some(message.to_string()))
    } else if level == LEVEL_INFO {
        (Some(EventStatus::Ok), None)
    } else {
        (None, None)
    }
}

/// 로그 레코드 → 메트릭 이벤트 (조건 미달이면 None)
pub(crate) fn parse(obj: &Object) -> Result<Option<MetricEvent>, NormalizeError> {
    let Some(level) = level_of(obj) else {
        return Err(NormalizeError::InvalidField {
            field: "level",
            reason: "레벨 없음".to_string(),
        });
    };
    let message = fields::first_str(obj, fields::MESSAGE_KEYS).unwrap_or_default();

    let tx_reference = fields::tx_reference(obj)
        .or_else(|| fields::free_text_tx_reference(message))
        .unwrap_or_default();
    let latency_ms = match fields::latency_ms(obj)? {
        Some(ms) => ms,
        None => fields::free_text_latency_ms(message).unwrap_or(0),
    };

    let lower = message.to_lowercase();
    let has_marker = TX_MARKERS.iter().any(|m| lower.contains(m));
    if tx_reference.is_empty() && latency_ms == 0 && !has_marker {
        return Ok(None);
    }

    let timestamp = fields::timestamp(obj)?.unwrap_or_else(Utc::now);

    // 명시적 error 필드가 레벨보다 우선
    let (status, error) = match fields::first_text(obj, fields::LOG_ERROR_KEYS) {
        Some(error) => (Some(EventStatus::Critical), Some(error)),
        None => status_for_level(level, message),
    };
    let status = status.or_else(|| Some(EventStatus::derived_from_error(error.as_deref())));

    let profit = fields::first_f64(obj, fields::PROFIT_KEYS)
        .or_else(|| fields::free_text_fee_profit(message));

    Ok(Some(MetricEvent {
        timestamp,
        source_name: fields::bot_name(obj),
        latency_ms,
        tx_reference,
        error,
        status,
        profit,
    }))
}
